mod problem;
mod solution;
mod solver;

pub use problem::{Constraint, ConstraintOp, LpProblem, Objective};
pub use solution::{ConstraintViolation, Solution, SolutionStatus};
pub use solver::{LpSolver, Solver, SolverError};
