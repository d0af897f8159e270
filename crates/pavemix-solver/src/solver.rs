use log::{debug, trace};
use microlp::{ComparisonOp, OptimizationDirection, Problem, Variable};
use thiserror::Error;

use crate::problem::{ConstraintOp, LpProblem};
use crate::solution::Solution;

/// Failures of the solving capability itself, as opposed to
/// infeasible or unbounded outcomes which are reported in [`Solution`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Malformed problem: {0}")]
    MalformedProblem(String),
    #[error("Solver backend failure: {0}")]
    Backend(String),
}

/// Anything that can take an [`LpProblem`] to an optimal assignment
pub trait LpSolver {
    fn solve(&self, problem: &LpProblem) -> Result<Solution, SolverError>;
}

/// Default LP capability, backed by the `microlp` simplex implementation
#[derive(Debug, Clone)]
pub struct Solver {
    /// Tolerance for constraints left with no coefficients
    tolerance: f64,
}

impl Default for Solver {
    fn default() -> Self {
        Self { tolerance: 1e-9 }
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    fn check_shape(&self, problem: &LpProblem) -> Result<(), SolverError> {
        let n = problem.num_variables();
        if n == 0 {
            return Err(SolverError::MalformedProblem("problem has no variables".to_string()));
        }
        if problem.objective.coefficients.len() != n {
            return Err(SolverError::MalformedProblem(format!(
                "objective has {} coefficients for {} variables",
                problem.objective.coefficients.len(),
                n
            )));
        }
        if problem.bounds.len() != n {
            return Err(SolverError::MalformedProblem(format!(
                "{} bounds for {} variables",
                problem.bounds.len(),
                n
            )));
        }
        if problem.objective.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(SolverError::MalformedProblem("non-finite objective coefficient".to_string()));
        }
        for c in &problem.constraints {
            if c.coefficients.len() != n {
                return Err(SolverError::MalformedProblem(format!(
                    "constraint {} has {} coefficients for {} variables",
                    c.name,
                    c.coefficients.len(),
                    n
                )));
            }
            if !c.rhs.is_finite() || c.coefficients.iter().any(|v| !v.is_finite()) {
                return Err(SolverError::MalformedProblem(format!(
                    "constraint {} has a non-finite value",
                    c.name
                )));
            }
        }
        Ok(())
    }
}

impl LpSolver for Solver {
    fn solve(&self, problem: &LpProblem) -> Result<Solution, SolverError> {
        self.check_shape(problem)?;

        let direction = if problem.objective.minimize {
            OptimizationDirection::Minimize
        } else {
            OptimizationDirection::Maximize
        };
        let mut lp = Problem::new(direction);

        let vars: Vec<Variable> = problem
            .objective
            .coefficients
            .iter()
            .zip(&problem.bounds)
            .map(|(&cost, &bounds)| lp.add_var(cost, bounds))
            .collect();

        for c in &problem.constraints {
            if c.is_empty() {
                if c.is_satisfied(0.0, self.tolerance) {
                    trace!("constraint {} has no terms and holds trivially", c.name);
                    continue;
                }
                debug!("constraint {} has no terms and cannot hold (0 {} {})", c.name, c.op, c.rhs);
                return Ok(Solution::infeasible());
            }

            // Zero coefficients are left out of the row entirely
            let terms: Vec<(Variable, f64)> = c
                .coefficients
                .iter()
                .zip(&vars)
                .filter(|&(&coef, _)| coef != 0.0)
                .map(|(&coef, &var)| (var, coef))
                .collect();

            let op = match c.op {
                ConstraintOp::Le => ComparisonOp::Le,
                ConstraintOp::Ge => ComparisonOp::Ge,
                ConstraintOp::Eq => ComparisonOp::Eq,
            };
            lp.add_constraint(terms, op, c.rhs);
        }

        debug!(
            "solving LP with {} variables and {} constraints",
            problem.num_variables(),
            problem.num_constraints()
        );

        match lp.solve() {
            Ok(solved) => {
                let values: Vec<f64> = vars.iter().map(|&v| solved[v]).collect();
                let objective_value = solved.objective();
                debug!("optimal objective {}", objective_value);
                Ok(Solution::optimal(values, objective_value))
            }
            Err(microlp::Error::Infeasible) => {
                debug!("problem is infeasible");
                Ok(Solution::infeasible())
            }
            Err(microlp::Error::Unbounded) => {
                debug!("problem is unbounded");
                Ok(Solution::unbounded())
            }
            Err(other) => Err(SolverError::Backend(other.to_string())),
        }
    }
}
