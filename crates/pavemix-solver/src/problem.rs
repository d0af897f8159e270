use crate::solution::ConstraintViolation;

/// A linear program over named, continuous variables
#[derive(Debug, Clone)]
pub struct LpProblem {
    /// Variable names
    pub variables: Vec<String>,
    /// Objective function coefficients
    pub objective: Objective,
    /// Constraints
    pub constraints: Vec<Constraint>,
    /// Inclusive `(min, max)` bounds for each variable
    pub bounds: Vec<(f64, f64)>,
}

#[derive(Debug, Clone)]
pub struct Objective {
    /// Coefficients for each variable
    pub coefficients: Vec<f64>,
    /// Whether to minimize or maximize
    pub minimize: bool,
}

#[derive(Debug, Clone)]
pub struct Constraint {
    /// Name/label for the constraint (for diagnostics)
    pub name: String,
    /// Coefficients for each variable
    pub coefficients: Vec<f64>,
    /// Comparison operator
    pub op: ConstraintOp,
    /// Right-hand side value
    pub rhs: f64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    /// Less than or equal (<=)
    Le,
    /// Greater than or equal (>=)
    Ge,
    /// Equal (=)
    Eq,
}

impl std::fmt::Display for ConstraintOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstraintOp::Le => write!(f, "<="),
            ConstraintOp::Ge => write!(f, ">="),
            ConstraintOp::Eq => write!(f, "="),
        }
    }
}

impl Constraint {
    /// Left-hand side value for an assignment. Missing values count as zero.
    pub fn lhs(&self, values: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(values)
            .map(|(coef, value)| coef * value)
            .sum()
    }

    /// Whether every coefficient is zero, leaving `0 op rhs`
    pub fn is_empty(&self) -> bool {
        self.coefficients.iter().all(|&c| c == 0.0)
    }

    /// Check `lhs op rhs` within `tolerance`
    pub fn is_satisfied(&self, lhs: f64, tolerance: f64) -> bool {
        match self.op {
            ConstraintOp::Le => lhs <= self.rhs + tolerance,
            ConstraintOp::Ge => lhs >= self.rhs - tolerance,
            ConstraintOp::Eq => (lhs - self.rhs).abs() <= tolerance,
        }
    }
}

impl LpProblem {
    /// Create a minimization problem whose variables are all non-negative and unbounded above
    pub fn new(variables: Vec<String>) -> Self {
        let n = variables.len();
        Self {
            variables,
            objective: Objective {
                coefficients: vec![0.0; n],
                minimize: true,
            },
            constraints: Vec::new(),
            bounds: vec![(0.0, f64::INFINITY); n],
        }
    }

    pub fn set_objective(&mut self, coefficients: Vec<f64>, minimize: bool) {
        self.objective = Objective { coefficients, minimize };
    }

    pub fn add_constraint(&mut self, name: impl Into<String>, coefficients: Vec<f64>, op: ConstraintOp, rhs: f64) {
        self.constraints.push(Constraint {
            name: name.into(),
            coefficients,
            op,
            rhs,
        });
    }

    pub fn constraint(&self, name: &str) -> Option<&Constraint> {
        self.constraints.iter().find(|c| c.name == name)
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Re-check every constraint and variable bound against `values`.
    ///
    /// Returns the violated ones, worst first. An empty list means the
    /// assignment is feasible within `tolerance`.
    pub fn violations(&self, values: &[f64], tolerance: f64) -> Vec<ConstraintViolation> {
        let mut violations = Vec::new();

        for c in &self.constraints {
            let lhs = c.lhs(values);
            if c.is_satisfied(lhs, tolerance) {
                continue;
            }

            let (amount, description) = match c.op {
                ConstraintOp::Le => {
                    let amt = lhs - c.rhs;
                    (amt, format!("{} exceeds maximum of {:.2} by {:.4}", c.name, c.rhs, amt))
                }
                ConstraintOp::Ge => {
                    let amt = c.rhs - lhs;
                    (amt, format!("{} is below minimum of {:.2} by {:.4}", c.name, c.rhs, amt))
                }
                ConstraintOp::Eq => {
                    let amt = (lhs - c.rhs).abs();
                    (amt, format!("{} requires exactly {:.2} but got {:.4}", c.name, c.rhs, lhs))
                }
            };

            violations.push(ConstraintViolation {
                constraint: c.name.clone(),
                required: c.rhs,
                actual: lhs,
                violation_amount: amount,
                description,
            });
        }

        for (name, (&value, &(min, max))) in self.variables.iter().zip(values.iter().zip(&self.bounds)) {
            if value < min - tolerance {
                violations.push(ConstraintViolation {
                    constraint: format!("{}_min", name),
                    required: min,
                    actual: value,
                    violation_amount: min - value,
                    description: format!("{} is below its lower bound of {:.2}", name, min),
                });
            } else if value > max + tolerance {
                violations.push(ConstraintViolation {
                    constraint: format!("{}_max", name),
                    required: max,
                    actual: value,
                    violation_amount: value - max,
                    description: format!("{} exceeds its upper bound of {:.2}", name, max),
                });
            }
        }

        violations.sort_by(|a, b| {
            b.violation_amount
                .partial_cmp(&a.violation_amount)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        violations
    }
}
