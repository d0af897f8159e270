use pavemix_solver::SolverError;
use thiserror::Error;

/// A problem with one field of one material row, or with a request-level setting.
/// Rows are numbered from 1.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("row {row}: missing or non-numeric {field}")]
    MissingField { row: usize, field: String },
    #[error("row {row}: {field} value {value} is out of range")]
    OutOfRange { row: usize, field: String, value: f64 },
    #[error("row {row}: invalid sieve size '{sieve}'")]
    InvalidSieve { row: usize, sieve: String },
    #[error("row {row}: material '{name}' has no gradation values")]
    MissingGradation { row: usize, name: String },
    #[error("row {row}: duplicate material id '{id}'")]
    DuplicateId { row: usize, id: String },
    #[error("row {row}: id '{id}' is reserved")]
    ReservedId { row: usize, id: String },
    #[error("No materials supplied")]
    NoMaterials,
    #[error("Target binder percent must be a number between 0 and 100 (exclusive), got {0}")]
    TargetBinder(String),
    #[error("{field} must be a positive number, got {value}")]
    InvalidSetting { field: String, value: f64 },
}

/// Failures loading or checking a gradation envelope
#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Invalid envelope JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Envelope has no sieves")]
    Empty,
    #[error("Envelope sequences differ in length: {sieves} sieves, {lower} lower bounds, {upper} upper bounds")]
    LengthMismatch { sieves: usize, lower: usize, upper: usize },
    #[error("Sieve size {0} must be a positive number")]
    InvalidSieve(f64),
    #[error("Sieve size {0} appears more than once")]
    DuplicateSieve(f64),
    #[error("Sieve {sieve} mm: bound {value} is outside 0-100")]
    BoundOutOfRange { sieve: f64, value: f64 },
    #[error("Sieve {sieve} mm: lower bound {lower} exceeds upper bound {upper}")]
    InvertedBounds { sieve: f64, lower: f64, upper: f64 },
}

/// Anything that stops a design run before it reaches an outcome.
/// An infeasible blend is an outcome, not an error.
#[derive(Error, Debug)]
pub enum DesignError {
    #[error("Invalid request:\n{}", format_errors(.0))]
    Validation(Vec<ValidationError>),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Invalid request JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Solver failure: {0}")]
    Solver(#[from] SolverError),
}

impl From<Vec<ValidationError>> for DesignError {
    fn from(errors: Vec<ValidationError>) -> Self {
        DesignError::Validation(errors)
    }
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}
