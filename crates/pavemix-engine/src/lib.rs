pub mod builder;
pub mod config;
pub mod designer;
pub mod envelope;
pub mod error;
pub mod material;
pub mod request;
pub mod results;

pub use builder::{ModelBuilder, BINDER_BALANCE, MASS_BALANCE};
pub use config::{MixConfig, VolumetricCriteria, VolumetricInputs, TOLERANCE};
pub use designer::{DesignOutcome, MixDesigner, MixReport};
pub use envelope::{format_sieve, GradationEnvelope, SieveBand};
pub use error::{DesignError, EnvelopeError, ValidationError};
pub use material::{Advisory, Catalog, Gradation, Material, MaterialCategory, SYNTHETIC_BINDER_ID};
pub use request::{MixDesignRequest, RawMaterial, RawNumber, RawRequest};
pub use results::{
    derive, derive_with_criteria, ComplianceCheck, ComponentLine, DerivedResults, MixSolution, Proportion,
    SieveResult, Verdict, VolumetricRow, Volumetrics,
};

pub use pavemix_solver::{ConstraintViolation, LpSolver, Solver, SolverError};
