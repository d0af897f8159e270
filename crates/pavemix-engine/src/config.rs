use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::request::RawNumber;

/// Tolerance for every near-equality check: mass balance, binder balance,
/// non-negativity, and the minimum proportion worth reporting.
pub const TOLERANCE: f64 = 1e-3;

/// Binder specific gravity used when none is supplied
pub const DEFAULT_BINDER_SG: f64 = 1.03;

/// Aggregate specific gravity used when neither a row nor the request supplies one
pub const DEFAULT_AGGREGATE_SG: f64 = 2.65;

/// Optional volumetric scalars as they arrive from the data-entry surface
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumetricInputs {
    #[serde(rename = "binderSG", default)]
    pub binder_sg: Option<RawNumber>,
    #[serde(rename = "defaultAggregateSG", default)]
    pub default_aggregate_sg: Option<RawNumber>,
    #[serde(rename = "compactedMixSG", default)]
    pub compacted_mix_sg: Option<RawNumber>,
}

/// Request-wide physical settings, resolved once before any stage runs
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MixConfig {
    #[serde(rename = "binderSG")]
    pub binder_sg: f64,
    #[serde(rename = "defaultAggregateSG")]
    pub default_aggregate_sg: f64,
    /// Bulk specific gravity of the compacted mix (Gmb); `None` disables Va/VMA/VFA
    #[serde(rename = "compactedMixSG")]
    pub compacted_mix_sg: Option<f64>,
}

impl Default for MixConfig {
    fn default() -> Self {
        Self {
            binder_sg: DEFAULT_BINDER_SG,
            default_aggregate_sg: DEFAULT_AGGREGATE_SG,
            compacted_mix_sg: None,
        }
    }
}

impl MixConfig {
    /// Fill absent or non-numeric inputs with defaults.
    /// A numeric value that is not positive is rejected rather than defaulted.
    pub fn resolve(inputs: &VolumetricInputs) -> Result<Self, Vec<ValidationError>> {
        let mut errors = Vec::new();

        let mut setting = |field: &str, raw: &Option<RawNumber>| -> Option<f64> {
            let value = raw.as_ref().and_then(RawNumber::value)?;
            if value > 0.0 {
                Some(value)
            } else {
                errors.push(ValidationError::InvalidSetting {
                    field: field.to_string(),
                    value,
                });
                None
            }
        };

        let binder_sg = setting("binderSG", &inputs.binder_sg).unwrap_or(DEFAULT_BINDER_SG);
        let default_aggregate_sg =
            setting("defaultAggregateSG", &inputs.default_aggregate_sg).unwrap_or(DEFAULT_AGGREGATE_SG);
        let compacted_mix_sg = setting("compactedMixSG", &inputs.compacted_mix_sg);

        if errors.is_empty() {
            Ok(Self {
                binder_sg,
                default_aggregate_sg,
                compacted_mix_sg,
            })
        } else {
            Err(errors)
        }
    }
}

/// Reference ranges the volumetric report is judged against
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VolumetricCriteria {
    pub va_min: f64,
    pub va_max: f64,
    pub vma_min: f64,
    pub vfa_min: f64,
    pub vfa_max: f64,
}

impl Default for VolumetricCriteria {
    fn default() -> Self {
        Self {
            va_min: 3.0,
            va_max: 5.0,
            vma_min: 14.0,
            vfa_min: 65.0,
            vfa_max: 80.0,
        }
    }
}
