use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::{MixConfig, VolumetricInputs};
use crate::error::{DesignError, ValidationError};
use crate::material::{Catalog, MaterialCategory};

/// A numeric form field: either a JSON number or the text a user typed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Number(f64),
    Text(String),
}

impl RawNumber {
    /// The finite value, if there is one. Blank or non-numeric text yields `None`.
    pub fn value(&self) -> Option<f64> {
        match self {
            RawNumber::Number(n) => Some(*n).filter(|v| v.is_finite()),
            RawNumber::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, RawNumber::Text(s) if s.trim().is_empty())
    }
}

impl From<f64> for RawNumber {
    fn from(value: f64) -> Self {
        RawNumber::Number(value)
    }
}

impl std::fmt::Display for RawNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawNumber::Number(n) => write!(f, "{}", n),
            RawNumber::Text(s) => write!(f, "{:?}", s),
        }
    }
}

/// One material row as entered, before validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMaterial {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub category: MaterialCategory,
    #[serde(default)]
    pub unit_cost: Option<RawNumber>,
    #[serde(default)]
    pub specific_gravity: Option<RawNumber>,
    #[serde(default)]
    pub rap_binder_percent: Option<RawNumber>,
    /// Sieve size (mm, as text) to percent passing
    #[serde(default)]
    pub gradation: BTreeMap<String, RawNumber>,
}

impl RawMaterial {
    pub fn new(name: impl Into<String>, category: MaterialCategory, unit_cost: f64) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
            category,
            unit_cost: Some(unit_cost.into()),
            specific_gravity: None,
            rap_binder_percent: None,
            gradation: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_specific_gravity(mut self, sg: f64) -> Self {
        self.specific_gravity = Some(sg.into());
        self
    }

    pub fn with_rap_binder_percent(mut self, percent: f64) -> Self {
        self.rap_binder_percent = Some(percent.into());
        self
    }

    pub fn with_passing(mut self, sieve_mm: f64, passing: f64) -> Self {
        self.gradation.insert(sieve_mm.to_string(), passing.into());
        self
    }
}

/// A whole request as produced by the data-entry surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRequest {
    pub target_binder_percent: RawNumber,
    pub materials: Vec<RawMaterial>,
    #[serde(default)]
    pub volumetric_inputs: VolumetricInputs,
}

/// A validated, immutable optimization request
#[derive(Debug, Clone, PartialEq)]
pub struct MixDesignRequest {
    pub target_binder_percent: f64,
    pub catalog: Catalog,
    pub config: MixConfig,
}

impl MixDesignRequest {
    /// Validate every part of a raw request, collecting all problems before failing
    pub fn from_raw(raw: &RawRequest) -> Result<Self, DesignError> {
        let mut errors = Vec::new();

        let target = raw.target_binder_percent.value().filter(|&v| v > 0.0 && v < 100.0);
        if target.is_none() {
            errors.push(ValidationError::TargetBinder(raw.target_binder_percent.to_string()));
        }

        let config = MixConfig::resolve(&raw.volumetric_inputs).unwrap_or_else(|mut e| {
            errors.append(&mut e);
            MixConfig::default()
        });

        let catalog = Catalog::normalize(&raw.materials, &config).map_err(|mut e| {
            errors.append(&mut e);
        });

        match (target, catalog) {
            (Some(target_binder_percent), Ok(catalog)) if errors.is_empty() => Ok(Self {
                target_binder_percent,
                catalog,
                config,
            }),
            _ => Err(DesignError::Validation(errors)),
        }
    }

    pub fn from_json_str(source: &str) -> Result<Self, DesignError> {
        let raw: RawRequest = serde_json::from_str(source)?;
        Self::from_raw(&raw)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DesignError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| DesignError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_number_parsing() {
        assert_eq!(RawNumber::Number(5.0).value(), Some(5.0));
        assert_eq!(RawNumber::Text(" 12.5 ".to_string()).value(), Some(12.5));
        assert_eq!(RawNumber::Text("abc".to_string()).value(), None);
        assert_eq!(RawNumber::Text(String::new()).value(), None);
        assert_eq!(RawNumber::Text("NaN".to_string()).value(), None);
        assert!(RawNumber::Text("  ".to_string()).is_blank());
        assert!(!RawNumber::Number(0.0).is_blank());
    }

    #[test]
    fn test_parse_request_document() {
        let source = r#"{
            "targetBinderPercent": "5.0",
            "materials": [
                {"id": "agg", "name": "3/4 stone", "category": "virgin_aggregate",
                 "unitCost": 30, "specificGravity": 2.68,
                 "gradation": {"19": 100, "4.75": "45"}},
                {"name": "RAP", "category": "rap", "unitCost": "12",
                 "rapBinderPercent": 5.0, "gradation": {"19": 100, "4.75": 60}},
                {"name": "PG 64-22", "category": "virgin_binder", "unitCost": 850}
            ],
            "volumetricInputs": {"binderSG": 1.02, "compactedMixSG": 2.41}
        }"#;

        let request = MixDesignRequest::from_json_str(source).unwrap();

        assert_eq!(request.target_binder_percent, 5.0);
        assert_eq!(request.config.binder_sg, 1.02);
        assert_eq!(request.config.compacted_mix_sg, Some(2.41));
        assert_eq!(request.catalog.materials().len(), 3);
        assert!(request.catalog.advisories().is_empty());
        assert_eq!(request.catalog.materials()[1].id, "m2");
    }

    #[test]
    fn test_all_problems_reported_together() {
        let raw = RawRequest {
            target_binder_percent: RawNumber::Number(120.0),
            materials: vec![RawMaterial {
                unit_cost: Some(RawNumber::Text("cheap".to_string())),
                ..RawMaterial::new("Sand", MaterialCategory::VirginAggregate, 0.0)
            }],
            volumetric_inputs: VolumetricInputs {
                binder_sg: Some(RawNumber::Number(-1.0)),
                ..VolumetricInputs::default()
            },
        };

        let Err(DesignError::Validation(errors)) = MixDesignRequest::from_raw(&raw) else {
            panic!("expected validation errors");
        };

        assert!(errors.contains(&ValidationError::TargetBinder("120".to_string())));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidSetting { .. })));
        assert!(errors.contains(&ValidationError::MissingField { row: 1, field: "unitCost".to_string() }));
        assert!(errors.contains(&ValidationError::MissingGradation { row: 1, name: "Sand".to_string() }));
    }

    #[test]
    fn test_unknown_category_is_a_json_error() {
        let source = r#"{"targetBinderPercent": 5, "materials": [{"name": "x", "category": "cement"}]}"#;
        assert!(matches!(
            MixDesignRequest::from_json_str(source).unwrap_err(),
            DesignError::Json(_)
        ));
    }
}
