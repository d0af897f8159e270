use std::collections::HashSet;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::MixConfig;
use crate::envelope::{format_sieve, SIEVE_MATCH};
use crate::error::ValidationError;
use crate::request::{RawMaterial, RawNumber};

/// Id given to the binder the catalog adds when a request has none
pub const SYNTHETIC_BINDER_ID: &str = "synthetic_binder";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialCategory {
    VirginAggregate,
    Rap,
    VirginBinder,
}

impl std::fmt::Display for MaterialCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaterialCategory::VirginAggregate => write!(f, "virgin aggregate"),
            MaterialCategory::Rap => write!(f, "RAP"),
            MaterialCategory::VirginBinder => write!(f, "virgin binder"),
        }
    }
}

/// Percent passing by sieve size (mm), largest sieve first
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Gradation(Vec<(f64, f64)>);

impl Gradation {
    pub fn new(mut points: Vec<(f64, f64)>) -> Self {
        points.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        Self(points)
    }

    pub fn passing(&self, sieve_mm: f64) -> Option<f64> {
        self.0
            .iter()
            .find(|(size, _)| (size - sieve_mm).abs() < SIEVE_MATCH)
            .map(|&(_, passing)| passing)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.0.iter().copied()
    }
}

/// A validated blend constituent
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub id: String,
    pub name: String,
    pub category: MaterialCategory,
    pub unit_cost: f64,
    pub specific_gravity: f64,
    pub gradation: Gradation,
    /// Aged binder share of a RAP row's mass, in percent
    pub rap_binder_percent: Option<f64>,
}

impl Material {
    /// Share of this material's mass that is aggregate, in [0, 1]
    pub fn aggregate_fraction(&self) -> f64 {
        match self.category {
            MaterialCategory::VirginAggregate => 1.0,
            MaterialCategory::Rap => 1.0 - self.rap_binder_percent.unwrap_or(0.0) / 100.0,
            MaterialCategory::VirginBinder => 0.0,
        }
    }

    /// Share of this material's mass that is binder, in [0, 1]
    pub fn binder_fraction(&self) -> f64 {
        match self.category {
            MaterialCategory::VirginAggregate => 0.0,
            MaterialCategory::Rap => self.rap_binder_percent.unwrap_or(0.0) / 100.0,
            MaterialCategory::VirginBinder => 1.0,
        }
    }

    pub fn is_binder(&self) -> bool {
        self.category == MaterialCategory::VirginBinder
    }

    /// Percent passing at a sieve; a sieve the material does not list counts as 0
    pub fn passing(&self, sieve_mm: f64) -> f64 {
        self.gradation.passing(sieve_mm).unwrap_or(0.0)
    }

    pub fn synthetic_binder(binder_sg: f64) -> Self {
        Self {
            id: SYNTHETIC_BINDER_ID.to_string(),
            name: "Synthetic binder".to_string(),
            category: MaterialCategory::VirginBinder,
            unit_cost: 0.0,
            specific_gravity: binder_sg,
            gradation: Gradation::default(),
            rap_binder_percent: None,
        }
    }
}

/// Non-fatal notices raised while building a catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Advisory {
    /// No virgin binder was supplied, so a zero-cost one was added
    SyntheticBinder { id: String, specific_gravity: f64 },
}

impl std::fmt::Display for Advisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Advisory::SyntheticBinder { id, specific_gravity } => write!(
                f,
                "No virgin binder supplied; added zero-cost binder '{}' (SG {}). Reported cost leaves out binder.",
                id, specific_gravity
            ),
        }
    }
}

/// Validated materials for one request, plus any advisories raised building them
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    materials: Vec<Material>,
    advisories: Vec<Advisory>,
}

impl Catalog {
    /// Validate raw rows into materials.
    ///
    /// Every row is checked and every problem returned, so a caller can show
    /// all offending rows at once.
    pub fn normalize(rows: &[RawMaterial], config: &MixConfig) -> Result<Self, Vec<ValidationError>> {
        if rows.is_empty() {
            return Err(vec![ValidationError::NoMaterials]);
        }

        let mut errors = Vec::new();
        let mut materials = Vec::with_capacity(rows.len() + 1);
        let mut seen_ids = HashSet::new();

        for (index, raw) in rows.iter().enumerate() {
            let row = index + 1;
            match normalize_row(row, raw, config) {
                Ok(material) => {
                    if !seen_ids.insert(material.id.clone()) {
                        errors.push(ValidationError::DuplicateId { row, id: material.id });
                    } else {
                        materials.push(material);
                    }
                }
                Err(mut row_errors) => errors.append(&mut row_errors),
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let mut advisories = Vec::new();
        if !materials.iter().any(Material::is_binder) {
            let binder = Material::synthetic_binder(config.binder_sg);
            let advisory = Advisory::SyntheticBinder {
                id: binder.id.clone(),
                specific_gravity: binder.specific_gravity,
            };
            warn!("{}", advisory);
            materials.push(binder);
            advisories.push(advisory);
        }

        debug!("catalog holds {} materials", materials.len());
        Ok(Self { materials, advisories })
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn advisories(&self) -> &[Advisory] {
        &self.advisories
    }

    pub fn get(&self, id: &str) -> Option<&Material> {
        self.materials.iter().find(|m| m.id == id)
    }
}

fn normalize_row(row: usize, raw: &RawMaterial, config: &MixConfig) -> Result<Material, Vec<ValidationError>> {
    let mut errors = Vec::new();
    let missing = |field: &str| ValidationError::MissingField {
        row,
        field: field.to_string(),
    };

    let name = raw.name.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        errors.push(missing("name"));
    }

    let id = raw
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("m{}", row));
    if id == SYNTHETIC_BINDER_ID {
        errors.push(ValidationError::ReservedId { row, id: id.clone() });
    }

    let unit_cost = match raw.unit_cost.as_ref().and_then(RawNumber::value) {
        Some(cost) if cost < 0.0 => {
            errors.push(ValidationError::OutOfRange {
                row,
                field: "unitCost".to_string(),
                value: cost,
            });
            0.0
        }
        Some(cost) => cost,
        None => {
            errors.push(missing("unitCost"));
            0.0
        }
    };

    let specific_gravity = match raw.category {
        MaterialCategory::VirginBinder => config.binder_sg,
        _ => match raw.specific_gravity.as_ref().and_then(RawNumber::value) {
            Some(sg) if sg <= 0.0 => {
                errors.push(ValidationError::OutOfRange {
                    row,
                    field: "specificGravity".to_string(),
                    value: sg,
                });
                config.default_aggregate_sg
            }
            Some(sg) => sg,
            None => config.default_aggregate_sg,
        },
    };

    let rap_binder_percent = match raw.category {
        MaterialCategory::Rap => match raw.rap_binder_percent.as_ref().and_then(RawNumber::value) {
            Some(pct) if !(0.0..=100.0).contains(&pct) => {
                errors.push(ValidationError::OutOfRange {
                    row,
                    field: "rapBinderPercent".to_string(),
                    value: pct,
                });
                None
            }
            Some(pct) => Some(pct),
            None => {
                errors.push(missing("rapBinderPercent"));
                None
            }
        },
        _ => None,
    };

    let gradation = match raw.category {
        MaterialCategory::VirginBinder => Gradation::default(),
        _ => {
            let mut points = Vec::with_capacity(raw.gradation.len());
            let errors_before = errors.len();
            for (sieve, passing) in &raw.gradation {
                if passing.is_blank() {
                    continue;
                }
                let Some(size) = sieve.trim().parse::<f64>().ok().filter(|s| s.is_finite() && *s > 0.0) else {
                    errors.push(ValidationError::InvalidSieve {
                        row,
                        sieve: sieve.clone(),
                    });
                    continue;
                };
                match passing.value() {
                    Some(value) if (0.0..=100.0).contains(&value) => points.push((size, value)),
                    Some(value) => errors.push(ValidationError::OutOfRange {
                        row,
                        field: format!("gradation[{}]", format_sieve(size)),
                        value,
                    }),
                    None => errors.push(missing(&format!("gradation[{}]", format_sieve(size)))),
                }
            }
            if points.is_empty() && errors.len() == errors_before {
                errors.push(ValidationError::MissingGradation {
                    row,
                    name: name.to_string(),
                });
            }
            Gradation::new(points)
        }
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(Material {
        id,
        name: name.to_string(),
        category: raw.category,
        unit_cost,
        specific_gravity,
        gradation,
        rap_binder_percent,
    })
}
