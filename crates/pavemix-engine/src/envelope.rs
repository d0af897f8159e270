use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EnvelopeError;

/// Two sieve sizes closer than this (mm) are the same sieve
pub const SIEVE_MATCH: f64 = 1e-6;

/// Allowed percent-passing band per sieve.
///
/// Immutable once built; every constructor checks that the three sequences
/// line up, that sieve sizes are distinct and positive, and that each lower
/// bound sits at or below its upper bound.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradationEnvelope {
    sieve_sizes: Vec<f64>,
    lower_bound: Vec<f64>,
    upper_bound: Vec<f64>,
}

/// The document shape accepted on input, before checks
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeDocument {
    sieve_sizes: Vec<f64>,
    lower_bound: Vec<f64>,
    upper_bound: Vec<f64>,
}

/// One sieve of an envelope
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SieveBand {
    pub size_mm: f64,
    pub lower: f64,
    pub upper: f64,
}

impl SieveBand {
    /// Inclusive range check
    pub fn contains(&self, passing: f64) -> bool {
        passing >= self.lower && passing <= self.upper
    }

    /// Short label used in constraint names and reports, e.g. `12.5` or `19`
    pub fn label(&self) -> String {
        format_sieve(self.size_mm)
    }
}

pub fn format_sieve(size_mm: f64) -> String {
    format!("{}", size_mm)
}

impl GradationEnvelope {
    pub fn new(sieve_sizes: Vec<f64>, lower_bound: Vec<f64>, upper_bound: Vec<f64>) -> Result<Self, EnvelopeError> {
        if sieve_sizes.len() != lower_bound.len() || sieve_sizes.len() != upper_bound.len() {
            return Err(EnvelopeError::LengthMismatch {
                sieves: sieve_sizes.len(),
                lower: lower_bound.len(),
                upper: upper_bound.len(),
            });
        }
        if sieve_sizes.is_empty() {
            return Err(EnvelopeError::Empty);
        }

        for (j, &size) in sieve_sizes.iter().enumerate() {
            if !size.is_finite() || size <= 0.0 {
                return Err(EnvelopeError::InvalidSieve(size));
            }
            if sieve_sizes[..j].iter().any(|&other| (other - size).abs() < SIEVE_MATCH) {
                return Err(EnvelopeError::DuplicateSieve(size));
            }

            let (lower, upper) = (lower_bound[j], upper_bound[j]);
            for value in [lower, upper] {
                if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                    return Err(EnvelopeError::BoundOutOfRange { sieve: size, value });
                }
            }
            if lower > upper {
                return Err(EnvelopeError::InvertedBounds { sieve: size, lower, upper });
            }
        }

        Ok(Self {
            sieve_sizes,
            lower_bound,
            upper_bound,
        })
    }

    pub fn from_json_str(source: &str) -> Result<Self, EnvelopeError> {
        let doc: EnvelopeDocument = serde_json::from_str(source)?;
        Self::new(doc.sieve_sizes, doc.lower_bound, doc.upper_bound)
    }

    /// Load an envelope document from disk
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, EnvelopeError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| EnvelopeError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&source)
    }

    pub fn len(&self) -> usize {
        self.sieve_sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sieve_sizes.is_empty()
    }

    pub fn sieve_sizes(&self) -> &[f64] {
        &self.sieve_sizes
    }

    pub fn band(&self, index: usize) -> Option<SieveBand> {
        Some(SieveBand {
            size_mm: *self.sieve_sizes.get(index)?,
            lower: self.lower_bound[index],
            upper: self.upper_bound[index],
        })
    }

    /// Bands in envelope order
    pub fn bands(&self) -> impl Iterator<Item = SieveBand> + '_ {
        (0..self.len()).filter_map(|j| self.band(j))
    }
}
