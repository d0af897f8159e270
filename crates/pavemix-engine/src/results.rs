use serde::Serialize;

use crate::config::{MixConfig, VolumetricCriteria, TOLERANCE};
use crate::envelope::{format_sieve, GradationEnvelope};
use crate::material::{Material, MaterialCategory};

/// One material's share of the blend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Proportion {
    pub id: String,
    pub percent: f64,
}

/// Proportions chosen by the solve step, keyed by material id
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MixSolution {
    pub proportions: Vec<Proportion>,
    pub feasible: bool,
}

impl MixSolution {
    /// Pair solver values with material ids, in catalog order
    pub fn from_values(materials: &[Material], values: &[f64]) -> Self {
        let proportions = materials
            .iter()
            .zip(values)
            .map(|(m, &percent)| Proportion {
                id: m.id.clone(),
                percent,
            })
            .collect();
        Self {
            proportions,
            feasible: true,
        }
    }

    pub fn infeasible() -> Self {
        Self {
            proportions: Vec::new(),
            feasible: false,
        }
    }

    pub fn total(&self) -> f64 {
        self.proportions.iter().map(|p| p.percent).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
    NotAvailable,
}

impl Verdict {
    pub fn check(ok: bool) -> Self {
        if ok { Verdict::Pass } else { Verdict::Fail }
    }

    /// Pass/fail on a value that may be missing
    pub fn check_optional(value: Option<f64>, ok: impl Fn(f64) -> bool) -> Self {
        value.map_or(Verdict::NotAvailable, |v| Verdict::check(ok(v)))
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Pass => f.pad("PASS"),
            Verdict::Fail => f.pad("FAIL"),
            Verdict::NotAvailable => f.pad("N/A"),
        }
    }
}

/// A reported line of the blend (proportion at or above [`TOLERANCE`])
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentLine {
    pub id: String,
    pub name: String,
    pub category: MaterialCategory,
    pub percent: f64,
    pub unit_cost: f64,
    /// Cost per unit mass of blend contributed by this material
    pub cost_contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SieveResult {
    pub sieve_mm: f64,
    pub passing: f64,
    pub lower: f64,
    pub upper: f64,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumetricRow {
    pub metric: String,
    pub value: Option<f64>,
    pub requirement: String,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Volumetrics {
    /// Blended bulk specific gravity of the aggregate (Gsb)
    pub gsb_blend: f64,
    /// Maximum theoretical specific gravity (Gmm)
    pub gmm: f64,
    pub va: Option<f64>,
    pub vma: Option<f64>,
    pub vfa: Option<f64>,
    pub table: Vec<VolumetricRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceCheck {
    pub name: String,
    pub verdict: Verdict,
    pub detail: String,
}

/// Everything derived from a solved blend. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedResults {
    /// Cost per unit mass of blend
    pub total_cost: f64,
    pub components: Vec<ComponentLine>,
    /// Aggregate mass per 100 units of blend (M_agg)
    pub aggregate_mass: f64,
    /// Virgin binder plus RAP binder, percent of blend
    pub total_binder: f64,
    pub gradation: Vec<SieveResult>,
    pub volumetrics: Volumetrics,
    pub compliance: Vec<ComplianceCheck>,
}

impl DerivedResults {
    pub fn is_compliant(&self) -> bool {
        self.compliance.iter().all(|c| c.verdict != Verdict::Fail)
    }
}

/// Compute gradation, volumetrics and compliance for a solved blend.
///
/// Pure: the same inputs always give the same results.
pub fn derive(
    solution: &MixSolution,
    materials: &[Material],
    target_binder_percent: f64,
    envelope: &GradationEnvelope,
    config: &MixConfig,
) -> DerivedResults {
    derive_with_criteria(
        solution,
        materials,
        target_binder_percent,
        envelope,
        config,
        &VolumetricCriteria::default(),
    )
}

pub fn derive_with_criteria(
    solution: &MixSolution,
    materials: &[Material],
    target_binder_percent: f64,
    envelope: &GradationEnvelope,
    config: &MixConfig,
    criteria: &VolumetricCriteria,
) -> DerivedResults {
    // Proportions are in catalog order; a short or empty solution leaves the rest at 0
    let blend: Vec<(&Material, f64)> = materials
        .iter()
        .enumerate()
        .map(|(i, m)| (m, solution.proportions.get(i).map_or(0.0, |p| p.percent)))
        .collect();

    let total_cost = blend.iter().map(|(m, p)| p * m.unit_cost).sum::<f64>() / 100.0;

    let components = blend
        .iter()
        .filter(|&&(_, p)| p >= TOLERANCE)
        .map(|&(m, p)| ComponentLine {
            id: m.id.clone(),
            name: m.name.clone(),
            category: m.category,
            percent: p,
            unit_cost: m.unit_cost,
            cost_contribution: p * m.unit_cost / 100.0,
        })
        .collect();

    let aggregates = || blend.iter().filter(|(m, _)| !m.is_binder());
    let aggregate_mass: f64 = aggregates().map(|(m, p)| p * m.aggregate_fraction()).sum();
    let total_binder: f64 = blend.iter().map(|(m, p)| p * m.binder_fraction()).sum();

    let gradation: Vec<SieveResult> = envelope
        .bands()
        .map(|band| {
            let passing = if aggregate_mass > 0.0 {
                aggregates()
                    .map(|(m, p)| (p * m.aggregate_fraction() / aggregate_mass) * m.passing(band.size_mm))
                    .sum::<f64>()
            } else {
                0.0
            };
            let verdict = Verdict::check(band.contains(passing));
            SieveResult {
                sieve_mm: band.size_mm,
                passing,
                lower: band.lower,
                upper: band.upper,
                verdict,
            }
        })
        .collect();

    let volumetrics = compute_volumetrics(&blend, aggregate_mass, target_binder_percent, config, criteria);

    let total = solution.total();
    let mut compliance: Vec<ComplianceCheck> = gradation
        .iter()
        .map(|s| ComplianceCheck {
            name: format!("Sieve {} mm", format_sieve(s.sieve_mm)),
            verdict: s.verdict,
            detail: format!("{:.1}% passing, band {:.1}-{:.1}%", s.passing, s.lower, s.upper),
        })
        .collect();
    compliance.push(ComplianceCheck {
        name: "Mass balance".to_string(),
        verdict: Verdict::check((total - 100.0).abs() < TOLERANCE),
        detail: format!("proportions sum to {:.4}%", total),
    });
    compliance.push(ComplianceCheck {
        name: "Binder balance".to_string(),
        verdict: Verdict::check((total_binder - target_binder_percent).abs() < TOLERANCE),
        detail: format!("{:.4}% binder against a {:.2}% target", total_binder, target_binder_percent),
    });
    let lowest = blend.iter().map(|&(_, p)| p).fold(f64::INFINITY, f64::min);
    compliance.push(ComplianceCheck {
        name: "Non-negativity".to_string(),
        verdict: Verdict::check(blend.iter().all(|&(_, p)| p > -TOLERANCE)),
        detail: if lowest.is_finite() {
            format!("smallest proportion {:.4}%", lowest)
        } else {
            "no proportions".to_string()
        },
    });
    compliance.extend(volumetrics.table.iter().map(|row| ComplianceCheck {
        name: row.metric.clone(),
        verdict: row.verdict,
        detail: match row.value {
            Some(v) => format!("{:.2}% (requires {})", v, row.requirement),
            None => format!("not available (requires {})", row.requirement),
        },
    }));

    DerivedResults {
        total_cost,
        components,
        aggregate_mass,
        total_binder,
        gradation,
        volumetrics,
        compliance,
    }
}

fn compute_volumetrics(
    blend: &[(&Material, f64)],
    aggregate_mass: f64,
    target_binder_percent: f64,
    config: &MixConfig,
    criteria: &VolumetricCriteria,
) -> Volumetrics {
    let volume: f64 = blend
        .iter()
        .map(|&(m, p)| (p * m.aggregate_fraction(), m.specific_gravity))
        .filter(|&(mass, sg)| mass > 0.0 && sg > 0.0)
        .map(|(mass, sg)| mass / sg)
        .sum();
    let gsb_blend = if volume > 0.0 {
        aggregate_mass / volume
    } else {
        config.default_aggregate_sg
    };

    let pb = target_binder_percent / 100.0;
    let ps = aggregate_mass / 100.0;
    let gmm = 1.0 / (pb / config.binder_sg + ps / gsb_blend);

    let gmb = config.compacted_mix_sg;
    let va = gmb.map(|gmb| 100.0 * (1.0 - gmb / gmm));
    let vma = gmb.map(|gmb| 100.0 - (gmb * ps / gsb_blend * 100.0));
    let vfa = match (va, vma) {
        (Some(va), Some(vma)) if vma > 0.0 => Some((100.0 * (vma - va) / vma).clamp(0.0, 100.0)),
        _ => None,
    };

    let table = vec![
        VolumetricRow {
            metric: "Air voids (Va)".to_string(),
            value: va,
            requirement: format!("{}-{}%", criteria.va_min, criteria.va_max),
            verdict: Verdict::check_optional(va, |v| v >= criteria.va_min && v <= criteria.va_max),
        },
        VolumetricRow {
            metric: "Voids in mineral aggregate (VMA)".to_string(),
            value: vma,
            requirement: format!(">= {}%", criteria.vma_min),
            verdict: Verdict::check_optional(vma, |v| v >= criteria.vma_min),
        },
        VolumetricRow {
            metric: "Voids filled with asphalt (VFA)".to_string(),
            value: vfa,
            requirement: format!("{}-{}%", criteria.vfa_min, criteria.vfa_max),
            verdict: Verdict::check_optional(vfa, |v| v >= criteria.vfa_min && v <= criteria.vfa_max),
        },
    ];

    Volumetrics {
        gsb_blend,
        gmm,
        va,
        vma,
        vfa,
        table,
    }
}
