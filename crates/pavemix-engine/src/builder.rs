use log::debug;
use pavemix_solver::{ConstraintOp, LpProblem};

use crate::envelope::{GradationEnvelope, SieveBand};
use crate::material::Material;

pub const MASS_BALANCE: &str = "mass_balance";
pub const BINDER_BALANCE: &str = "binder_balance";

/// Name of the lower (`min`) or upper (`max`) constraint for a sieve
pub fn sieve_constraint_name(band: &SieveBand, side: &str) -> String {
    format!("sieve_{}_{}", band.label(), side)
}

/// Turns a catalog and an envelope into a cost-minimizing linear program.
///
/// One variable per material, in catalog order, holding its percent of the blend.
pub struct ModelBuilder<'a> {
    materials: &'a [Material],
    envelope: &'a GradationEnvelope,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(materials: &'a [Material], envelope: &'a GradationEnvelope) -> Self {
        Self { materials, envelope }
    }

    pub fn build(&self, target_binder_percent: f64) -> LpProblem {
        let ids = self.materials.iter().map(|m| m.id.clone()).collect();
        let mut lp = LpProblem::new(ids);

        // Σ p_i·cost_i is 100x the cost per unit mass; same minimizer since Σ p_i = 100
        let costs = self.materials.iter().map(|m| m.unit_cost).collect();
        lp.set_objective(costs, true);

        self.add_mass_balance(&mut lp);
        self.add_binder_balance(&mut lp, target_binder_percent);
        for band in self.envelope.bands() {
            self.add_sieve_constraints(&mut lp, &band);
        }

        debug!(
            "built blend model: {} variables, {} constraints",
            lp.num_variables(),
            lp.num_constraints()
        );
        lp
    }

    fn add_mass_balance(&self, lp: &mut LpProblem) {
        let ones = vec![1.0; self.materials.len()];
        lp.add_constraint(MASS_BALANCE, ones, ConstraintOp::Eq, 100.0);
    }

    fn add_binder_balance(&self, lp: &mut LpProblem, target_binder_percent: f64) {
        let coeffs = self.materials.iter().map(Material::binder_fraction).collect();
        lp.add_constraint(BINDER_BALANCE, coeffs, ConstraintOp::Eq, target_binder_percent);
    }

    /// Add the band for one sieve.
    ///
    /// The combined passing is a ratio,
    /// `Σ p_i·af_i·pass_i / Σ p_i·af_i`, so `lower <= ratio <= upper` is
    /// multiplied through by the non-negative denominator:
    /// - min: `Σ p_i·af_i·(pass_i - lower) >= 0`
    /// - max: `Σ p_i·af_i·(pass_i - upper) <= 0`
    fn add_sieve_constraints(&self, lp: &mut LpProblem, band: &SieveBand) {
        let coeffs_against = |bound: f64| -> Vec<f64> {
            self.materials
                .iter()
                .map(|m| {
                    if m.is_binder() {
                        0.0
                    } else {
                        m.aggregate_fraction() * (m.passing(band.size_mm) - bound)
                    }
                })
                .collect()
        };

        lp.add_constraint(
            sieve_constraint_name(band, "min"),
            coeffs_against(band.lower),
            ConstraintOp::Ge,
            0.0,
        );
        lp.add_constraint(
            sieve_constraint_name(band, "max"),
            coeffs_against(band.upper),
            ConstraintOp::Le,
            0.0,
        );
    }
}
