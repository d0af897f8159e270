use log::{info, warn};
use pavemix_solver::{ConstraintViolation, LpSolver, SolutionStatus, Solver, SolverError};
use serde::Serialize;

use crate::builder::ModelBuilder;
use crate::config::{VolumetricCriteria, TOLERANCE};
use crate::envelope::GradationEnvelope;
use crate::error::DesignError;
use crate::material::Advisory;
use crate::request::MixDesignRequest;
use crate::results::{derive_with_criteria, DerivedResults, MixSolution};

/// A solved blend and everything derived from it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MixReport {
    pub target_binder_percent: f64,
    pub advisories: Vec<Advisory>,
    pub solution: MixSolution,
    pub results: DerivedResults,
    /// Model constraints the solver's assignment misses by more than [`TOLERANCE`]
    pub violations: Vec<ConstraintViolation>,
}

/// How a design run ended. Infeasibility is a legitimate result of the inputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DesignOutcome {
    Solved(MixReport),
    Infeasible {
        advisories: Vec<Advisory>,
        solution: MixSolution,
    },
}

impl DesignOutcome {
    pub fn advisories(&self) -> &[Advisory] {
        match self {
            DesignOutcome::Solved(report) => &report.advisories,
            DesignOutcome::Infeasible { advisories, .. } => advisories,
        }
    }

    pub fn report(&self) -> Option<&MixReport> {
        match self {
            DesignOutcome::Solved(report) => Some(report),
            DesignOutcome::Infeasible { .. } => None,
        }
    }

    pub fn solution(&self) -> &MixSolution {
        match self {
            DesignOutcome::Solved(report) => &report.solution,
            DesignOutcome::Infeasible { solution, .. } => solution,
        }
    }

    pub fn is_feasible(&self) -> bool {
        self.solution().feasible
    }
}

/// Runs catalog, model building, solving and analysis for requests
/// against one envelope
pub struct MixDesigner<'a, S = Solver> {
    envelope: &'a GradationEnvelope,
    solver: S,
    criteria: VolumetricCriteria,
}

impl<'a> MixDesigner<'a> {
    pub fn new(envelope: &'a GradationEnvelope) -> Self {
        Self::with_solver(envelope, Solver::new())
    }
}

impl<'a, S: LpSolver> MixDesigner<'a, S> {
    pub fn with_solver(envelope: &'a GradationEnvelope, solver: S) -> Self {
        Self {
            envelope,
            solver,
            criteria: VolumetricCriteria::default(),
        }
    }

    pub fn with_criteria(mut self, criteria: VolumetricCriteria) -> Self {
        self.criteria = criteria;
        self
    }

    pub fn envelope(&self) -> &GradationEnvelope {
        self.envelope
    }

    pub fn design(&self, request: &MixDesignRequest) -> Result<DesignOutcome, DesignError> {
        let materials = request.catalog.materials();
        let advisories = request.catalog.advisories().to_vec();
        info!(
            "designing blend of {} materials for {}% binder over {} sieves",
            materials.len(),
            request.target_binder_percent,
            self.envelope.len()
        );

        let lp = ModelBuilder::new(materials, self.envelope).build(request.target_binder_percent);
        let solution = self.solver.solve(&lp)?;

        match solution.status {
            SolutionStatus::Optimal => {}
            SolutionStatus::Infeasible => {
                info!("no feasible blend");
                return Ok(DesignOutcome::Infeasible {
                    advisories,
                    solution: MixSolution::infeasible(),
                });
            }
            SolutionStatus::Unbounded => {
                return Err(SolverError::Backend("blend model reported unbounded".to_string()).into());
            }
        }

        if solution.values.len() != materials.len() {
            return Err(SolverError::Backend(format!(
                "solver returned {} values for {} materials",
                solution.values.len(),
                materials.len()
            ))
            .into());
        }

        let violations = lp.violations(&solution.values, TOLERANCE);
        for v in &violations {
            warn!("solver assignment fails re-check: {}", v.description);
        }

        let mix = MixSolution::from_values(materials, &solution.values);
        let results = derive_with_criteria(
            &mix,
            materials,
            request.target_binder_percent,
            self.envelope,
            &request.config,
            &self.criteria,
        );
        info!("blend costs {:.2} per unit mass", results.total_cost);

        Ok(DesignOutcome::Solved(MixReport {
            target_binder_percent: request.target_binder_percent,
            advisories,
            solution: mix,
            results,
            violations,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MixConfig, VolumetricInputs};
    use crate::material::{MaterialCategory, SYNTHETIC_BINDER_ID};
    use crate::request::{RawMaterial, RawNumber, RawRequest};
    use crate::results::Verdict;
    use pavemix_solver::{LpProblem, Solution};

    fn request(target: f64, materials: Vec<RawMaterial>, volumetric_inputs: VolumetricInputs) -> MixDesignRequest {
        let raw = RawRequest {
            target_binder_percent: RawNumber::Number(target),
            materials,
            volumetric_inputs,
        };
        MixDesignRequest::from_raw(&raw).unwrap()
    }

    fn binder() -> RawMaterial {
        RawMaterial::new("PG 64-22", MaterialCategory::VirginBinder, 850.0)
            .with_id("binder")
            .with_specific_gravity(1.03)
    }

    fn clean_stone(envelope: &GradationEnvelope) -> RawMaterial {
        envelope.sieve_sizes().iter().fold(
            RawMaterial::new("Stone", MaterialCategory::VirginAggregate, 30.0)
                .with_id("stone")
                .with_specific_gravity(2.65),
            |row, &sieve| row.with_passing(sieve, 100.0),
        )
    }

    fn open_envelope() -> GradationEnvelope {
        GradationEnvelope::new(vec![19.0, 4.75, 0.075], vec![90.0, 20.0, 0.0], vec![100.0, 100.0, 100.0]).unwrap()
    }

    fn percent(solution: &MixSolution, id: &str) -> f64 {
        solution
            .proportions
            .iter()
            .find(|p| p.id == id)
            .map_or(0.0, |p| p.percent)
    }

    fn check<'a>(report: &'a MixReport, name: &str) -> &'a crate::results::ComplianceCheck {
        report.results.compliance.iter().find(|c| c.name == name).unwrap()
    }

    #[test]
    fn test_single_aggregate_and_binder() {
        let envelope = open_envelope();
        let req = request(5.0, vec![binder(), clean_stone(&envelope)], VolumetricInputs::default());

        let outcome = MixDesigner::new(&envelope).design(&req).unwrap();
        let report = outcome.report().expect("blend should be feasible");

        assert!(report.solution.feasible);
        assert!((percent(&report.solution, "stone") - 95.0).abs() < 1e-6);
        assert!((percent(&report.solution, "binder") - 5.0).abs() < 1e-6);
        assert!((report.results.total_cost - 71.0).abs() < 1e-6);
        assert!(report.results.gradation.iter().all(|s| s.verdict == Verdict::Pass));
        assert!(report.results.is_compliant());
        assert!(report.violations.is_empty());
        assert!(report.advisories.is_empty());
    }

    #[test]
    fn test_band_out_of_reach_is_infeasible() {
        // Any stone/fines split that lands 4.75 in 40-60 puts 0.075 above 10
        let envelope = GradationEnvelope::new(vec![4.75, 0.075], vec![40.0, 0.0], vec![60.0, 10.0]).unwrap();
        let materials = vec![
            binder(),
            RawMaterial::new("Stone", MaterialCategory::VirginAggregate, 30.0)
                .with_passing(4.75, 20.0)
                .with_passing(0.075, 0.0),
            RawMaterial::new("Fines", MaterialCategory::VirginAggregate, 25.0)
                .with_passing(4.75, 80.0)
                .with_passing(0.075, 50.0),
        ];
        let req = request(5.0, materials, VolumetricInputs::default());

        let outcome = MixDesigner::new(&envelope).design(&req).unwrap();

        assert!(!outcome.is_feasible());
        assert!(outcome.report().is_none());
    }

    #[test]
    fn test_all_materials_below_band_is_infeasible() {
        let envelope = GradationEnvelope::new(vec![4.75], vec![40.0], vec![60.0]).unwrap();
        let materials = vec![
            binder(),
            RawMaterial::new("A", MaterialCategory::VirginAggregate, 30.0).with_passing(4.75, 20.0),
            RawMaterial::new("B", MaterialCategory::VirginAggregate, 30.0).with_passing(4.75, 35.0),
        ];
        let req = request(5.0, materials, VolumetricInputs::default());

        let outcome = MixDesigner::new(&envelope).design(&req).unwrap();

        assert_eq!(
            outcome,
            DesignOutcome::Infeasible {
                advisories: vec![],
                solution: MixSolution::infeasible(),
            }
        );
        assert!(!outcome.solution().feasible);
        assert!(outcome.solution().proportions.is_empty());
    }

    #[test]
    fn test_missing_binder_gets_synthetic_binder() {
        let envelope = open_envelope();
        let req = request(5.0, vec![clean_stone(&envelope)], VolumetricInputs::default());

        let outcome = MixDesigner::new(&envelope).design(&req).unwrap();

        assert_eq!(outcome.advisories().len(), 1);
        let report = outcome.report().unwrap();
        assert!((percent(&report.solution, SYNTHETIC_BINDER_ID) - 5.0).abs() < 1e-6);
        assert!((report.results.total_cost - 95.0 * 30.0 / 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_volumetrics_not_available_without_compacted_gravity() {
        let envelope = open_envelope();
        let req = request(5.0, vec![binder(), clean_stone(&envelope)], VolumetricInputs::default());

        let outcome = MixDesigner::new(&envelope).design(&req).unwrap();
        let report = outcome.report().unwrap();
        let vol = &report.results.volumetrics;

        assert!(vol.va.is_none() && vol.vma.is_none() && vol.vfa.is_none());
        for name in [
            "Air voids (Va)",
            "Voids in mineral aggregate (VMA)",
            "Voids filled with asphalt (VFA)",
        ] {
            assert_eq!(check(report, name).verdict, Verdict::NotAvailable);
        }
        assert!((vol.gsb_blend - 2.65).abs() < 1e-9);
        assert!(vol.gmm.is_finite());
        assert!(report.results.total_cost.is_finite());
        assert_eq!(check(report, "Mass balance").verdict, Verdict::Pass);
    }

    #[test]
    fn test_volumetrics_reported_with_compacted_gravity() {
        let envelope = open_envelope();
        let inputs = VolumetricInputs {
            compacted_mix_sg: Some(RawNumber::Number(2.40)),
            ..VolumetricInputs::default()
        };
        let req = request(5.0, vec![binder(), clean_stone(&envelope)], inputs);

        let outcome = MixDesigner::new(&envelope).design(&req).unwrap();
        let vol = &outcome.report().unwrap().results.volumetrics;

        let gmm = 1.0 / (0.05 / 1.03 + 0.95 / 2.65);
        assert!((vol.gmm - gmm).abs() < 1e-6);
        assert!((vol.va.unwrap() - 100.0 * (1.0 - 2.40 / gmm)).abs() < 1e-6);
        assert!((vol.vma.unwrap() - (100.0 - 2.40 * 0.95 / 2.65 * 100.0)).abs() < 1e-6);
        assert!(vol.vfa.is_some());
    }

    #[test]
    fn test_rap_blend_meets_balances_and_band() {
        let envelope = GradationEnvelope::new(vec![19.0, 4.75, 0.075], vec![100.0, 40.0, 2.0], vec![100.0, 60.0, 8.0]).unwrap();
        let materials = vec![
            binder(),
            RawMaterial::new("Coarse", MaterialCategory::VirginAggregate, 30.0)
                .with_id("coarse")
                .with_specific_gravity(2.70)
                .with_passing(19.0, 100.0)
                .with_passing(4.75, 30.0)
                .with_passing(0.075, 2.0),
            RawMaterial::new("RAP", MaterialCategory::Rap, 12.0)
                .with_id("rap")
                .with_specific_gravity(2.60)
                .with_rap_binder_percent(5.0)
                .with_passing(19.0, 100.0)
                .with_passing(4.75, 70.0)
                .with_passing(0.075, 9.0),
            RawMaterial::new("Sand", MaterialCategory::VirginAggregate, 25.0)
                .with_id("sand")
                .with_passing(19.0, 100.0)
                .with_passing(4.75, 95.0)
                .with_passing(0.075, 12.0),
        ];
        let req = request(5.5, materials, VolumetricInputs::default());

        let outcome = MixDesigner::new(&envelope).design(&req).unwrap();
        let report = outcome.report().unwrap();
        let sol = &report.solution;

        assert!((sol.total() - 100.0).abs() < TOLERANCE);
        let binder_total = percent(&sol, "binder") + percent(&sol, "rap") * 0.05;
        assert!((binder_total - 5.5).abs() < TOLERANCE);
        assert!(percent(&sol, "rap") > 0.0);
        assert!(sol.proportions.iter().all(|p| p.percent > -TOLERANCE));
        // A binding sieve may sit a rounding step past its bound, so check
        // the band with a margin and every other item exactly
        for sieve in &report.results.gradation {
            assert!(sieve.passing >= sieve.lower - 1e-6 && sieve.passing <= sieve.upper + 1e-6);
        }
        assert!(report
            .results
            .compliance
            .iter()
            .filter(|c| !c.name.starts_with("Sieve"))
            .all(|c| c.verdict != Verdict::Fail));
        assert!(report.violations.is_empty());

        // Combined passing stays between the contributing materials' extremes
        let used: Vec<&str> = ["coarse", "rap", "sand"]
            .into_iter()
            .filter(|id| percent(&sol, id) > 0.0)
            .collect();
        let catalog = &req.catalog;
        for sieve in &report.results.gradation {
            let passes: Vec<f64> = used
                .iter()
                .map(|id| catalog.get(id).unwrap().passing(sieve.sieve_mm))
                .collect();
            let lo = passes.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = passes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            assert!(sieve.passing >= lo - 1e-9 && sieve.passing <= hi + 1e-9);
        }
    }

    #[test]
    fn test_reserved_id_rejected_before_solving() {
        let envelope = open_envelope();
        let stone = clean_stone(&envelope).with_id(SYNTHETIC_BINDER_ID);
        let raw = RawRequest {
            target_binder_percent: RawNumber::Number(5.0),
            materials: vec![stone],
            volumetric_inputs: VolumetricInputs::default(),
        };

        let Err(DesignError::Validation(errors)) = MixDesignRequest::from_raw(&raw) else {
            panic!("expected a validation error");
        };
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], crate::error::ValidationError::ReservedId { row: 1, .. }));
    }

    struct BrokenSolver;

    impl LpSolver for BrokenSolver {
        fn solve(&self, _problem: &LpProblem) -> Result<Solution, SolverError> {
            Err(SolverError::Backend("tableau exploded".to_string()))
        }
    }

    struct UnboundedSolver;

    impl LpSolver for UnboundedSolver {
        fn solve(&self, _problem: &LpProblem) -> Result<Solution, SolverError> {
            Ok(Solution::unbounded())
        }
    }

    #[test]
    fn test_capability_failures_are_errors_not_infeasible() {
        let envelope = open_envelope();
        let req = request(5.0, vec![binder(), clean_stone(&envelope)], VolumetricInputs::default());

        let err = MixDesigner::with_solver(&envelope, BrokenSolver).design(&req).unwrap_err();
        assert!(matches!(err, DesignError::Solver(SolverError::Backend(ref msg)) if msg == "tableau exploded"));

        let err = MixDesigner::with_solver(&envelope, UnboundedSolver).design(&req).unwrap_err();
        assert!(matches!(err, DesignError::Solver(_)));
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let envelope = open_envelope();
        let req = request(5.0, vec![clean_stone(&envelope)], VolumetricInputs::default());

        let outcome = MixDesigner::new(&envelope).design(&req).unwrap();
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["status"], "solved");
        assert_eq!(json["advisories"][0]["kind"], "synthetic_binder");
        assert!(json["results"]["volumetrics"]["va"].is_null());
        assert_eq!(json["results"]["gradation"][0]["verdict"], "pass");
    }

    #[test]
    fn test_config_defaults_flow_into_catalog() {
        let envelope = open_envelope();
        let req = request(5.0, vec![clean_stone(&envelope)], VolumetricInputs::default());
        assert_eq!(req.config, MixConfig::default());
        assert_eq!(req.catalog.get(SYNTHETIC_BINDER_ID).unwrap().specific_gravity, 1.03);
    }
}
