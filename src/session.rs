use crate::config::Config;
use crate::controls::{Control, ControlBounds, ControlSnapshot, ParameterStore};
use crate::error::{PKError, PKResult};
use crate::models::Simulator;
use crate::nca::{NcaEngine, NcaOptions, PkSummary};
use crate::presets::{CategoryResolver, PresetAxis, PresetCatalog};
use crate::profiles::{ProfileAction, ProfileRegistry};
use crate::simulation::{simulate_cohort, SimulationOrchestrator, SimulationRun, Substance, VirtualPatient};
use crate::config::CohortConfig;
use log::{info, warn};
use serde::Serialize;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionStatus {
    Idle,
    Ready,
    Failed(String),
}

/// Output of one complete recompute cycle.
#[derive(Debug, Clone)]
pub struct SessionResult {
    pub revision: u64,
    pub run: SimulationRun,
    pub summaries: Vec<PkSummary>,
}

impl SessionResult {
    pub fn summary(&self, substance: Substance) -> Option<&PkSummary> {
        self.summaries.iter().find(|s| s.substance == substance)
    }
}

/// Preset categories currently matching the controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Categories {
    pub renal: &'static str,
    pub cirrhosis: &'static str,
    pub allele1: &'static str,
    pub allele2: &'static str,
}

/// One user's explorer state. Every mutation runs the full pipeline before returning.
pub struct Session<S: Simulator> {
    store: ParameterStore,
    registry: ProfileRegistry,
    orchestrator: SimulationOrchestrator<S>,
    nca: NcaEngine,
    cohort: CohortConfig,
    last: Option<SessionResult>,
    status: SessionStatus,
}

impl<S: Simulator> Session<S> {
    pub fn new(config: &Config, simulator: S) -> Self {
        Self {
            store: ParameterStore::new(ControlBounds::from_config(&config.controls)),
            registry: ProfileRegistry::new(PresetCatalog::new()),
            orchestrator: SimulationOrchestrator::new(
                simulator,
                config.simulation.clone(),
                config.physiology.normal_crcl,
            ),
            nca: NcaEngine::new(NcaOptions::from(&config.nca)),
            cohort: config.cohort.clone(),
            last: None,
            status: SessionStatus::Idle,
        }
    }

    pub fn store(&self) -> &ParameterStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ParameterStore {
        &mut self.store
    }

    pub fn registry(&self) -> &ProfileRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ProfileRegistry {
        &mut self.registry
    }

    pub fn orchestrator(&self) -> &SimulationOrchestrator<S> {
        &self.orchestrator
    }

    pub fn nca(&self) -> &NcaEngine {
        &self.nca
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    /// Last successful cycle; never a partially updated one.
    pub fn result(&self) -> Option<&SessionResult> {
        self.last.as_ref()
    }

    /// True when the displayed result no longer matches the controls.
    pub fn is_stale(&self) -> bool {
        self.last
            .as_ref()
            .map_or(true, |r| r.revision != self.store.revision())
    }

    pub fn categories(&self) -> Categories {
        let resolver = CategoryResolver::new(self.registry.catalog());
        Categories {
            renal: resolver.category_of(&self.store, Control::CrclMlmin),
            cirrhosis: resolver.category_of(&self.store, Control::CirrhosisDegree),
            allele1: resolver.category_of(&self.store, Control::Allele1ActivityPct),
            allele2: resolver.category_of(&self.store, Control::Allele2ActivityPct),
        }
    }

    pub fn set_control(&mut self, control: Control, value: f64) -> PKResult<()> {
        if self.store.set(control, value) || self.last.is_none() {
            self.recompute()?;
        }
        Ok(())
    }

    /// Applies a preset by name. "Custom" and unknown names change nothing.
    pub fn apply_preset(&mut self, axis: PresetAxis, control: Control, name: &str) -> PKResult<()> {
        let resolver = CategoryResolver::new(self.registry.catalog());
        if resolver.apply_to_store(&mut self.store, axis, control, name) {
            self.recompute()?;
        }
        Ok(())
    }

    pub fn save_profile(&mut self, name: &str) -> PKResult<()> {
        let snapshot = self.store.snapshot();
        self.registry.save(name, &snapshot)
    }

    pub fn load_profile(&mut self, name: &str) -> PKResult<()> {
        let snapshot = self.registry.load(name)?;
        info!("Loading profile '{}'", name.trim());
        self.load_snapshot(&snapshot)
    }

    pub fn load_snapshot(&mut self, snapshot: &ControlSnapshot) -> PKResult<()> {
        if self.store.set_all(snapshot) || self.last.is_none() {
            self.recompute()?;
        }
        Ok(())
    }

    pub fn dispatch(&mut self, action: &ProfileAction) -> PKResult<()> {
        match action {
            ProfileAction::Load(name) => self.load_profile(name),
            ProfileAction::Delete(name) => {
                self.registry.delete(name);
                Ok(())
            }
        }
    }

    /// Runs simulation and NCA for the current controls. On failure the previous result is kept.
    pub fn recompute(&mut self) -> PKResult<&SessionResult> {
        let snapshot = self.store.snapshot();
        let revision = self.store.revision();

        let outcome = self.orchestrator.run(&snapshot).and_then(|run| {
            let summaries = self.nca.analyze_all(&run.series, snapshot.dose_mg)?;
            Ok(SessionResult {
                revision,
                run,
                summaries,
            })
        });

        match outcome {
            Ok(result) => {
                self.status = SessionStatus::Ready;
                let result = self.last.insert(result);
                Ok(&*result)
            }
            Err(e) => {
                let message = if e.is_series_error() {
                    format!("simulation produced no usable result: {}", e)
                } else {
                    format!("simulation failed: {}", e)
                };
                warn!("{}", message);
                self.status = SessionStatus::Failed(message);
                Err(e)
            }
        }
    }

    /// Virtual patients around the current controls. Leaves the session result untouched.
    pub fn simulate_cohort(&mut self, n_patients: usize, seed: Option<u64>) -> PKResult<Vec<VirtualPatient>> {
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let base = self.store.snapshot();
        simulate_cohort(
            &mut self.orchestrator,
            &self.nca,
            &base,
            self.store.bounds(),
            &self.cohort,
            n_patients,
            &mut rng,
        )
    }

    /// Like [`Session::result`], but an error when no cycle has succeeded yet.
    pub fn require_result(&self) -> PKResult<&SessionResult> {
        self.last
            .as_ref()
            .ok_or_else(|| PKError::Simulation("no successful simulation yet".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::models::{RawSeries, SurrogateModel};
    use approx::assert_relative_eq;

    fn session() -> Session<SurrogateModel> {
        let config = Config {
            simulation: SimulationConfig {
                steps: 192,
                ..SimulationConfig::default()
            },
            ..Config::default()
        };
        Session::new(&config, SurrogateModel::new())
    }

    /// Succeeds until told to fail.
    struct FlakySimulator {
        inner: SurrogateModel,
        fail: bool,
    }

    impl Simulator for FlakySimulator {
        fn reset(&mut self) {
            self.inner.reset()
        }

        fn set_parameter(&mut self, name: &str, value: f64) -> PKResult<()> {
            self.inner.set_parameter(name, value)
        }

        fn simulate(&mut self, start: f64, end: f64, steps: usize) -> PKResult<RawSeries> {
            if self.fail {
                return Err(PKError::Simulation("integrator did not converge".to_string()));
            }
            self.inner.simulate(start, end, steps)
        }
    }

    #[test]
    fn test_reference_patient_summary() {
        let mut session = session();
        let result = session.recompute().unwrap();

        let gli = result.summary(Substance::Glimepiride).unwrap();
        assert!(gli.cmax > 0.0);
        assert!(gli.tmax > 0.0 && gli.tmax < 12.0);
        assert!(gli.auc > 0.0);
        assert!(gli.half_life.is_some());

        let urine = result.summary(Substance::UrineM1M2).unwrap();
        assert!(urine.half_life.is_none());
        assert_eq!(*session.status(), SessionStatus::Ready);
    }

    #[test]
    fn test_save_modify_load_round_trip() {
        let mut session = session();
        let saved = ControlSnapshot {
            dose_mg: 4.0,
            weight_kg: 75.0,
            crcl_mlmin: 110.0,
            cirrhosis_degree: 0.0,
            allele1_activity_pct: 100.0,
            allele2_activity_pct: 100.0,
        };
        session.load_snapshot(&saved).unwrap();
        session.save_profile("P").unwrap();

        session.set_control(Control::DoseMg, 7.5).unwrap();
        session.set_control(Control::WeightKg, 130.0).unwrap();
        session
            .apply_preset(PresetAxis::Allele, Control::Allele1ActivityPct, "*3")
            .unwrap();
        assert_eq!(session.registry().load("P").unwrap(), saved);

        session.dispatch(&ProfileAction::Load("P".to_string())).unwrap();
        assert_eq!(session.store().snapshot(), saved);
        assert!(!session.is_stale());
    }

    #[test]
    fn test_categories_follow_presets() {
        let mut session = session();
        session
            .apply_preset(PresetAxis::Cirrhosis, Control::CirrhosisDegree, "Moderate cirrhosis (CTP B)")
            .unwrap();
        session.set_control(Control::CrclMlmin, 32.0).unwrap();

        let categories = session.categories();
        assert_eq!(categories.cirrhosis, "Moderate cirrhosis (CTP B)");
        assert_eq!(categories.renal, "Moderate impairment");
        assert_eq!(categories.allele1, "*1");

        session.set_control(Control::CirrhosisDegree, 0.5).unwrap();
        assert_eq!(session.categories().cirrhosis, "Custom");
    }

    #[test]
    fn test_failed_cycle_keeps_previous_result() {
        let simulator = FlakySimulator {
            inner: SurrogateModel::new(),
            fail: false,
        };
        let mut session = Session::new(&Config::default(), simulator);
        session.recompute().unwrap();
        let before = session.result().unwrap().summaries.clone();

        session.orchestrator.simulator_mut().fail = true;
        assert!(session.set_control(Control::DoseMg, 2.0).is_err());

        assert!(matches!(session.status(), SessionStatus::Failed(_)));
        assert_eq!(session.result().unwrap().summaries, before);
        assert!(session.is_stale());
    }

    #[test]
    fn test_unknown_profile_leaves_controls_untouched() {
        let mut session = session();
        session.set_control(Control::WeightKg, 90.0).unwrap();
        assert!(matches!(
            session.load_profile("ghost"),
            Err(PKError::ProfileNotFound(_))
        ));
        assert_eq!(session.store().get(Control::WeightKg), 90.0);
    }

    #[test]
    fn test_cohort_does_not_touch_controls() {
        let mut session = session();
        session.set_control(Control::CrclMlmin, 45.0).unwrap();
        let before = session.store().snapshot();

        let patients = session.simulate_cohort(4, Some(3)).unwrap();
        assert_eq!(patients.len(), 4);
        assert_eq!(session.store().snapshot(), before);
        assert!(!session.is_stale());
    }

    #[test]
    fn test_poor_metabolizer_has_higher_exposure() {
        let mut session = session();
        let reference_auc = session.recompute().unwrap().summary(Substance::Glimepiride).unwrap().auc;

        session.load_profile("CYP2C9 *3/*3").unwrap();
        let poor_auc = session.require_result().unwrap().summary(Substance::Glimepiride).unwrap().auc;

        assert!(poor_auc > reference_auc);
        assert_relative_eq!(session.require_result().unwrap().run.derived.f_cyp2c9, 0.21, epsilon = 1e-12);
    }
}
