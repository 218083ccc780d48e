pub mod physiology;
pub mod population;
pub mod series;
pub mod variability;

use crate::config::SimulationConfig;
use crate::controls::ControlSnapshot;
use crate::error::{PKError, PKResult};
use crate::models::{
    Simulator, PARAM_BODY_WEIGHT, PARAM_CIRRHOSIS, PARAM_CYP2C9, PARAM_DOSE, PARAM_RENAL_FUNCTION,
};
use log::{debug, info};

pub use physiology::*;
pub use population::*;
pub use series::*;
pub use variability::*;

/// One completed simulation: its inputs and the unit-converted output.
#[derive(Debug, Clone)]
pub struct SimulationRun {
    pub controls: ControlSnapshot,
    pub derived: DerivedPhysiology,
    pub series: TimeSeries,
}

/// Drives a simulator from control values. Owns its simulator exclusively.
pub struct SimulationOrchestrator<S: Simulator> {
    simulator: S,
    settings: SimulationConfig,
    normal_crcl: f64,
}

impl<S: Simulator> SimulationOrchestrator<S> {
    pub fn new(simulator: S, settings: SimulationConfig, normal_crcl: f64) -> Self {
        Self {
            simulator,
            settings,
            normal_crcl,
        }
    }

    pub fn simulator(&self) -> &S {
        &self.simulator
    }

    pub fn simulator_mut(&mut self) -> &mut S {
        &mut self.simulator
    }

    pub fn settings(&self) -> &SimulationConfig {
        &self.settings
    }

    pub fn normal_crcl(&self) -> f64 {
        self.normal_crcl
    }

    pub fn derive(&self, controls: &ControlSnapshot) -> DerivedPhysiology {
        DerivedPhysiology::from_controls(controls, self.normal_crcl)
    }

    pub fn run(&mut self, controls: &ControlSnapshot) -> PKResult<SimulationRun> {
        let derived = self.derive(controls);
        info!(
            "Simulating dose {} mg, BW {} kg, cirrhosis {:.3}, f_renal {:.3}, f_cyp2c9 {:.3}",
            controls.dose_mg,
            controls.weight_kg,
            controls.cirrhosis_degree,
            derived.f_renal_function,
            derived.f_cyp2c9
        );

        // Integrators keep state between runs
        self.simulator.reset();

        let parameters = [
            (PARAM_DOSE, controls.dose_mg),
            (PARAM_BODY_WEIGHT, controls.weight_kg),
            (PARAM_CIRRHOSIS, controls.cirrhosis_degree),
            (PARAM_RENAL_FUNCTION, derived.f_renal_function),
            (PARAM_CYP2C9, derived.f_cyp2c9),
        ];
        for (name, value) in parameters {
            debug!("set {} = {}", name, value);
            self.simulator
                .set_parameter(name, value)
                .map_err(simulator_failure)?;
        }

        let raw = self
            .simulator
            .simulate(self.settings.start_min, self.settings.end_min, self.settings.steps)
            .map_err(simulator_failure)?;

        let series = TimeSeries::from_raw(&raw)?;
        debug!("Simulation returned {} samples", series.len());

        Ok(SimulationRun {
            controls: *controls,
            derived,
            series,
        })
    }
}

/// Any collaborator error aborts the cycle as a simulation failure.
fn simulator_failure(e: PKError) -> PKError {
    match e {
        PKError::Simulation(_) => e,
        other => PKError::Simulation(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawSeries, SurrogateModel, TIME_COURSE_SELECTIONS};
    use approx::assert_relative_eq;
    use std::collections::HashMap;

    /// Records every parameter it receives and returns a fixed two-row series.
    struct RecordingSimulator {
        resets: usize,
        parameters: HashMap<String, f64>,
    }

    impl Simulator for RecordingSimulator {
        fn reset(&mut self) {
            self.resets += 1;
            self.parameters.clear();
        }

        fn set_parameter(&mut self, name: &str, value: f64) -> PKResult<()> {
            self.parameters.insert(name.to_string(), value);
            Ok(())
        }

        fn simulate(&mut self, start: f64, end: f64, _steps: usize) -> PKResult<RawSeries> {
            let mut raw = RawSeries::new(TIME_COURSE_SELECTIONS.iter().map(|c| c.to_string()).collect());
            raw.push_row(vec![start, 0.0, 0.0, 0.0, 0.0])?;
            raw.push_row(vec![end, 1e-3, 1e-4, 1e-5, 1e-3])?;
            Ok(raw)
        }
    }

    #[test]
    fn test_parameters_pushed_after_reset() {
        let simulator = RecordingSimulator {
            resets: 0,
            parameters: HashMap::new(),
        };
        let mut orchestrator =
            SimulationOrchestrator::new(simulator, SimulationConfig::default(), NORMAL_CRCL);

        let controls = ControlSnapshot {
            crcl_mlmin: 55.0,
            allele2_activity_pct: 63.0,
            ..ControlSnapshot::default()
        };
        let run = orchestrator.run(&controls).unwrap();
        orchestrator.run(&controls).unwrap();

        let sim = &orchestrator.simulator;
        assert_eq!(sim.resets, 2);
        assert_eq!(sim.parameters[PARAM_DOSE], 4.0);
        assert_eq!(sim.parameters[PARAM_RENAL_FUNCTION], 0.5);
        assert_relative_eq!(sim.parameters[PARAM_CYP2C9], 0.815, epsilon = 1e-12);

        assert_relative_eq!(run.series.times[1], 48.0);
        assert_relative_eq!(run.series.values(Substance::Glimepiride).unwrap()[1], 1.0);
    }

    #[test]
    fn test_surrogate_run_has_all_columns() {
        let settings = SimulationConfig {
            steps: 96,
            ..SimulationConfig::default()
        };
        let mut orchestrator = SimulationOrchestrator::new(SurrogateModel::new(), settings, NORMAL_CRCL);
        let run = orchestrator.run(&ControlSnapshot::default()).unwrap();

        assert_eq!(run.series.len(), 97);
        assert_relative_eq!(*run.series.times.last().unwrap(), 48.0, epsilon = 1e-9);
        for substance in Substance::ALL {
            assert!(run.series.values(substance).is_some());
        }
    }

    #[test]
    fn test_simulator_errors_become_simulation_failures() {
        let mut orchestrator = SimulationOrchestrator::new(
            SurrogateModel::new(),
            SimulationConfig::default(),
            NORMAL_CRCL,
        );
        let controls = ControlSnapshot {
            cirrhosis_degree: 1.0,
            ..ControlSnapshot::default()
        };
        assert!(matches!(orchestrator.run(&controls), Err(PKError::Simulation(_))));
    }

    struct RejectingSimulator;

    impl Simulator for RejectingSimulator {
        fn reset(&mut self) {}

        fn set_parameter(&mut self, name: &str, _value: f64) -> PKResult<()> {
            Err(PKError::InvalidModel(format!("unknown parameter {}", name)))
        }

        fn simulate(&mut self, _start: f64, _end: f64, _steps: usize) -> PKResult<RawSeries> {
            Ok(RawSeries::new(Vec::new()))
        }
    }

    #[test]
    fn test_rejected_parameter_is_simulation_failure() {
        let mut orchestrator =
            SimulationOrchestrator::new(RejectingSimulator, SimulationConfig::default(), NORMAL_CRCL);
        match orchestrator.run(&ControlSnapshot::default()) {
            Err(PKError::Simulation(message)) => assert!(message.contains(PARAM_DOSE)),
            other => panic!("expected simulation failure, got {:?}", other.map(|r| r.series.len())),
        }
    }
}
