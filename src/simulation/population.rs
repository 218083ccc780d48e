use serde::{Deserialize, Serialize};
use super::{sample_patient, SimulationOrchestrator};
use crate::config::CohortConfig;
use crate::controls::{ControlBounds, ControlSnapshot};
use crate::error::PKResult;
use crate::models::Simulator;
use crate::nca::{NcaEngine, PkSummary};
use crate::simulation::Substance;
use log::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualPatient {
    pub patient_id: usize,
    pub controls: ControlSnapshot,
    pub summaries: Vec<PkSummary>,
}

impl VirtualPatient {
    pub fn summary(&self, substance: Substance) -> Option<&PkSummary> {
        self.summaries.iter().find(|s| s.substance == substance)
    }
}

/// Runs the full pipeline for `n_patients` virtual patients drawn around `base`.
pub fn simulate_cohort<S: Simulator, R: rand::Rng>(
    orchestrator: &mut SimulationOrchestrator<S>,
    nca: &NcaEngine,
    base: &ControlSnapshot,
    bounds: &ControlBounds,
    cohort: &CohortConfig,
    n_patients: usize,
    rng: &mut R,
) -> PKResult<Vec<VirtualPatient>> {
    info!("Starting cohort simulation for {} virtual patients", n_patients);
    let mut patients = Vec::with_capacity(n_patients);

    for patient_id in 1..=n_patients {
        if patient_id % 10 == 0 || patient_id <= 10 {
            debug!("Simulating virtual patient {}/{}", patient_id, n_patients);
        }

        let controls = sample_patient(base, bounds, cohort, rng)?;
        let run = orchestrator.run(&controls)?;
        let summaries = nca.analyze_all(&run.series, controls.dose_mg)?;

        patients.push(VirtualPatient {
            patient_id,
            controls,
            summaries,
        });
    }

    info!("Cohort simulation completed");
    Ok(patients)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortSummary {
    pub substance: Substance,
    pub n_patients: usize,
    pub cmax_mean: f64,
    pub cmax_sd: f64,
    pub auc_mean: f64,
    pub auc_sd: f64,
    pub tmax_mean: f64,
    pub tmax_sd: f64,
    /// Undefined half-lives are left out; see `n_half_life`
    pub half_life_mean: Option<f64>,
    pub half_life_sd: Option<f64>,
    pub n_half_life: usize,
}

impl CohortSummary {
    pub fn from_patients(patients: &[VirtualPatient], substance: Substance) -> Self {
        let summaries: Vec<&PkSummary> = patients
            .iter()
            .filter_map(|p| p.summary(substance))
            .collect();

        let cmax_values: Vec<f64> = summaries.iter().map(|s| s.cmax).collect();
        let auc_values: Vec<f64> = summaries.iter().map(|s| s.auc).collect();
        let tmax_values: Vec<f64> = summaries.iter().map(|s| s.tmax).collect();
        let half_lives: Vec<f64> = summaries.iter().filter_map(|s| s.half_life).collect();

        let (half_life_mean, half_life_sd) = if half_lives.is_empty() {
            (None, None)
        } else {
            (Some(mean(&half_lives)), Some(std_dev(&half_lives)))
        };

        Self {
            substance,
            n_patients: summaries.len(),
            cmax_mean: mean(&cmax_values),
            cmax_sd: std_dev(&cmax_values),
            auc_mean: mean(&auc_values),
            auc_sd: std_dev(&auc_values),
            tmax_mean: mean(&tmax_values),
            tmax_sd: std_dev(&tmax_values),
            half_life_mean,
            half_life_sd,
            n_half_life: half_lives.len(),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        0.0
    } else {
        let mean_val = mean(values);
        let variance = values.iter()
            .map(|v| (v - mean_val).powi(2))
            .sum::<f64>() / (values.len() - 1) as f64;
        variance.sqrt()
    }
}
