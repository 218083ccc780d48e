use rand_distr::{Normal, LogNormal, Distribution};
use crate::config::CohortConfig;
use crate::controls::{ControlBounds, ControlSnapshot};
use crate::error::{PKError, PKResult};

/// Log-normal variability around `base_value` with the given CV%.
pub fn apply_log_normal_variability<R: rand::Rng>(
    base_value: f64,
    cv_percent: f64,
    rng: &mut R,
) -> PKResult<f64> {
    if cv_percent <= 0.0 || base_value <= 0.0 {
        return Ok(base_value);
    }

    let cv = cv_percent / 100.0;
    let sigma_log = (cv * cv + 1.0).ln().sqrt();
    let mu_log = base_value.ln() - sigma_log * sigma_log / 2.0;

    let log_normal = LogNormal::new(mu_log, sigma_log)
        .map_err(|_| PKError::Random)?;
    Ok(log_normal.sample(rng))
}

/// Additive normal variability around `base_value`.
pub fn apply_normal_variability<R: rand::Rng>(
    base_value: f64,
    sd: f64,
    rng: &mut R,
) -> PKResult<f64> {
    if sd <= 0.0 {
        return Ok(base_value);
    }

    let normal = Normal::new(base_value, sd)
        .map_err(|_| PKError::Random)?;
    Ok(normal.sample(rng))
}

/// Draws a virtual patient around `base`: body weight and CrCl vary, everything else is kept.
pub fn sample_patient<R: rand::Rng>(
    base: &ControlSnapshot,
    bounds: &ControlBounds,
    cohort: &CohortConfig,
    rng: &mut R,
) -> PKResult<ControlSnapshot> {
    let weight = apply_normal_variability(base.weight_kg, cohort.weight_sd, rng)?;
    let crcl = apply_log_normal_variability(base.crcl_mlmin, cohort.crcl_cv, rng)?;

    let patient = ControlSnapshot {
        weight_kg: weight,
        crcl_mlmin: crcl,
        ..*base
    };
    Ok(patient.clamped(bounds))
}
