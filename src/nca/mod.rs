//! Non-compartmental analysis of simulated concentration-time curves.

pub mod terminal;
pub mod units;

use serde::{Deserialize, Serialize};
use crate::config::NcaConfig;
use crate::error::{PKError, PKResult};
use crate::simulation::{Substance, TimeSeries};
use log::debug;

pub use terminal::*;
pub use units::*;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NcaOptions {
    /// Terminal phase starts once the curve is at or below this fraction of Cmax
    pub terminal_fraction: f64,
    /// Absolute floor below which samples are ignored for the terminal fit
    pub min_concentration: f64,
    /// Floor per administered dose unit, applied to the dosed substance only
    pub dose_floor_factor: f64,
}

impl Default for NcaOptions {
    fn default() -> Self {
        Self::from(&NcaConfig::default())
    }
}

impl From<&NcaConfig> for NcaOptions {
    fn from(config: &NcaConfig) -> Self {
        Self {
            terminal_fraction: config.terminal_fraction,
            min_concentration: config.min_concentration,
            dose_floor_factor: config.dose_floor_factor,
        }
    }
}

/// Derived PK statistics for one substance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PkSummary {
    pub substance: Substance,
    pub cmax: f64,
    pub tmax: f64,
    pub auc: f64,
    /// `None` when no terminal decay could be fitted
    pub half_life: Option<f64>,
    pub lambda_z: Option<f64>,
    pub terminal_points: usize,
    pub unit: MeasureUnit,
    pub time_unit: TimeUnit,
}

impl PkSummary {
    pub fn half_life_or_nan(&self) -> f64 {
        self.half_life.unwrap_or(f64::NAN)
    }

    pub fn auc_unit(&self) -> String {
        format!("{}·{}", self.unit.symbol(), self.time_unit.symbol())
    }

    /// Converts Cmax and AUC to mass units using the caller's molar masses.
    /// `None` for substances without a known molar mass or already mass-based units.
    pub fn to_mass_units(&self, molar_masses: &MolarMasses) -> Option<PkSummary> {
        let grams_per_mole = molar_masses.get(self.substance)?;
        let unit = self.unit.mass_equivalent()?;
        Some(PkSummary {
            cmax: self.cmax * grams_per_mole,
            auc: self.auc * grams_per_mole,
            unit,
            ..self.clone()
        })
    }
}

/// Formats an optional statistic, "N/A" when undefined.
pub fn format_value(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.*}", precision, v),
        _ => "N/A".to_string(),
    }
}

fn validate_series(times: &[f64], values: &[f64]) -> PKResult<()> {
    if times.is_empty() || values.is_empty() {
        return Err(PKError::EmptySeries);
    }

    if times.len() != values.len() {
        return Err(PKError::InvalidSeries(format!(
            "{} time points but {} values",
            times.len(),
            values.len()
        )));
    }

    if let Some(i) = times.windows(2).position(|w| !(w[1] > w[0])) {
        return Err(PKError::InvalidSeries(format!(
            "time is not strictly increasing at index {} ({} -> {})",
            i + 1,
            times[i],
            times[i + 1]
        )));
    }

    if values.iter().chain(times).any(|v| !v.is_finite()) {
        return Err(PKError::InvalidSeries("series contains non-finite values".to_string()));
    }

    Ok(())
}

/// Cmax, Tmax and the index of the first sample reaching Cmax.
pub fn cmax_tmax(times: &[f64], values: &[f64]) -> PKResult<(f64, f64, usize)> {
    validate_series(times, values)?;

    let mut idx = 0;
    for (i, &c) in values.iter().enumerate() {
        if c > values[idx] {
            idx = i;
        }
    }

    Ok((values[idx], times[idx], idx))
}

/// Linear trapezoidal AUC from the first to the last sample.
pub fn auc(times: &[f64], values: &[f64]) -> PKResult<f64> {
    validate_series(times, values)?;

    let mut auc = 0.0;
    for i in 1..times.len() {
        auc += 0.5 * (values[i - 1] + values[i]) * (times[i] - times[i - 1]);
    }

    Ok(auc)
}

#[derive(Debug, Clone, Default)]
pub struct NcaEngine {
    options: NcaOptions,
}

impl NcaEngine {
    pub fn new(options: NcaOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &NcaOptions {
        &self.options
    }

    /// Terminal-fit floor; a supplied dose raises it to `dose x dose_floor_factor`.
    pub fn floor(&self, dose: Option<f64>) -> f64 {
        match dose {
            Some(d) if d > 0.0 => self.options.min_concentration.max(d * self.options.dose_floor_factor),
            _ => self.options.min_concentration,
        }
    }

    pub fn analyze_values(
        &self,
        substance: Substance,
        times: &[f64],
        values: &[f64],
        dose: Option<f64>,
        unit: MeasureUnit,
        time_unit: TimeUnit,
    ) -> PKResult<PkSummary> {
        let (cmax, tmax, cmax_idx) = cmax_tmax(times, values)?;
        let auc = auc(times, values)?;

        let threshold = self.options.terminal_fraction * cmax;
        let points = terminal_points(values, cmax_idx, threshold, self.floor(dose));
        let fit = fit_terminal(times, values, &points);

        match &fit {
            Some(f) => debug!(
                "{}: λz = {:.5} from {} points (R² = {:.4})",
                substance, f.lambda_z, f.n_points, f.r_squared
            ),
            None => debug!("{}: half-life not estimable ({} terminal points)", substance, points.len()),
        }

        Ok(PkSummary {
            substance,
            cmax,
            tmax,
            auc,
            half_life: fit.map(|f| f.half_life()),
            lambda_z: fit.map(|f| f.lambda_z),
            terminal_points: points.len(),
            unit,
            time_unit,
        })
    }

    pub fn analyze(
        &self,
        series: &TimeSeries,
        substance: Substance,
        dose: Option<f64>,
    ) -> PKResult<PkSummary> {
        let values = series.values(substance).ok_or_else(|| {
            PKError::InvalidSeries(format!("series has no {} column", substance))
        })?;
        self.analyze_values(
            substance,
            &series.times,
            values,
            dose,
            substance.unit(),
            series.time_unit,
        )
    }

    /// Summaries for every substance in the series; the dose is passed to the dosed substance only.
    pub fn analyze_all(&self, series: &TimeSeries, dose: f64) -> PKResult<Vec<PkSummary>> {
        series
            .substances()
            .map(|substance| {
                let dose = if substance.is_dosed() { Some(dose) } else { None };
                self.analyze(series, substance, dose)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn exponential(c0: f64, k: f64, n: usize, dt: f64) -> (Vec<f64>, Vec<f64>) {
        let times: Vec<f64> = (0..n).map(|i| i as f64 * dt).collect();
        let values = times.iter().map(|t| c0 * (-k * t).exp()).collect();
        (times, values)
    }

    fn analyze(times: &[f64], values: &[f64], dose: Option<f64>) -> PKResult<PkSummary> {
        NcaEngine::default().analyze_values(
            Substance::Glimepiride,
            times,
            values,
            dose,
            MeasureUnit::Micromolar,
            TimeUnit::Hour,
        )
    }

    #[test]
    fn test_cmax_tmax_first_index_wins() {
        let times = [0.0, 1.0, 2.0, 3.0];
        let values = [0.0, 5.0, 5.0, 1.0];
        let (cmax, tmax, idx) = cmax_tmax(&times, &values).unwrap();
        assert_eq!(cmax, 5.0);
        assert_eq!(tmax, 1.0);
        assert_eq!(idx, 1);
    }

    #[test]
    fn test_empty_series() {
        assert!(matches!(cmax_tmax(&[], &[]), Err(PKError::EmptySeries)));
        assert!(matches!(analyze(&[], &[], None), Err(PKError::EmptySeries)));
    }

    #[test]
    fn test_non_increasing_time_is_invalid() {
        let times = [0.0, 1.0, 1.0, 2.0];
        let values = [0.0, 1.0, 0.5, 0.2];
        assert!(matches!(auc(&times, &values), Err(PKError::InvalidSeries(_))));
    }

    #[test]
    fn test_trapezoidal_auc() {
        let times = [0.0, 1.0, 3.0];
        let values = [0.0, 2.0, 0.0];
        assert_relative_eq!(auc(&times, &values).unwrap(), 3.0);
        assert_eq!(auc(&[2.0], &[7.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_auc_additive_over_interior_sample() {
        let times = [0.0, 0.5, 1.0, 2.0, 4.0, 8.0, 12.0];
        let values = [0.0, 0.4, 0.7, 0.6, 0.35, 0.12, 0.04];
        let total = auc(&times, &values).unwrap();

        for k in 1..times.len() - 1 {
            let head = auc(&times[..=k], &values[..=k]).unwrap();
            let tail = auc(&times[k..], &values[k..]).unwrap();
            assert_relative_eq!(total, head + tail, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_half_life_of_exponential_decay() {
        let k = 0.12;
        let (times, values) = exponential(2.0, k, 500, 0.1);
        let summary = analyze(&times, &values, None).unwrap();

        let expected = std::f64::consts::LN_2 / k;
        assert_relative_eq!(summary.half_life.unwrap(), expected, epsilon = 1e-6);
        assert_relative_eq!(summary.lambda_z.unwrap(), k, epsilon = 1e-8);
        assert_eq!(summary.tmax, 0.0);
    }

    #[test]
    fn test_two_samples_above_threshold_have_no_half_life() {
        let summary = analyze(&[0.0, 1.0], &[1.0, 0.9], None).unwrap();
        assert!(summary.half_life.is_none());
        assert!(summary.half_life_or_nan().is_nan());
        assert_eq!(summary.terminal_points, 0);
    }

    #[test]
    fn test_rising_curve_has_no_half_life() {
        let times = [0.0, 1.0, 2.0, 3.0];
        let values = [0.0, 1.0, 2.0, 3.0];
        let summary = analyze(&times, &values, None).unwrap();
        assert!(summary.half_life.is_none());
        assert_eq!(summary.cmax, 3.0);
        assert_eq!(summary.tmax, 3.0);
    }

    #[test]
    fn test_dose_raises_floor() {
        let engine = NcaEngine::default();
        assert_eq!(engine.floor(None), 1e-9);
        assert_relative_eq!(engine.floor(Some(4.0)), 4e-4);
        assert_eq!(engine.floor(Some(0.0)), 1e-9);

        // Tail samples below the dose floor are excluded from the fit
        let times = [0.0, 1.0, 2.0, 3.0, 4.0];
        let values = [1.0, 0.4, 0.16, 1e-4, 5e-5];
        let with_dose = analyze(&times, &values, Some(4.0)).unwrap();
        let without = analyze(&times, &values, None).unwrap();
        assert_eq!(with_dose.terminal_points, 2);
        assert_eq!(without.terminal_points, 4);
    }

    #[test]
    fn test_mass_unit_conversion() {
        let summary = analyze(&[0.0, 1.0, 2.0], &[0.0, 1.0, 0.5], None).unwrap();
        let masses = MolarMasses::glimepiride();
        let mass = summary.to_mass_units(&masses).unwrap();

        assert_eq!(mass.unit, MeasureUnit::NanogramPerMl);
        assert_relative_eq!(mass.cmax, 490.62);
        assert_relative_eq!(mass.auc, summary.auc * 490.62);
        assert_eq!(mass.auc_unit(), "ng/mL·hr");

        let urine = PkSummary { substance: Substance::UrineM1M2, ..summary };
        assert!(urine.to_mass_units(&masses).is_none());
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(None, 2), "N/A");
        assert_eq!(format_value(Some(f64::NAN), 2), "N/A");
        assert_eq!(format_value(Some(1.23456), 2), "1.23");
    }
}
