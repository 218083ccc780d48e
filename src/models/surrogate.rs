use super::{
    RawSeries, Simulator, PARAM_BODY_WEIGHT, PARAM_CIRRHOSIS, PARAM_CYP2C9, PARAM_DOSE,
    PARAM_RENAL_FUNCTION, TIME_COURSE_SELECTIONS,
};
use crate::error::{PKError, PKResult};
use std::collections::HashMap;

const MOLAR_MASS_GLI: f64 = 490.62; // g/mol
const REFERENCE_WEIGHT: f64 = 75.0; // kg
const ALLOMETRIC_EXPONENT: f64 = 0.75;

// Per-minute / per-kg constants of the reference patient
const KA: f64 = 0.012;
const V_GLI_PER_KG: f64 = 0.13;
const V_MET_PER_KG: f64 = 0.3;
const CL_HEP_GLI: f64 = 0.02; // L/min
const CL_HEP_M1: f64 = 0.02;
const CL_RENAL_M1: f64 = 0.04;
const CL_RENAL_M2: f64 = 0.08;

const MIN_RATE_SEPARATION: f64 = 1e-6;

/// Closed-form stand-in for the whole-body glimepiride model.
///
/// Oral dose -> gut -> plasma glimepiride -> M1 -> M2, with renal excretion of
/// M1 and M2 into urine. The chain is linear so every compartment is a sum of
/// exponentials (Bateman). Native units: minutes, mmol, mmol/L.
#[derive(Debug, Clone)]
pub struct SurrogateModel {
    parameters: HashMap<String, f64>,
}

#[derive(Debug, Clone, Copy)]
struct Rates {
    ka: f64,
    k_gli: f64,
    k_m1m2: f64,
    k_m1_urine: f64,
    k_m2_urine: f64,
    v_gli: f64,
    v_m1: f64,
    v_m2: f64,
}

impl SurrogateModel {
    pub fn new() -> Self {
        Self {
            parameters: Self::baseline(),
        }
    }

    fn baseline() -> HashMap<String, f64> {
        let mut params = HashMap::new();
        params.insert(PARAM_DOSE.to_string(), 4.0);
        params.insert(PARAM_BODY_WEIGHT.to_string(), REFERENCE_WEIGHT);
        params.insert(PARAM_CIRRHOSIS.to_string(), 0.0);
        params.insert(PARAM_RENAL_FUNCTION.to_string(), 1.0);
        params.insert(PARAM_CYP2C9.to_string(), 1.0);
        params
    }

    pub fn get_parameter(&self, name: &str) -> Option<f64> {
        self.parameters.get(name).copied()
    }

    fn param(&self, name: &str) -> PKResult<f64> {
        self.get_parameter(name)
            .ok_or_else(|| PKError::InvalidModel(format!("Missing parameter: {}", name)))
    }

    fn rates(&self) -> PKResult<Rates> {
        let bw = self.param(PARAM_BODY_WEIGHT)?;
        if bw <= 0.0 {
            return Err(PKError::Simulation(format!("Body weight must be positive, got {}", bw)));
        }

        let f_cirrhosis = self.param(PARAM_CIRRHOSIS)?;
        if !(0.0..1.0).contains(&f_cirrhosis) {
            return Err(PKError::Simulation(format!(
                "Cirrhosis fraction must lie in [0, 1), got {}",
                f_cirrhosis
            )));
        }
        let f_renal = self.param(PARAM_RENAL_FUNCTION)?.max(0.0);
        let f_cyp = self.param(PARAM_CYP2C9)?.max(0.0);

        let allometric = (bw / REFERENCE_WEIGHT).powf(ALLOMETRIC_EXPONENT);
        let v_gli = V_GLI_PER_KG * bw;
        let v_met = V_MET_PER_KG * bw;
        let liver = 1.0 - f_cirrhosis;

        Ok(Rates {
            ka: KA,
            k_gli: CL_HEP_GLI * allometric * f_cyp * liver / v_gli,
            k_m1m2: CL_HEP_M1 * allometric * liver / v_met,
            k_m1_urine: CL_RENAL_M1 * allometric * f_renal / v_met,
            k_m2_urine: CL_RENAL_M2 * allometric * f_renal / v_met,
            v_gli,
            v_m1: v_met,
            v_m2: v_met,
        })
    }

    /// Amounts in gut, plasma glimepiride, M1 and M2 at time `t` for an initial gut amount `dose`.
    fn amounts(dose: f64, rates: &Rates, t: f64) -> [f64; 4] {
        let lambdas = separate(&[
            rates.ka,
            rates.k_gli,
            rates.k_m1m2 + rates.k_m1_urine,
            rates.k_m2_urine,
        ]);
        let transfers = [rates.ka, rates.k_gli, rates.k_m1m2];

        let mut out = [0.0; 4];
        for (n, slot) in out.iter_mut().enumerate() {
            let gain: f64 = transfers[..n].iter().product();
            if gain == 0.0 {
                continue;
            }

            let mut sum = 0.0;
            for i in 0..=n {
                let mut denom = 1.0;
                for j in 0..=n {
                    if j != i {
                        denom *= lambdas[j] - lambdas[i];
                    }
                }
                sum += (-lambdas[i] * t).exp() / denom;
            }
            *slot = (dose * gain * sum).max(0.0);
        }
        out
    }
}

impl Default for SurrogateModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Pushes coincident decay rates apart so the Bateman denominators stay finite.
fn separate(lambdas: &[f64; 4]) -> [f64; 4] {
    let mut out = *lambdas;
    for i in 1..out.len() {
        let mut bumped = true;
        while bumped {
            bumped = false;
            for j in 0..i {
                if (out[i] - out[j]).abs() < MIN_RATE_SEPARATION {
                    out[i] += MIN_RATE_SEPARATION;
                    bumped = true;
                }
            }
        }
    }
    out
}

impl Simulator for SurrogateModel {
    fn reset(&mut self) {
        self.parameters = Self::baseline();
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> PKResult<()> {
        if !self.parameters.contains_key(name) {
            return Err(PKError::InvalidModel(format!("Unknown parameter: {}", name)));
        }
        if !value.is_finite() {
            return Err(PKError::Validation(format!("{} must be finite", name)));
        }
        self.parameters.insert(name.to_string(), value);
        Ok(())
    }

    fn simulate(&mut self, start: f64, end: f64, steps: usize) -> PKResult<RawSeries> {
        if steps == 0 || end <= start {
            return Err(PKError::Simulation(format!(
                "Invalid time window [{}, {}] with {} steps",
                start, end, steps
            )));
        }

        let rates = self.rates()?;
        let dose = self.param(PARAM_DOSE)?.max(0.0) / MOLAR_MASS_GLI; // mmol

        let columns = TIME_COURSE_SELECTIONS.iter().map(|c| c.to_string()).collect();
        let mut series = RawSeries::new(columns);
        let dt = (end - start) / steps as f64;

        for step in 0..=steps {
            let time = start + dt * step as f64;
            let t = time.max(0.0);
            let [gut, gli, m1, m2] = Self::amounts(dose, &rates, t);
            let urine = (dose - gut - gli - m1 - m2).max(0.0);

            series.push_row(vec![
                time,
                gli / rates.v_gli,
                m1 / rates.v_m1,
                m2 / rates.v_m2,
                urine,
            ])?;
        }

        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn run(model: &mut SurrogateModel) -> RawSeries {
        model.simulate(0.0, 60.0 * 48.0, 480).unwrap()
    }

    #[test]
    fn test_mass_balance_closes() {
        let mut model = SurrogateModel::new();
        let series = run(&mut model);
        let last = series.rows.last().unwrap();
        let dose = 4.0 / MOLAR_MASS_GLI;

        // After 48 h nearly everything has been excreted
        assert!(last[4] > 0.9 * dose);
        assert!(last[4] <= dose + 1e-12);
    }

    #[test]
    fn test_zero_dose_gives_flat_series() {
        let mut model = SurrogateModel::new();
        model.set_parameter(PARAM_DOSE, 0.0).unwrap();
        let series = run(&mut model);
        assert!(series.rows.iter().all(|row| row[1..].iter().all(|&v| v == 0.0)));
    }

    #[test]
    fn test_reduced_cyp_activity_raises_exposure() {
        let mut model = SurrogateModel::new();
        let reference = run(&mut model);

        model.reset();
        model.set_parameter(PARAM_CYP2C9, 0.21).unwrap();
        let poor = run(&mut model);

        let peak = |s: &RawSeries| s.column("[Cve_gli]").unwrap().into_iter().fold(0.0, f64::max);
        assert!(peak(&poor) > peak(&reference));
    }

    #[test]
    fn test_reset_restores_baseline() {
        let mut model = SurrogateModel::new();
        model.set_parameter(PARAM_BODY_WEIGHT, 120.0).unwrap();
        model.reset();
        assert_relative_eq!(model.get_parameter(PARAM_BODY_WEIGHT).unwrap(), 75.0);
    }

    #[test]
    fn test_unknown_parameter_rejected() {
        let mut model = SurrogateModel::new();
        assert!(matches!(
            model.set_parameter("KA", 1.0),
            Err(PKError::InvalidModel(_))
        ));
    }

    #[test]
    fn test_coincident_rates_stay_finite() {
        let mut model = SurrogateModel::new();
        model.set_parameter(PARAM_RENAL_FUNCTION, 0.0).unwrap();
        model.set_parameter(PARAM_CYP2C9, 0.0).unwrap();
        let series = run(&mut model);
        assert!(series.rows.iter().all(|row| row.iter().all(|v| v.is_finite())));
    }
}
