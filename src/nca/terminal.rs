//! Terminal elimination phase: point selection and log-linear regression.
//!
//! Points after Tmax that have dropped to `terminal_fraction x Cmax` or below,
//! and stay above a positive floor, form the terminal phase. `ln(C) = a - k t`
//! is fitted by ordinary least squares and the half-life is `ln(2) / k`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerminalFit {
    /// Terminal elimination rate constant (1/time)
    pub lambda_z: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub n_points: usize,
    pub time_first: f64,
    pub time_last: f64,
}

impl TerminalFit {
    pub fn half_life(&self) -> f64 {
        std::f64::consts::LN_2 / self.lambda_z
    }
}

/// Indices of the terminal-phase samples.
pub fn terminal_points(
    concentrations: &[f64],
    cmax_idx: usize,
    threshold: f64,
    floor: f64,
) -> Vec<usize> {
    (cmax_idx + 1..concentrations.len())
        .filter(|&i| concentrations[i] <= threshold && concentrations[i] > floor)
        .collect()
}

/// Fits the terminal phase. `None` when fewer than two points qualify or no decay is seen.
pub fn fit_terminal(times: &[f64], concentrations: &[f64], indices: &[usize]) -> Option<TerminalFit> {
    if indices.len() < 2 {
        return None;
    }

    let x: Vec<f64> = indices.iter().map(|&i| times[i]).collect();
    let y: Vec<f64> = indices.iter().map(|&i| concentrations[i].ln()).collect();

    let (slope, intercept, r_squared) = linear_regression(&x, &y)?;
    let lambda_z = -slope;
    if !(lambda_z > 0.0) {
        return None;
    }

    Some(TerminalFit {
        lambda_z,
        intercept,
        r_squared,
        n_points: indices.len(),
        time_first: x[0],
        time_last: x[x.len() - 1],
    })
}

/// Least squares `y = intercept + slope * x`, returning (slope, intercept, R²).
fn linear_regression(x: &[f64], y: &[f64]) -> Option<(f64, f64, f64)> {
    let n = x.len() as f64;
    if n < 2.0 {
        return None;
    }

    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let sxx: f64 = x.iter().map(|xi| (xi - mean_x).powi(2)).sum();
    let sxy: f64 = x.iter().zip(y).map(|(xi, yi)| (xi - mean_x) * (yi - mean_y)).sum();
    if sxx.abs() < 1e-15 {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let ss_tot: f64 = y.iter().map(|yi| (yi - mean_y).powi(2)).sum();
    let ss_res: f64 = x
        .iter()
        .zip(y)
        .map(|(xi, yi)| (yi - (intercept + slope * xi)).powi(2))
        .sum();

    let r_squared = if ss_tot.abs() < 1e-15 {
        1.0
    } else {
        1.0 - ss_res / ss_tot
    };

    Some((slope, intercept, r_squared))
}
