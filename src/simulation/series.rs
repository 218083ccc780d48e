use serde::{Deserialize, Serialize};
use std::fmt;
use crate::error::{PKError, PKResult};
use crate::models::RawSeries;
use crate::nca::{MeasureUnit, TimeUnit};

pub const TIME_COLUMN: &str = "time";
pub const TIME_FACTOR: f64 = 1.0 / 60.0; // min -> hr
pub const TIME_LABEL: &str = "Time [hr]";

/// Simulated outputs shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Substance {
    #[serde(rename = "parent_drug")]
    Glimepiride,
    #[serde(rename = "metabolite_1")]
    M1,
    #[serde(rename = "metabolite_2")]
    M2,
    #[serde(rename = "cumulative_urinary_excretion")]
    UrineM1M2,
}

impl Substance {
    pub const ALL: [Substance; 4] = [
        Substance::Glimepiride,
        Substance::M1,
        Substance::M2,
        Substance::UrineM1M2,
    ];

    /// Name of the simulator column.
    pub fn column(&self) -> &'static str {
        match self {
            Substance::Glimepiride => "[Cve_gli]",
            Substance::M1 => "[Cve_m1]",
            Substance::M2 => "[Cve_m2]",
            Substance::UrineM1M2 => "Aurine_m1_m2",
        }
    }

    /// Multiplier from native model units (mM, mmole) to display units.
    pub fn factor(&self) -> f64 {
        1000.0
    }

    pub fn unit(&self) -> MeasureUnit {
        match self {
            Substance::UrineM1M2 => MeasureUnit::Micromole,
            _ => MeasureUnit::Micromolar,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Substance::Glimepiride => "Glimepiride Plasma [µM]",
            Substance::M1 => "M1 Plasma [µM]",
            Substance::M2 => "M2 Plasma [µM]",
            Substance::UrineM1M2 => "M1 + M2 Urine [µmole]",
        }
    }

    /// Fixed y-axis range for plotting.
    pub fn display_range(&self) -> (f64, f64) {
        match self {
            Substance::Glimepiride => (0.0, 1.0),
            Substance::M1 => (0.0, 0.3),
            Substance::M2 => (0.0, 0.1),
            Substance::UrineM1M2 => (0.0, 10.0),
        }
    }

    /// True when the administered dose belongs to this substance.
    pub fn is_dosed(&self) -> bool {
        matches!(self, Substance::Glimepiride)
    }
}

impl fmt::Display for Substance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Substance::Glimepiride => "glimepiride",
            Substance::M1 => "M1",
            Substance::M2 => "M2",
            Substance::UrineM1M2 => "M1 + M2 urine",
        };
        write!(f, "{}", name)
    }
}

/// Unit-converted simulation output, time in hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub time_unit: TimeUnit,
    pub times: Vec<f64>,
    columns: Vec<(Substance, Vec<f64>)>,
}

impl TimeSeries {
    pub fn new(times: Vec<f64>, time_unit: TimeUnit) -> Self {
        Self {
            time_unit,
            times,
            columns: Vec::new(),
        }
    }

    pub fn with_column(mut self, substance: Substance, values: Vec<f64>) -> PKResult<Self> {
        if values.len() != self.times.len() {
            return Err(PKError::InvalidSeries(format!(
                "{} has {} values for {} time points",
                substance,
                values.len(),
                self.times.len()
            )));
        }
        self.columns.retain(|(s, _)| *s != substance);
        self.columns.push((substance, values));
        Ok(self)
    }

    /// Applies the fixed per-column conversion table to raw simulator output.
    pub fn from_raw(raw: &RawSeries) -> PKResult<Self> {
        let times = raw
            .column(TIME_COLUMN)
            .ok_or_else(|| PKError::Simulation("Simulator output has no time column".to_string()))?
            .into_iter()
            .map(|t| t * TIME_FACTOR)
            .collect();

        let mut series = TimeSeries::new(times, TimeUnit::Hour);
        for substance in Substance::ALL {
            let values = raw.column(substance.column()).ok_or_else(|| {
                PKError::Simulation(format!("Simulator output lacks column {}", substance.column()))
            })?;
            let factor = substance.factor();
            series = series.with_column(substance, values.into_iter().map(|v| v * factor).collect())?;
        }

        Ok(series)
    }

    pub fn values(&self, substance: Substance) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(s, _)| *s == substance)
            .map(|(_, v)| v.as_slice())
    }

    pub fn substances(&self) -> impl Iterator<Item = Substance> + '_ {
        self.columns.iter().map(|(s, _)| *s)
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}
