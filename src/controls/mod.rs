pub mod store;

use serde::{Deserialize, Serialize};
use std::fmt;
use crate::config::ControlConfig;
use crate::error::{PKError, PKResult};

pub use store::*;

/// The six independent patient controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    DoseMg,
    WeightKg,
    CrclMlmin,
    CirrhosisDegree,
    Allele1ActivityPct,
    Allele2ActivityPct,
}

impl Control {
    pub const ALL: [Control; 6] = [
        Control::DoseMg,
        Control::WeightKg,
        Control::CrclMlmin,
        Control::CirrhosisDegree,
        Control::Allele1ActivityPct,
        Control::Allele2ActivityPct,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Control::DoseMg => "Glimepiride Dose [mg]",
            Control::WeightKg => "Bodyweight [kg]",
            Control::CrclMlmin => "Creatinine Clearance [mL/min]",
            Control::CirrhosisDegree => "Cirrhosis Degree",
            Control::Allele1ActivityPct => "CYP2C9 Allele 1 Activity [%]",
            Control::Allele2ActivityPct => "CYP2C9 Allele 2 Activity [%]",
        }
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Control::DoseMg => "dose_mg",
            Control::WeightKg => "weight_kg",
            Control::CrclMlmin => "crcl_mlmin",
            Control::CirrhosisDegree => "cirrhosis_degree",
            Control::Allele1ActivityPct => "allele1_activity_pct",
            Control::Allele2ActivityPct => "allele2_activity_pct",
        };
        write!(f, "{}", name)
    }
}

/// Range, UI step and default of a single control. The step is a slider hint only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlSpec {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub default: f64,
}

impl ControlSpec {
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.default;
        }
        value.max(self.min).min(self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Declared bounds of every control. CrCl and allele upper bounds come from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlBounds {
    pub dose_mg: ControlSpec,
    pub weight_kg: ControlSpec,
    pub crcl_mlmin: ControlSpec,
    pub cirrhosis_degree: ControlSpec,
    pub allele_activity_pct: ControlSpec,
}

impl ControlBounds {
    pub fn from_config(config: &ControlConfig) -> Self {
        Self {
            dose_mg: ControlSpec { min: 0.0, max: 8.0, step: 0.1, default: 4.0 },
            weight_kg: ControlSpec { min: 40.0, max: 170.0, step: 1.0, default: 75.0 },
            crcl_mlmin: ControlSpec {
                min: 1.0,
                max: config.crcl_max,
                step: 5.0,
                default: 110.0_f64.min(config.crcl_max),
            },
            cirrhosis_degree: ControlSpec { min: 0.0, max: 0.95, step: 0.01, default: 0.0 },
            allele_activity_pct: ControlSpec {
                min: 0.0,
                max: config.allele_max,
                step: 1.0,
                default: 100.0_f64.min(config.allele_max),
            },
        }
    }

    pub fn spec(&self, control: Control) -> &ControlSpec {
        match control {
            Control::DoseMg => &self.dose_mg,
            Control::WeightKg => &self.weight_kg,
            Control::CrclMlmin => &self.crcl_mlmin,
            Control::CirrhosisDegree => &self.cirrhosis_degree,
            Control::Allele1ActivityPct | Control::Allele2ActivityPct => &self.allele_activity_pct,
        }
    }

    /// Strict check for callers that reject rather than clamp.
    pub fn validate(&self, control: Control, value: f64) -> PKResult<f64> {
        let spec = self.spec(control);
        if spec.contains(value) {
            Ok(value)
        } else {
            Err(PKError::OutOfRange {
                control: control.to_string(),
                value,
                min: spec.min,
                max: spec.max,
            })
        }
    }

    pub fn defaults(&self) -> ControlSnapshot {
        ControlSnapshot {
            dose_mg: self.dose_mg.default,
            weight_kg: self.weight_kg.default,
            crcl_mlmin: self.crcl_mlmin.default,
            cirrhosis_degree: self.cirrhosis_degree.default,
            allele1_activity_pct: self.allele_activity_pct.default,
            allele2_activity_pct: self.allele_activity_pct.default,
        }
    }
}

impl Default for ControlBounds {
    fn default() -> Self {
        Self::from_config(&ControlConfig::default())
    }
}

/// A full set of control values. Profiles store copies of this.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlSnapshot {
    pub dose_mg: f64,
    pub weight_kg: f64,
    pub crcl_mlmin: f64,
    pub cirrhosis_degree: f64,
    pub allele1_activity_pct: f64,
    pub allele2_activity_pct: f64,
}

impl ControlSnapshot {
    pub fn get(&self, control: Control) -> f64 {
        match control {
            Control::DoseMg => self.dose_mg,
            Control::WeightKg => self.weight_kg,
            Control::CrclMlmin => self.crcl_mlmin,
            Control::CirrhosisDegree => self.cirrhosis_degree,
            Control::Allele1ActivityPct => self.allele1_activity_pct,
            Control::Allele2ActivityPct => self.allele2_activity_pct,
        }
    }

    pub fn set(&mut self, control: Control, value: f64) {
        let slot = match control {
            Control::DoseMg => &mut self.dose_mg,
            Control::WeightKg => &mut self.weight_kg,
            Control::CrclMlmin => &mut self.crcl_mlmin,
            Control::CirrhosisDegree => &mut self.cirrhosis_degree,
            Control::Allele1ActivityPct => &mut self.allele1_activity_pct,
            Control::Allele2ActivityPct => &mut self.allele2_activity_pct,
        };
        *slot = value;
    }

    pub fn clamped(&self, bounds: &ControlBounds) -> Self {
        let mut out = *self;
        for control in Control::ALL {
            out.set(control, bounds.spec(control).clamp(self.get(control)));
        }
        out
    }
}

impl Default for ControlSnapshot {
    fn default() -> Self {
        ControlBounds::default().defaults()
    }
}
