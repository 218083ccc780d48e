use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use crate::simulation::Substance;

/// Unit of a concentration or amount column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeasureUnit {
    Micromolar,
    NanogramPerMl,
    Micromole,
    Microgram,
}

impl MeasureUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            MeasureUnit::Micromolar => "µM",
            MeasureUnit::NanogramPerMl => "ng/mL",
            MeasureUnit::Micromole => "µmole",
            MeasureUnit::Microgram => "µg",
        }
    }

    /// Mass-based counterpart of a molar unit. µM x g/mol = ng/mL, µmole x g/mol = µg.
    pub fn mass_equivalent(&self) -> Option<MeasureUnit> {
        match self {
            MeasureUnit::Micromolar => Some(MeasureUnit::NanogramPerMl),
            MeasureUnit::Micromole => Some(MeasureUnit::Microgram),
            MeasureUnit::NanogramPerMl | MeasureUnit::Microgram => None,
        }
    }
}

impl fmt::Display for MeasureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeUnit {
    Minute,
    Hour,
}

impl TimeUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            TimeUnit::Minute => "min",
            TimeUnit::Hour => "hr",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Caller-supplied molar masses [g/mol] used for mass-unit conversion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MolarMasses {
    masses: HashMap<Substance, f64>,
}

impl MolarMasses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, substance: Substance, grams_per_mole: f64) -> Self {
        self.masses.insert(substance, grams_per_mole);
        self
    }

    pub fn get(&self, substance: Substance) -> Option<f64> {
        self.masses.get(&substance).copied()
    }

    /// Glimepiride and its hydroxy (M1) and carboxy (M2) metabolites.
    pub fn glimepiride() -> Self {
        Self::new()
            .with(Substance::Glimepiride, 490.62)
            .with(Substance::M1, 506.62)
            .with(Substance::M2, 520.60)
    }
}
