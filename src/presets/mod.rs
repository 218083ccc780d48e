pub mod catalog;
pub mod resolver;

use serde::{Deserialize, Serialize};
use std::fmt;
use crate::controls::Control;

pub use catalog::*;
pub use resolver::*;

/// Sentinel category for values that match no preset.
pub const CUSTOM: &str = "Custom";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetAxis {
    Renal,
    Cirrhosis,
    Allele,
}

impl PresetAxis {
    /// Absolute tolerance used when matching a value against the axis presets.
    pub fn tolerance(&self) -> Option<f64> {
        match self {
            PresetAxis::Cirrhosis => Some(1e-3),
            PresetAxis::Renal | PresetAxis::Allele => None,
        }
    }

    /// Controls driven by this axis.
    pub fn controls(&self) -> &'static [Control] {
        match self {
            PresetAxis::Renal => &[Control::CrclMlmin],
            PresetAxis::Cirrhosis => &[Control::CirrhosisDegree],
            PresetAxis::Allele => &[Control::Allele1ActivityPct, Control::Allele2ActivityPct],
        }
    }
}

impl fmt::Display for PresetAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PresetAxis::Renal => "renal",
            PresetAxis::Cirrhosis => "cirrhosis",
            PresetAxis::Allele => "allele",
        };
        write!(f, "{}", name)
    }
}

/// Ordered category name -> reference value table.
#[derive(Debug, Clone, PartialEq)]
pub struct PresetTable {
    entries: Vec<(&'static str, f64)>,
}

impl PresetTable {
    pub fn new(entries: Vec<(&'static str, f64)>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[(&'static str, f64)] {
        &self.entries
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    pub fn value_of(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(entry, _)| *entry == name)
            .map(|(_, value)| *value)
    }

    /// Largest reference value, `None` for an empty table.
    pub fn max_value(&self) -> Option<f64> {
        self.entries
            .iter()
            .map(|(_, value)| *value)
            .reduce(f64::max)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
