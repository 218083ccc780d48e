use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::error::{PKError, PKResult};
use crate::presets::{PresetAxis, PresetCatalog};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub controls: ControlConfig,
    pub physiology: PhysiologyConfig,
    pub simulation: SimulationConfig,
    pub nca: NcaConfig,
    pub cohort: CohortConfig,
}

/// Upper bounds that differ between deployments of the explorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub crcl_max: f64,   // mL/min
    pub allele_max: f64, // % activity
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            crcl_max: 150.0,
            allele_max: 150.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysiologyConfig {
    pub normal_crcl: f64, // mL/min (eGFR 100 + 10% overestimation)
}

impl Default for PhysiologyConfig {
    fn default() -> Self {
        Self { normal_crcl: 110.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub start_min: f64,
    pub end_min: f64,
    pub steps: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start_min: 0.0,
            end_min: 60.0 * 48.0,
            steps: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NcaConfig {
    pub terminal_fraction: f64,
    pub min_concentration: f64,
    pub dose_floor_factor: f64,
}

impl Default for NcaConfig {
    fn default() -> Self {
        Self {
            terminal_fraction: 0.5,
            min_concentration: 1e-9,
            dose_floor_factor: 1e-4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CohortConfig {
    pub weight_sd: f64, // kg
    pub crcl_cv: f64,   // CV%
}

impl Default for CohortConfig {
    fn default() -> Self {
        Self {
            weight_sd: 12.0,
            crcl_cv: 20.0,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> PKResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PKResult<()> {
        if self.controls.crcl_max <= 1.0 {
            return Err(PKError::Validation(
                "crcl_max must be greater than the CrCl lower bound (1 mL/min)".to_string()
            ));
        }

        if self.controls.allele_max <= 0.0 {
            return Err(PKError::Validation(
                "allele_max must be positive".to_string()
            ));
        }

        self.validate_preset_bounds(&PresetCatalog::new())?;

        if self.physiology.normal_crcl <= 0.0 {
            return Err(PKError::Validation(
                "normal_crcl must be positive".to_string()
            ));
        }

        self.validate_simulation()?;
        self.validate_nca()?;

        if self.cohort.weight_sd < 0.0 || self.cohort.crcl_cv < 0.0 {
            return Err(PKError::Validation(
                "Cohort variability must not be negative".to_string()
            ));
        }

        Ok(())
    }

    /// Control upper bounds must admit every preset, or presets clamp to "Custom".
    fn validate_preset_bounds(&self, catalog: &PresetCatalog) -> PKResult<()> {
        let bounds = [
            (PresetAxis::Renal, "crcl_max", self.controls.crcl_max),
            (PresetAxis::Allele, "allele_max", self.controls.allele_max),
        ];
        for (axis, field, max) in bounds {
            if let Some(largest) = catalog.table(axis).max_value() {
                if max < largest {
                    return Err(PKError::Validation(format!(
                        "{} ({}) is below the largest {} preset ({})",
                        field, max, axis, largest
                    )));
                }
            }
        }
        Ok(())
    }

    fn validate_simulation(&self) -> PKResult<()> {
        if self.simulation.end_min <= self.simulation.start_min {
            return Err(PKError::Validation(
                "Simulation end must lie after its start".to_string()
            ));
        }

        if self.simulation.steps == 0 {
            return Err(PKError::Validation(
                "At least one simulation step must be specified".to_string()
            ));
        }

        Ok(())
    }

    fn validate_nca(&self) -> PKResult<()> {
        if !(self.nca.terminal_fraction > 0.0 && self.nca.terminal_fraction <= 1.0) {
            return Err(PKError::Validation(
                format!("terminal_fraction must lie in (0, 1], got {}", self.nca.terminal_fraction)
            ));
        }

        if self.nca.min_concentration <= 0.0 {
            return Err(PKError::Validation(
                "min_concentration must be positive".to_string()
            ));
        }

        if self.nca.dose_floor_factor < 0.0 {
            return Err(PKError::Validation(
                "dose_floor_factor must not be negative".to_string()
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.simulation.end_min, 2880.0);
        assert_eq!(config.simulation.steps, 1000);
        assert_eq!(config.controls.crcl_max, 150.0);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let content = r#"{ "controls": { "crcl_max": 110.0 }, "simulation": { "steps": 200 } }"#;
        let config: Config = serde_json::from_str(content).unwrap();

        assert_eq!(config.controls.crcl_max, 110.0);
        assert_eq!(config.controls.allele_max, 150.0);
        assert_eq!(config.simulation.steps, 200);
        assert_eq!(config.simulation.end_min, 2880.0);
        assert_eq!(config.physiology.normal_crcl, 110.0);
    }

    #[test]
    fn test_bounds_below_presets_rejected() {
        let mut config = Config::default();
        config.controls.crcl_max = 100.0;
        assert!(matches!(config.validate(), Err(PKError::Validation(_))));

        let mut config = Config::default();
        config.controls.allele_max = 50.0;
        assert!(matches!(config.validate(), Err(PKError::Validation(_))));

        let mut config = Config::default();
        config.controls.crcl_max = 110.0;
        config.controls.allele_max = 100.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_round_trip_under_tightest_valid_bounds() {
        use crate::controls::{Control, ControlBounds, ParameterStore};
        use crate::presets::CategoryResolver;

        let controls = ControlConfig { crcl_max: 110.0, allele_max: 100.0 };
        let config = Config { controls: controls.clone(), ..Config::default() };
        config.validate().unwrap();

        let catalog = PresetCatalog::new();
        let resolver = CategoryResolver::new(&catalog);
        let mut store = ParameterStore::new(ControlBounds::from_config(&controls));
        for (axis, control) in [
            (PresetAxis::Renal, Control::CrclMlmin),
            (PresetAxis::Allele, Control::Allele1ActivityPct),
        ] {
            for name in catalog.table(axis).names() {
                resolver.apply_to_store(&mut store, axis, control, name);
                assert_eq!(resolver.category_of(&store, control), name);
            }
        }
    }

    #[test]
    fn test_invalid_window_rejected() {
        let mut config = Config::default();
        config.simulation.end_min = 0.0;
        assert!(matches!(config.validate(), Err(PKError::Validation(_))));
    }

    #[test]
    fn test_invalid_terminal_fraction_rejected() {
        let mut config = Config::default();
        config.nca.terminal_fraction = 1.5;
        assert!(config.validate().is_err());
    }
}
