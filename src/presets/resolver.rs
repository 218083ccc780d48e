use super::{PresetAxis, PresetCatalog, CUSTOM};
use crate::controls::{Control, ParameterStore};
use log::{debug, warn};

/// Maps control values to preset names and back.
#[derive(Debug, Clone, Copy)]
pub struct CategoryResolver<'a> {
    catalog: &'a PresetCatalog,
}

impl<'a> CategoryResolver<'a> {
    pub fn new(catalog: &'a PresetCatalog) -> Self {
        Self { catalog }
    }

    /// First preset in declared order matching `value`, else `"Custom"`.
    pub fn resolve(&self, axis: PresetAxis, value: f64) -> &'static str {
        let tolerance = axis.tolerance();
        self.catalog
            .table(axis)
            .entries()
            .iter()
            .find(|(_, reference)| match tolerance {
                Some(tol) => (value - reference).abs() <= tol,
                None => value == *reference,
            })
            .map(|(name, _)| *name)
            .unwrap_or(CUSTOM)
    }

    /// Reference value for `name`; `None` for the sentinel and unknown names.
    pub fn apply(&self, axis: PresetAxis, name: &str) -> Option<f64> {
        if name == CUSTOM {
            return None;
        }
        self.catalog.table(axis).value_of(name)
    }

    /// Sets `control` to the preset value. Unknown names and "Custom" leave the store untouched.
    pub fn apply_to_store(
        &self,
        store: &mut ParameterStore,
        axis: PresetAxis,
        control: Control,
        name: &str,
    ) -> bool {
        if !axis.controls().contains(&control) {
            warn!("Control {} is not driven by the {} presets", control, axis);
            return false;
        }

        match self.apply(axis, name) {
            Some(value) => {
                debug!("Preset {} '{}' -> {} = {}", axis, name, control, value);
                store.set(control, value)
            }
            None => {
                if name != CUSTOM {
                    warn!("Unknown {} preset '{}'", axis, name);
                }
                false
            }
        }
    }

    /// Category shown for the current value of `control`.
    pub fn category_of(&self, store: &ParameterStore, control: Control) -> &'static str {
        match control {
            Control::CrclMlmin => self.resolve(PresetAxis::Renal, store.get(control)),
            Control::CirrhosisDegree => self.resolve(PresetAxis::Cirrhosis, store.get(control)),
            Control::Allele1ActivityPct | Control::Allele2ActivityPct => {
                self.resolve(PresetAxis::Allele, store.get(control))
            }
            Control::DoseMg | Control::WeightKg => CUSTOM,
        }
    }
}
