pub mod persistence;

use serde::{Deserialize, Serialize};
use crate::controls::ControlSnapshot;
use crate::error::{PKError, PKResult};
use crate::presets::PresetCatalog;
use log::{info, warn};

pub use persistence::*;

/// Named copy of all six control values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub name: String,
    pub controls: ControlSnapshot,
}

/// Row action in the profile table, dispatched by profile name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileAction {
    Load(String),
    Delete(String),
}

impl ProfileAction {
    pub fn name(&self) -> &str {
        match self {
            ProfileAction::Load(name) | ProfileAction::Delete(name) => name,
        }
    }
}

/// Where a listed profile comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSource {
    Example,
    User,
}

/// User-saved profiles in first-insertion order, backed by the read-only examples.
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    catalog: PresetCatalog,
    profiles: Vec<PatientProfile>,
}

impl ProfileRegistry {
    pub fn new(catalog: PresetCatalog) -> Self {
        Self {
            catalog,
            profiles: Vec::new(),
        }
    }

    /// Saves a copy under the trimmed name. Empty names are ignored; existing names are overwritten in place.
    pub fn save(&mut self, name: &str, snapshot: &ControlSnapshot) -> PKResult<()> {
        let name = name.trim();
        if name.is_empty() {
            warn!("Ignoring profile save with an empty name");
            return Ok(());
        }

        if self.catalog.is_example(name) {
            return Err(PKError::ReadOnlyProfile(name.to_string()));
        }

        match self.profiles.iter_mut().find(|p| p.name == name) {
            Some(existing) => {
                existing.controls = *snapshot;
                info!("Overwrote profile '{}'", name);
            }
            None => {
                self.profiles.push(PatientProfile {
                    name: name.to_string(),
                    controls: *snapshot,
                });
                info!("Saved profile '{}'", name);
            }
        }
        Ok(())
    }

    /// User profiles first, then the read-only examples.
    pub fn load(&self, name: &str) -> PKResult<ControlSnapshot> {
        let name = name.trim();
        self.profiles
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.controls)
            .or_else(|| self.catalog.example_profile(name).copied())
            .ok_or_else(|| PKError::ProfileNotFound(name.to_string()))
    }

    /// Removes a user profile. Absent names and examples are left alone.
    pub fn delete(&mut self, name: &str) -> bool {
        let name = name.trim();
        let before = self.profiles.len();
        self.profiles.retain(|p| p.name != name);

        if self.profiles.len() < before {
            info!("Deleted profile '{}'", name);
            true
        } else {
            if self.catalog.is_example(name) {
                warn!("Example profile '{}' cannot be deleted", name);
            }
            false
        }
    }

    pub fn list(&self) -> &[PatientProfile] {
        &self.profiles
    }

    /// Examples followed by user profiles, as shown in the profile table.
    pub fn table(&self) -> Vec<(ProfileSource, &str, &ControlSnapshot)> {
        self.catalog
            .example_profiles()
            .iter()
            .map(|(name, snapshot)| (ProfileSource::Example, name.as_str(), snapshot))
            .chain(
                self.profiles
                    .iter()
                    .map(|p| (ProfileSource::User, p.name.as_str(), &p.controls)),
            )
            .collect()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn catalog(&self) -> &PresetCatalog {
        &self.catalog
    }

    /// Replaces user profiles, e.g. from a persisted file. Example names are skipped.
    pub fn restore(&mut self, profiles: Vec<PatientProfile>) -> PKResult<()> {
        self.profiles.clear();
        for profile in profiles {
            match self.save(&profile.name, &profile.controls) {
                Err(PKError::ReadOnlyProfile(name)) => {
                    warn!("Skipping stored profile '{}': name is reserved", name)
                }
                other => other?,
            }
        }
        Ok(())
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::new(PresetCatalog::new())
    }
}
