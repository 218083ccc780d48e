use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use super::PatientProfile;
use crate::controls::ControlSnapshot;
use crate::error::PKResult;
use log::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredProfile {
    name: String,
    controls: ControlSnapshot,
}

#[derive(Debug, Serialize, Deserialize)]
struct ProfileFile {
    /// When the whole file was last written
    written_at: DateTime<Utc>,
    profiles: Vec<StoredProfile>,
}

/// Writes user profiles to a JSON file, keeping their order.
pub fn save_profiles<P: AsRef<Path>>(profiles: &[PatientProfile], path: P) -> PKResult<()> {
    let file = ProfileFile {
        written_at: Utc::now(),
        profiles: profiles
            .iter()
            .map(|p| StoredProfile {
                name: p.name.clone(),
                controls: p.controls,
            })
            .collect(),
    };

    let writer = File::create(path.as_ref())?;
    serde_json::to_writer_pretty(writer, &file)?;
    info!("Stored {} profiles in {:?}", profiles.len(), path.as_ref());
    Ok(())
}

/// Reads profiles written by [`save_profiles`]. A missing file yields no profiles.
pub fn load_profiles<P: AsRef<Path>>(path: P) -> PKResult<Vec<PatientProfile>> {
    let path = path.as_ref();
    if !path.exists() {
        debug!("No profile file at {:?}", path);
        return Ok(Vec::new());
    }

    let reader = BufReader::new(File::open(path)?);
    let file: ProfileFile = serde_json::from_reader(reader)?;
    Ok(file
        .profiles
        .into_iter()
        .map(|p| PatientProfile {
            name: p.name,
            controls: p.controls,
        })
        .collect())
}
