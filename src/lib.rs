//! Covariate explorer for glimepiride pharmacokinetics.
//!
//! Maps patient controls (dose, body weight, CrCl, cirrhosis degree, CYP2C9
//! alleles) to and from clinical presets, keeps named patient profiles, drives
//! a whole-body model through the [`models::Simulator`] interface and derives
//! Cmax, Tmax, AUC and terminal half-life from the simulated curves.

pub mod config;
pub mod controls;
pub mod error;
pub mod models;
pub mod nca;
pub mod output;
pub mod presets;
pub mod profiles;
pub mod session;
pub mod simulation;

pub use config::Config;
pub use controls::{Control, ControlSnapshot, ParameterStore};
pub use error::{PKError, PKResult};
pub use nca::{NcaEngine, PkSummary};
pub use presets::{CategoryResolver, PresetAxis, PresetCatalog, CUSTOM};
pub use profiles::{ProfileAction, ProfileRegistry};
pub use session::Session;
