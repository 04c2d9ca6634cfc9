//! Vista Services Layer
//!
//! Settings loading and construction of the terrain model they select.

pub mod settings;
pub mod terrain;

pub use settings::{LosSettings, ScenarioSettings, Settings, SettingsError, TerrainSettings};
pub use terrain::build_terrain;
