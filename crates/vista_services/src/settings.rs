//! Settings management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use vista_core::terrain::STANDARD_EARTH_FACTOR;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid settings: {reason}")]
    Invalid { reason: String },
}

/// Top-level settings for a visibility run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub los: LosSettings,
    pub terrain: TerrainSettings,
    pub scenario: ScenarioSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LosSettings {
    /// Effective earth radius multiplier, fixed for the life of a cache.
    pub earth_factor: f64,
}

impl Default for LosSettings {
    fn default() -> Self {
        Self {
            earth_factor: STANDARD_EARTH_FACTOR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TerrainSettings {
    /// Smooth earth; the cache bypasses its store.
    Bald,
    /// Synthetic height grid with a north-south ridge through the middle.
    Grid {
        cell_size: f64,
        width: u32,
        height: u32,
        ridge_height: f32,
    },
}

impl Default for TerrainSettings {
    fn default() -> Self {
        TerrainSettings::Grid {
            cell_size: 250.0,
            width: 200,
            height: 200,
            ridge_height: 400.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioSettings {
    pub entity_count: usize,
    pub ticks: u32,
    /// Entity speed in metres per tick.
    pub speed: f64,
    /// Sensor height above ground in metres.
    pub sensor_height: f64,
    pub seed: u64,
}

impl Default for ScenarioSettings {
    fn default() -> Self {
        Self {
            entity_count: 64,
            ticks: 120,
            speed: 40.0,
            sensor_height: 20.0,
            seed: 0x5EED,
        }
    }
}

impl Settings {
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_json_str(&json)?;
        tracing::debug!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let factor = self.los.earth_factor;
        if !(factor.is_finite() && factor > 0.0) {
            return Err(SettingsError::Invalid {
                reason: format!("los.earth_factor {factor} must be finite and positive"),
            });
        }
        if let TerrainSettings::Grid {
            cell_size,
            width,
            height,
            ridge_height,
        } = &self.terrain
        {
            if !(cell_size.is_finite() && *cell_size > 0.0) {
                return Err(SettingsError::Invalid {
                    reason: format!("terrain.cell_size {cell_size} must be finite and positive"),
                });
            }
            if *width == 0 || *height == 0 {
                return Err(SettingsError::Invalid {
                    reason: format!("terrain grid {width}x{height} must be non-empty"),
                });
            }
            if !ridge_height.is_finite() {
                return Err(SettingsError::Invalid {
                    reason: "terrain.ridge_height must be finite".into(),
                });
            }
        }
        if self.scenario.entity_count < 2 {
            return Err(SettingsError::Invalid {
                reason: "scenario.entity_count must be at least 2".into(),
            });
        }
        Ok(())
    }
}
