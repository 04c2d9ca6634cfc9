//! Terrain models answering the authoritative line-of-sight question.
//!
//! The LOS cache treats a [`TerrainModel`] as a black box: it maps a 2D
//! position to a discrete cell id and answers whether a sightline between
//! two 3D points is unobstructed. The model is injected into the cache at
//! construction; nothing here is global.

mod bald;
mod grid;

pub use bald::BaldEarth;
pub use grid::HeightGrid;

use glam::DVec3;
use thiserror::Error;

/// Mean earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Standard-refraction effective earth radius multiplier.
pub const STANDARD_EARTH_FACTOR: f64 = 4.0 / 3.0;

/// Errors a terrain model can report while answering a query.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TerrainError {
    #[error("position ({x}, {y}, {z}) is not finite")]
    NonFinitePosition { x: f64, y: f64, z: f64 },

    #[error("earth factor {factor} must be finite and positive")]
    InvalidEarthFactor { factor: f64 },

    #[error("invalid terrain grid: {reason}")]
    InvalidGrid { reason: String },

    #[error("terrain backend '{model}' failed: {reason}")]
    Backend { model: String, reason: String },
}

/// Discrete terrain cell an entity was last observed in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TerrainCell {
    /// Never observed, off-grid, or reported invalid by the model.
    Unknown,
    Known(u64),
}

impl TerrainCell {
    /// Negative raw ids are the terrain models' "unknown" sentinel.
    #[inline]
    pub fn from_raw(raw: i64) -> Self {
        if raw < 0 {
            TerrainCell::Unknown
        } else {
            TerrainCell::Known(raw as u64)
        }
    }

    #[inline]
    pub fn is_known(self) -> bool {
        matches!(self, TerrainCell::Known(_))
    }
}

/// Authoritative geometry/terrain service.
pub trait TerrainModel: Send + Sync {
    /// Human-readable name used in logs.
    fn name(&self) -> &str;

    /// Map a ground position to a cell id. Negative means unknown/off-grid.
    fn cell_at(&self, x: f64, y: f64) -> i64;

    /// Whether an unobstructed sightline exists between `from` and `to`.
    fn line_of_sight(&self, from: DVec3, to: DVec3, earth_factor: f64)
        -> Result<bool, TerrainError>;

    /// True for flat/curved-earth-only models with no discrete obstruction.
    ///
    /// Such models are cheap enough that the cache calls them directly.
    fn is_bald(&self) -> bool {
        false
    }
}

pub(crate) fn ensure_finite(pos: DVec3) -> Result<(), TerrainError> {
    if pos.is_finite() {
        Ok(())
    } else {
        Err(TerrainError::NonFinitePosition {
            x: pos.x,
            y: pos.y,
            z: pos.z,
        })
    }
}

/// Effective earth radius for a refraction factor.
pub(crate) fn effective_radius(earth_factor: f64) -> Result<f64, TerrainError> {
    if earth_factor.is_finite() && earth_factor > 0.0 {
        Ok(EARTH_RADIUS_M * earth_factor)
    } else {
        Err(TerrainError::InvalidEarthFactor {
            factor: earth_factor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_raw_cells_are_unknown() {
        assert_eq!(TerrainCell::from_raw(-1), TerrainCell::Unknown);
        assert_eq!(TerrainCell::from_raw(i64::MIN), TerrainCell::Unknown);
        assert_eq!(TerrainCell::from_raw(0), TerrainCell::Known(0));
        assert!(TerrainCell::from_raw(42).is_known());
    }

    #[test]
    fn effective_radius_rejects_bad_factors() {
        assert!(effective_radius(0.0).is_err());
        assert!(effective_radius(-1.0).is_err());
        assert!(effective_radius(f64::NAN).is_err());
        assert_eq!(effective_radius(1.0), Ok(EARTH_RADIUS_M));
    }
}
