//! Bald earth: a smooth sphere with no terrain relief.

use super::{effective_radius, ensure_finite, TerrainError, TerrainModel};
use glam::DVec3;

/// Curved-earth-only model. Two points see each other when their
/// horizontal separation is within the sum of their radio horizons.
#[derive(Debug, Default, Clone, Copy)]
pub struct BaldEarth;

impl BaldEarth {
    pub fn new() -> Self {
        Self
    }

    /// Distance to the horizon for an observer at `height` metres.
    #[inline]
    pub fn horizon_distance(height: f64, radius: f64) -> f64 {
        (2.0 * radius * height.max(0.0)).sqrt()
    }
}

impl TerrainModel for BaldEarth {
    fn name(&self) -> &str {
        "bald"
    }

    fn cell_at(&self, _x: f64, _y: f64) -> i64 {
        0
    }

    fn line_of_sight(
        &self,
        from: DVec3,
        to: DVec3,
        earth_factor: f64,
    ) -> Result<bool, TerrainError> {
        ensure_finite(from)?;
        ensure_finite(to)?;
        let radius = effective_radius(earth_factor)?;

        let ground = from.truncate().distance(to.truncate());
        let reach = Self::horizon_distance(from.z, radius) + Self::horizon_distance(to.z, radius);
        Ok(ground <= reach)
    }

    fn is_bald(&self) -> bool {
        true
    }
}
