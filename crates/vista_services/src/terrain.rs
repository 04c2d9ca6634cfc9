//! Terrain construction from settings

use crate::settings::TerrainSettings;
use vista_core::math::DVec2;
use vista_core::terrain::{BaldEarth, HeightGrid, TerrainError, TerrainModel};

/// Build the terrain model selected by `settings`.
///
/// The grid variant is centred on the origin, with a ridge running north to
/// south through the middle and low rolling hills elsewhere.
pub fn build_terrain(settings: &TerrainSettings) -> Result<Box<dyn TerrainModel>, TerrainError> {
    match *settings {
        TerrainSettings::Bald => Ok(Box::new(BaldEarth::new())),
        TerrainSettings::Grid {
            cell_size,
            width,
            height,
            ridge_height,
        } => {
            let origin = DVec2::new(
                -(width as f64) * cell_size / 2.0,
                -(height as f64) * cell_size / 2.0,
            );
            let ridge_half_width = cell_size * 2.0;
            let grid = HeightGrid::from_fn(origin, cell_size, width, height, |x, y| {
                let hills = ((x / 3_000.0).sin() * (y / 2_000.0).cos() * 15.0) as f32;
                if x.abs() <= ridge_half_width {
                    ridge_height + hills
                } else {
                    hills.max(0.0)
                }
            })?;
            tracing::debug!(width, height, cell_size, ridge_height, "height grid built");
            Ok(Box::new(grid))
        }
    }
}
