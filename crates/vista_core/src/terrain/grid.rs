//! Gridded elevation terrain with earth-curvature correction.
//!
//! Cells are square, `cell_size` metres on a side, laid out row-major from
//! `origin` (south-west corner). Cell ids are `row * width + col`; positions
//! outside the grid map to `-1`.

use super::{effective_radius, ensure_finite, TerrainError, TerrainModel};
use glam::{DVec2, DVec3};
use rayon::prelude::*;

pub struct HeightGrid {
    origin: DVec2,
    cell_size: f64,
    width: u32,
    height: u32,
    elevations: Vec<f32>,
}

impl HeightGrid {
    /// Build a grid from row-major elevations (metres).
    pub fn new(
        origin: DVec2,
        cell_size: f64,
        width: u32,
        height: u32,
        elevations: Vec<f32>,
    ) -> Result<Self, TerrainError> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(TerrainError::InvalidGrid {
                reason: format!("cell size {cell_size} must be finite and positive"),
            });
        }
        if width == 0 || height == 0 {
            return Err(TerrainError::InvalidGrid {
                reason: format!("dimensions {width}x{height} must be non-zero"),
            });
        }
        let expected = width as usize * height as usize;
        if elevations.len() != expected {
            return Err(TerrainError::InvalidGrid {
                reason: format!(
                    "expected {expected} elevations for {width}x{height}, got {}",
                    elevations.len()
                ),
            });
        }
        Ok(Self {
            origin,
            cell_size,
            width,
            height,
            elevations,
        })
    }

    /// Build a grid by sampling `f(x, y)` at every cell centre (rows in parallel).
    pub fn from_fn<F>(
        origin: DVec2,
        cell_size: f64,
        width: u32,
        height: u32,
        f: F,
    ) -> Result<Self, TerrainError>
    where
        F: Fn(f64, f64) -> f32 + Sync,
    {
        if width == 0 || height == 0 {
            return Err(TerrainError::InvalidGrid {
                reason: format!("dimensions {width}x{height} must be non-zero"),
            });
        }
        let mut elevations = vec![0.0f32; width as usize * height as usize];
        elevations
            .par_chunks_mut(width as usize)
            .enumerate()
            .for_each(|(row, cells)| {
                let y = origin.y + (row as f64 + 0.5) * cell_size;
                for (col, elev) in cells.iter_mut().enumerate() {
                    let x = origin.x + (col as f64 + 0.5) * cell_size;
                    *elev = f(x, y);
                }
            });
        Self::new(origin, cell_size, width, height, elevations)
    }

    #[inline]
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Column/row of the cell containing `(x, y)`, if on the grid.
    pub fn cell_coords(&self, x: f64, y: f64) -> Option<(u32, u32)> {
        if !(x.is_finite() && y.is_finite()) {
            return None;
        }
        let col = ((x - self.origin.x) / self.cell_size).floor();
        let row = ((y - self.origin.y) / self.cell_size).floor();
        if col < 0.0 || row < 0.0 || col >= self.width as f64 || row >= self.height as f64 {
            return None;
        }
        Some((col as u32, row as u32))
    }

    /// Terrain elevation at `(x, y)`, or `None` off-grid.
    pub fn elevation_at(&self, x: f64, y: f64) -> Option<f32> {
        let (col, row) = self.cell_coords(x, y)?;
        self.elevations
            .get(row as usize * self.width as usize + col as usize)
            .copied()
    }
}

impl TerrainModel for HeightGrid {
    fn name(&self) -> &str {
        "height-grid"
    }

    fn cell_at(&self, x: f64, y: f64) -> i64 {
        match self.cell_coords(x, y) {
            Some((col, row)) => row as i64 * self.width as i64 + col as i64,
            None => -1,
        }
    }

    /// Compares terrain against the ray lowered by the earth bulge
    /// `d1 * d2 / (2R)`. The part of the segment over the grid is sampled once
    /// per cell; off-grid ground is sea level, checked in closed form.
    fn line_of_sight(
        &self,
        from: DVec3,
        to: DVec3,
        earth_factor: f64,
    ) -> Result<bool, TerrainError> {
        ensure_finite(from)?;
        ensure_finite(to)?;
        let radius = effective_radius(earth_factor)?;

        let delta = to - from;
        let ground = delta.truncate().length();
        if ground < self.cell_size {
            return Ok(true);
        }

        // Ray height above the curved ground's datum at parameter `t`.
        let bulge = ground * ground / (2.0 * radius);
        let clearance = |t: f64| from.z + delta.z * t - bulge * t * (1.0 - t);
        // `clearance` is a convex quadratic, so its minimum on [a, b] is at
        // the clamped vertex.
        let lowest = |a: f64, b: f64| {
            if b <= a {
                return f64::INFINITY;
            }
            clearance(((bulge - delta.z) / (2.0 * bulge)).clamp(a, b))
        };

        let Some((t0, t1)) = self.clip_to_grid(from.truncate(), delta.truncate()) else {
            return Ok(lowest(0.0, 1.0) >= 0.0);
        };
        if lowest(0.0, t0) < 0.0 || lowest(t1, 1.0) < 0.0 {
            return Ok(false);
        }

        let steps = (((t1 - t0) * ground / self.cell_size).ceil() as usize).max(1);
        for i in 0..=steps {
            let t = t0 + (t1 - t0) * i as f64 / steps as f64;
            if t <= 0.0 || t >= 1.0 {
                continue;
            }
            let sample = from + delta * t;
            let terrain = self.elevation_at(sample.x, sample.y).unwrap_or(0.0) as f64;
            if terrain > clearance(t) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl HeightGrid {
    /// Parameter range of `start + dir * t`, `t` in [0, 1], lying over the grid.
    fn clip_to_grid(&self, start: DVec2, dir: DVec2) -> Option<(f64, f64)> {
        let max = self.origin + DVec2::new(self.width as f64, self.height as f64) * self.cell_size;
        let (mut t0, mut t1) = (0.0f64, 1.0f64);
        for (p, d, lo, hi) in [
            (start.x, dir.x, self.origin.x, max.x),
            (start.y, dir.y, self.origin.y, max.y),
        ] {
            if d == 0.0 {
                if p < lo || p >= hi {
                    return None;
                }
            } else {
                let (a, b) = ((lo - p) / d, (hi - p) / d);
                t0 = t0.max(a.min(b));
                t1 = t1.min(a.max(b));
            }
        }
        (t0 < t1).then_some((t0, t1))
    }
}
