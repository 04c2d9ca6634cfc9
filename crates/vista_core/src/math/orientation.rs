//! Unit-quaternion orientation with validated construction.

use glam::{DQuat, DVec3};
use thiserror::Error;

/// Allowed deviation of a quaternion's norm from 1.0.
pub const UNIT_NORM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrientationError {
    #[error("quaternion norm {norm} is not a unit norm")]
    NotUnit { norm: f64 },

    #[error("expected a 3-dimensional vector, got {len} components")]
    Dimension { len: usize },
}

/// Rotation represented by a unit quaternion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation(DQuat);

impl Orientation {
    pub const IDENTITY: Self = Self(DQuat::IDENTITY);

    /// Build from scalar-first components, rejecting non-unit quaternions.
    pub fn from_components(w: f64, x: f64, y: f64, z: f64) -> Result<Self, OrientationError> {
        let quat = DQuat::from_xyzw(x, y, z, w);
        let norm = quat.length();
        if !norm.is_finite() || (norm - 1.0).abs() > UNIT_NORM_TOLERANCE {
            return Err(OrientationError::NotUnit { norm });
        }
        Ok(Self(quat))
    }

    pub fn from_axis_angle(axis: DVec3, radians: f64) -> Result<Self, OrientationError> {
        let axis = axis.try_normalize().ok_or(OrientationError::NotUnit {
            norm: axis.length(),
        })?;
        Ok(Self(DQuat::from_axis_angle(axis, radians)))
    }

    #[inline]
    pub fn quat(self) -> DQuat {
        self.0
    }

    /// Rotate a vector given as a slice; anything but 3 components is rejected.
    pub fn rotate(&self, v: &[f64]) -> Result<DVec3, OrientationError> {
        match v {
            &[x, y, z] => Ok(self.rotate_vec(DVec3::new(x, y, z))),
            _ => Err(OrientationError::Dimension { len: v.len() }),
        }
    }

    #[inline]
    pub fn rotate_vec(&self, v: DVec3) -> DVec3 {
        self.0 * v
    }

    /// Apply `other` after `self`.
    pub fn then(self, other: Orientation) -> Orientation {
        Self((other.0 * self.0).normalize())
    }
}

impl Default for Orientation {
    fn default() -> Self {
        Self::IDENTITY
    }
}
