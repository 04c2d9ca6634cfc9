//! Math utilities
//!
//! Re-exports glam (double precision is used throughout for geo-scale
//! coordinates) plus orientation helpers.

mod orientation;

pub use glam::*;
pub use orientation::{Orientation, OrientationError, UNIT_NORM_TOLERANCE};
