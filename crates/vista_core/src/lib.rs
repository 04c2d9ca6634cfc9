//! Vista Core
//!
//! Incremental line-of-sight caching for large entity simulations:
//! - Dense per-run entity indexing
//! - Triangular pairwise visibility storage
//! - Terrain-cell driven invalidation
//! - Pluggable terrain models and geo-scale math

pub mod entity;
pub mod los;
pub mod math;
pub mod terrain;

pub use entity::{EntityId, Tracked};
pub use los::{LosCache, LosError, SharedLosCache, Visibility};
pub use terrain::{TerrainCell, TerrainError, TerrainModel};

pub use glam;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
