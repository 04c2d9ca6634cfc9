//! Incremental line-of-sight cache.
//!
//! [`LosCache`] answers "can A see B?" for simulated entities, delegating
//! to the installed [`TerrainModel`](crate::terrain::TerrainModel) only when
//! a cached answer may be out of date. It is built from three parts:
//!
//! - [`IdentityRegistrar`]: external id → dense index, fixed after reset.
//! - [`VisibilityMatrix`]: one tri-state slot per unordered index pair.
//! - a per-index record of the last observed terrain cell, used to decide
//!   when an entity has moved far enough to discard its cached pairs.

mod cache;
mod error;
mod matrix;
mod registrar;
mod shared;

pub use cache::LosCache;
pub use error::LosError;
pub use matrix::VisibilityMatrix;
pub use registrar::IdentityRegistrar;
pub use shared::SharedLosCache;

/// Cached outcome for one entity pair.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    /// Needs recomputation.
    #[default]
    Stale,
    Visible,
    Hidden,
}

impl Visibility {
    #[inline]
    pub fn from_los(visible: bool) -> Self {
        if visible {
            Visibility::Visible
        } else {
            Visibility::Hidden
        }
    }

    /// The resolved boolean, or `None` while stale.
    #[inline]
    pub fn resolved(self) -> Option<bool> {
        match self {
            Visibility::Stale => None,
            Visibility::Visible => Some(true),
            Visibility::Hidden => Some(false),
        }
    }

    #[inline]
    pub fn is_stale(self) -> bool {
        self == Visibility::Stale
    }
}
