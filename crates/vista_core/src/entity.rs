//! External entity identity as seen by the LOS cache
//!
//! The simulation owns its entities; the cache only ever reads an opaque
//! id and a current position through [`Tracked`].

use glam::DVec3;
use std::fmt;

/// Opaque external entity handle (owned by the simulation's registry).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Read-only view of a simulated entity.
pub trait Tracked {
    fn external_id(&self) -> EntityId;

    /// Current position in world metres (x east, y north, z up).
    fn position(&self) -> DVec3;
}

impl<T: Tracked + ?Sized> Tracked for &T {
    fn external_id(&self) -> EntityId {
        (**self).external_id()
    }

    fn position(&self) -> DVec3 {
        (**self).position()
    }
}
