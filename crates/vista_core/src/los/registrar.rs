//! Dense per-run index assignment for external entity ids.

use crate::entity::EntityId;
use std::collections::HashMap;

/// Assigns each distinct [`EntityId`] the next free index in `[0, N)`.
///
/// Indices are never reclaimed within a run. Once [`seal`](Self::seal)ed,
/// the index set is considered complete and callers should resolve ids with
/// [`get`](Self::get) so an unexpected id is reported instead of growing N.
#[derive(Debug, Default)]
pub struct IdentityRegistrar {
    indices: HashMap<EntityId, usize>,
    sealed: bool,
}

impl IdentityRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index for `id`, allocating the next one on first sight.
    pub fn index_of(&mut self, id: EntityId) -> usize {
        let next = self.indices.len();
        *self.indices.entry(id).or_insert(next)
    }

    /// Index for `id` without allocating.
    #[inline]
    pub fn get(&self, id: EntityId) -> Option<usize> {
        self.indices.get(&id).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn seal(&mut self) {
        self.sealed = true;
    }

    #[inline]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Forget every assignment; the next run starts again at index 0.
    pub fn clear(&mut self) {
        self.indices.clear();
        self.sealed = false;
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, usize)> + '_ {
        self.indices.iter().map(|(id, idx)| (*id, *idx))
    }
}
