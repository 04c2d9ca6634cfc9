//! Single-lock wrapper for simulations that query from several threads.

use super::{LosCache, LosError};
use crate::entity::Tracked;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

/// Cloneable handle serializing all cache access behind one mutex.
///
/// The lock spans the whole "check cell, invalidate, read or compute"
/// sequence of a query.
#[derive(Clone)]
pub struct SharedLosCache {
    inner: Arc<Mutex<LosCache>>,
}

impl SharedLosCache {
    pub fn new(cache: LosCache) -> Self {
        Self {
            inner: Arc::new(Mutex::new(cache)),
        }
    }

    pub fn reset<I>(&self, entities: I)
    where
        I: IntoIterator,
        I::Item: Tracked,
    {
        self.lock().reset(entities);
    }

    pub fn has_los<A, B>(&self, a: &A, b: &B) -> Result<bool, LosError>
    where
        A: Tracked + ?Sized,
        B: Tracked + ?Sized,
    {
        self.lock().has_los(a, b)
    }

    /// Run `f` with exclusive access to the cache.
    pub fn with<R>(&self, f: impl FnOnce(&mut LosCache) -> R) -> R {
        f(&mut self.lock())
    }

    /// A panic mid-query may have left a slot half-updated, so a poisoned
    /// cache drops everything it has cached before being used again.
    fn lock(&self) -> MutexGuard<'_, LosCache> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("los cache lock poisoned; discarding cached results");
                let mut guard = poisoned.into_inner();
                guard.discard_cached();
                self.inner.clear_poison();
                guard
            }
        }
    }
}
