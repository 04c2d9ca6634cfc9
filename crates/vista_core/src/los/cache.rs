//! Query orchestration: cell tracking, invalidation, and the bald-earth bypass.

use super::{IdentityRegistrar, LosError, Visibility, VisibilityMatrix};
use crate::entity::{EntityId, Tracked};
use crate::terrain::{TerrainCell, TerrainModel};
use glam::DVec3;
use std::collections::HashMap;
use tracing::{debug, trace, warn};
use vista_metrics::Counter;

/// Pairwise line-of-sight cache for one simulation run.
///
/// Call [`reset`](Self::reset) once per run with every entity that will be
/// queried, then [`has_los`](Self::has_los) as often as needed. A cached
/// pair is reused until either entity is observed in a different terrain
/// cell than the one recorded for it.
pub struct LosCache {
    terrain: Box<dyn TerrainModel>,
    earth_factor: f64,
    registrar: IdentityRegistrar,
    matrix: VisibilityMatrix,
    cells: HashMap<usize, TerrainCell>,
    counter: Counter,
}

impl LosCache {
    pub fn new(terrain: Box<dyn TerrainModel>, earth_factor: f64) -> Self {
        Self {
            terrain,
            earth_factor,
            registrar: IdentityRegistrar::new(),
            matrix: VisibilityMatrix::default(),
            cells: HashMap::new(),
            counter: Counter::new(),
        }
    }

    /// Start a new run: index every entity in iteration order and drop all
    /// cached results and cell records.
    pub fn reset<I>(&mut self, entities: I)
    where
        I: IntoIterator,
        I::Item: Tracked,
    {
        self.registrar.clear();
        for entity in entities {
            self.registrar.index_of(entity.external_id());
        }
        self.registrar.seal();

        self.matrix = VisibilityMatrix::with_entities(self.registrar.len());
        self.cells.clear();
        self.counter.reset_all();

        debug!(
            entities = self.registrar.len(),
            slots = self.matrix.slot_count(),
            terrain = self.terrain.name(),
            "los cache reset"
        );
    }

    /// Whether entity `a` can see entity `b`.
    pub fn has_los<A, B>(&mut self, a: &A, b: &B) -> Result<bool, LosError>
    where
        A: Tracked + ?Sized,
        B: Tracked + ?Sized,
    {
        let (id_a, id_b) = (a.external_id(), b.external_id());
        if id_a == id_b {
            return Err(LosError::SelfPair { id: id_a });
        }

        if self.terrain.is_bald() {
            self.counter.increment("los.bypass", 1);
            return Ok(self
                .terrain
                .line_of_sight(a.position(), b.position(), self.earth_factor)?);
        }

        let i = self.resolve(id_a)?;
        let j = self.resolve(id_b)?;
        self.query(i, a.position(), j, b.position())
    }

    /// Cached lookup by internal index, recomputing through the terrain
    /// model when the slot is stale.
    pub fn query(
        &mut self,
        i: usize,
        pos_i: DVec3,
        j: usize,
        pos_j: DVec3,
    ) -> Result<bool, LosError> {
        // Validates both indices before any cell record is touched.
        self.matrix.get(i, j)?;

        self.refresh_cell(i, pos_i)?;
        self.refresh_cell(j, pos_j)?;

        if let Some(visible) = self.matrix.get(i, j)?.resolved() {
            self.counter.increment("los.hit", 1);
            return Ok(visible);
        }

        self.counter.increment("los.miss", 1);
        let (from, to) = if i < j { (pos_i, pos_j) } else { (pos_j, pos_i) };
        let visible = self
            .terrain
            .line_of_sight(from, to, self.earth_factor)
            .map_err(|err| {
                warn!(i, j, terrain = self.terrain.name(), %err, "terrain los query failed");
                err
            })?;
        self.matrix.set(i, j, Visibility::from_los(visible))?;
        Ok(visible)
    }

    /// Discard every cached result involving `index`.
    pub fn invalidate(&mut self, index: usize) -> Result<(), LosError> {
        self.matrix.invalidate(index)?;
        self.counter.increment("los.invalidate", 1);
        trace!(index, "los pairs invalidated");
        Ok(())
    }

    /// Swap the terrain model; everything cached against the old one is dropped.
    pub fn install_terrain(&mut self, terrain: Box<dyn TerrainModel>) {
        debug!(from = self.terrain.name(), to = terrain.name(), "terrain model installed");
        self.terrain = terrain;
        self.discard_cached();
    }

    /// Mark every pair stale and forget every recorded cell, keeping indices.
    pub fn discard_cached(&mut self) {
        self.matrix.invalidate_all();
        self.cells.clear();
    }

    /// Cached state for a pair without recomputing it.
    pub fn visibility(&self, a: EntityId, b: EntityId) -> Result<Visibility, LosError> {
        if a == b {
            return Err(LosError::SelfPair { id: a });
        }
        let i = self.resolve(a)?;
        let j = self.resolve(b)?;
        self.matrix.get(i, j)
    }

    pub fn index_of(&self, id: EntityId) -> Option<usize> {
        self.registrar.get(id)
    }

    #[inline]
    pub fn entity_count(&self) -> usize {
        self.registrar.len()
    }

    #[inline]
    pub fn is_reset(&self) -> bool {
        self.registrar.is_sealed()
    }

    #[inline]
    pub fn earth_factor(&self) -> f64 {
        self.earth_factor
    }

    pub fn terrain(&self) -> &dyn TerrainModel {
        self.terrain.as_ref()
    }

    pub fn matrix(&self) -> &VisibilityMatrix {
        &self.matrix
    }

    pub fn counters(&self) -> &Counter {
        &self.counter
    }

    fn resolve(&self, id: EntityId) -> Result<usize, LosError> {
        if !self.registrar.is_sealed() {
            return Err(LosError::NotReset);
        }
        self.registrar
            .get(id)
            .ok_or(LosError::UnknownEntity { id })
    }

    /// Invalidate `index` if it is not still in the cell last recorded for it.
    /// Unknown cells never count as unchanged.
    fn refresh_cell(&mut self, index: usize, pos: DVec3) -> Result<(), LosError> {
        let current = TerrainCell::from_raw(self.terrain.cell_at(pos.x, pos.y));
        let unchanged = matches!(
            (self.cells.get(&index), current),
            (Some(TerrainCell::Known(prev)), TerrainCell::Known(now)) if *prev == now
        );
        if !unchanged {
            self.invalidate(index)?;
            self.cells.insert(index, current);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::{BaldEarth, TerrainError, STANDARD_EARTH_FACTOR};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    /// 100 m cells along x; visible when closer than 1 km on the ground.
    /// Cells at x < 0 are reported as unknown.
    #[derive(Clone, Default)]
    struct CountingTerrain {
        calls: Arc<AtomicUsize>,
        failing: Arc<AtomicBool>,
        bald: bool,
    }

    impl CountingTerrain {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TerrainModel for CountingTerrain {
        fn name(&self) -> &str {
            "counting"
        }

        fn cell_at(&self, x: f64, _y: f64) -> i64 {
            if x < 0.0 {
                -1
            } else {
                (x / 100.0).floor() as i64
            }
        }

        fn line_of_sight(
            &self,
            from: DVec3,
            to: DVec3,
            _earth_factor: f64,
        ) -> Result<bool, TerrainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(TerrainError::Backend {
                    model: "counting".into(),
                    reason: "offline".into(),
                });
            }
            Ok(from.truncate().distance(to.truncate()) < 1_000.0)
        }

        fn is_bald(&self) -> bool {
            self.bald
        }
    }

    #[derive(Debug, Clone, Copy)]
    struct Unit {
        id: EntityId,
        pos: DVec3,
    }

    impl Unit {
        fn new(id: u64, x: f64) -> Self {
            Self {
                id: EntityId::from_raw(id),
                pos: DVec3::new(x, 0.0, 2.0),
            }
        }
    }

    impl Tracked for Unit {
        fn external_id(&self) -> EntityId {
            self.id
        }

        fn position(&self) -> DVec3 {
            self.pos
        }
    }

    fn cache_with(terrain: &CountingTerrain, units: &[Unit]) -> LosCache {
        let mut cache = LosCache::new(Box::new(terrain.clone()), STANDARD_EARTH_FACTOR);
        cache.reset(units);
        cache
    }

    #[test]
    fn reset_indexes_entities_in_order() {
        let terrain = CountingTerrain::default();
        let units = [Unit::new(30, 0.0), Unit::new(10, 50.0), Unit::new(20, 900.0)];
        let cache = cache_with(&terrain, &units);

        assert_eq!(cache.entity_count(), 3);
        assert_eq!(cache.index_of(EntityId::from_raw(30)), Some(0));
        assert_eq!(cache.index_of(EntityId::from_raw(10)), Some(1));
        assert_eq!(cache.index_of(EntityId::from_raw(20)), Some(2));
        assert_eq!(cache.matrix().slot_count(), 3);
    }

    #[test]
    fn symmetric_and_cached() {
        let terrain = CountingTerrain::default();
        let units = [Unit::new(1, 0.0), Unit::new(2, 500.0), Unit::new(3, 5_000.0)];
        let mut cache = cache_with(&terrain, &units);

        let ab = cache.has_los(&units[0], &units[1]).unwrap();
        let ba = cache.has_los(&units[1], &units[0]).unwrap();
        assert!(ab);
        assert_eq!(ab, ba);

        let ac = cache.has_los(&units[0], &units[2]).unwrap();
        let ca = cache.has_los(&units[2], &units[0]).unwrap();
        assert!(!ac);
        assert_eq!(ac, ca);

        assert_eq!(terrain.calls(), 2);
    }

    #[test]
    fn repeated_queries_without_cell_change_hit_the_cache() {
        let terrain = CountingTerrain::default();
        let mut units = [Unit::new(1, 0.0), Unit::new(2, 500.0)];
        let mut cache = cache_with(&terrain, &units);

        let first = cache.has_los(&units[0], &units[1]).unwrap();
        // Moving within the same 100 m cell keeps the cached answer.
        units[0].pos.x = 99.0;
        for _ in 0..10 {
            assert_eq!(cache.has_los(&units[0], &units[1]).unwrap(), first);
        }
        assert_eq!(terrain.calls(), 1);

        #[cfg(feature = "metrics")]
        {
            assert_eq!(cache.counters().get("los.miss"), 1);
            assert_eq!(cache.counters().get("los.hit"), 10);
        }
    }

    #[test]
    fn moving_one_entity_invalidates_only_its_pairs() {
        let terrain = CountingTerrain::default();
        let mut units = [Unit::new(100, 0.0), Unit::new(200, 300.0), Unit::new(300, 600.0)];
        let mut cache = cache_with(&terrain, &units);
        let [a, b, c] = [0, 1, 2];

        assert_eq!(cache.index_of(units[a].id), Some(0));
        assert_eq!(cache.index_of(units[b].id), Some(1));
        assert_eq!(cache.index_of(units[c].id), Some(2));

        cache.has_los(&units[a], &units[c]).unwrap();
        assert_eq!(terrain.calls(), 1);
        cache.has_los(&units[c], &units[a]).unwrap();
        assert_eq!(terrain.calls(), 1);

        cache.has_los(&units[a], &units[b]).unwrap();
        cache.has_los(&units[b], &units[c]).unwrap();
        assert_eq!(terrain.calls(), 3);

        units[a].pos.x = 250.0;
        cache.has_los(&units[a], &units[b]).unwrap();
        assert_eq!(terrain.calls(), 4);

        assert!(cache.visibility(units[a].id, units[c].id).unwrap().is_stale());
        assert!(!cache.visibility(units[b].id, units[c].id).unwrap().is_stale());

        cache.has_los(&units[b], &units[c]).unwrap();
        assert_eq!(terrain.calls(), 4);
        cache.has_los(&units[c], &units[a]).unwrap();
        assert_eq!(terrain.calls(), 5);
    }

    #[test]
    fn invalidate_forces_recompute_for_every_pair_of_that_index() {
        let terrain = CountingTerrain::default();
        let units: Vec<Unit> = (0..6).map(|i| Unit::new(i, i as f64 * 150.0)).collect();
        let mut cache = cache_with(&terrain, &units);

        for i in 0..units.len() {
            for j in (i + 1)..units.len() {
                cache.has_los(&units[i], &units[j]).unwrap();
            }
        }
        let baseline = terrain.calls();
        assert_eq!(baseline, 15);

        let k = cache.index_of(units[2].id).unwrap();
        cache.invalidate(k).unwrap();

        for i in 0..units.len() {
            for j in (i + 1)..units.len() {
                let before = terrain.calls();
                cache.has_los(&units[j], &units[i]).unwrap();
                let recomputed = terrain.calls() - before;
                let involves_k = i == 2 || j == 2;
                assert_eq!(recomputed, usize::from(involves_k), "pair ({i}, {j})");
            }
        }
        assert_eq!(terrain.calls(), baseline + units.len() - 1);
    }

    #[test]
    fn unknown_cells_always_invalidate() {
        let terrain = CountingTerrain::default();
        let units = [Unit::new(1, -50.0), Unit::new(2, 100.0)];
        let mut cache = cache_with(&terrain, &units);

        cache.has_los(&units[0], &units[1]).unwrap();
        cache.has_los(&units[0], &units[1]).unwrap();
        assert_eq!(terrain.calls(), 2);
    }

    #[test]
    fn moving_off_grid_mid_run_invalidates_cached_pairs() {
        let terrain = CountingTerrain::default();
        let mut units = [Unit::new(1, 50.0), Unit::new(2, 300.0), Unit::new(3, 600.0)];
        let mut cache = cache_with(&terrain, &units);
        for (i, j) in [(0, 1), (0, 2), (1, 2)] {
            cache.has_los(&units[i], &units[j]).unwrap();
        }
        assert_eq!(terrain.calls(), 3);

        units[0].pos.x = -20.0;
        cache.has_los(&units[0], &units[1]).unwrap();
        assert_eq!(terrain.calls(), 4);
        assert!(cache.visibility(units[0].id, units[2].id).unwrap().is_stale());
        cache.has_los(&units[1], &units[2]).unwrap();
        assert_eq!(terrain.calls(), 4);

        // Still off-grid: never treated as unchanged.
        cache.has_los(&units[0], &units[1]).unwrap();
        assert_eq!(terrain.calls(), 5);

        // Back on a known cell counts as a change from unknown.
        units[0].pos.x = 50.0;
        cache.has_los(&units[1], &units[0]).unwrap();
        assert_eq!(terrain.calls(), 6);
        cache.has_los(&units[0], &units[1]).unwrap();
        assert_eq!(terrain.calls(), 6);
    }

    #[test]
    fn reset_twice_is_idempotent_and_clears_results() {
        let terrain = CountingTerrain::default();
        let units = [Unit::new(5, 0.0), Unit::new(6, 10.0), Unit::new(7, 20.0)];
        let mut cache = cache_with(&terrain, &units);
        cache.has_los(&units[0], &units[1]).unwrap();
        cache.has_los(&units[1], &units[2]).unwrap();

        let before: Vec<_> = units.iter().map(|u| cache.index_of(u.id)).collect();
        cache.reset(&units);
        cache.reset(&units);
        let after: Vec<_> = units.iter().map(|u| cache.index_of(u.id)).collect();

        assert_eq!(before, after);
        assert_eq!(cache.matrix().stale_count(), cache.matrix().slot_count());
    }

    #[test]
    fn self_pair_is_rejected() {
        let terrain = CountingTerrain::default();
        let units = [Unit::new(1, 0.0), Unit::new(2, 10.0)];
        let mut cache = cache_with(&terrain, &units);
        assert_eq!(
            cache.has_los(&units[0], &units[0]),
            Err(LosError::SelfPair { id: units[0].id })
        );
        assert_eq!(terrain.calls(), 0);
    }

    #[test]
    fn entities_after_reset_are_rejected_without_growing() {
        let terrain = CountingTerrain::default();
        let units = [Unit::new(1, 0.0), Unit::new(2, 10.0)];
        let mut cache = cache_with(&terrain, &units);
        let late = Unit::new(99, 20.0);

        assert_eq!(
            cache.has_los(&units[0], &late),
            Err(LosError::UnknownEntity { id: late.id })
        );
        assert_eq!(cache.entity_count(), 2);
        assert_eq!(cache.matrix().entity_count(), 2);
    }

    #[test]
    fn query_before_reset_fails() {
        let terrain = CountingTerrain::default();
        let mut cache = LosCache::new(Box::new(terrain.clone()), 1.0);
        let (a, b) = (Unit::new(1, 0.0), Unit::new(2, 1.0));
        assert_eq!(cache.has_los(&a, &b), Err(LosError::NotReset));
        assert!(!cache.is_reset());
    }

    #[test]
    fn terrain_failure_is_propagated_and_not_cached() {
        let terrain = CountingTerrain::default();
        let units = [Unit::new(1, 0.0), Unit::new(2, 10.0)];
        let mut cache = cache_with(&terrain, &units);

        terrain.failing.store(true, Ordering::SeqCst);
        let err = cache.has_los(&units[0], &units[1]).unwrap_err();
        assert!(matches!(err, LosError::Terrain(TerrainError::Backend { .. })));
        assert!(cache.visibility(units[0].id, units[1].id).unwrap().is_stale());

        terrain.failing.store(false, Ordering::SeqCst);
        assert!(cache.has_los(&units[0], &units[1]).unwrap());
        assert_eq!(terrain.calls(), 2);
    }

    #[test]
    fn bald_terrain_bypasses_the_store() {
        let terrain = CountingTerrain {
            bald: true,
            ..CountingTerrain::default()
        };
        let units = [Unit::new(1, 0.0), Unit::new(2, 10.0), Unit::new(3, 5_000.0)];
        let mut cache = cache_with(&terrain, &units);

        for _ in 0..3 {
            assert!(cache.has_los(&units[0], &units[1]).unwrap());
            assert!(!cache.has_los(&units[2], &units[0]).unwrap());
        }
        assert_eq!(terrain.calls(), 6);
        assert_eq!(cache.matrix().stale_count(), cache.matrix().slot_count());
    }

    #[test]
    fn bald_earth_fast_path_matches_direct_queries() {
        let units: Vec<Unit> = (0..8)
            .map(|i| Unit {
                id: EntityId::from_raw(i),
                pos: DVec3::new(i as f64 * 15_000.0, 0.0, 50.0 + i as f64 * 20.0),
            })
            .collect();
        let mut cache = LosCache::new(Box::new(BaldEarth::new()), STANDARD_EARTH_FACTOR);
        cache.reset(&units);
        let reference = BaldEarth::new();

        for (step, a) in units.iter().enumerate() {
            for b in units.iter().filter(|b| b.id != a.id).cycle().skip(step).take(7) {
                let direct = reference
                    .line_of_sight(a.pos, b.pos, STANDARD_EARTH_FACTOR)
                    .unwrap();
                assert_eq!(cache.has_los(a, b).unwrap(), direct);
            }
        }
    }

    #[test]
    fn installing_terrain_discards_cached_pairs() {
        let terrain = CountingTerrain::default();
        let units = [Unit::new(1, 0.0), Unit::new(2, 10.0)];
        let mut cache = cache_with(&terrain, &units);
        cache.has_los(&units[0], &units[1]).unwrap();

        let replacement = CountingTerrain::default();
        cache.install_terrain(Box::new(replacement.clone()));
        assert_eq!(cache.terrain().name(), "counting");
        assert!(cache.visibility(units[0].id, units[1].id).unwrap().is_stale());

        cache.has_los(&units[0], &units[1]).unwrap();
        assert_eq!(replacement.calls(), 1);
        assert_eq!(cache.index_of(units[1].id), Some(1));
    }

    #[test]
    fn query_rejects_out_of_range_indices() {
        let terrain = CountingTerrain::default();
        let units = [Unit::new(1, 0.0), Unit::new(2, 10.0)];
        let mut cache = cache_with(&terrain, &units);
        assert_eq!(
            cache.query(0, DVec3::ZERO, 2, DVec3::ZERO),
            Err(LosError::IndexOutOfRange { index: 2, count: 2 })
        );
        assert!(cache.invalidate(7).is_err());
    }
}
