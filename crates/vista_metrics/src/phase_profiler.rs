//! Accumulated wall-clock time per simulation phase

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct PhaseProfiler {
    totals: BTreeMap<&'static str, Duration>,
}

impl PhaseProfiler {
    pub fn new() -> Self {
        Self {
            totals: BTreeMap::new(),
        }
    }

    pub fn time_phase<F, R>(&mut self, name: &'static str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        *self.totals.entry(name).or_insert(Duration::ZERO) += start.elapsed();
        result
    }

    pub fn total(&self, name: &str) -> Duration {
        self.totals.get(name).copied().unwrap_or(Duration::ZERO)
    }

    pub fn snapshot(&self) -> Vec<(&'static str, Duration)> {
        self.totals.iter().map(|(k, v)| (*k, *v)).collect()
    }
}
