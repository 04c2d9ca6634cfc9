//! Vista Runtime
//!
//! Runs a moving-sensor scenario against the line-of-sight cache and
//! reports how often the terrain model actually had to be consulted.

mod scenario;

use anyhow::{Context, Result};
use scenario::Scenario;
use vista_core::LosCache;
use vista_metrics::PhaseProfiler;
use vista_services::{build_terrain, Settings, TerrainSettings};

/// Half-size of the play area when the terrain has no extent of its own.
const BALD_EXTENT_M: f64 = 20_000.0;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    tracing::info!("Vista v{}", vista_core::VERSION);

    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::load(&path).with_context(|| format!("loading {path}"))?,
        None => Settings::default(),
    };

    let terrain = build_terrain(&settings.terrain).context("building terrain")?;
    let extent = match settings.terrain {
        TerrainSettings::Bald => BALD_EXTENT_M,
        TerrainSettings::Grid {
            cell_size,
            width,
            height,
            ..
        } => width.min(height) as f64 * cell_size / 2.0 * 0.95,
    };

    let scenario_settings = &settings.scenario;
    let mut scenario = Scenario::spawn(
        scenario_settings.entity_count,
        extent,
        scenario_settings.speed,
        scenario_settings.sensor_height,
        scenario_settings.seed,
    );

    let mut cache = LosCache::new(terrain, settings.los.earth_factor);
    cache.reset(scenario.sensors());
    tracing::info!(
        entities = cache.entity_count(),
        terrain = cache.terrain().name(),
        earth_factor = cache.earth_factor(),
        "run started"
    );

    let mut profiler = PhaseProfiler::new();
    for tick in 0..scenario_settings.ticks {
        profiler.time_phase("movement", || scenario.step());

        let visible_pairs = profiler.time_phase("los_sweep", || -> Result<usize> {
            let sensors = scenario.sensors();
            let mut visible = 0;
            for (i, a) in sensors.iter().enumerate() {
                for b in &sensors[i + 1..] {
                    if cache.has_los(a, b)? {
                        visible += 1;
                    }
                }
            }
            Ok(visible)
        })?;

        if tick % 30 == 0 {
            tracing::info!(tick, visible_pairs, "tick");
        }
    }

    vista_metrics::metrics! {
        for (name, value) in cache.counters().snapshot() {
            tracing::info!(counter = name, value, "los counter");
        }
        for (phase, total) in profiler.snapshot() {
            tracing::info!(phase, elapsed_ms = total.as_secs_f64() * 1_000.0, "phase timing");
        }
    }

    tracing::info!("Run finished");
    Ok(())
}
