//! Demo population of moving sensors

use rayon::prelude::*;
use vista_core::math::{DVec2, DVec3};
use vista_core::{EntityId, Tracked};

/// Deterministic LCG so runs with the same seed are reproducible.
pub struct ScenarioRng {
    state: u64,
}

impl ScenarioRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u32(&mut self) -> u32 {
        const A: u64 = 6364136223846793005;
        const C: u64 = 1442695040888963407;
        self.state = self.state.wrapping_mul(A).wrapping_add(C);
        (self.state >> 33) as u32
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.next_u32() as f64 / (u32::MAX as f64 + 1.0)
    }
}

#[derive(Debug, Clone)]
pub struct Sensor {
    id: EntityId,
    position: DVec3,
    velocity: DVec2,
}

impl Tracked for Sensor {
    fn external_id(&self) -> EntityId {
        self.id
    }

    fn position(&self) -> DVec3 {
        self.position
    }
}

/// Sensors wandering inside a square of half-size `extent` around the origin.
pub struct Scenario {
    sensors: Vec<Sensor>,
    extent: f64,
}

impl Scenario {
    pub fn spawn(count: usize, extent: f64, speed: f64, height: f64, seed: u64) -> Self {
        let mut rng = ScenarioRng::new(seed);
        let sensors = (0..count)
            .map(|i| {
                let x = (rng.next_f64() * 2.0 - 1.0) * extent;
                let y = (rng.next_f64() * 2.0 - 1.0) * extent;
                let heading = rng.next_f64() * std::f64::consts::TAU;
                Sensor {
                    id: EntityId::from_raw(1_000 + i as u64),
                    position: DVec3::new(x, y, height),
                    velocity: DVec2::from_angle(heading) * speed,
                }
            })
            .collect();
        Self { sensors, extent }
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    /// Advance every sensor one tick, reflecting off the square's edges.
    pub fn step(&mut self) {
        let extent = self.extent;
        self.sensors.par_iter_mut().for_each(|sensor| {
            let mut next = sensor.position.truncate() + sensor.velocity;
            if next.x.abs() > extent {
                sensor.velocity.x = -sensor.velocity.x;
                next.x = next.x.clamp(-extent, extent);
            }
            if next.y.abs() > extent {
                sensor.velocity.y = -sensor.velocity.y;
                next.y = next.y.clamp(-extent, extent);
            }
            sensor.position = next.extend(sensor.position.z);
        });
    }
}
