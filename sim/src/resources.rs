//! Shared simulation resources: tick counter, random source and run statistics.

use bevy_ecs::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Current simulation tick. Advanced once per `SimWorld::step`, after all phases ran.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimTick(pub u64);

impl SimTick {
    pub fn increment(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }
}

/// The single random source of a run. Seeded from `SimConfig::seed`.
#[derive(Resource, Debug, Clone)]
pub struct SimRng(pub StdRng);

impl SimRng {
    pub fn from_seed(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

/// Run statistics.
///
/// Per-tick counters are reset at the start of every tick; `total_arrivals`
/// accumulates over the run.
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimStats {
    /// Goal arrivals since setup.
    pub total_arrivals: u64,
    /// Goal arrivals this tick.
    pub arrivals: u32,
    /// Hidden pedestrians that reappeared this tick.
    pub reappearances: u32,
    /// Paths recomputed this tick.
    pub recalculations: u32,
    /// Recomputed paths that found no route this tick.
    pub unreachable_paths: u32,
    /// Forced stuck escapes this tick.
    pub stuck_escapes: u32,
    /// Moves aborted by the no-tunneling check this tick.
    pub blocked_moves: u32,
    /// Visible pedestrians at the end of the tick.
    pub visible: u32,
    /// Hidden pedestrians at the end of the tick.
    pub hidden: u32,
}

impl SimStats {
    /// Reset the per-tick counters.
    pub fn begin_tick(&mut self) {
        *self = Self {
            total_arrivals: self.total_arrivals,
            visible: self.visible,
            hidden: self.hidden,
            ..Default::default()
        };
    }

    pub fn record_arrival(&mut self) {
        self.arrivals += 1;
        self.total_arrivals += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_tick_increment() {
        let mut tick = SimTick::default();
        tick.increment();
        tick.increment();
        assert_eq!(tick.0, 2);
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let mut a = SimRng::from_seed(42);
        let mut b = SimRng::from_seed(42);
        for _ in 0..10 {
            assert_eq!(a.0.random::<u64>(), b.0.random::<u64>());
        }
    }

    #[test]
    fn test_begin_tick_keeps_totals() {
        let mut stats = SimStats::default();
        stats.record_arrival();
        stats.record_arrival();
        stats.recalculations = 4;
        stats.visible = 3;
        stats.begin_tick();
        assert_eq!(stats.total_arrivals, 2);
        assert_eq!(stats.arrivals, 0);
        assert_eq!(stats.recalculations, 0);
        assert_eq!(stats.visible, 3);
    }
}
