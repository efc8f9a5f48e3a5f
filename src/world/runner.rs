//! Drives a [`World`] from wall clock time.

use tracing::warn;

use crate::core::fixed::Fixed;
use super::ticker::Ticker;
use super::World;

/// What one [`WorldRunner::run_logic`] call did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunReport {
    /// Ticks actually run
    pub ticks_run: u32,
    /// Ticks that were due
    pub ticks_due: u32,
    /// Render interpolation fraction after running
    pub fraction: Fixed,
}

impl RunReport {
    /// True if the backlog was dropped.
    pub fn overflowed(&self) -> bool {
        self.ticks_run < self.ticks_due
    }
}

/// Runs the ticks a stretch of wall time makes due.
#[derive(Clone, Debug)]
pub struct WorldRunner {
    ticker: Ticker,
    overflow_threshold: u32,
}

impl WorldRunner {
    /// Runner for `world`'s tick overflow threshold at `TICK_RATE`.
    pub fn new(world: &World) -> Self {
        Self {
            ticker: Ticker::new(crate::TICK_RATE),
            overflow_threshold: world.config().tick_overflow_threshold,
        }
    }

    /// Current interpolation fraction.
    pub fn fraction(&self) -> Fixed {
        self.ticker.fraction()
    }

    /// Advance by `elapsed_nanos` and run the ticks that are due.
    ///
    /// A backlog above the overflow threshold (a stalled host) is dropped
    /// and a single tick runs instead.
    pub fn run_logic(&mut self, world: &mut World, elapsed_nanos: u64) -> RunReport {
        let advance = self.ticker.advance(elapsed_nanos);
        let ticks_run = if advance.ticks > self.overflow_threshold {
            warn!(
                pending = advance.ticks,
                threshold = self.overflow_threshold,
                gametick = world.gametick(),
                "Tick overflow, dropping backlog"
            );
            1
        } else {
            advance.ticks
        };

        for _ in 0..ticks_run {
            world.tick();
        }

        RunReport { ticks_run, ticks_due: advance.ticks, fraction: advance.fraction }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::DefinitionRegistry;
    use crate::map::demo;
    use crate::world::WorldConfig;

    const SECOND: u64 = 1_000_000_000;

    fn world() -> World {
        World::load(&demo::square_room(256, 0, 128), DefinitionRegistry::doom_defaults(), WorldConfig::default())
            .unwrap()
    }

    #[test]
    fn test_runs_due_ticks() {
        let mut world = world();
        let mut runner = WorldRunner::new(&world);

        let report = runner.run_logic(&mut world, SECOND);
        assert_eq!(report.ticks_run, 35);
        assert!(!report.overflowed());
        assert_eq!(world.gametick(), 35);

        let report = runner.run_logic(&mut world, SECOND / 100);
        assert_eq!(report.ticks_run, 0);
        assert!(report.fraction > 0);
        assert_eq!(world.gametick(), 35);
    }

    #[test]
    fn test_overflow_runs_one_tick() {
        let mut world = world();
        let mut runner = WorldRunner::new(&world);

        // Eleven seconds behind, threshold is ten
        let report = runner.run_logic(&mut world, 11 * SECOND);
        assert!(report.overflowed());
        assert_eq!(report.ticks_due, 385);
        assert_eq!(report.ticks_run, 1);
        assert_eq!(world.gametick(), 1);
    }

    #[test]
    fn test_threshold_from_config() {
        let config = WorldConfig { tick_overflow_threshold: 5, ..WorldConfig::default() };
        let mut world =
            World::load(&demo::square_room(256, 0, 128), DefinitionRegistry::doom_defaults(), config).unwrap();
        let mut runner = WorldRunner::new(&world);

        let report = runner.run_logic(&mut world, SECOND / 5);
        assert_eq!(report.ticks_due, 7);
        assert_eq!(report.ticks_run, 1);
    }
}
