//! Wall clock to tick conversion.

use crate::core::fixed::{Fixed, FIXED_ONE};

const NANOS_PER_SECOND: u128 = 1_000_000_000;

/// Whole ticks due plus how far into the next one the clock is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickAdvance {
    /// Ticks to run now
    pub ticks: u32,
    /// Progress into the next tick, in `[0, FIXED_ONE)`
    pub fraction: Fixed,
}

/// Accumulates elapsed time at a fixed tick rate.
///
/// Time is kept in nanoseconds scaled by the rate, so no rounding error
/// builds up at rates that do not divide a second evenly.
#[derive(Clone, Debug)]
pub struct Ticker {
    rate: u32,
    scaled_nanos: u128,
}

impl Ticker {
    /// Ticker running at `rate` ticks per second.
    pub fn new(rate: u32) -> Self {
        Self { rate: rate.max(1), scaled_nanos: 0 }
    }

    /// Ticks per second.
    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// Add `elapsed_nanos` of wall time and take the whole ticks it makes up.
    pub fn advance(&mut self, elapsed_nanos: u64) -> TickAdvance {
        self.scaled_nanos += elapsed_nanos as u128 * self.rate as u128;
        let ticks = self.scaled_nanos / NANOS_PER_SECOND;
        self.scaled_nanos %= NANOS_PER_SECOND;

        TickAdvance {
            ticks: ticks.min(u32::MAX as u128) as u32,
            fraction: self.fraction(),
        }
    }

    /// Progress into the next tick.
    pub fn fraction(&self) -> Fixed {
        (self.scaled_nanos * FIXED_ONE as u128 / NANOS_PER_SECOND) as Fixed
    }

    /// Forget partial progress.
    pub fn reset(&mut self) {
        self.scaled_nanos = 0;
    }
}
