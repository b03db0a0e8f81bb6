//! Rotation accumulator - coalesces dial ticks over a debounce window
//!
//! A fast spin produces dozens of tick events. They are summed here and
//! released as one delta when the actor's flush timer fires, which bounds the
//! backend write rate to about one per window regardless of input rate.

use super::sessions::DEFAULT_STEP;

/// Running sum of ticks since the last flush
#[derive(Debug, Clone)]
pub struct RotationAccumulator {
    ticks: i64,
    step: u8,
}

impl Default for RotationAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl RotationAccumulator {
    pub fn new() -> Self {
        Self {
            ticks: 0,
            step: DEFAULT_STEP,
        }
    }

    /// Add ticks; the step size in effect at flush time is the last one given
    pub fn accumulate(&mut self, ticks: i64, step: u8) {
        self.ticks = self.ticks.saturating_add(ticks);
        self.step = step;
    }

    /// Net ticks not yet flushed
    pub fn pending_ticks(&self) -> i64 {
        self.ticks
    }

    /// Take the net delta and reset; None if the burst cancelled out
    pub fn take_delta(&mut self) -> Option<i64> {
        let ticks = std::mem::take(&mut self.ticks);
        if ticks == 0 {
            return None;
        }
        Some(ticks.saturating_mul(self.step as i64))
    }
}
