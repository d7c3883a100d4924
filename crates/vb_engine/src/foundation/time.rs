//! Time management utilities
//!
//! The console has no wall clock the engine trusts; time advances when the
//! display raises FRAMESTART. [`FrameClock`] accumulates those ticks.

use std::time::Duration;

/// Display refresh period in milliseconds (50 Hz)
pub const FRAME_MILLISECONDS: u32 = 20;

/// Logical clock advanced once per display refresh
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    elapsed: Duration,
    ticks: u64,
    paused: bool,
}

impl FrameClock {
    /// Create a stopped-at-zero clock
    #[must_use]
    pub const fn new() -> Self {
        Self { elapsed: Duration::ZERO, ticks: 0, paused: false }
    }

    /// Advance by one display refresh of `milliseconds`
    ///
    /// Ticks are counted even while paused; elapsed time is not.
    pub fn tick(&mut self, milliseconds: u32) {
        self.ticks += 1;

        if !self.paused {
            self.elapsed += Duration::from_millis(u64::from(milliseconds));
        }
    }

    /// Stop accumulating elapsed time
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume accumulating elapsed time
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Whether the clock is paused
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Reset to zero
    pub fn reset(&mut self) {
        *self = Self { paused: self.paused, ..Self::new() };
    }

    /// Accumulated time
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Accumulated time in milliseconds
    #[must_use]
    pub fn milliseconds(&self) -> u128 {
        self.elapsed.as_millis()
    }

    /// Accumulated time in seconds, for event timestamps
    #[must_use]
    pub fn seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Number of ticks received
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }
}
