//! Time sources for the driver.
//!
//! The engine never reads wall-clock time directly. Production runs use
//! [`SystemClock`]; tests use [`ManualClock`], whose `sleep` just moves a
//! virtual clock forward so whole ceremonies run instantly.

use std::time::{Duration, Instant};

/// Elapsed-time source with a pacing sleep.
pub trait Clock {
    /// Time since the clock was created.
    fn elapsed(&self) -> Duration;

    /// Pauses for `duration` of this clock's time.
    fn sleep(&mut self, duration: Duration);
}

/// Monotonic wall clock.
#[derive(Debug, Clone)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Virtual clock advanced only by `sleep` and `advance`.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Duration,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, by: Duration) {
        self.now += by;
    }
}

impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        self.now
    }

    fn sleep(&mut self, duration: Duration) {
        self.advance(duration);
    }
}
