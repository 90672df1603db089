use std::fmt;
use std::time::{Duration, Instant};

use tracing_subscriber::fmt::{format::Writer, time::FormatTime};

/// Monotonic clock measuring seconds from a resettable epoch.
///
/// A session keeps two of these: one started with the session and used for log
/// timestamps, and one reset at every stimulus onset for reaction times.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    epoch: Instant,
}

impl SessionClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// Seconds elapsed since the epoch.
    pub fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Moves the epoch to the current instant.
    pub fn reset(&mut self) {
        self.epoch = Instant::now();
    }

    pub fn epoch(&self) -> Instant {
        self.epoch
    }

    /// Seconds from the epoch to `at`, or `None` if `at` happened before it.
    pub fn since(&self, at: Instant) -> Option<f64> {
        at.checked_duration_since(self.epoch)
            .map(|d| d.as_secs_f64())
    }

    /// Instant at which `elapsed` has passed on this clock.
    pub fn deadline(&self, elapsed: Duration) -> Instant {
        self.epoch + elapsed
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatTime for SessionClock {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{:>10.4}", self.now())
    }
}

/// Unconditional blocking wait used for fixation and the inter-trial interval.
pub fn wait(duration: Duration) {
    if !duration.is_zero() {
        std::thread::sleep(duration);
    }
}
