//! Time source abstraction, so backoff and readiness timing are testable
//! without sleeping in real wall-clock time.

use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// A source of "now", injected into anything that arms a timer or stamps a
/// start/stop time.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;

    /// Seconds since the Unix epoch, for `ProcessInfo.start/stop/now`.
    fn unix_seconds(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock an integration test can advance deterministically instead of
/// racing real timers.
#[derive(Clone)]
pub struct FakeClock {
    inner: Arc<Mutex<FakeClockState>>,
}

struct FakeClockState {
    now: Instant,
    unix_seconds: u64,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeClockState {
                now: Instant::now(),
                unix_seconds: 0,
            })),
        }
    }

    pub fn advance(&self, duration: std::time::Duration) {
        let mut state = self.inner.lock();
        state.now += duration;
        state.unix_seconds += duration.as_secs();
    }

    pub fn set_unix_seconds(&self, seconds: u64) {
        self.inner.lock().unix_seconds = seconds;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.inner.lock().now
    }

    fn unix_seconds(&self) -> u64 {
        self.inner.lock().unix_seconds
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
