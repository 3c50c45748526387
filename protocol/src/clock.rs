//! # Clocks
//!
//! Vault unlock decisions compare against "now". The engine never reads the
//! wall clock itself; the host reads a [`Clock`] and passes the reading in
//! with each call, so tests can pin time exactly.
//!
//! Timestamps are Unix seconds. A clock must never go backwards.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

/// Unix time in seconds.
pub type Timestamp = u64;

/// A source of non-decreasing timestamps.
pub trait Clock: Send + Sync {
    /// The current time.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time from the system, clamped so it never runs backwards
/// across calls even if the host's clock is stepped.
#[derive(Debug, Default)]
pub struct SystemClock {
    last: AtomicU64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let wall = u64::try_from(Utc::now().timestamp()).unwrap_or(0);
        // fetch_max returns the previous value; the reading is the max of both.
        let prev = self.last.fetch_max(wall, Ordering::AcqRel);
        prev.max(wall)
    }
}

/// A clock that only moves when told to. Used by tests and by hosts that
/// take time from an external sequencer.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Starts the clock at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    /// Moves the clock forward by `secs`.
    pub fn advance(&self, secs: u64) {
        let _ = self
            .now
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |t| {
                Some(t.saturating_add(secs))
            });
    }

    /// Sets the clock to `t`. Earlier values are ignored.
    pub fn set(&self, t: Timestamp) {
        self.now.fetch_max(t, Ordering::AcqRel);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::Acquire)
    }
}
