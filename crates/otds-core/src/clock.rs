//! Wall-clock source for metadata timestamps (`ctime`, `mtime`, `ts`).

use std::sync::atomic::{AtomicI64, Ordering};

/// Source of "now" in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Reads the system clock through chrono.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Settable clock for deterministic tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    value: AtomicI64,
}

impl ManualClock {
    pub fn new(start: i64) -> Self {
        Self {
            value: AtomicI64::new(start),
        }
    }

    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::SeqCst);
    }

    /// Move the clock forward and return the new reading.
    pub fn advance(&self, by: i64) -> i64 {
        self.value.fetch_add(by, Ordering::SeqCst) + by
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.value.load(Ordering::SeqCst)
    }
}
