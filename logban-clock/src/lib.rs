//! Clock abstraction for logban.
//!
//! A scan measures its time window backward from a single "now" taken at
//! scan start. Injecting the clock keeps window filtering deterministic in tests.

use std::time::{SystemTime, UNIX_EPOCH};

/// Trait for getting the current Unix timestamp.
pub trait Clock: Send + Sync {
    /// Returns the current time as Unix seconds since epoch.
    fn now_unix_sec(&self) -> i64;
}

/// Real system clock implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix_sec(&self) -> i64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(elapsed) => elapsed.as_secs() as i64,
            // Clock set before 1970: report negative seconds rather than panic.
            Err(e) => -(e.duration().as_secs() as i64),
        }
    }
}

/// Mock clock for testing with a fixed timestamp.
#[derive(Debug, Clone, Copy)]
pub struct MockClock {
    timestamp: i64,
}

impl MockClock {
    /// Create a mock clock with a fixed timestamp.
    pub fn new(timestamp: i64) -> Self {
        Self { timestamp }
    }
}

impl Clock for MockClock {
    fn now_unix_sec(&self) -> i64 {
        self.timestamp
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_unix_sec(&self) -> i64 {
        (**self).now_unix_sec()
    }
}
