//! Network-adjusted time.

use std::time::{SystemTime, UNIX_EPOCH};

/// Source of network-adjusted time, in seconds since the epoch. The
/// adjustment itself is maintained by the peer layer; consensus code only
/// consumes the reading.
pub trait NetworkClock {
    fn adjusted_time(&self) -> i64;
}

/// Wall clock without peer adjustment.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl NetworkClock for SystemClock {
    fn adjusted_time(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs() as i64)
            .unwrap_or(0)
    }
}

/// Fixed clock for tests and replay tooling.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub i64);

impl NetworkClock for FixedClock {
    fn adjusted_time(&self) -> i64 {
        self.0
    }
}
