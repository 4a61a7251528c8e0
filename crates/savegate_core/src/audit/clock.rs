//! UTC time source for audit timestamps.

use crate::model::entity::EpochMillis;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of "now" for audit stamping.
pub trait Clock {
    /// Current UTC time in Unix epoch milliseconds.
    fn now_ms(&self) -> EpochMillis;
}

/// Wall clock backed by `SystemTime`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> EpochMillis {
        // A clock set before 1970 stamps the epoch rather than failing a save.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| {
                EpochMillis::try_from(elapsed.as_millis()).unwrap_or(EpochMillis::MAX)
            })
    }
}

/// Clock pinned to one instant. Used for deterministic stamping in tests and
/// replay tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub EpochMillis);

impl Clock for FixedClock {
    fn now_ms(&self) -> EpochMillis {
        self.0
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> EpochMillis {
        (**self).now_ms()
    }
}
