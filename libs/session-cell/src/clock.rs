// libs/session-cell/src/clock.rs
use chrono::{DateTime, Utc};

/// Time source for the date window, activity stamps, and idle eviction.
/// A trait so tests can pin or step the clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
