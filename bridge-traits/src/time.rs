//! Injectable time source.
//!
//! Session tokens carry an expiry computed from the backend's `expiresIn`;
//! hosts and tests can substitute the clock that expiry is checked against.

use chrono::{DateTime, Utc};

use crate::platform::PlatformSendSync;

pub trait Clock: PlatformSendSync {
    fn now(&self) -> DateTime<Utc>;

    /// Seconds since the Unix epoch
    fn unix_timestamp(&self) -> i64 {
        self.now().timestamp()
    }
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
