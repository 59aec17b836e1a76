//! Time sources for token issuance.
//!
//! Issuance reads the current time twice: once for the document's `TLS.time`
//! and once for the absolute expiry inside a UserBuf. Both reads go through a
//! [`Clock`] so tests can pin them.

use chrono::Utc;

/// Source of the current UNIX time in seconds.
pub trait Clock: Send + Sync {
    /// Returns the current time as seconds since the UNIX epoch.
    fn now(&self) -> i64;
}

/// Wall clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Clock that always reports the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.0
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> i64 {
        (**self).now()
    }
}
