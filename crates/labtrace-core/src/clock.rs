//! Injected time source for expiry decisions.
//!
//! Every expiry comparison in this crate goes through a [`Clock`] so that
//! token and grant lifetimes can be tested deterministically. Production
//! callers use [`SystemClock`]; tests pin time with [`FixedClock`].

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Trait for clock implementations.
///
/// Implementations report Unix time at one-second resolution, which is the
/// granularity all persisted timestamps in this crate use.
pub trait Clock: Send + Sync {
    /// Returns the current Unix timestamp in seconds.
    fn now_secs(&self) -> u64;
}

/// System clock that uses the real system time.
///
/// This is the default clock for production use.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs()
    }
}

/// Fixed clock for testing that returns a constant timestamp.
///
/// This allows deterministic testing of expiry and safety-buffer logic.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    /// The fixed timestamp to return.
    pub timestamp: u64,
}

impl FixedClock {
    /// Creates a new fixed clock with the given timestamp.
    #[must_use]
    pub const fn new(timestamp: u64) -> Self {
        Self { timestamp }
    }
}

impl Clock for FixedClock {
    fn now_secs(&self) -> u64 {
        self.timestamp
    }
}
