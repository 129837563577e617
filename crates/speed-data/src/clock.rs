//! Monotonic time sources.
//!
//! Backoff bookkeeping is done in microseconds on a monotonic scale where
//! `0` means "never failed". [`MonotonicClock`] therefore never reports `0`.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::time::Instant;

/// Offset added to [`MonotonicClock`] readings so they stay clear of the unset value.
const CLOCK_ORIGIN_US: u64 = 1_000_000;

/// Source of monotonic timestamps in microseconds.
pub trait Clock: Send + Sync {
    fn now_us(&self) -> u64;
}

/// Process-local monotonic clock backed by tokio's [`Instant`].
///
/// Follows the runtime clock, so paused-time tests see it advance together
/// with `tokio::time::sleep`.
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_us(&self) -> u64 {
        let elapsed = self.origin.elapsed().as_micros();
        CLOCK_ORIGIN_US.saturating_add(u64::try_from(elapsed).unwrap_or(u64::MAX))
    }
}

/// Hand-driven clock for deterministic tests and replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_us: AtomicU64,
}

impl ManualClock {
    pub fn new(start_us: u64) -> Self {
        Self {
            now_us: AtomicU64::new(start_us),
        }
    }

    pub fn set_us(&self, now_us: u64) {
        self.now_us.store(now_us, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: u64) {
        self.now_us
            .fetch_add(secs.saturating_mul(1_000_000), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_us(&self) -> u64 {
        self.now_us.load(Ordering::SeqCst)
    }
}
