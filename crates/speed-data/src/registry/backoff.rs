//! Per-provider exponential backoff.
//!
//! Tracks consecutive failures of one provider and the earliest monotonic
//! time at which it may be tried again. The state has two shapes:
//!
//! - **Ready**: `fail_count == 0`, `next_allowed_us == 0`; always allowed.
//! - **Cooling down**: `fail_count > 0`; allowed once `now >= next_allowed_us`.
//!
//! A single success returns the provider to Ready. There is no decay.
//! Timestamps are monotonic microseconds (see [`crate::clock`]).

/// Default delay after the first failure.
const DEFAULT_INITIAL_DELAY_SECS: u64 = 2;

/// Default upper bound on any delay.
const DEFAULT_MAX_DELAY_SECS: u64 = 60;

/// Default multiplier between consecutive delays.
const DEFAULT_GROWTH_FACTOR: f64 = 2.0;

/// Largest exponent ever fed to `powi`.
const MAX_EXPONENT: u32 = 30;

const MICROS_PER_SEC: u64 = 1_000_000;

/// Backoff configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct BackoffConfig {
    /// Delay after the first failure.
    pub initial_delay_secs: u64,
    /// Cap applied to every computed delay.
    pub max_delay_secs: u64,
    /// Multiplier applied per additional consecutive failure (> 1).
    pub growth_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_secs: DEFAULT_INITIAL_DELAY_SECS,
            max_delay_secs: DEFAULT_MAX_DELAY_SECS,
            growth_factor: DEFAULT_GROWTH_FACTOR,
        }
    }
}

/// Failure/cooldown state for a single provider.
#[derive(Clone, Debug)]
pub struct ExponentialBackoff {
    config: BackoffConfig,
    /// Consecutive failures since the last success.
    fail_count: u32,
    /// Monotonic time before which the provider must not be tried; `0` when unset.
    next_allowed_us: u64,
}

impl ExponentialBackoff {
    /// Create a backoff with default settings (2s initial, 60s cap, factor 2).
    pub fn new() -> Self {
        Self::with_config(BackoffConfig::default())
    }

    pub fn with_config(config: BackoffConfig) -> Self {
        Self {
            config,
            fail_count: 0,
            next_allowed_us: 0,
        }
    }

    /// True iff `now_us >= next_allowed_us`.
    pub fn is_allowed(&self, now_us: u64) -> bool {
        now_us >= self.next_allowed_us
    }

    /// Whole seconds (rounded up) until the provider may be tried; `0` when allowed.
    pub fn seconds_until_allowed(&self, now_us: u64) -> u64 {
        if self.is_allowed(now_us) {
            return 0;
        }
        (self.next_allowed_us - now_us).div_ceil(MICROS_PER_SEC)
    }

    /// Forget every previous failure. The provider is allowed immediately.
    pub fn mark_success(&mut self) {
        self.fail_count = 0;
        self.next_allowed_us = 0;
    }

    /// Record one failure at `now_us` and return the resulting delay in seconds.
    ///
    /// The delay is `min(max, round(initial × factor^min(fail_count - 1, 30)))`.
    pub fn mark_failure(&mut self, now_us: u64) -> u64 {
        self.fail_count = self.fail_count.saturating_add(1);

        let delay = self.delay_for(self.fail_count);
        self.next_allowed_us = now_us.saturating_add(delay.saturating_mul(MICROS_PER_SEC));
        delay
    }

    /// Delay in seconds that the `fail_count`-th consecutive failure produces.
    pub fn delay_for(&self, fail_count: u32) -> u64 {
        let exponent = fail_count.saturating_sub(1).min(MAX_EXPONENT) as i32;
        let initial = self.config.initial_delay_secs as f64;
        let factor = self.config.growth_factor;
        let secs = (initial * factor.powi(exponent)).round();
        let max = self.config.max_delay_secs;

        if !secs.is_finite() || secs >= max as f64 {
            max
        } else if secs <= 0.0 {
            0
        } else {
            secs as u64
        }
    }

    pub fn fail_count(&self) -> u32 {
        self.fail_count
    }

    pub fn next_allowed_us(&self) -> u64 {
        self.next_allowed_us
    }

    pub fn config(&self) -> &BackoffConfig {
        &self.config
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new()
    }
}
