//! Railspeed Speed Data Crate
//!
//! This crate polls several independent, unreliable on-board endpoints for
//! the current train speed and returns the first usable reading, while
//! backing off from endpoints that keep failing.
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! |  Update driver   |  (one round at a time, reschedules itself)
//! +------------------+
//!          |  try_once()
//!          v
//! +------------------+     +---------------------+
//! | SpeedOrchestrator| --> | ExponentialBackoff  |  (one per provider)
//! +------------------+     +---------------------+
//!          |  dispatch() under a round CancellationToken
//!          v
//! +------------------+
//! |  SpeedProvider   |  (ICE Portal, ÖBB Railnet, plain-text test endpoint)
//! +------------------+
//!          |  wrap_fetch()
//!          v
//! +------------------+
//! |  ProviderResult  |  (Success | Failure, never an error)
//! +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`SpeedOrchestrator`] - Races eligible providers, cancels losers
//! - [`ExponentialBackoff`] - Per-provider failure/cooldown state
//! - [`SpeedProvider`] - Contract every data source implements
//! - [`ProviderResult`] / [`OrchestratorResult`] - Tagged round outcomes
//! - [`LogSink`] - Injected logging capability
//! - [`Clock`] - Monotonic time source

pub mod clock;
pub mod errors;
pub mod format;
pub mod logging;
pub mod models;
pub mod provider;
pub mod registry;

#[cfg(test)]
mod test_support;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use errors::ProviderError;
pub use format::time_ago;
pub use logging::{LogSink, NoopSink, TracingSink};
pub use models::{OrchestratorResult, ProviderResult};

pub use provider::iceportal::IcePortalProvider;
pub use provider::oebb::OebbProvider;
pub use provider::test_endpoint::{TestProvider, DEFAULT_TEST_URL};
pub use provider::{dispatch, wrap_fetch, HttpClient, PendingFetch, SpeedProvider};

pub use registry::{
    AttemptOutcome, BackoffConfig, BackoffSnapshot, ExponentialBackoff, OrchestratorConfig,
    ProviderAttempt, RoundDiagnostics, SpeedOrchestrator,
};
