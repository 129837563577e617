//! Provider registry module.
//!
//! This module provides orchestration for speed providers, including:
//! - Per-provider exponential backoff
//! - Racing the eligible providers and cancelling the losers
//! - Per-round diagnostics

mod backoff;
mod diagnostics;
mod orchestrator;

pub use backoff::{BackoffConfig, ExponentialBackoff};
pub use diagnostics::{AttemptOutcome, ProviderAttempt, RoundDiagnostics};
pub use orchestrator::{BackoffSnapshot, OrchestratorConfig, SpeedOrchestrator};
