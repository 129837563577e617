//! Round orchestration across all configured providers.
//!
//! One call to [`SpeedOrchestrator::try_once`] is one round:
//!
//! 1. Capture `now`. Providers still cooling down are skipped and their
//!    remaining wait is remembered.
//! 2. Nothing eligible: fail with the soonest wait.
//! 3. Dispatch every eligible provider under a fresh round token.
//! 4. Take results in arrival order. A failure marks that provider's backoff
//!    and the race goes on; the first usable reading wins, resets the
//!    winner's backoff and cancels everyone still in flight.
//! 5. Everyone failed: fail with the soonest wait across all providers.
//!
//! Fetches are polled on the caller's task; nothing is spawned. A cancelled
//! fetch is dropped unpolled, so its outcome can never reach a backoff.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use super::backoff::{BackoffConfig, ExponentialBackoff};
use super::diagnostics::RoundDiagnostics;
use crate::clock::{Clock, MonotonicClock};
use crate::errors::ProviderError;
use crate::logging::{self, LogSink};
use crate::models::{OrchestratorResult, ProviderResult};
use crate::provider::{dispatch, SpeedProvider};

/// Wake delay when no provider is configured at all.
const DEFAULT_IDLE_WAKE_SECS: u64 = 60;

/// Wake delay when a round failed but no backoff reports a wait.
const DEFAULT_FALLBACK_WAKE_SECS: u64 = 1;

/// Orchestrator configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct OrchestratorConfig {
    /// Backoff settings applied to every provider.
    pub backoff: BackoffConfig,
    /// Recommended wake delay when there is nothing to poll.
    pub idle_wake_secs: u64,
    /// Recommended wake delay when a failed round yields no better hint.
    pub fallback_wake_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            backoff: BackoffConfig::default(),
            idle_wake_secs: DEFAULT_IDLE_WAKE_SECS,
            fallback_wake_secs: DEFAULT_FALLBACK_WAKE_SECS,
        }
    }
}

/// A provider and the backoff state that belongs to it.
struct Entry {
    provider: Arc<dyn SpeedProvider>,
    name: String,
    backoff: ExponentialBackoff,
}

/// Point-in-time view of one provider's backoff.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackoffSnapshot {
    pub provider: String,
    pub fail_count: u32,
    pub seconds_until_allowed: u64,
}

/// Races the configured providers and keeps their backoff state.
///
/// Rounds must not overlap; `try_once` takes `&mut self`, so the borrow
/// checker enforces that for direct callers.
pub struct SpeedOrchestrator {
    entries: Vec<Entry>,
    config: OrchestratorConfig,
    clock: Arc<dyn Clock>,
    log: Arc<dyn LogSink>,
    destroyed: bool,
}

impl SpeedOrchestrator {
    /// Create an orchestrator with default settings, a monotonic clock and no logging.
    pub fn new(providers: Vec<Arc<dyn SpeedProvider>>) -> Self {
        Self::with_config(
            providers,
            OrchestratorConfig::default(),
            Arc::new(MonotonicClock::new()),
            logging::noop(),
        )
    }

    /// Create an orchestrator with custom configuration.
    pub fn with_config(
        providers: Vec<Arc<dyn SpeedProvider>>,
        config: OrchestratorConfig,
        clock: Arc<dyn Clock>,
        log: Arc<dyn LogSink>,
    ) -> Self {
        let entries = providers
            .into_iter()
            .map(|provider| Entry {
                name: provider.name().to_string(),
                backoff: ExponentialBackoff::with_config(config.backoff.clone()),
                provider,
            })
            .collect();

        Self {
            entries,
            config,
            clock,
            log,
            destroyed: false,
        }
    }

    /// Run one round and return its result.
    ///
    /// # Panics
    ///
    /// Panics when called after [`destroy`](Self::destroy).
    pub async fn try_once(&mut self) -> OrchestratorResult {
        self.try_once_with_diagnostics().await.0
    }

    /// Run one round and also report what every provider did.
    ///
    /// # Panics
    ///
    /// Panics when called after [`destroy`](Self::destroy).
    pub async fn try_once_with_diagnostics(&mut self) -> (OrchestratorResult, RoundDiagnostics) {
        assert!(
            !self.destroyed,
            "SpeedOrchestrator::try_once called after destroy()"
        );

        let now = self.clock.now_us();
        let mut diagnostics = RoundDiagnostics::new();

        // Eligibility scan
        let mut soonest_wait: Option<u64> = None;
        let mut eligible = Vec::with_capacity(self.entries.len());

        for (index, entry) in self.entries.iter().enumerate() {
            if entry.backoff.is_allowed(now) {
                eligible.push(index);
                continue;
            }

            let wait = entry.backoff.seconds_until_allowed(now);
            self.log.debug(&format!(
                "skipping '{}' ({} failures, {}s left)",
                entry.name,
                entry.backoff.fail_count(),
                wait
            ));
            diagnostics.record_skip(&entry.name, wait);
            soonest_wait = Some(soonest_wait.map_or(wait, |s| s.min(wait)));
        }

        if eligible.is_empty() {
            let next_wake_secs = soonest_wait.unwrap_or(self.config.idle_wake_secs).max(1);
            self.log.debug(&format!(
                "no provider eligible, next wake in {}s",
                next_wake_secs
            ));
            return (OrchestratorResult::Failure { next_wake_secs }, diagnostics);
        }

        // Dispatch
        let round = CancellationToken::new();
        let mut pending: Vec<Option<CancellationToken>> = vec![None; self.entries.len()];
        let mut in_flight = FuturesUnordered::new();

        for &index in &eligible {
            let (result, token) =
                dispatch(self.entries[index].provider.clone(), &round).into_parts();
            pending[index] = Some(token);
            in_flight.push(result.map(move |r| (index, r)));
        }

        self.log
            .debug(&format!("dispatched {} provider(s)", eligible.len()));

        // Race
        let mut outcome = None;

        while let Some((index, result)) = in_flight.next().await {
            let Some(token) = pending[index].take() else {
                continue;
            };
            if token.is_cancelled() {
                self.log.debug(&format!(
                    "discarding late result from '{}'",
                    self.entries[index].name
                ));
                continue;
            }

            let entry = &mut self.entries[index];
            let latency_ms = result.latency_ms();

            let error = match result {
                ProviderResult::Success { speed, .. } if speed.is_finite() => {
                    entry.backoff.mark_success();
                    diagnostics.record_win(&entry.name, speed, latency_ms);
                    self.log.debug(&format!(
                        "'{}' won with {} km/h after {}ms",
                        entry.name, speed, latency_ms
                    ));

                    outcome = Some(OrchestratorResult::Success {
                        speed,
                        provider: entry.name.clone(),
                        latency_ms,
                        timestamp_us: now,
                    });
                    break;
                }
                ProviderResult::Success { speed, .. } => {
                    ProviderError::NonFinite { value: speed }.to_string()
                }
                ProviderResult::Failure { error, .. } => error,
            };

            let delay = entry.backoff.mark_failure(now);
            self.log.warn(&format!(
                "'{}' failed after {}ms: {} (failure #{}, retry in {}s)",
                entry.name,
                latency_ms,
                error,
                entry.backoff.fail_count(),
                delay
            ));
            diagnostics.record_failure(&entry.name, error, delay);
        }

        if let Some(result) = outcome {
            for (index, slot) in pending.iter_mut().enumerate() {
                if let Some(token) = slot.take() {
                    token.cancel();
                    diagnostics.record_cancelled(&self.entries[index].name);
                    self.log
                        .debug(&format!("cancelled '{}'", self.entries[index].name));
                }
            }
            round.cancel();
            drop(in_flight);
            return (result, diagnostics);
        }

        let next_wake_secs = self
            .entries
            .iter()
            .map(|e| e.backoff.seconds_until_allowed(now))
            .min()
            .unwrap_or(self.config.fallback_wake_secs)
            .max(1);

        self.log.debug(&format!(
            "all providers failed, next wake in {}s",
            next_wake_secs
        ));
        (OrchestratorResult::Failure { next_wake_secs }, diagnostics)
    }

    /// Forget every provider's failures, e.g. after connectivity came back.
    pub fn reset_all(&mut self) {
        for entry in &mut self.entries {
            entry.backoff.mark_success();
        }
        self.log.info("reset all provider backoffs");
    }

    /// Tear down every provider exactly once. Further calls do nothing.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        for entry in &self.entries {
            entry.provider.destroy();
        }
        self.destroyed = true;
        self.log
            .info(&format!("destroyed {} provider(s)", self.entries.len()));
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Names of the configured providers, in configuration order.
    pub fn provider_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// Current backoff state of every provider.
    pub fn backoff_states(&self) -> Vec<BackoffSnapshot> {
        let now = self.clock.now_us();
        self.entries
            .iter()
            .map(|e| BackoffSnapshot {
                provider: e.name.clone(),
                fail_count: e.backoff.fail_count(),
                seconds_until_allowed: e.backoff.seconds_until_allowed(now),
            })
            .collect()
    }
}

impl Drop for SpeedOrchestrator {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for SpeedOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeedOrchestrator")
            .field("providers", &self.provider_names())
            .field("config", &self.config)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}
