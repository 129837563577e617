//! Per-round attempt tracking for diagnostics.

/// What happened to one provider during a round.
#[derive(Clone, Debug, PartialEq)]
pub enum AttemptOutcome {
    /// Still cooling down; not dispatched.
    Skipped { wait_secs: u64 },

    /// Dispatched and answered without a usable reading.
    Failed { error: String, delay_secs: u64 },

    /// Dispatched and answered first with a usable reading.
    Won { speed: f64, latency_ms: u64 },

    /// Dispatched but abandoned because another provider won.
    Cancelled,
}

/// Record of a single provider during a round.
#[derive(Clone, Debug, PartialEq)]
pub struct ProviderAttempt {
    pub provider: String,
    pub outcome: AttemptOutcome,
}

/// Everything a round did, in the order it happened.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RoundDiagnostics {
    pub attempts: Vec<ProviderAttempt>,
}

impl RoundDiagnostics {
    pub fn new() -> Self {
        Self {
            attempts: Vec::new(),
        }
    }

    pub fn record_skip(&mut self, provider: &str, wait_secs: u64) {
        self.push(provider, AttemptOutcome::Skipped { wait_secs });
    }

    pub fn record_failure(&mut self, provider: &str, error: String, delay_secs: u64) {
        self.push(provider, AttemptOutcome::Failed { error, delay_secs });
    }

    pub fn record_win(&mut self, provider: &str, speed: f64, latency_ms: u64) {
        self.push(provider, AttemptOutcome::Won { speed, latency_ms });
    }

    pub fn record_cancelled(&mut self, provider: &str) {
        self.push(provider, AttemptOutcome::Cancelled);
    }

    fn push(&mut self, provider: &str, outcome: AttemptOutcome) {
        self.attempts.push(ProviderAttempt {
            provider: provider.to_string(),
            outcome,
        });
    }

    /// Outcome recorded for `provider`, if any.
    pub fn outcome_of(&self, provider: &str) -> Option<&AttemptOutcome> {
        self.attempts
            .iter()
            .find(|a| a.provider == provider)
            .map(|a| &a.outcome)
    }

    pub fn winner(&self) -> Option<&ProviderAttempt> {
        self.attempts
            .iter()
            .find(|a| matches!(a.outcome, AttemptOutcome::Won { .. }))
    }

    /// Number of providers actually dispatched this round.
    pub fn dispatched(&self) -> usize {
        self.attempts
            .iter()
            .filter(|a| !matches!(a.outcome, AttemptOutcome::Skipped { .. }))
            .count()
    }

    /// Summary for logging/debugging.
    pub fn summary(&self) -> String {
        self.attempts
            .iter()
            .map(|a| match &a.outcome {
                AttemptOutcome::Skipped { wait_secs } => {
                    format!("{}: SKIPPED ({}s)", a.provider, wait_secs)
                }
                AttemptOutcome::Failed { error, delay_secs } => {
                    format!("{}: ERROR ({error}, retry in {delay_secs}s)", a.provider)
                }
                AttemptOutcome::Won { speed, latency_ms } => {
                    format!("{}: WON ({} km/h, {}ms)", a.provider, speed, latency_ms)
                }
                AttemptOutcome::Cancelled => format!("{}: CANCELLED", a.provider),
            })
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}
