use serde::{Deserialize, Serialize};

/// Outcome of one orchestrator round.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum OrchestratorResult {
    /// The first provider to answer with a usable reading.
    #[serde(rename_all = "camelCase")]
    Success {
        speed: f64,
        provider: String,
        latency_ms: u64,
        /// Monotonic microseconds captured at the start of the round.
        timestamp_us: u64,
    },
    /// No usable reading this round.
    #[serde(rename_all = "camelCase")]
    Failure {
        /// Recommended delay before the next round (always >= 1).
        next_wake_secs: u64,
    },
}

impl OrchestratorResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}
