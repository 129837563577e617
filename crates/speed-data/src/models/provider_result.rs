use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;

/// Normalized outcome of one provider fetch.
///
/// Every transport error, bad status, malformed payload and non-finite
/// reading ends up as [`ProviderResult::Failure`]. A `Success` always carries
/// a finite speed when built through [`ProviderResult::from_reading`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ProviderResult {
    /// The provider produced a usable reading.
    #[serde(rename_all = "camelCase")]
    Success {
        /// Current speed (km/h).
        speed: f64,
        /// Time spent fetching and parsing.
        latency_ms: u64,
        /// Name of the provider that produced the reading.
        provider: String,
    },
    /// The provider could not produce a usable reading.
    #[serde(rename_all = "camelCase")]
    Failure {
        /// Human readable description of what went wrong.
        error: String,
        /// Time spent before the failure was detected.
        latency_ms: u64,
        /// Name of the provider that failed.
        provider: String,
    },
}

impl ProviderResult {
    /// Build a result from a raw reading, demoting non-finite values to a failure.
    pub fn from_reading(provider: impl Into<String>, speed: f64, latency_ms: u64) -> Self {
        let provider = provider.into();
        if speed.is_finite() {
            Self::Success {
                speed,
                latency_ms,
                provider,
            }
        } else {
            Self::Failure {
                error: ProviderError::NonFinite { value: speed }.to_string(),
                latency_ms,
                provider,
            }
        }
    }

    /// Build a failure result.
    pub fn failure(provider: impl Into<String>, error: impl Into<String>, latency_ms: u64) -> Self {
        Self::Failure {
            error: error.into(),
            latency_ms,
            provider: provider.into(),
        }
    }

    pub fn latency_ms(&self) -> u64 {
        match self {
            Self::Success { latency_ms, .. } | Self::Failure { latency_ms, .. } => *latency_ms,
        }
    }

    /// True only for a success holding a finite reading.
    pub fn is_usable(&self) -> bool {
        match self {
            Self::Success { speed, .. } => speed.is_finite(),
            Self::Failure { .. } => false,
        }
    }
}
