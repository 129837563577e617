//! Error types for the speed data crate.
//!
//! [`ProviderError`] describes everything that can go wrong inside a
//! provider. It never leaves the provider boundary: the normalization helper
//! in [`crate::provider`] turns it into a
//! [`ProviderResult::Failure`](crate::models::ProviderResult::Failure)
//! carrying the error's display text.

use thiserror::Error;

/// Failures raised while fetching or parsing a single reading.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The endpoint answered with a non-200 status.
    #[error("HTTP {status}{}", reason_suffix(.reason))]
    Http { status: u16, reason: Option<String> },

    /// The request could not be sent or the body could not be read.
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// The body was received but did not contain a usable value.
    #[error("{message}")]
    InvalidPayload { message: String },

    /// A value was parsed but is NaN or infinite.
    #[error("invalid speed")]
    NonFinite { value: f64 },

    /// The fetch was abandoned because another provider won the round.
    #[error("cancelled")]
    Cancelled,

    /// The transport was torn down before the fetch started.
    #[error("HttpClient destroyed")]
    Destroyed,
}

fn reason_suffix(reason: &Option<String>) -> String {
    match reason.as_deref() {
        Some(r) if !r.is_empty() => format!(" {}", r),
        _ => String::new(),
    }
}

impl ProviderError {
    /// Shorthand for [`ProviderError::InvalidPayload`].
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            message: message.into(),
        }
    }
}
