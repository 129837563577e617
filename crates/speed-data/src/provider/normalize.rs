//! Turning raw fetches into [`ProviderResult`]s.

use std::future::Future;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::errors::ProviderError;
use crate::models::ProviderResult;

/// Run `fetch` for `provider` and normalize whatever happens.
///
/// - `Ok(finite)` becomes `Success`
/// - `Ok(non-finite)` and every `Err` become `Failure` with the error's display text
/// - if `cancel` fires first, `fetch` is dropped (aborting the request) and
///   the result is a `cancelled` failure
///
/// Latency is measured from the call to the outcome.
pub async fn wrap_fetch<F>(provider: &str, cancel: &CancellationToken, fetch: F) -> ProviderResult
where
    F: Future<Output = Result<f64, ProviderError>>,
{
    let started = Instant::now();

    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ProviderError::Cancelled),
        reading = fetch => reading,
    };

    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    match outcome {
        Ok(speed) => ProviderResult::from_reading(provider, speed, latency_ms),
        Err(e) => ProviderResult::failure(provider, e.to_string(), latency_ms),
    }
}

/// Read a plain-text number the way the on-board APIs send it.
///
/// Surrounding whitespace is ignored and an empty body reads as `0`.
/// Unparsable or non-finite text is reported with `error_message`.
pub fn parse_plain_number(text: &str, error_message: &str) -> Result<f64, ProviderError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }

    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ProviderError::invalid_payload(error_message)),
    }
}
