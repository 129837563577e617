//! Minimal HTTP transport shared by the concrete providers.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use reqwest::{Client, StatusCode};

use crate::errors::ProviderError;
use crate::logging::{self, LogSink};

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// GET-and-read-text client with an explicit teardown.
///
/// Wraps a [`reqwest::Client`]. After [`destroy`](Self::destroy) every
/// request fails with [`ProviderError::Destroyed`].
pub struct HttpClient {
    client: Mutex<Option<Client>>,
    log: Arc<dyn LogSink>,
}

impl HttpClient {
    /// Create a client with the given per-request timeout.
    pub fn new(timeout: Duration) -> Self {
        Self::with_log(timeout, logging::noop())
    }

    pub fn with_log(timeout: Duration, log: Arc<dyn LogSink>) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client: Mutex::new(Some(client)),
            log,
        }
    }

    /// Lock the client slot, recovering from poison.
    ///
    /// The slot only ever holds a cheap-to-clone handle, so a poisoned lock
    /// still contains a consistent value.
    fn lock_client(&self) -> MutexGuard<'_, Option<Client>> {
        self.client
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// GET `url` and return the trimmed body text.
    ///
    /// Any status other than 200 is an error. Headers are applied in order;
    /// later duplicates replace earlier ones.
    pub async fn fetch_text(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<String, ProviderError> {
        let client = self.lock_client().clone().ok_or(ProviderError::Destroyed)?;

        let mut request = client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await?;
        let status = response.status();

        if status != StatusCode::OK {
            return Err(ProviderError::Http {
                status: status.as_u16(),
                reason: status.canonical_reason().map(str::to_string),
            });
        }

        let body = response.text().await?;
        Ok(body.trim().to_string())
    }

    /// Drop the underlying client. Safe to call more than once.
    pub fn destroy(&self) {
        if self.lock_client().take().is_some() {
            self.log.debug("destroyed http session");
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.lock_client().is_none()
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}
