//! Configurable plain-text endpoint.
//!
//! Useful off the train: point it at any URL that returns a number and the
//! rest of the pipeline behaves exactly as with the real portals.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::models::ProviderResult;
use crate::provider::{parse_plain_number, wrap_fetch, HttpClient, SpeedProvider};

const PROVIDER_NAME: &str = "Test";

/// Endpoint used when no URL is configured.
pub const DEFAULT_TEST_URL: &str = "https://dummyjson.com/c/8e53-5ce8-4a29-ba8e";

const INVALID_RESPONSE: &str = "Test: invalid numeric response";

#[derive(Debug)]
pub struct TestProvider {
    http: HttpClient,
    url: String,
}

impl TestProvider {
    pub fn new(http: HttpClient, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl SpeedProvider for TestProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn fetch(&self, cancel: CancellationToken) -> ProviderResult {
        wrap_fetch(PROVIDER_NAME, &cancel, async {
            let text = self.http.fetch_text(&self.url, &[]).await?;
            parse_plain_number(&text, INVALID_RESPONSE)
        })
        .await
    }

    fn destroy(&self) {
        self.http.destroy();
    }
}
