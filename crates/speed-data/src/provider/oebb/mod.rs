//! ÖBB Railnet provider.
//!
//! The Railjet on-board portal exposes the current speed as a bare number.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::models::ProviderResult;
use crate::provider::{parse_plain_number, wrap_fetch, HttpClient, SpeedProvider};

/// Provider name constant
const PROVIDER_NAME: &str = "OEBB";

const SPEED_URL: &str = "https://railnet.oebb.at/api/speed";

const INVALID_RESPONSE: &str = "ÖBB: invalid numeric response";

const REQUEST_HEADERS: &[(&str, &str)] = &[("Accept", "text/plain,*/*;q=0.9")];

/// ÖBB Railnet speed provider.
#[derive(Debug)]
pub struct OebbProvider {
    http: HttpClient,
    url: String,
}

impl OebbProvider {
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            url: SPEED_URL.to_string(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[async_trait]
impl SpeedProvider for OebbProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn fetch(&self, cancel: CancellationToken) -> ProviderResult {
        wrap_fetch(PROVIDER_NAME, &cancel, async {
            let text = self.http.fetch_text(&self.url, REQUEST_HEADERS).await?;
            parse_plain_number(&text, INVALID_RESPONSE)
        })
        .await
    }

    fn destroy(&self) {
        self.http.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemorySink;
    use crate::test_support::{http_response, serve_once, serve_silence};
    use std::sync::Arc;
    use std::time::Duration;
    use tracing::Level;

    #[tokio::test]
    async fn test_plain_number_is_success() {
        let (url, request) = serve_once(http_response("200 OK", "164\n")).await;
        let provider = OebbProvider::new(HttpClient::default()).with_url(url);

        match provider.fetch(CancellationToken::new()).await {
            ProviderResult::Success { speed, .. } => assert_eq!(speed, 164.0),
            other => panic!("unexpected result: {:?}", other),
        }

        let head = request.await.unwrap().to_lowercase();
        assert!(head.contains("accept: text/plain,*/*;q=0.9"));
    }

    #[tokio::test]
    async fn test_captive_portal_page_is_failure() {
        let (url, _request) =
            serve_once(http_response("200 OK", "<html>Welcome aboard</html>")).await;
        let provider = OebbProvider::new(HttpClient::default()).with_url(url);

        match provider.fetch(CancellationToken::new()).await {
            ProviderResult::Failure { error, .. } => assert_eq!(error, INVALID_RESPONSE),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_destroy_logs_through_sink_given_at_construction() {
        let sink = Arc::new(MemorySink::new());
        let http = HttpClient::with_log(Duration::from_secs(1), sink.clone());
        let provider = OebbProvider::new(http);

        provider.destroy();
        provider.destroy();

        assert_eq!(sink.lines().len(), 1);
        assert!(sink.contains(Level::DEBUG, "destroyed http session"));
    }

    #[tokio::test]
    async fn test_cancel_abandons_hanging_request() {
        let url = serve_silence().await;
        let provider = OebbProvider::new(HttpClient::default()).with_url(url);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        match provider.fetch(cancel).await {
            ProviderResult::Failure { error, .. } => assert_eq!(error, "cancelled"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
