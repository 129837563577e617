//! ICE Portal provider.
//!
//! Reads the on-board status API of Deutsche Bahn ICE trains. The endpoint
//! answers with a JSON document whose `speed` field holds km/h, either as a
//! number or as a numeric string.

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::errors::ProviderError;
use crate::models::ProviderResult;
use crate::provider::{parse_plain_number, wrap_fetch, HttpClient, SpeedProvider};

/// Provider name constant
const PROVIDER_NAME: &str = "ICEPortal";

/// Status endpoint of the on-board portal
const STATUS_URL: &str = "https://iceportal.de/api1/rs/status";

const INVALID_JSON: &str = "ICE: invalid JSON";
const INVALID_SPEED: &str = "ICE: missing/invalid \"speed\"";

/// The portal rejects requests without a browser user agent (HTTP 403).
const REQUEST_HEADERS: &[(&str, &str)] = &[
    ("Accept", "application/json, text/plain, */*"),
    ("Accept-Language", "de-DE,de;q=0.9,en;q=0.8"),
    (
        "User-Agent",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    ),
    ("Cache-Control", "no-cache"),
    ("Pragma", "no-cache"),
];

/// ICE Portal speed provider.
///
/// # Example
///
/// ```ignore
/// use railspeed_speed_data::provider::{iceportal::IcePortalProvider, HttpClient};
///
/// let provider = IcePortalProvider::new(HttpClient::default());
/// ```
#[derive(Debug)]
pub struct IcePortalProvider {
    http: HttpClient,
    url: String,
}

impl IcePortalProvider {
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            url: STATUS_URL.to_string(),
        }
    }

    /// Point the provider at a different status endpoint.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

/// Extract the speed from a status document.
pub fn parse_status(text: &str) -> Result<f64, ProviderError> {
    let status: Value =
        serde_json::from_str(text).map_err(|_| ProviderError::invalid_payload(INVALID_JSON))?;

    match status.get("speed") {
        Some(Value::Number(n)) => n
            .as_f64()
            .filter(|v| v.is_finite())
            .ok_or_else(|| ProviderError::invalid_payload(INVALID_SPEED)),
        Some(Value::String(s)) => parse_plain_number(s, INVALID_SPEED),
        _ => Err(ProviderError::invalid_payload(INVALID_SPEED)),
    }
}

#[async_trait]
impl SpeedProvider for IcePortalProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn fetch(&self, cancel: CancellationToken) -> ProviderResult {
        wrap_fetch(PROVIDER_NAME, &cancel, async {
            let text = self.http.fetch_text(&self.url, REQUEST_HEADERS).await?;
            parse_status(&text)
        })
        .await
    }

    fn destroy(&self) {
        self.http.destroy();
    }
}
