//! Speed provider trait definitions.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::models::ProviderResult;

/// Trait for speed data sources.
///
/// Implement this trait to add a new upstream endpoint. The orchestrator
/// only ever sees the normalized [`ProviderResult`].
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use railspeed_speed_data::provider::{wrap_fetch, SpeedProvider};
///
/// struct FixedProvider;
///
/// #[async_trait]
/// impl SpeedProvider for FixedProvider {
///     fn name(&self) -> &str {
///         "FIXED"
///     }
///
///     async fn fetch(&self, cancel: CancellationToken) -> ProviderResult {
///         wrap_fetch(self.name(), &cancel, async { Ok(42.0) }).await
///     }
/// }
/// ```
#[async_trait]
pub trait SpeedProvider: Send + Sync {
    /// Stable identifier used for logging, backoff bookkeeping and attribution.
    fn name(&self) -> &str;

    /// Read the current speed.
    ///
    /// Must resolve to a [`ProviderResult`] in every case. When `cancel`
    /// fires before completion the underlying request should be abandoned;
    /// whatever is returned afterwards is ignored by the orchestrator.
    async fn fetch(&self, cancel: CancellationToken) -> ProviderResult;

    /// Release transport resources. Idempotent, and safe without a fetch in flight.
    fn destroy(&self) {}
}

/// An in-flight fetch together with its cancellation handle.
///
/// Awaiting a `PendingFetch` yields the provider's result. [`cancel`](Self::cancel)
/// aborts the request best-effort and marks the outcome as discarded.
pub struct PendingFetch {
    result: BoxFuture<'static, ProviderResult>,
    cancel: CancellationToken,
}

impl PendingFetch {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Split into the result future and the cancellation token.
    pub fn into_parts(self) -> (BoxFuture<'static, ProviderResult>, CancellationToken) {
        (self.result, self.cancel)
    }
}

impl Future for PendingFetch {
    type Output = ProviderResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.result.as_mut().poll(cx)
    }
}

impl std::fmt::Debug for PendingFetch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingFetch")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// Start a fetch on `provider` under a child token of `parent`.
///
/// Cancelling `parent` cancels every fetch dispatched from it; cancelling the
/// returned handle only affects this fetch. Nothing runs until the handle is polled.
pub fn dispatch(provider: Arc<dyn SpeedProvider>, parent: &CancellationToken) -> PendingFetch {
    let cancel = parent.child_token();
    let token = cancel.clone();
    let result: BoxFuture<'static, ProviderResult> =
        Box::pin(async move { provider.fetch(token).await });

    PendingFetch { result, cancel }
}
