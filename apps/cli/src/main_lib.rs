use std::sync::Arc;

use railspeed_speed_data::{
    HttpClient, IcePortalProvider, LogSink, MonotonicClock, OebbProvider, SpeedOrchestrator,
    SpeedProvider, TestProvider, TracingSink,
};
use tokio::sync::{watch, Notify};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{Config, ProviderKind};

pub fn init_tracing() {
    let log_format = std::env::var("RAILSPEED_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    // Readings go to stdout, so logs stay on stderr.
    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Instantiate the configured providers, each with its own HTTP session.
pub fn build_providers(config: &Config, log: &Arc<dyn LogSink>) -> Vec<Arc<dyn SpeedProvider>> {
    config
        .providers
        .iter()
        .map(|kind| {
            let http = HttpClient::with_log(config.request_timeout, log.clone());
            let provider: Arc<dyn SpeedProvider> = match kind {
                ProviderKind::IcePortal => Arc::new(IcePortalProvider::new(http)),
                ProviderKind::Oebb => Arc::new(OebbProvider::new(http)),
                ProviderKind::Test => Arc::new(TestProvider::new(http, config.test_url.clone())),
            };
            provider
        })
        .collect()
}

pub fn build_orchestrator(config: &Config) -> SpeedOrchestrator {
    let log: Arc<dyn LogSink> = Arc::new(TracingSink::default());
    let providers = build_providers(config, &log);
    SpeedOrchestrator::with_config(
        providers,
        config.orchestrator_config(),
        Arc::new(MonotonicClock::new()),
        log,
    )
}

/// Ctrl-C cancels `shutdown`.
///
/// On unix, SIGUSR1 reports lost connectivity through `online`, and SIGHUP
/// reports it regained: `online` flips back and `reset` fires.
pub fn spawn_signal_handlers(
    reset: Arc<Notify>,
    online: watch::Sender<bool>,
    shutdown: CancellationToken,
) {
    let ctrl_c_shutdown = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received Ctrl-C, shutting down"),
            Err(err) => tracing::error!("Failed to listen for Ctrl-C: {}", err),
        }
        ctrl_c_shutdown.cancel();
    });

    #[cfg(unix)]
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};

        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(stream) => stream,
            Err(err) => {
                tracing::warn!("SIGHUP reset unavailable: {}", err);
                return;
            }
        };
        let mut user1 = match signal(SignalKind::user_defined1()) {
            Ok(stream) => stream,
            Err(err) => {
                tracing::warn!("SIGUSR1 offline signal unavailable: {}", err);
                return;
            }
        };
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                received = hangup.recv() => {
                    if received.is_none() {
                        break;
                    }
                    tracing::info!("Received SIGHUP, network available");
                    online.send_replace(true);
                    reset.notify_one();
                }
                received = user1.recv() => {
                    if received.is_none() {
                        break;
                    }
                    tracing::info!("Received SIGUSR1, network unavailable");
                    online.send_replace(false);
                }
            }
        }
    });

    #[cfg(not(unix))]
    drop((reset, online, shutdown));
}
