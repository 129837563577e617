//! The polling loop around the orchestrator.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use railspeed_speed_data::{OrchestratorResult, SpeedOrchestrator};
use tokio::sync::{watch, Notify};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::output::{render_line, OutputFormat};

const MIN_DELAY: Duration = Duration::from_secs(1);

/// How long to wait before checking connectivity again while offline.
const OFFLINE_RECHECK: Duration = Duration::from_secs(5);

/// Delay before the next round.
///
/// A success re-polls after `fast_refresh`; a failure honours the
/// orchestrator's wake hint. Both are at least one second.
pub fn next_delay(result: &OrchestratorResult, fast_refresh: Duration) -> Duration {
    let delay = match result {
        OrchestratorResult::Success { .. } => fast_refresh,
        OrchestratorResult::Failure { next_wake_secs } => Duration::from_secs(*next_wake_secs),
    };
    delay.max(MIN_DELAY)
}

/// Runs rounds one at a time and writes one line per round.
pub struct UpdateDriver<W: Write> {
    orchestrator: SpeedOrchestrator,
    connectivity: Option<watch::Receiver<bool>>,
    fast_refresh: Duration,
    format: OutputFormat,
    last_success: Option<Instant>,
    rounds: u64,
    writer: W,
}

impl<W: Write> UpdateDriver<W> {
    pub fn new(orchestrator: SpeedOrchestrator, config: &Config, writer: W) -> Self {
        Self {
            orchestrator,
            connectivity: None,
            fast_refresh: config.fast_refresh,
            format: config.output,
            last_success: None,
            rounds: 0,
            writer,
        }
    }

    /// Skip rounds while `online` reads `false`.
    ///
    /// Without a connectivity signal the driver assumes it is always online.
    pub fn with_connectivity(mut self, online: watch::Receiver<bool>) -> Self {
        self.connectivity = Some(online);
        self
    }

    /// Poll until `shutdown` fires, then destroy the orchestrator.
    ///
    /// A notification on `reset` clears every backoff and starts the next
    /// round immediately. While offline no provider is asked and
    /// connectivity is checked again every five seconds.
    pub async fn run(&mut self, reset: Arc<Notify>, shutdown: CancellationToken) {
        tracing::info!(
            "Polling providers: {}",
            self.orchestrator.provider_names().join(", ")
        );

        loop {
            if !self.is_online() {
                tracing::debug!("Offline, checking again in {OFFLINE_RECHECK:?}");
                if !self.pause(OFFLINE_RECHECK, &reset, &shutdown).await {
                    break;
                }
                continue;
            }

            let (result, diagnostics) = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                round = self.orchestrator.try_once_with_diagnostics() => round,
            };
            self.rounds += 1;
            tracing::debug!("Round {}: {}", self.rounds, diagnostics.summary());
            self.render(&result);

            let delay = next_delay(&result, self.fast_refresh);
            if !self.pause(delay, &reset, &shutdown).await {
                break;
            }
        }

        tracing::info!("Stopping after {} round(s)", self.rounds);
        self.orchestrator.destroy();
    }

    /// Wait out `delay`, cut short by a reset. Returns `false` on shutdown.
    async fn pause(
        &mut self,
        delay: Duration,
        reset: &Notify,
        shutdown: &CancellationToken,
    ) -> bool {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => return false,
            _ = reset.notified() => {
                tracing::info!("Connectivity changed, resetting provider backoff");
                self.orchestrator.reset_all();
            }
            _ = tokio::time::sleep(delay) => {}
        }
        true
    }

    fn is_online(&self) -> bool {
        match &self.connectivity {
            Some(online) => *online.borrow(),
            None => true,
        }
    }

    #[cfg(test)]
    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    #[cfg(test)]
    pub fn writer(&self) -> &W {
        &self.writer
    }

    fn render(&mut self, result: &OrchestratorResult) {
        let now = Instant::now();
        let last_reading = self.last_success.map(|at| now.duration_since(at));
        if result.is_success() {
            self.last_success = Some(now);
        }

        let line = render_line(self.format, result, last_reading, chrono::Utc::now());
        if let Err(err) = writeln!(self.writer, "{line}").and_then(|_| self.writer.flush()) {
            tracing::warn!("Failed to write reading: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use railspeed_speed_data::{
        logging, MonotonicClock, OrchestratorConfig, ProviderResult, SpeedProvider,
    };

    #[derive(Clone, Copy)]
    enum Behaviour {
        Succeed(f64),
        Fail,
        Hang,
    }

    struct CountingProvider {
        behaviour: Behaviour,
        calls: AtomicUsize,
        destroys: AtomicUsize,
    }

    impl CountingProvider {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                behaviour,
                calls: AtomicUsize::new(0),
                destroys: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl SpeedProvider for CountingProvider {
        fn name(&self) -> &str {
            "P"
        }

        async fn fetch(&self, _cancel: CancellationToken) -> ProviderResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behaviour {
                Behaviour::Succeed(speed) => ProviderResult::Success {
                    speed,
                    latency_ms: 0,
                    provider: "P".into(),
                },
                Behaviour::Fail => ProviderResult::failure("P", "HTTP 503", 0),
                Behaviour::Hang => std::future::pending().await,
            }
        }

        fn destroy(&self) {
            self.destroys.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn driver_for(provider: Arc<CountingProvider>) -> UpdateDriver<Vec<u8>> {
        let config = Config::from_lookup(|_| None).unwrap();
        let orchestrator = SpeedOrchestrator::with_config(
            vec![provider as Arc<dyn SpeedProvider>],
            OrchestratorConfig::default(),
            Arc::new(MonotonicClock::new()),
            logging::noop(),
        );
        UpdateDriver::new(orchestrator, &config, Vec::new())
    }

    fn shutdown_after(delay: Duration) -> CancellationToken {
        let shutdown = CancellationToken::new();
        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            trigger.cancel();
        });
        shutdown
    }

    /// Shared buffer the test subscriber writes formatted events into.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn lines(driver: &UpdateDriver<Vec<u8>>) -> Vec<String> {
        String::from_utf8(driver.writer().clone())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_next_delay() {
        let success = OrchestratorResult::Success {
            speed: 100.0,
            provider: "P".into(),
            latency_ms: 1,
            timestamp_us: 1,
        };
        assert_eq!(
            next_delay(&success, Duration::from_secs(3)),
            Duration::from_secs(3)
        );
        assert_eq!(next_delay(&success, Duration::ZERO), MIN_DELAY);

        let failure = OrchestratorResult::Failure { next_wake_secs: 16 };
        assert_eq!(
            next_delay(&failure, Duration::from_secs(1)),
            Duration::from_secs(16)
        );
        let failure = OrchestratorResult::Failure { next_wake_secs: 0 };
        assert_eq!(next_delay(&failure, Duration::from_secs(1)), MIN_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_repolls_at_fast_refresh() {
        let provider = CountingProvider::new(Behaviour::Succeed(120.0));
        let mut driver = driver_for(provider.clone());

        driver
            .run(
                Arc::new(Notify::new()),
                shutdown_after(Duration::from_millis(3500)),
            )
            .await;

        // Rounds at t = 0, 1, 2, 3.
        assert_eq!(driver.rounds(), 4);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 4);
        let lines = lines(&driver);
        assert_eq!(lines.len(), 4);
        assert!(lines.iter().all(|line| line == "🚆 120 km/h (P, 0ms)"));
        assert_eq!(provider.destroys.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_follows_backoff() {
        let provider = CountingProvider::new(Behaviour::Fail);
        let mut driver = driver_for(provider.clone());

        // Attempts at t = 0 (retry in 2s), t = 2 (retry in 4s), t = 6 (retry in 8s).
        driver
            .run(
                Arc::new(Notify::new()),
                shutdown_after(Duration::from_secs(10)),
            )
            .await;

        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            lines(&driver),
            vec![
                "no reading, retrying in 2s",
                "no reading, retrying in 4s",
                "no reading, retrying in 8s",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_repolls_immediately() {
        let provider = CountingProvider::new(Behaviour::Fail);
        let mut driver = driver_for(provider.clone());
        let reset = Arc::new(Notify::new());
        // Stored permit, consumed as soon as the first round has finished.
        reset.notify_one();

        driver
            .run(reset, shutdown_after(Duration::from_millis(1500)))
            .await;

        // Without the reset the second attempt would only happen at t = 2.
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(driver.rounds(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_abandons_stalled_round() {
        let provider = CountingProvider::new(Behaviour::Hang);
        let mut driver = driver_for(provider.clone());

        driver
            .run(
                Arc::new(Notify::new()),
                shutdown_after(Duration::from_secs(5)),
            )
            .await;

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(driver.rounds(), 0);
        assert!(lines(&driver).is_empty());
        assert_eq!(provider.destroys.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_skips_rounds_until_connectivity_returns() {
        let provider = CountingProvider::new(Behaviour::Succeed(90.0));
        let (online_tx, online_rx) = watch::channel(false);
        let mut driver = driver_for(provider.clone()).with_connectivity(online_rx);
        let reset = Arc::new(Notify::new());

        let network_back = reset.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(12)).await;
            online_tx.send_replace(true);
            network_back.notify_one();
        });

        driver
            .run(reset, shutdown_after(Duration::from_millis(12500)))
            .await;

        // Offline checks at t = 0, 5 and 10; the reset at t = 12 polls once.
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(lines(&driver), vec!["🚆 90 km/h (P, 0ms)"]);
        assert_eq!(provider.destroys.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_driver_still_shuts_down() {
        let provider = CountingProvider::new(Behaviour::Succeed(90.0));
        let (_online_tx, online_rx) = watch::channel(false);
        let mut driver = driver_for(provider.clone()).with_connectivity(online_rx);

        driver
            .run(
                Arc::new(Notify::new()),
                shutdown_after(Duration::from_secs(30)),
            )
            .await;

        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(driver.rounds(), 0);
        assert_eq!(provider.destroys.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_round_summary_is_logged_at_debug() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let provider = CountingProvider::new(Behaviour::Fail);
        let mut driver = driver_for(provider);
        driver
            .run(
                Arc::new(Notify::new()),
                shutdown_after(Duration::from_millis(500)),
            )
            .await;

        let text = logs.text();
        assert!(text.contains("Round 1: P: ERROR (HTTP 503, retry in 2s)"));
    }
}
