mod config;
mod driver;
mod main_lib;
mod output;

use std::sync::Arc;

use config::Config;
use driver::UpdateDriver;
use main_lib::{build_orchestrator, init_tracing, spawn_signal_handlers};
use tokio::sync::{watch, Notify};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing();
    let orchestrator = build_orchestrator(&config);

    let reset = Arc::new(Notify::new());
    let (online_tx, online_rx) = watch::channel(true);
    let shutdown = CancellationToken::new();
    spawn_signal_handlers(reset.clone(), online_tx, shutdown.clone());

    let mut driver = UpdateDriver::new(orchestrator, &config, std::io::stdout())
        .with_connectivity(online_rx);
    driver.run(reset, shutdown).await;
    Ok(())
}
