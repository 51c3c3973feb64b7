//! Loft Dispatcher - Main Entry Point

mod config;
mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use loft_api_rpc::RpcServer;
use loft_core::application::{shutdown_channel, QueueSet, TimeoutSweeper};
use loft_core::port::id_provider::UuidProvider;
use loft_core::port::time_provider::SystemTimeProvider;

use crate::config::DaemonConfig;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration (fails fast on malformed env)
    let config = DaemonConfig::from_env()?;

    // 2. Initialize logging
    let _log_guard = telemetry::init(&config.logging)?;

    info!(
        version = VERSION,
        worker_version = %config.dispatcher.expected_version,
        local_only = config.dispatcher.local_only,
        host_signature = %config.dispatcher.host_signature,
        "Loft dispatcher starting"
    );

    // 3. Setup dependencies (DI wiring)
    let queues = Arc::new(QueueSet::new(
        &config.dispatcher,
        Arc::new(SystemTimeProvider),
        Arc::new(UuidProvider),
    ));

    // 4. Start timeout sweeper
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let sweeper = TimeoutSweeper::new(queues.clone(), config.dispatcher.sweep_interval);
    let sweeper_handle = tokio::spawn(sweeper.run(shutdown_rx));

    // 5. Start JSON-RPC server
    let server = RpcServer::new(config.rpc.clone(), queues.clone())
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    info!(addr = %server.local_addr, "System ready. Press Ctrl+C to shut down");

    // 6. Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("Shutdown signal received. Exiting gracefully...");

    // 7. Graceful shutdown
    shutdown_tx.shutdown();
    server
        .handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    if tokio::time::timeout(SHUTDOWN_GRACE, server.handle.stopped())
        .await
        .is_err()
    {
        warn!("RPC server did not stop within grace period");
    }
    let _ = tokio::time::timeout(SHUTDOWN_GRACE, sweeper_handle).await;

    queues.shutdown();
    telemetry::shutdown();

    info!("Shutdown complete.");
    Ok(())
}
