//! Courier - Webhook Callback Delivery Daemon
//!
//! Wires the SQLite queue, the HTTP sender and the worker pool together and
//! exposes the producer surface over JSON-RPC.

mod config;
mod telemetry;

use anyhow::{Context, Result};
use config::{DaemonConfig, LogFormat};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use courier_api_rpc::{RpcHandler, RpcServer, RpcServerConfig};
use courier_core::application::WorkerPool;
use courier_core::port::id_provider::UuidProvider;
use courier_core::port::time_provider::SystemTimeProvider;
use courier_infra_http::{ClientConfig, HttpCallbackSender};
use courier_infra_sqlite::{create_pool, run_migrations, SqliteQueue};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn init_logging() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("courier=info"))
        .context("Failed to create env filter")?;

    // Built first; a misconfiguration is reported once logging is up
    let (otel_layer, otel_error) = match telemetry::otel_layer() {
        Ok(layer) => (layer, None),
        Err(e) => (None, Some(e)),
    };

    let registry = tracing_subscriber::registry().with(otel_layer).with(env_filter);
    match config::log_format() {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).init(),
    }

    if let Some(e) = otel_error {
        warn!(error = %e, "OpenTelemetry disabled");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Logging (+ optional OTLP export)
    init_logging()?;
    info!("Courier v{} starting...", VERSION);

    // 2. Configuration
    let config = DaemonConfig::from_env().context("Invalid configuration")?;
    info!(
        db_path = %config.db_path,
        workers = config.workers,
        visibility_timeout_secs = config.visibility_timeout.as_secs(),
        retry_delay_secs = config.retry_delay.as_secs(),
        "Configuration loaded"
    );

    // 3. Database
    if let Some(parent) = std::path::Path::new(&config.db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    let db = create_pool(&config.database_url())
        .await
        .context("DB pool creation failed")?;
    run_migrations(&db).await.context("Migration failed")?;

    // 4. Dependencies (DI wiring)
    let queue = Arc::new(SqliteQueue::new(
        db.clone(),
        Arc::new(SystemTimeProvider),
        Arc::new(UuidProvider),
        config.visibility_timeout,
    ));
    let sender = Arc::new(
        HttpCallbackSender::new(ClientConfig {
            timeout: config.http_timeout,
            ..ClientConfig::default()
        })
        .context("HTTP client setup failed")?,
    );

    // 5. Workers
    let mut pool = WorkerPool::new(config.pool_config(), queue.clone(), sender)?;
    pool.start()?;

    // 6. JSON-RPC producer surface
    let rpc_config = RpcServerConfig {
        host: config.rpc_host.clone(),
        port: config.rpc_port,
    };
    let handler = RpcHandler::new(pool.producer(), queue, pool.monitor());
    let (rpc_addr, rpc_handle) = match RpcServer::new(rpc_config, handler).start().await {
        Ok(started) => started,
        Err(e) => {
            // Workers are already running; stop them before bailing out
            if let Err(stop_err) = pool.stop().await {
                error!(error = %stop_err, "Worker pool stopped with errors");
            }
            return Err(e).context("RPC server start failed");
        }
    };

    info!(rpc_addr = %rpc_addr, "System ready. Press Ctrl+C to shutdown");

    // 7. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, draining in-flight deliveries...");

    // 8. Graceful shutdown: stop accepting work, then drain workers
    if let Err(e) = rpc_handle.stop() {
        warn!(error = %e, "RPC server already stopped");
    }
    rpc_handle.stopped().await;

    match tokio::time::timeout(config.shutdown_timeout, pool.stop()).await {
        Ok(Ok(())) => info!("Worker pool drained"),
        Ok(Err(e)) => error!(error = %e, "Worker pool stopped with errors"),
        Err(_) => warn!(
            timeout_secs = config.shutdown_timeout.as_secs(),
            "Shutdown timeout elapsed; unfinished messages will be redelivered"
        ),
    }

    db.close().await;
    telemetry::shutdown();
    info!("Shutdown complete.");
    Ok(())
}
