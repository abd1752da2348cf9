//! `ddms-poller` -- Modbus TCP device polling daemon.
//!
//! Loads every configured device from PostgreSQL, polls each on its own
//! sampling interval, stores readings and connection status, and alerts
//! owners and admins when a device stops responding. Runs until SIGINT
//! or SIGTERM, then closes every device session before exiting.
//!
//! See [`ddms_poller::config::PollerConfig::from_env`] for the environment
//! variables.

use std::sync::Arc;

use ddms_db::PgStore;
use ddms_modbus::{DeviceManager, TcpTransportFactory};
use ddms_poller::config::{LogFormat, PollerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = PollerConfig::from_env();

    // --- Tracing ---
    init_tracing(
        config
            .as_ref()
            .map(|c| c.log_format)
            .unwrap_or_default(),
    );

    // --- Configuration ---
    let config = config.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });
    tracing::info!(
        db_max_connections = config.db_max_connections,
        reconnect_delay_secs = config.polling.reconnect_delay.as_secs(),
        failure_threshold = config.polling.failure_threshold,
        modbus_timeout_secs = config.polling.collector.timeout.as_secs(),
        modbus_retries = config.polling.collector.retries,
        "Loaded poller configuration",
    );

    // --- Database ---
    let pool = ddms_db::create_pool(&config.database_url, config.db_max_connections)
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to connect to database");
            std::process::exit(1);
        });
    tracing::info!("Database connection pool created");

    if let Err(e) = ddms_db::health_check(&pool).await {
        tracing::error!(error = %e, "Database health check failed");
        std::process::exit(1);
    }
    tracing::info!("Database health check passed");

    // --- Device manager ---
    let store = Arc::new(PgStore::new(pool.clone()));
    let manager = Arc::new(DeviceManager::new(
        store,
        Arc::new(TcpTransportFactory),
        config.polling,
    ));
    let started = manager.start().await;
    tracing::info!(devices = started, "Device polling started");

    shutdown_signal().await;

    // --- Shutdown ---
    manager.stop().await;
    pool.close().await;
    tracing::info!("Graceful shutdown complete");
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ddms_poller=info,ddms_modbus=info,ddms_events=info,ddms_db=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
