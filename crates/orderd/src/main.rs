//! Order engine entry point.

use std::sync::Arc;

use orderd::{App, Config, StartupError, telemetry};
use sqlx::postgres::PgPoolOptions;
use store::PostgresStore;
use tokio::signal;

/// Waits for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    // 1. Configuration and observability
    let config = Config::from_env()?;
    telemetry::init_tracing(&config.log_level, config.log_format)?;
    telemetry::install_metrics(config.metrics_addr)?;
    tracing::info!(metrics_addr = %config.metrics_addr, "metrics exporter listening");

    // 2. Database
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;
    let store = PostgresStore::new(pool);
    store.run_migrations().await?;
    tracing::info!("database migrations applied");

    // 3. Dispatcher and coordinator
    let app = App::start(store.clone(), store.clone(), Arc::new(store), &config)?;
    tracing::info!(
        timeout_ms = config.engine.operation_timeout.as_millis() as u64,
        "order engine ready"
    );

    shutdown_signal().await;
    app.shutdown().await;
    Ok(())
}
