//! Tracing and metrics installation.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LogFormat;
use crate::error::StartupError;

/// Installs the global tracing subscriber.
///
/// An unparsable `filter` falls back to `info`.
pub fn init_tracing(filter: &str, format: LogFormat) -> Result<(), StartupError> {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
    }
    .map_err(|e| StartupError::Tracing(e.to_string()))
}

/// Installs the Prometheus recorder and serves `/metrics` on `addr`.
///
/// Must be called from inside the tokio runtime.
pub fn install_metrics(addr: SocketAddr) -> Result<(), StartupError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    Ok(())
}
