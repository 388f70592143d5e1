//! Startup errors.

use thiserror::Error;

/// Errors that stop the process before it is ready.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Invalid configuration: {key}={value:?}: {reason}")]
    Config {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Failed to initialize tracing: {0}")]
    Tracing(String),

    #[error("Failed to install metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("Notification sender error: {0}")]
    Sender(#[from] notify::SendError),
}

impl StartupError {
    pub(crate) fn config(key: &'static str, value: &str, reason: impl ToString) -> Self {
        Self::Config {
            key,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}
