//! Host process for the order engine.
//!
//! Loads [`Config`] from the environment, installs tracing and the Prometheus
//! exporter, connects to PostgreSQL, and runs the notification dispatcher
//! alongside the [`orders::OrderCoordinator`] until shutdown.

pub mod app;
pub mod config;
pub mod error;
pub mod telemetry;

pub use app::App;
pub use config::{Config, LogFormat};
pub use error::StartupError;
