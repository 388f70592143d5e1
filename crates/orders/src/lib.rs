//! Order lifecycle coordination.
//!
//! [`OrderCoordinator`] is the entry point: it runs every order mutation as
//! one unit of work against a [`store::Store`], applies inventory effects
//! through the [`InventoryAdjuster`], and hands committed events to a
//! [`notify::Notifier`].

pub mod adjuster;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod request;
pub mod result;

pub use adjuster::InventoryAdjuster;
pub use config::EngineConfig;
pub use coordinator::OrderCoordinator;
pub use error::{AdjustError, CoordinatorError, Result};
pub use request::{CreateOrderRequest, LineRequest, OperationContext, OrderDetails};
pub use result::{ErrorKind, OrderResult};
