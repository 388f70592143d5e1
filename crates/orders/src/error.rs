//! Coordinator and adjuster error types.

use std::time::Duration;

use common::{InventoryId, OrderId, OrderItemId, ProductId};
use domain::{DomainError, OrderStatus};
use store::StoreError;
use thiserror::Error;

use crate::result::ErrorKind;

/// Errors raised by the inventory adjuster.
#[derive(Debug, Error)]
pub enum AdjustError {
    /// The inventory record does not exist.
    #[error("Inventory record not found: {0}")]
    NotFound(InventoryId),

    /// The adjustment broke a domain rule (negative result, zero delta).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors raised by the order coordinator.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Order item {item_id} not found on order {order_id}")]
    ItemNotFound {
        order_id: OrderId,
        item_id: OrderItemId,
    },

    #[error("Inventory record not found: {0}")]
    InventoryNotFound(InventoryId),

    #[error("No catalog price for product {0}")]
    PriceNotFound(ProductId),

    /// Another writer changed the order status after it was loaded.
    #[error("Order {order_id} is no longer {expected}; it was changed concurrently")]
    Conflict {
        order_id: OrderId,
        expected: OrderStatus,
    },

    /// Tracking cannot be recorded once the order is closed.
    #[error("Cannot record tracking for order {order_id} in {status} status")]
    TrackingClosed {
        order_id: OrderId,
        status: OrderStatus,
    },

    /// The request is malformed in a way the domain types cannot express.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Domain rule violation.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Store error; the unit of work was rolled back.
    #[error("Persistence failure: {0}")]
    Store(#[from] StoreError),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out after {0:?}")]
    TimedOut(Duration),
}

impl From<AdjustError> for CoordinatorError {
    fn from(err: AdjustError) -> Self {
        match err {
            AdjustError::NotFound(id) => CoordinatorError::InventoryNotFound(id),
            AdjustError::Domain(e) => CoordinatorError::Domain(e),
            AdjustError::Store(e) => CoordinatorError::Store(e),
        }
    }
}

impl CoordinatorError {
    /// Caller-facing category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoordinatorError::OrderNotFound(_)
            | CoordinatorError::ItemNotFound { .. }
            | CoordinatorError::InventoryNotFound(_)
            | CoordinatorError::PriceNotFound(_) => ErrorKind::NotFound,
            CoordinatorError::Conflict { .. } => ErrorKind::Conflict,
            CoordinatorError::TrackingClosed { .. } => ErrorKind::InvalidTransition,
            CoordinatorError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            CoordinatorError::Domain(e) => match e {
                DomainError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
                DomainError::InsufficientInventory { .. } => ErrorKind::InsufficientInventory,
                DomainError::NotEditable { .. }
                | DomainError::InvalidQuantity { .. }
                | DomainError::InvalidDiscount { .. }
                | DomainError::NoItems
                | DomainError::ZeroDelta { .. }
                | DomainError::QuantityOverflow { .. }
                | DomainError::AmountOverflow => ErrorKind::InvalidRequest,
            },
            CoordinatorError::Store(_) => ErrorKind::PersistenceFailure,
            CoordinatorError::Cancelled | CoordinatorError::TimedOut(_) => ErrorKind::Cancelled,
        }
    }
}

/// Convenience type alias for coordinator results.
pub type Result<T> = std::result::Result<T, CoordinatorError>;
