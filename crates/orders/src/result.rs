//! Caller-facing operation results.

use domain::Order;
use serde::{Deserialize, Serialize};

use crate::error::CoordinatorError;

/// Category of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidTransition,
    InsufficientInventory,
    Conflict,
    PersistenceFailure,
    /// Only ever recorded on delivery rows; never returned to callers.
    NotificationFailure,
    Cancelled,
    InvalidRequest,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidTransition => "invalid_transition",
            ErrorKind::InsufficientInventory => "insufficient_inventory",
            ErrorKind::Conflict => "conflict",
            ErrorKind::PersistenceFailure => "persistence_failure",
            ErrorKind::NotificationFailure => "notification_failure",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::InvalidRequest => "invalid_request",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a mutating order operation.
///
/// On success `order` holds the persisted state; on failure nothing the
/// operation wrote survived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Order>,
}

impl OrderResult {
    pub fn ok(order: Order, message: impl Into<String>) -> Self {
        Self {
            success: true,
            kind: None,
            message: message.into(),
            order: Some(order),
        }
    }

    pub fn failed(err: &CoordinatorError) -> Self {
        Self {
            success: false,
            kind: Some(err.kind()),
            message: err.to_string(),
            order: None,
        }
    }

    pub(crate) fn from_outcome(
        outcome: Result<Order, CoordinatorError>,
        message: impl FnOnce(&Order) -> String,
    ) -> Self {
        match outcome {
            Ok(order) => {
                let message = message(&order);
                Self::ok(order, message)
            }
            Err(err) => Self::failed(&err),
        }
    }
}
