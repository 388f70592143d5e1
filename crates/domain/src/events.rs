//! Order lifecycle events emitted after a committed mutation.

use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use serde::{Deserialize, Serialize};

use crate::order::OrderStatus;

/// What happened to the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum OrderEventKind {
    /// Order was created.
    Created,

    /// Order moved between statuses.
    StatusChanged { from: OrderStatus, to: OrderStatus },
}

/// A committed order change, delivered to the notification dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub order_id: OrderId,
    pub kind: OrderEventKind,
    /// User who triggered the change, when known.
    pub actor: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

impl OrderEvent {
    pub fn created(order_id: OrderId, actor: Option<UserId>) -> Self {
        Self {
            order_id,
            kind: OrderEventKind::Created,
            actor,
            occurred_at: Utc::now(),
        }
    }

    pub fn status_changed(
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        actor: Option<UserId>,
    ) -> Self {
        Self {
            order_id,
            kind: OrderEventKind::StatusChanged { from, to },
            actor,
            occurred_at: Utc::now(),
        }
    }

    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        match self.kind {
            OrderEventKind::Created => "order_created",
            OrderEventKind::StatusChanged { .. } => "order_status_changed",
        }
    }

    /// Status the order is in after this event.
    pub fn status(&self) -> OrderStatus {
        match self.kind {
            OrderEventKind::Created => OrderStatus::PendingConfirmation,
            OrderEventKind::StatusChanged { to, .. } => to,
        }
    }
}
