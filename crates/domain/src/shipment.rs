//! Shipment records.

use chrono::{DateTime, Utc};
use common::{OrderId, ShipmentId};
use serde::{Deserialize, Serialize};

/// Carrier reference for an order; at most one per order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: ShipmentId,
    pub order_id: OrderId,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Shipment {
    /// Empty shipment created alongside a new order.
    pub fn placeholder(order_id: OrderId) -> Self {
        let now = Utc::now();
        Self {
            id: ShipmentId::new(),
            order_id,
            tracking_number: None,
            carrier: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns a copy carrying the given tracking reference.
    pub fn with_tracking(&self, tracking_number: impl Into<String>, carrier: Option<String>) -> Self {
        Self {
            tracking_number: Some(tracking_number.into()),
            carrier,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }

    pub fn has_tracking(&self) -> bool {
        self.tracking_number.is_some()
    }
}
