//! Inventory records and reconciliation.

use chrono::{DateTime, Utc};
use common::{InventoryId, ProductId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

use super::ledger::{LedgerEntry, ledger_sum};

/// Stock count for one product variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub id: InventoryId,
    pub product_id: ProductId,
    pub quantity: i64,
    /// Quantity when the record was created; the ledger explains every change since.
    pub initial_quantity: i64,
    pub updated_at: DateTime<Utc>,
}

impl InventoryRecord {
    pub fn new(product_id: ProductId, initial_quantity: i64) -> Self {
        Self {
            id: InventoryId::new(),
            product_id,
            quantity: initial_quantity,
            initial_quantity,
            updated_at: Utc::now(),
        }
    }

    /// Computes `quantity + delta`, failing if the result would be negative
    /// or overflow.
    pub fn quantity_after(&self, delta: i64) -> Result<i64, DomainError> {
        let next = self
            .quantity
            .checked_add(delta)
            .ok_or(DomainError::QuantityOverflow {
                inventory_id: self.id,
                quantity: self.quantity,
                delta,
            })?;
        if next < 0 {
            return Err(DomainError::InsufficientInventory {
                inventory_id: self.id,
                available: self.quantity,
                requested: delta.saturating_neg(),
            });
        }
        Ok(next)
    }

    /// Checks that `requested` units are currently on hand, without taking them.
    pub fn ensure_available(&self, requested: i64) -> Result<(), DomainError> {
        if requested > self.quantity {
            return Err(DomainError::InsufficientInventory {
                inventory_id: self.id,
                available: self.quantity,
                requested,
            });
        }
        Ok(())
    }
}

/// Result of auditing a record against its ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub inventory_id: InventoryId,
    pub initial_quantity: i64,
    pub ledger_sum: i64,
    pub expected_quantity: i64,
    pub actual_quantity: i64,
}

impl Reconciliation {
    pub fn compute<'a>(
        record: &InventoryRecord,
        entries: impl IntoIterator<Item = &'a LedgerEntry>,
    ) -> Self {
        let sum = ledger_sum(
            entries
                .into_iter()
                .filter(|entry| entry.inventory_id == record.id),
        );
        Self {
            inventory_id: record.id,
            initial_quantity: record.initial_quantity,
            ledger_sum: sum,
            expected_quantity: record.initial_quantity + sum,
            actual_quantity: record.quantity,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.expected_quantity == self.actual_quantity
    }

    /// `actual - expected`; zero when consistent.
    pub fn drift(&self) -> i64 {
        self.actual_quantity - self.expected_quantity
    }
}
