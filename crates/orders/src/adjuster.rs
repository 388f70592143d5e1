//! Inventory adjuster: the only writer of inventory quantities.

use domain::{Adjustment, InventoryPlan, InventoryRecord, LedgerEntry};
use store::InventoryRepository;

use crate::error::AdjustError;

/// Applies signed quantity changes inside an open unit of work.
///
/// Each adjustment locks the inventory row, checks the result stays
/// non-negative, saves the new quantity and appends exactly one ledger entry.
/// Nothing here commits; the caller's unit of work decides.
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryAdjuster;

impl InventoryAdjuster {
    pub fn new() -> Self {
        Self
    }

    /// Applies one adjustment and returns the updated record.
    #[tracing::instrument(
        skip(self, repo, adjustment),
        fields(inventory_id = %adjustment.inventory_id, delta = adjustment.delta, reason = %adjustment.reason)
    )]
    pub async fn adjust<R>(
        &self,
        repo: &mut R,
        adjustment: &Adjustment,
    ) -> Result<InventoryRecord, AdjustError>
    where
        R: InventoryRepository + ?Sized,
    {
        adjustment.validate()?;

        let mut record = repo
            .lock_inventory(adjustment.inventory_id)
            .await?
            .ok_or(AdjustError::NotFound(adjustment.inventory_id))?;

        let quantity = record.quantity_after(adjustment.delta)?;
        repo.save_quantity(record.id, quantity).await?;
        repo.append_ledger_entry(&LedgerEntry::record(adjustment))
            .await?;

        metrics::counter!(
            "inventory_adjustments_total",
            "reason" => adjustment.reason.as_str(),
            "type" => adjustment.transaction_type.as_str()
        )
        .increment(1);
        tracing::debug!(before = record.quantity, after = quantity, "inventory adjusted");

        record.quantity = quantity;
        Ok(record)
    }

    /// Applies every line of `plan` in order, stopping at the first failure.
    pub async fn apply_plan<R>(&self, repo: &mut R, plan: &InventoryPlan) -> Result<(), AdjustError>
    where
        R: InventoryRepository + ?Sized,
    {
        for line in plan.lines() {
            self.adjust(repo, &line.adjustment).await?;
        }
        Ok(())
    }
}
