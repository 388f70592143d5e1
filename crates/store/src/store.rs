use async_trait::async_trait;
use common::{InventoryId, NotificationId, OrderId, OrderItemId, ProductId};
use domain::{
    InventoryRecord, LedgerEntry, Money, Notification, NotificationDelivery, Order, OrderItem,
    OrderStatus, Shipment, Totals,
};

use crate::Result;

/// Order writes scoped to one unit of work.
///
/// Every method that touches an order row takes that row's exclusive lock
/// first; the lock is held until the unit of work ends.
#[async_trait]
pub trait OrderRepository: Send {
    /// Locks the order row and returns it as seen inside this unit of work.
    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>>;

    /// Inserts a new order row.
    async fn insert_order(&mut self, order: &Order) -> Result<()>;

    /// Sets the status only if it is still `expected`.
    ///
    /// Returns false, writing nothing, when another writer changed it first.
    async fn update_status_if(
        &mut self,
        id: OrderId,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<bool>;

    /// Overwrites the stored totals.
    async fn update_totals(&mut self, id: OrderId, totals: Totals) -> Result<()>;

    /// Items of the order, in insertion order.
    async fn list_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItem>>;

    async fn insert_item(&mut self, item: &OrderItem) -> Result<()>;

    /// Changes an item's quantity; the price snapshot is untouched.
    async fn update_item_quantity(&mut self, item_id: OrderItemId, quantity: u32) -> Result<()>;

    /// Returns false if the item did not exist.
    async fn delete_item(&mut self, item_id: OrderItemId) -> Result<bool>;

    /// Inserts or replaces the order's shipment row.
    async fn upsert_shipment(&mut self, shipment: &Shipment) -> Result<()>;

    async fn shipment(&mut self, order_id: OrderId) -> Result<Option<Shipment>>;
}

/// Inventory writes scoped to one unit of work.
#[async_trait]
pub trait InventoryRepository: Send {
    /// Locks the inventory row and returns it as seen inside this unit of work.
    async fn lock_inventory(&mut self, id: InventoryId) -> Result<Option<InventoryRecord>>;

    /// Persists a new quantity for a locked row.
    async fn save_quantity(&mut self, id: InventoryId, quantity: i64) -> Result<()>;

    /// Appends one ledger row. Entries are never updated or deleted.
    async fn append_ledger_entry(&mut self, entry: &LedgerEntry) -> Result<()>;
}

/// An atomic scope spanning order and inventory writes.
///
/// Nothing written through it is visible to others until [`commit`]
/// succeeds. Dropping it without committing discards every write and
/// releases every lock.
///
/// [`commit`]: UnitOfWork::commit
#[async_trait]
pub trait UnitOfWork: OrderRepository + InventoryRepository {
    async fn commit(self) -> Result<()>;

    async fn rollback(self) -> Result<()>;
}

/// Entry point to persistence: committed reads plus unit-of-work creation.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    type Uow: UnitOfWork + 'static;

    /// Opens a new unit of work.
    async fn begin(&self) -> Result<Self::Uow>;

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    async fn get_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>>;

    async fn get_shipment(&self, order_id: OrderId) -> Result<Option<Shipment>>;

    async fn get_inventory(&self, id: InventoryId) -> Result<Option<InventoryRecord>>;

    /// Ledger rows for one inventory record, oldest first.
    async fn ledger_entries(&self, inventory_id: InventoryId) -> Result<Vec<LedgerEntry>>;

    /// Ledger rows referencing one order, oldest first.
    async fn ledger_entries_for_order(&self, order_id: OrderId) -> Result<Vec<LedgerEntry>>;
}

/// Current catalog price lookup, used to freeze `price_at_order`.
#[async_trait]
pub trait CatalogPrices: Send + Sync {
    async fn current_price(&self, product_id: ProductId) -> Result<Option<Money>>;
}

/// Persistence for notifications and their delivery attempts.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_notification(&self, notification: &Notification) -> Result<()>;

    async fn insert_delivery(&self, delivery: &NotificationDelivery) -> Result<()>;

    async fn notifications_for_order(&self, order_id: OrderId) -> Result<Vec<Notification>>;

    async fn deliveries(&self, notification_id: NotificationId)
    -> Result<Vec<NotificationDelivery>>;
}
