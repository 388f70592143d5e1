use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock as StdRwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use common::{InventoryId, NotificationId, OrderId, OrderItemId, ProductId};
use domain::{
    InventoryRecord, LedgerEntry, Money, Notification, NotificationDelivery, Order, OrderItem,
    OrderStatus, ReferenceType, Shipment, Totals,
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard, RwLock};

use crate::{
    Result, StoreError,
    store::{
        CatalogPrices, InventoryRepository, NotificationStore, OrderRepository, Store, UnitOfWork,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RowKey {
    Order(OrderId),
    Inventory(InventoryId),
}

#[derive(Default)]
struct Tables {
    orders: HashMap<OrderId, Order>,
    items: HashMap<OrderId, Vec<OrderItem>>,
    shipments: HashMap<OrderId, Shipment>,
    inventory: HashMap<InventoryId, InventoryRecord>,
    ledger: Vec<LedgerEntry>,
    prices: HashMap<ProductId, Money>,
    notifications: Vec<Notification>,
    deliveries: Vec<NotificationDelivery>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Faults {
    fail_on_status_update: bool,
    fail_on_ledger_append: bool,
    fail_on_commit: bool,
    fail_on_notification_write: bool,
    write_delay: Option<Duration>,
}

#[derive(Default)]
struct Shared {
    tables: RwLock<Tables>,
    row_locks: Mutex<HashMap<RowKey, Arc<AsyncMutex<()>>>>,
    faults: StdRwLock<Faults>,
}

impl Shared {
    fn faults(&self) -> Faults {
        *self.faults.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn row_lock(&self, key: RowKey) -> Arc<AsyncMutex<()>> {
        let mut locks = self.row_locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(key).or_default().clone()
    }

    /// Releases `held` and forgets row locks nobody else is waiting on.
    fn release(&self, held: &mut HashMap<RowKey, OwnedMutexGuard<()>>) {
        if held.is_empty() {
            return;
        }
        let keys: Vec<RowKey> = held.keys().copied().collect();
        held.clear();

        let mut locks = self.row_locks.lock().unwrap_or_else(PoisonError::into_inner);
        for key in keys {
            // Waiters hold their own clone of the lock.
            if locks.get(&key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
                locks.remove(&key);
            }
        }
    }
}

/// In-memory store for tests and local runs.
///
/// Behaves like the PostgreSQL store: per-row exclusive locks held for the
/// life of a unit of work, writes staged until commit, and nothing applied
/// when a unit of work is dropped. Unlike PostgreSQL there is no deadlock
/// detection; callers must take locks in a consistent order. Fault switches let tests force a failure
/// at a chosen step.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    shared: Arc<Shared>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an inventory record.
    pub async fn seed_inventory(&self, record: InventoryRecord) {
        self.shared
            .tables
            .write()
            .await
            .inventory
            .insert(record.id, record);
    }

    /// Sets the catalog price of a product.
    pub async fn set_price(&self, product_id: ProductId, price: Money) {
        self.shared
            .tables
            .write()
            .await
            .prices
            .insert(product_id, price);
    }

    /// Overwrites a stored quantity without a ledger entry, simulating drift.
    pub async fn force_quantity(&self, id: InventoryId, quantity: i64) {
        if let Some(record) = self.shared.tables.write().await.inventory.get_mut(&id) {
            record.quantity = quantity;
        }
    }

    /// Returns the total number of ledger entries stored.
    pub async fn ledger_len(&self) -> usize {
        self.shared.tables.read().await.ledger.len()
    }

    pub fn set_fail_on_status_update(&self, fail: bool) {
        self.update_faults(|faults| faults.fail_on_status_update = fail);
    }

    pub fn set_fail_on_ledger_append(&self, fail: bool) {
        self.update_faults(|faults| faults.fail_on_ledger_append = fail);
    }

    pub fn set_fail_on_commit(&self, fail: bool) {
        self.update_faults(|faults| faults.fail_on_commit = fail);
    }

    pub fn set_fail_on_notification_write(&self, fail: bool) {
        self.update_faults(|faults| faults.fail_on_notification_write = fail);
    }

    /// Delays every status and quantity write, widening race windows.
    pub fn set_write_delay(&self, delay: Option<Duration>) {
        self.update_faults(|faults| faults.write_delay = delay);
    }

    fn update_faults(&self, apply: impl FnOnce(&mut Faults)) {
        let mut faults = self
            .shared
            .faults
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        apply(&mut faults);
    }
}

#[async_trait]
impl Store for InMemoryStore {
    type Uow = InMemoryUnitOfWork;

    async fn begin(&self) -> Result<Self::Uow> {
        Ok(InMemoryUnitOfWork {
            shared: self.shared.clone(),
            held: HashMap::new(),
            staged: Staged::default(),
        })
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.shared.tables.read().await.orders.get(&id).cloned())
    }

    async fn get_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let tables = self.shared.tables.read().await;
        Ok(tables.items.get(&order_id).cloned().unwrap_or_default())
    }

    async fn get_shipment(&self, order_id: OrderId) -> Result<Option<Shipment>> {
        Ok(self.shared.tables.read().await.shipments.get(&order_id).cloned())
    }

    async fn get_inventory(&self, id: InventoryId) -> Result<Option<InventoryRecord>> {
        Ok(self.shared.tables.read().await.inventory.get(&id).cloned())
    }

    async fn ledger_entries(&self, inventory_id: InventoryId) -> Result<Vec<LedgerEntry>> {
        let tables = self.shared.tables.read().await;
        Ok(tables
            .ledger
            .iter()
            .filter(|e| e.inventory_id == inventory_id)
            .cloned()
            .collect())
    }

    async fn ledger_entries_for_order(&self, order_id: OrderId) -> Result<Vec<LedgerEntry>> {
        let tables = self.shared.tables.read().await;
        Ok(tables
            .ledger
            .iter()
            .filter(|e| {
                e.reference_type == Some(ReferenceType::Order)
                    && e.reference_id == Some(order_id.as_uuid())
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CatalogPrices for InMemoryStore {
    async fn current_price(&self, product_id: ProductId) -> Result<Option<Money>> {
        Ok(self.shared.tables.read().await.prices.get(&product_id).copied())
    }
}

#[async_trait]
impl NotificationStore for InMemoryStore {
    async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        if self.shared.faults().fail_on_notification_write {
            return Err(StoreError::Unavailable("notification write disabled".into()));
        }
        self.shared
            .tables
            .write()
            .await
            .notifications
            .push(notification.clone());
        Ok(())
    }

    async fn insert_delivery(&self, delivery: &NotificationDelivery) -> Result<()> {
        if self.shared.faults().fail_on_notification_write {
            return Err(StoreError::Unavailable("notification write disabled".into()));
        }
        self.shared
            .tables
            .write()
            .await
            .deliveries
            .push(delivery.clone());
        Ok(())
    }

    async fn notifications_for_order(&self, order_id: OrderId) -> Result<Vec<Notification>> {
        let tables = self.shared.tables.read().await;
        Ok(tables
            .notifications
            .iter()
            .filter(|n| n.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn deliveries(
        &self,
        notification_id: NotificationId,
    ) -> Result<Vec<NotificationDelivery>> {
        let tables = self.shared.tables.read().await;
        Ok(tables
            .deliveries
            .iter()
            .filter(|d| d.notification_id == notification_id)
            .cloned()
            .collect())
    }
}

/// Writes buffered by an in-memory unit of work.
#[derive(Default)]
struct Staged {
    orders: HashMap<OrderId, Order>,
    items: HashMap<OrderId, Vec<OrderItem>>,
    shipments: HashMap<OrderId, Shipment>,
    inventory: HashMap<InventoryId, InventoryRecord>,
    ledger: Vec<LedgerEntry>,
}

/// Unit of work over [`InMemoryStore`].
pub struct InMemoryUnitOfWork {
    shared: Arc<Shared>,
    held: HashMap<RowKey, OwnedMutexGuard<()>>,
    staged: Staged,
}

impl InMemoryUnitOfWork {
    async fn acquire(&mut self, key: RowKey) {
        if self.held.contains_key(&key) {
            return;
        }
        let lock = self.shared.row_lock(key);
        let guard = lock.lock_owned().await;
        self.held.insert(key, guard);
    }

    async fn delay_write(&self) {
        if let Some(delay) = self.shared.faults().write_delay {
            tokio::time::sleep(delay).await;
        }
    }

    async fn current_order(&self, id: OrderId) -> Option<Order> {
        match self.staged.orders.get(&id) {
            Some(order) => Some(order.clone()),
            None => self.shared.tables.read().await.orders.get(&id).cloned(),
        }
    }

    /// Copy-on-write view of an order's item list.
    async fn items_mut(&mut self, order_id: OrderId) -> &mut Vec<OrderItem> {
        if !self.staged.items.contains_key(&order_id) {
            let committed = self
                .shared
                .tables
                .read()
                .await
                .items
                .get(&order_id)
                .cloned()
                .unwrap_or_default();
            self.staged.items.insert(order_id, committed);
        }
        self.staged.items.entry(order_id).or_default()
    }

    /// Finds the order owning an item, taking that order's lock.
    async fn owning_order(&mut self, item_id: OrderItemId) -> Result<OrderId> {
        let staged = self
            .staged
            .items
            .iter()
            .find(|(_, items)| items.iter().any(|i| i.id == item_id))
            .map(|(order_id, _)| *order_id);
        let order_id = match staged {
            Some(order_id) => order_id,
            None => self
                .shared
                .tables
                .read()
                .await
                .items
                .iter()
                .find(|(_, items)| items.iter().any(|i| i.id == item_id))
                .map(|(order_id, _)| *order_id)
                .ok_or_else(|| StoreError::row_not_found("order_items", item_id))?,
        };
        self.acquire(RowKey::Order(order_id)).await;
        Ok(order_id)
    }

    async fn current_inventory(&self, id: InventoryId) -> Option<InventoryRecord> {
        match self.staged.inventory.get(&id) {
            Some(record) => Some(record.clone()),
            None => self.shared.tables.read().await.inventory.get(&id).cloned(),
        }
    }
}

#[async_trait]
impl OrderRepository for InMemoryUnitOfWork {
    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        self.acquire(RowKey::Order(id)).await;
        Ok(self.current_order(id).await)
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        self.acquire(RowKey::Order(order.id)).await;
        self.staged.orders.insert(order.id, order.clone());
        self.staged.items.entry(order.id).or_default();
        Ok(())
    }

    async fn update_status_if(
        &mut self,
        id: OrderId,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<bool> {
        self.acquire(RowKey::Order(id)).await;
        self.delay_write().await;
        if self.shared.faults().fail_on_status_update {
            return Err(StoreError::Unavailable("status update disabled".into()));
        }

        let Some(mut order) = self.current_order(id).await else {
            return Ok(false);
        };
        if order.status != expected {
            return Ok(false);
        }
        order.status = next;
        order.updated_at = Utc::now();
        self.staged.orders.insert(id, order);
        Ok(true)
    }

    async fn update_totals(&mut self, id: OrderId, totals: Totals) -> Result<()> {
        self.acquire(RowKey::Order(id)).await;
        let mut order = self
            .current_order(id)
            .await
            .ok_or_else(|| StoreError::row_not_found("orders", id))?;
        order.totals = totals;
        order.updated_at = Utc::now();
        self.staged.orders.insert(id, order);
        Ok(())
    }

    async fn list_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        if let Some(items) = self.staged.items.get(&order_id) {
            return Ok(items.clone());
        }
        let tables = self.shared.tables.read().await;
        Ok(tables.items.get(&order_id).cloned().unwrap_or_default())
    }

    async fn insert_item(&mut self, item: &OrderItem) -> Result<()> {
        self.acquire(RowKey::Order(item.order_id)).await;
        if self.current_order(item.order_id).await.is_none() {
            return Err(StoreError::row_not_found("orders", item.order_id));
        }
        self.items_mut(item.order_id).await.push(item.clone());
        Ok(())
    }

    async fn update_item_quantity(&mut self, item_id: OrderItemId, quantity: u32) -> Result<()> {
        let order_id = self.owning_order(item_id).await?;
        let items = self.items_mut(order_id).await;
        let item = items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| StoreError::row_not_found("order_items", item_id))?;
        item.quantity = quantity;
        Ok(())
    }

    async fn delete_item(&mut self, item_id: OrderItemId) -> Result<bool> {
        let order_id = match self.owning_order(item_id).await {
            Ok(order_id) => order_id,
            Err(StoreError::RowNotFound { .. }) => return Ok(false),
            Err(e) => return Err(e),
        };
        let items = self.items_mut(order_id).await;
        let before = items.len();
        items.retain(|i| i.id != item_id);
        Ok(items.len() != before)
    }

    async fn upsert_shipment(&mut self, shipment: &Shipment) -> Result<()> {
        self.acquire(RowKey::Order(shipment.order_id)).await;
        self.staged
            .shipments
            .insert(shipment.order_id, shipment.clone());
        Ok(())
    }

    async fn shipment(&mut self, order_id: OrderId) -> Result<Option<Shipment>> {
        if let Some(shipment) = self.staged.shipments.get(&order_id) {
            return Ok(Some(shipment.clone()));
        }
        Ok(self.shared.tables.read().await.shipments.get(&order_id).cloned())
    }
}

#[async_trait]
impl InventoryRepository for InMemoryUnitOfWork {
    async fn lock_inventory(&mut self, id: InventoryId) -> Result<Option<InventoryRecord>> {
        self.acquire(RowKey::Inventory(id)).await;
        Ok(self.current_inventory(id).await)
    }

    async fn save_quantity(&mut self, id: InventoryId, quantity: i64) -> Result<()> {
        self.acquire(RowKey::Inventory(id)).await;
        self.delay_write().await;
        let mut record = self
            .current_inventory(id)
            .await
            .ok_or_else(|| StoreError::row_not_found("inventory_records", id))?;
        if quantity < 0 {
            return Err(StoreError::corrupt(
                "inventory_records",
                format!("negative quantity {quantity} for {id}"),
            ));
        }
        record.quantity = quantity;
        record.updated_at = Utc::now();
        self.staged.inventory.insert(id, record);
        Ok(())
    }

    async fn append_ledger_entry(&mut self, entry: &LedgerEntry) -> Result<()> {
        if self.shared.faults().fail_on_ledger_append {
            return Err(StoreError::Unavailable("ledger append disabled".into()));
        }
        self.staged.ledger.push(entry.clone());
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn commit(mut self) -> Result<()> {
        if self.shared.faults().fail_on_commit {
            return Err(StoreError::Unavailable("commit disabled".into()));
        }

        let staged = std::mem::take(&mut self.staged);
        let mut tables = self.shared.tables.write().await;
        tables.orders.extend(staged.orders);
        tables.items.extend(staged.items);
        tables.shipments.extend(staged.shipments);
        tables.inventory.extend(staged.inventory);
        tables.ledger.extend(staged.ledger);
        drop(tables);

        // Row locks are released only after the writes are visible.
        self.shared.release(&mut self.held);
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}

impl Drop for InMemoryUnitOfWork {
    fn drop(&mut self) {
        self.shared.release(&mut self.held);
    }
}
