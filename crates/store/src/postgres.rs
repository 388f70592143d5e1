use async_trait::async_trait;
use chrono::Utc;
use common::{
    InventoryId, LedgerEntryId, NotificationId, OrderId, OrderItemId, ProductId, ShipmentId,
    UserId,
};
use domain::{
    InventoryRecord, LedgerEntry, Money, Notification, NotificationDelivery, Order, OrderItem,
    OrderStatus, ReferenceType, Shipment, ShippingContact, Totals,
};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Result, StoreError,
    store::{
        CatalogPrices, InventoryRepository, NotificationStore, OrderRepository, Store, UnitOfWork,
    },
};

const ORDER_COLUMNS: &str = "id, status, total_amount, discount_amount, final_total_amount, \
     created_by, recipient_name, phone, address, note, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, order_id, inventory_id, quantity, price_at_order";

const SHIPMENT_COLUMNS: &str =
    "id, order_id, tracking_number, carrier, created_at, updated_at";

const INVENTORY_COLUMNS: &str = "id, product_id, quantity, initial_quantity, updated_at";

const LEDGER_COLUMNS: &str =
    "id, inventory_id, delta, transaction_type, reason, reference_id, reference_type, created_at";

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::debug!("migrations up to date");
        Ok(())
    }

    /// Inserts an inventory record.
    pub async fn insert_inventory(&self, record: &InventoryRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory_records (id, product_id, quantity, initial_quantity, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.product_id.as_uuid())
        .bind(record.quantity)
        .bind(record.initial_quantity)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Inserts or replaces the catalog price of a product.
    pub async fn set_price(&self, product_id: ProductId, price: Money) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO catalog_prices (product_id, price_cents, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (product_id)
            DO UPDATE SET price_cents = EXCLUDED.price_cents, updated_at = NOW()
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(price.cents())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn row_to_order(row: &PgRow) -> Result<Order> {
    let status: String = row.try_get("status")?;
    let status = status
        .parse::<OrderStatus>()
        .map_err(|e| StoreError::corrupt("orders", e))?;

    Ok(Order {
        id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
        status,
        totals: Totals {
            total_amount: Money::from_cents(row.try_get("total_amount")?),
            discount_amount: Money::from_cents(row.try_get("discount_amount")?),
            final_total_amount: Money::from_cents(row.try_get("final_total_amount")?),
        },
        created_by: row
            .try_get::<Option<Uuid>, _>("created_by")?
            .map(UserId::from_uuid),
        shipping: ShippingContact {
            recipient_name: row.try_get("recipient_name")?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
            note: row.try_get("note")?,
        },
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_item(row: &PgRow) -> Result<OrderItem> {
    let quantity: i32 = row.try_get("quantity")?;
    let quantity = u32::try_from(quantity).map_err(|e| StoreError::corrupt("order_items", e))?;

    Ok(OrderItem {
        id: OrderItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
        order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
        inventory_id: InventoryId::from_uuid(row.try_get::<Uuid, _>("inventory_id")?),
        quantity,
        price_at_order: Money::from_cents(row.try_get("price_at_order")?),
    })
}

fn row_to_shipment(row: &PgRow) -> Result<Shipment> {
    Ok(Shipment {
        id: ShipmentId::from_uuid(row.try_get::<Uuid, _>("id")?),
        order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
        tracking_number: row.try_get("tracking_number")?,
        carrier: row.try_get("carrier")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_inventory(row: &PgRow) -> Result<InventoryRecord> {
    Ok(InventoryRecord {
        id: InventoryId::from_uuid(row.try_get::<Uuid, _>("id")?),
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        quantity: row.try_get("quantity")?,
        initial_quantity: row.try_get("initial_quantity")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_ledger(row: &PgRow) -> Result<LedgerEntry> {
    let corrupt = |e| StoreError::corrupt("inventory_ledger", e);
    let transaction_type: String = row.try_get("transaction_type")?;
    let reason: String = row.try_get("reason")?;
    let reference_type: Option<String> = row.try_get("reference_type")?;

    Ok(LedgerEntry {
        id: LedgerEntryId::from_uuid(row.try_get::<Uuid, _>("id")?),
        inventory_id: InventoryId::from_uuid(row.try_get::<Uuid, _>("inventory_id")?),
        delta: row.try_get("delta")?,
        transaction_type: transaction_type.parse().map_err(corrupt)?,
        reason: reason.parse().map_err(corrupt)?,
        reference_id: row.try_get("reference_id")?,
        reference_type: reference_type
            .map(|t| t.parse::<ReferenceType>())
            .transpose()
            .map_err(corrupt)?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_notification(row: &PgRow) -> Result<Notification> {
    Ok(Notification {
        id: NotificationId::from_uuid(row.try_get::<Uuid, _>("id")?),
        order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
        event_type: row.try_get("event_type")?,
        title: row.try_get("title")?,
        message: row.try_get("message")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_delivery(row: &PgRow) -> Result<NotificationDelivery> {
    let channel: String = row.try_get("channel")?;
    let status: String = row.try_get("status")?;

    Ok(NotificationDelivery {
        notification_id: NotificationId::from_uuid(row.try_get::<Uuid, _>("notification_id")?),
        channel: channel
            .parse()
            .map_err(|e| StoreError::corrupt("notification_deliveries", e))?,
        recipient: UserId::from_uuid(row.try_get::<Uuid, _>("recipient")?),
        status: status
            .parse()
            .map_err(|e| StoreError::corrupt("notification_deliveries", e))?,
        failure_reason: row.try_get("failure_reason")?,
        attempted_at: row.try_get("attempted_at")?,
    })
}

fn quantity_to_db(quantity: u32) -> Result<i32> {
    i32::try_from(quantity).map_err(|e| StoreError::corrupt("order_items", e))
}

#[async_trait]
impl Store for PostgresStore {
    type Uow = PostgresUnitOfWork;

    async fn begin(&self) -> Result<Self::Uow> {
        Ok(PostgresUnitOfWork {
            tx: self.pool.begin().await?,
        })
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_order).transpose()
    }

    async fn get_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY position ASC"
        ))
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_item).collect()
    }

    async fn get_shipment(&self, order_id: OrderId) -> Result<Option<Shipment>> {
        let row = sqlx::query(&format!(
            "SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE order_id = $1"
        ))
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_shipment).transpose()
    }

    async fn get_inventory(&self, id: InventoryId) -> Result<Option<InventoryRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventory_records WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_inventory).transpose()
    }

    async fn ledger_entries(&self, inventory_id: InventoryId) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(&format!(
            "SELECT {LEDGER_COLUMNS} FROM inventory_ledger WHERE inventory_id = $1 ORDER BY position ASC"
        ))
        .bind(inventory_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_ledger).collect()
    }

    async fn ledger_entries_for_order(&self, order_id: OrderId) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(&format!(
            "SELECT {LEDGER_COLUMNS} FROM inventory_ledger \
             WHERE reference_type = $1 AND reference_id = $2 ORDER BY position ASC"
        ))
        .bind(ReferenceType::Order.as_str())
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_ledger).collect()
    }
}

#[async_trait]
impl CatalogPrices for PostgresStore {
    async fn current_price(&self, product_id: ProductId) -> Result<Option<Money>> {
        let cents: Option<i64> =
            sqlx::query_scalar("SELECT price_cents FROM catalog_prices WHERE product_id = $1")
                .bind(product_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;
        Ok(cents.map(Money::from_cents))
    }
}

#[async_trait]
impl NotificationStore for PostgresStore {
    async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, order_id, event_type, title, message, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(notification.id.as_uuid())
        .bind(notification.order_id.as_uuid())
        .bind(&notification.event_type)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_delivery(&self, delivery: &NotificationDelivery) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notification_deliveries
                (notification_id, channel, recipient, status, failure_reason, attempted_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(delivery.notification_id.as_uuid())
        .bind(delivery.channel.as_str())
        .bind(delivery.recipient.as_uuid())
        .bind(delivery.status.as_str())
        .bind(&delivery.failure_reason)
        .bind(delivery.attempted_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn notifications_for_order(&self, order_id: OrderId) -> Result<Vec<Notification>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, event_type, title, message, created_at
            FROM notifications
            WHERE order_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_notification).collect()
    }

    async fn deliveries(
        &self,
        notification_id: NotificationId,
    ) -> Result<Vec<NotificationDelivery>> {
        let rows = sqlx::query(
            r#"
            SELECT notification_id, channel, recipient, status, failure_reason, attempted_at
            FROM notification_deliveries
            WHERE notification_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(notification_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_delivery).collect()
    }
}

/// Unit of work backed by one database transaction.
///
/// Dropping it without committing rolls the transaction back.
pub struct PostgresUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl OrderRepository for PostgresUnitOfWork {
    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.as_ref().map(row_to_order).transpose()
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, status, total_amount, discount_amount, final_total_amount,
                                created_by, recipient_name, phone, address, note,
                                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.status.as_str())
        .bind(order.totals.total_amount.cents())
        .bind(order.totals.discount_amount.cents())
        .bind(order.totals.final_total_amount.cents())
        .bind(order.created_by.map(|u| u.as_uuid()))
        .bind(&order.shipping.recipient_name)
        .bind(&order.shipping.phone)
        .bind(&order.shipping.address)
        .bind(&order.shipping.note)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_status_if(
        &mut self,
        id: OrderId,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE orders SET status = $1, updated_at = $2 WHERE id = $3 AND status = $4",
        )
        .bind(next.as_str())
        .bind(Utc::now())
        .bind(id.as_uuid())
        .bind(expected.as_str())
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn update_totals(&mut self, id: OrderId, totals: Totals) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET total_amount = $1, discount_amount = $2, final_total_amount = $3, updated_at = $4
            WHERE id = $5
            "#,
        )
        .bind(totals.total_amount.cents())
        .bind(totals.discount_amount.cents())
        .bind(totals.final_total_amount.cents())
        .bind(Utc::now())
        .bind(id.as_uuid())
        .execute(&mut *self.tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::row_not_found("orders", id));
        }
        Ok(())
    }

    async fn list_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY position ASC"
        ))
        .bind(order_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;
        rows.iter().map(row_to_item).collect()
    }

    async fn insert_item(&mut self, item: &OrderItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO order_items (id, order_id, inventory_id, quantity, price_at_order)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(item.order_id.as_uuid())
        .bind(item.inventory_id.as_uuid())
        .bind(quantity_to_db(item.quantity)?)
        .bind(item.price_at_order.cents())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_item_quantity(&mut self, item_id: OrderItemId, quantity: u32) -> Result<()> {
        let result = sqlx::query("UPDATE order_items SET quantity = $1 WHERE id = $2")
            .bind(quantity_to_db(quantity)?)
            .bind(item_id.as_uuid())
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::row_not_found("order_items", item_id));
        }
        Ok(())
    }

    async fn delete_item(&mut self, item_id: OrderItemId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM order_items WHERE id = $1")
            .bind(item_id.as_uuid())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn upsert_shipment(&mut self, shipment: &Shipment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO shipments (id, order_id, tracking_number, carrier, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (order_id)
            DO UPDATE SET tracking_number = EXCLUDED.tracking_number,
                          carrier = EXCLUDED.carrier,
                          updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(shipment.id.as_uuid())
        .bind(shipment.order_id.as_uuid())
        .bind(&shipment.tracking_number)
        .bind(&shipment.carrier)
        .bind(shipment.created_at)
        .bind(shipment.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn shipment(&mut self, order_id: OrderId) -> Result<Option<Shipment>> {
        let row = sqlx::query(&format!(
            "SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE order_id = $1"
        ))
        .bind(order_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.as_ref().map(row_to_shipment).transpose()
    }
}

#[async_trait]
impl InventoryRepository for PostgresUnitOfWork {
    async fn lock_inventory(&mut self, id: InventoryId) -> Result<Option<InventoryRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventory_records WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.as_ref().map(row_to_inventory).transpose()
    }

    async fn save_quantity(&mut self, id: InventoryId, quantity: i64) -> Result<()> {
        let result = sqlx::query(
            "UPDATE inventory_records SET quantity = $1, updated_at = $2 WHERE id = $3",
        )
        .bind(quantity)
        .bind(Utc::now())
        .bind(id.as_uuid())
        .execute(&mut *self.tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::row_not_found("inventory_records", id));
        }
        Ok(())
    }

    async fn append_ledger_entry(&mut self, entry: &LedgerEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory_ledger
                (id, inventory_id, delta, transaction_type, reason, reference_id, reference_type, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.inventory_id.as_uuid())
        .bind(entry.delta)
        .bind(entry.transaction_type.as_str())
        .bind(entry.reason.as_str())
        .bind(entry.reference_id)
        .bind(entry.reference_type.map(|t| t.as_str()))
        .bind(entry.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        tracing::debug!("unit of work rolled back");
        Ok(())
    }
}
