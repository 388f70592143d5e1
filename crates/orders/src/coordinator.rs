//! Order transaction coordinator.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use common::{InventoryId, OrderId, OrderItemId};
use domain::{
    Adjustment, DomainError, InventoryPlan, InventoryRecord, Money, Order, OrderEvent, OrderItem,
    OrderStateMachine, OrderStatus, ReasonCode, Reconciliation, Shipment, Totals,
};
use notify::Notifier;
use store::{CatalogPrices, InventoryRepository, OrderRepository, Store, UnitOfWork};
use tracing::{info, warn};

use crate::adjuster::InventoryAdjuster;
use crate::config::EngineConfig;
use crate::error::{CoordinatorError, Result};
use crate::request::{CreateOrderRequest, OperationContext, OrderDetails};
use crate::result::OrderResult;

/// Runs every order mutation as one atomic unit of work.
///
/// Status changes are decided by the state machine before anything is
/// written; inventory effects are applied through the adjuster inside the
/// same unit of work as the status write; notifications go out only after
/// commit and can never fail the operation.
pub struct OrderCoordinator<S, C>
where
    S: Store,
    C: CatalogPrices,
{
    store: S,
    catalog: C,
    notifier: Arc<dyn Notifier>,
    machine: OrderStateMachine,
    adjuster: InventoryAdjuster,
    config: EngineConfig,
}

impl<S, C> OrderCoordinator<S, C>
where
    S: Store,
    C: CatalogPrices,
{
    /// Creates a new coordinator using the canonical transition table.
    pub fn new(store: S, catalog: C, notifier: Arc<dyn Notifier>, config: EngineConfig) -> Self {
        Self {
            store,
            catalog,
            notifier,
            machine: OrderStateMachine::new(),
            adjuster: InventoryAdjuster::new(),
            config,
        }
    }

    /// Replaces the state machine.
    pub fn with_state_machine(mut self, machine: OrderStateMachine) -> Self {
        self.machine = machine;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Moves an order to `requested`, applying the transition's inventory effect.
    #[tracing::instrument(skip_all, fields(order_id = %order_id, to = %requested, actor = ?ctx.actor))]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        requested: OrderStatus,
        ctx: &OperationContext,
    ) -> OrderResult {
        let outcome = self
            .guarded("update_status", ctx, self.try_update_status(order_id, requested))
            .await;

        match &outcome {
            Ok((_, from)) => {
                self.notifier.notify(OrderEvent::status_changed(
                    order_id,
                    *from,
                    requested,
                    ctx.actor,
                ));
                metrics::counter!(
                    "order_transitions_total",
                    "from" => from.as_str(),
                    "to" => requested.as_str()
                )
                .increment(1);
            }
            Err(e) => {
                metrics::counter!("order_transition_failures_total", "kind" => e.kind().as_str())
                    .increment(1);
            }
        }

        OrderResult::from_outcome(outcome.map(|(order, _)| order), |order| {
            format!("Order status updated to {}", order.status)
        })
    }

    async fn try_update_status(
        &self,
        order_id: OrderId,
        requested: OrderStatus,
    ) -> Result<(Order, OrderStatus)> {
        let loaded = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(CoordinatorError::OrderNotFound(order_id))?;
        let transition = self.machine.decide(loaded.status, requested)?;

        let mut uow = self.store.begin().await?;
        let locked = uow
            .lock_order(order_id)
            .await?
            .ok_or(CoordinatorError::OrderNotFound(order_id))?;
        if locked.status != loaded.status {
            return Err(CoordinatorError::Conflict {
                order_id,
                expected: loaded.status,
            });
        }

        let items = uow.list_items(order_id).await?;
        let plan = InventoryPlan::for_transition(order_id, transition.effect, &items);
        self.adjuster.apply_plan(&mut uow, &plan).await?;

        if !uow
            .update_status_if(order_id, loaded.status, requested)
            .await?
        {
            return Err(CoordinatorError::Conflict {
                order_id,
                expected: loaded.status,
            });
        }
        let order = Self::reread(&mut uow, order_id).await?;
        uow.commit().await?;

        info!(
            from = %loaded.status,
            to = %requested,
            adjustments = plan.len(),
            "order status updated"
        );
        Ok((order, loaded.status))
    }

    /// Creates a pending order, freezing each line's catalog price.
    ///
    /// Availability is checked against current stock without taking it; stock
    /// is reserved when the order enters fulfillment.
    #[tracing::instrument(skip_all, fields(lines = request.items.len(), actor = ?ctx.actor))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
        ctx: &OperationContext,
    ) -> OrderResult {
        let outcome = self
            .guarded("create_order", ctx, self.try_create_order(request))
            .await;

        // The order is committed; nothing below may turn this into a failure.
        if let Ok(order) = &outcome {
            if self.config.create_shipment_placeholder {
                self.create_shipment_placeholder(order.id).await;
            }
            self.notifier.notify(OrderEvent::created(order.id, ctx.actor));
        }
        OrderResult::from_outcome(outcome, |order| format!("Order {} created", order.id))
    }

    async fn try_create_order(&self, request: CreateOrderRequest) -> Result<Order> {
        if request.items.is_empty() {
            return Err(DomainError::NoItems.into());
        }
        if let Some(line) = request.items.iter().find(|line| line.quantity == 0) {
            return Err(DomainError::InvalidQuantity {
                quantity: line.quantity,
            }
            .into());
        }
        if request.discount.is_negative() {
            return Err(DomainError::InvalidDiscount {
                discount: request.discount,
            }
            .into());
        }

        // Demand per inventory record, in lock order.
        let mut demand: BTreeMap<InventoryId, i64> = BTreeMap::new();
        for line in &request.items {
            let units = demand.entry(line.inventory_id).or_default();
            *units = units.saturating_add(i64::from(line.quantity));
        }

        let order = Order::new_pending(request.created_by, request.shipping);
        let mut uow = self.store.begin().await?;
        uow.insert_order(&order).await?;

        let mut prices: HashMap<InventoryId, Money> = HashMap::new();
        for (&inventory_id, &requested) in &demand {
            let record = Self::lock_available(&mut uow, inventory_id, requested).await?;
            prices.insert(inventory_id, self.price_of(&record).await?);
        }

        let mut items = Vec::with_capacity(request.items.len());
        for line in &request.items {
            let price = prices
                .get(&line.inventory_id)
                .copied()
                .ok_or(CoordinatorError::InventoryNotFound(line.inventory_id))?;
            let item = OrderItem::new(order.id, line.inventory_id, line.quantity, price)?;
            uow.insert_item(&item).await?;
            items.push(item);
        }

        let totals = Totals::from_items(&items, request.discount)?;
        uow.update_totals(order.id, totals).await?;
        let order = Self::reread(&mut uow, order.id).await?;
        uow.commit().await?;

        info!(
            order_id = %order.id,
            total = %order.totals.final_total_amount,
            "order created"
        );
        Ok(order)
    }

    /// Own unit of work under its own timeout; a failure here is logged and
    /// does not fail creation.
    async fn create_shipment_placeholder(&self, order_id: OrderId) {
        let timeout = self.config.operation_timeout;
        let write = self.write_shipment_placeholder(order_id);

        match tokio::time::timeout(timeout, write).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(%order_id, error = %e, "failed to create shipment placeholder"),
            Err(_) => warn!(%order_id, ?timeout, "shipment placeholder timed out"),
        }
    }

    async fn write_shipment_placeholder(&self, order_id: OrderId) -> store::Result<()> {
        let mut uow = self.store.begin().await?;
        uow.upsert_shipment(&Shipment::placeholder(order_id))
            .await?;
        uow.commit().await
    }

    /// Adds a line to an editable order.
    #[tracing::instrument(skip_all, fields(order_id = %order_id, inventory_id = %inventory_id, quantity = quantity))]
    pub async fn add_item(
        &self,
        order_id: OrderId,
        inventory_id: InventoryId,
        quantity: u32,
        ctx: &OperationContext,
    ) -> OrderResult {
        let outcome = self
            .guarded(
                "add_item",
                ctx,
                self.try_add_item(order_id, inventory_id, quantity),
            )
            .await;
        OrderResult::from_outcome(outcome, |_| "Item added".to_string())
    }

    async fn try_add_item(
        &self,
        order_id: OrderId,
        inventory_id: InventoryId,
        quantity: u32,
    ) -> Result<Order> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity { quantity }.into());
        }

        let mut uow = self.store.begin().await?;
        let order = Self::lock_editable(&mut uow, order_id).await?;
        let mut items = uow.list_items(order_id).await?;

        let requested = demand_for(&items, inventory_id, None) + i64::from(quantity);
        let record = Self::lock_available(&mut uow, inventory_id, requested).await?;
        let price = self.price_of(&record).await?;

        let item = OrderItem::new(order_id, inventory_id, quantity, price)?;
        uow.insert_item(&item).await?;
        items.push(item);

        let order = Self::write_totals(&mut uow, order, &items, None).await?;
        uow.commit().await?;
        Ok(order)
    }

    /// Changes a line's quantity; its price snapshot is kept.
    #[tracing::instrument(skip_all, fields(order_id = %order_id, item_id = %item_id, quantity = quantity))]
    pub async fn update_item_quantity(
        &self,
        order_id: OrderId,
        item_id: OrderItemId,
        quantity: u32,
        ctx: &OperationContext,
    ) -> OrderResult {
        let outcome = self
            .guarded(
                "update_item_quantity",
                ctx,
                self.try_update_item_quantity(order_id, item_id, quantity),
            )
            .await;
        OrderResult::from_outcome(outcome, |_| "Item quantity updated".to_string())
    }

    async fn try_update_item_quantity(
        &self,
        order_id: OrderId,
        item_id: OrderItemId,
        quantity: u32,
    ) -> Result<Order> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity { quantity }.into());
        }

        let mut uow = self.store.begin().await?;
        let order = Self::lock_editable(&mut uow, order_id).await?;
        let mut items = uow.list_items(order_id).await?;

        let position = items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or(CoordinatorError::ItemNotFound { order_id, item_id })?;
        let updated = items[position].with_quantity(quantity)?;

        let requested =
            demand_for(&items, updated.inventory_id, Some(item_id)) + i64::from(quantity);
        Self::lock_available(&mut uow, updated.inventory_id, requested).await?;

        uow.update_item_quantity(item_id, quantity).await?;
        items[position] = updated;

        let order = Self::write_totals(&mut uow, order, &items, None).await?;
        uow.commit().await?;
        Ok(order)
    }

    /// Removes a line from an editable order.
    #[tracing::instrument(skip_all, fields(order_id = %order_id, item_id = %item_id))]
    pub async fn delete_item(
        &self,
        order_id: OrderId,
        item_id: OrderItemId,
        ctx: &OperationContext,
    ) -> OrderResult {
        let outcome = self
            .guarded("delete_item", ctx, self.try_delete_item(order_id, item_id))
            .await;
        OrderResult::from_outcome(outcome, |_| "Item deleted".to_string())
    }

    async fn try_delete_item(&self, order_id: OrderId, item_id: OrderItemId) -> Result<Order> {
        let mut uow = self.store.begin().await?;
        let order = Self::lock_editable(&mut uow, order_id).await?;
        let mut items = uow.list_items(order_id).await?;

        if !items.iter().any(|item| item.id == item_id) || !uow.delete_item(item_id).await? {
            return Err(CoordinatorError::ItemNotFound { order_id, item_id });
        }
        items.retain(|item| item.id != item_id);

        let order = Self::write_totals(&mut uow, order, &items, None).await?;
        uow.commit().await?;
        Ok(order)
    }

    /// Sets the order discount and recomputes the final total.
    #[tracing::instrument(skip_all, fields(order_id = %order_id, discount = %discount))]
    pub async fn set_discount(
        &self,
        order_id: OrderId,
        discount: Money,
        ctx: &OperationContext,
    ) -> OrderResult {
        let outcome = self
            .guarded("set_discount", ctx, self.try_set_discount(order_id, discount))
            .await;
        OrderResult::from_outcome(outcome, |_| "Discount applied".to_string())
    }

    async fn try_set_discount(&self, order_id: OrderId, discount: Money) -> Result<Order> {
        if discount.is_negative() {
            return Err(DomainError::InvalidDiscount { discount }.into());
        }

        let mut uow = self.store.begin().await?;
        let order = Self::lock_editable(&mut uow, order_id).await?;
        let items = uow.list_items(order_id).await?;

        let order = Self::write_totals(&mut uow, order, &items, Some(discount)).await?;
        uow.commit().await?;
        Ok(order)
    }

    /// Records a carrier tracking reference on the order's shipment.
    #[tracing::instrument(skip_all, fields(order_id = %order_id))]
    pub async fn record_tracking(
        &self,
        order_id: OrderId,
        tracking_number: &str,
        carrier: Option<String>,
        ctx: &OperationContext,
    ) -> OrderResult {
        let outcome = self
            .guarded(
                "record_tracking",
                ctx,
                self.try_record_tracking(order_id, tracking_number, carrier),
            )
            .await;
        OrderResult::from_outcome(outcome, |_| "Tracking recorded".to_string())
    }

    async fn try_record_tracking(
        &self,
        order_id: OrderId,
        tracking_number: &str,
        carrier: Option<String>,
    ) -> Result<Order> {
        let tracking_number = tracking_number.trim();
        if tracking_number.is_empty() {
            return Err(CoordinatorError::InvalidRequest(
                "tracking number must not be empty".to_string(),
            ));
        }

        let mut uow = self.store.begin().await?;
        let order = uow
            .lock_order(order_id)
            .await?
            .ok_or(CoordinatorError::OrderNotFound(order_id))?;
        if order.status.is_terminal() {
            return Err(CoordinatorError::TrackingClosed {
                order_id,
                status: order.status,
            });
        }

        let shipment = uow
            .shipment(order_id)
            .await?
            .unwrap_or_else(|| Shipment::placeholder(order_id))
            .with_tracking(tracking_number, carrier);
        uow.upsert_shipment(&shipment).await?;
        uow.commit().await?;
        Ok(order)
    }

    /// Manual stock correction or restock, recorded with a `manual` reference.
    #[tracing::instrument(skip_all, fields(inventory_id = %inventory_id, delta = delta, reason = %reason, actor = ?ctx.actor))]
    pub async fn adjust_inventory(
        &self,
        inventory_id: InventoryId,
        delta: i64,
        reason: ReasonCode,
        ctx: &OperationContext,
    ) -> Result<InventoryRecord> {
        let adjustment = Adjustment::manual(inventory_id, delta, reason);
        self.guarded("adjust_inventory", ctx, async {
            let mut uow = self.store.begin().await?;
            let record = self.adjuster.adjust(&mut uow, &adjustment).await?;
            uow.commit().await?;
            Ok::<_, CoordinatorError>(record)
        })
        .await
    }

    /// Audits one record against its ledger.
    #[tracing::instrument(skip(self))]
    pub async fn reconcile(&self, inventory_id: InventoryId) -> Result<Reconciliation> {
        let record = self
            .store
            .get_inventory(inventory_id)
            .await?
            .ok_or(CoordinatorError::InventoryNotFound(inventory_id))?;
        let entries = self.store.ledger_entries(inventory_id).await?;
        let reconciliation = Reconciliation::compute(&record, &entries);

        if !reconciliation.is_consistent() {
            warn!(
                expected = reconciliation.expected_quantity,
                actual = reconciliation.actual_quantity,
                drift = reconciliation.drift(),
                "inventory drifted from its ledger"
            );
        }
        Ok(reconciliation)
    }

    /// Loads an order with its items and shipment.
    pub async fn get_order(&self, order_id: OrderId) -> Result<OrderDetails> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(CoordinatorError::OrderNotFound(order_id))?;
        let items = self.store.get_items(order_id).await?;
        let shipment = self.store.get_shipment(order_id).await?;
        Ok(OrderDetails {
            order,
            items,
            shipment,
        })
    }

    /// Runs `work` under the operation timeout and the caller's cancel token.
    ///
    /// Dropping `work` drops its unit of work, which rolls back.
    async fn guarded<T>(
        &self,
        operation: &'static str,
        ctx: &OperationContext,
        work: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let started = Instant::now();
        let timeout = self.config.operation_timeout;

        let outcome = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => Err(CoordinatorError::Cancelled),
            result = tokio::time::timeout(timeout, work) => {
                result.unwrap_or_else(|_| Err(CoordinatorError::TimedOut(timeout)))
            }
        };

        metrics::histogram!("order_operation_duration_seconds", "operation" => operation)
            .record(started.elapsed().as_secs_f64());
        if let Err(e) = &outcome {
            warn!(operation, kind = %e.kind(), error = %e, "order operation failed");
        }
        outcome
    }

    async fn lock_editable(uow: &mut S::Uow, order_id: OrderId) -> Result<Order> {
        let order = uow
            .lock_order(order_id)
            .await?
            .ok_or(CoordinatorError::OrderNotFound(order_id))?;
        order.ensure_editable()?;
        Ok(order)
    }

    /// Locks the record and checks `requested` units are on hand.
    async fn lock_available(
        uow: &mut S::Uow,
        inventory_id: InventoryId,
        requested: i64,
    ) -> Result<InventoryRecord> {
        let record = uow
            .lock_inventory(inventory_id)
            .await?
            .ok_or(CoordinatorError::InventoryNotFound(inventory_id))?;
        record.ensure_available(requested)?;
        Ok(record)
    }

    /// The order row as written so far by this unit of work.
    async fn reread(uow: &mut S::Uow, order_id: OrderId) -> Result<Order> {
        uow.lock_order(order_id)
            .await?
            .ok_or(CoordinatorError::OrderNotFound(order_id))
    }

    async fn price_of(&self, record: &InventoryRecord) -> Result<Money> {
        self.catalog
            .current_price(record.product_id)
            .await?
            .ok_or(CoordinatorError::PriceNotFound(record.product_id))
    }

    /// Recomputes totals from `items` and writes them.
    async fn write_totals(
        uow: &mut S::Uow,
        order: Order,
        items: &[OrderItem],
        discount: Option<Money>,
    ) -> Result<Order> {
        let discount = discount.unwrap_or(order.totals.discount_amount);
        let totals = Totals::from_items(items, discount)?;
        uow.update_totals(order.id, totals).await?;
        Self::reread(uow, order.id).await
    }
}

/// Units of `inventory_id` already on the order, optionally excluding one item.
fn demand_for(items: &[OrderItem], inventory_id: InventoryId, except: Option<OrderItemId>) -> i64 {
    items
        .iter()
        .filter(|item| item.inventory_id == inventory_id && Some(item.id) != except)
        .map(|item| i64::from(item.quantity))
        .sum()
}
