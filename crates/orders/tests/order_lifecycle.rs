//! End-to-end order lifecycle tests against the in-memory store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use common::{InventoryId, OrderId, ProductId, UserId};
use domain::{
    Channel, InventoryRecord, LedgerEntry, Money, Order, OrderEvent, OrderItem, OrderStatus,
    ReasonCode, ReferenceType, Shipment, TransactionType,
};
use notify::{
    Dispatcher, DispatcherConfig, NoopNotifier, Notifier, Recipient, RecordingSender,
    SenderRegistry, StaticDirectory,
};
use orders::{
    CreateOrderRequest, EngineConfig, ErrorKind, OperationContext, OrderCoordinator, OrderResult,
};
use store::{InMemoryStore, InMemoryUnitOfWork, NotificationStore, Store};

type Coordinator = OrderCoordinator<InMemoryStore, InMemoryStore>;

fn coordinator(store: &InMemoryStore, config: EngineConfig) -> Coordinator {
    OrderCoordinator::new(store.clone(), store.clone(), Arc::new(NoopNotifier), config)
}

async fn stock(store: &InMemoryStore, quantity: i64, cents: i64) -> InventoryRecord {
    let record = InventoryRecord::new(ProductId::new(), quantity);
    store.seed_inventory(record.clone()).await;
    store
        .set_price(record.product_id, Money::from_cents(cents))
        .await;
    record
}

async fn quantity(store: &InMemoryStore, id: InventoryId) -> i64 {
    store.get_inventory(id).await.unwrap().unwrap().quantity
}

async fn status(store: &InMemoryStore, id: OrderId) -> OrderStatus {
    store.get_order(id).await.unwrap().unwrap().status
}

fn order_id(result: &OrderResult) -> OrderId {
    assert!(result.success, "operation failed: {}", result.message);
    result.order.as_ref().unwrap().id
}

/// Two lines (3 of A at $1.00, 5 of B at $0.50) on a confirmed order.
struct Confirmed {
    store: InMemoryStore,
    coordinator: Coordinator,
    a: InventoryRecord,
    b: InventoryRecord,
    order_id: OrderId,
}

async fn confirmed_order(config: EngineConfig) -> Confirmed {
    let store = InMemoryStore::new();
    let coordinator = coordinator(&store, config);
    let a = stock(&store, 10, 100).await;
    let b = stock(&store, 10, 50).await;
    let ctx = OperationContext::system();

    let created = coordinator
        .create_order(CreateOrderRequest::new([(a.id, 3), (b.id, 5)]), &ctx)
        .await;
    let order_id = order_id(&created);
    let confirmed = coordinator
        .update_status(order_id, OrderStatus::Confirmed, &ctx)
        .await;
    assert!(confirmed.success);

    Confirmed {
        store,
        coordinator,
        a,
        b,
        order_id,
    }
}

async fn walk(coordinator: &Coordinator, order_id: OrderId, path: &[OrderStatus]) {
    let ctx = OperationContext::system();
    for &next in path {
        let result = coordinator.update_status(order_id, next, &ctx).await;
        assert!(result.success, "{next}: {}", result.message);
    }
}

#[tokio::test]
async fn test_create_order_freezes_prices_and_totals() {
    let store = InMemoryStore::new();
    let coordinator = coordinator(&store, EngineConfig::default());
    let a = stock(&store, 10, 100).await;
    let b = stock(&store, 10, 50).await;

    let result = coordinator
        .create_order(
            CreateOrderRequest::new([(a.id, 3), (b.id, 5)])
                .created_by(UserId::new())
                .with_discount(Money::from_cents(25)),
            &OperationContext::system(),
        )
        .await;
    let order_id = order_id(&result);

    let details = coordinator.get_order(order_id).await.unwrap();
    assert_eq!(details.order.status, OrderStatus::PendingConfirmation);
    assert_eq!(details.order.totals.total_amount, Money::from_cents(550));
    assert_eq!(details.order.totals.discount_amount, Money::from_cents(25));
    assert_eq!(details.order.totals.final_total_amount, Money::from_cents(525));
    assert_eq!(details.items.len(), 2);

    // Later catalog changes do not touch existing lines.
    store.set_price(a.product_id, Money::from_cents(999)).await;
    let details = coordinator.get_order(order_id).await.unwrap();
    assert!(
        details
            .items
            .iter()
            .any(|item| item.inventory_id == a.id && item.price_at_order == Money::from_cents(100))
    );

    // Creation checks stock without taking it.
    assert_eq!(quantity(&store, a.id).await, 10);
    assert_eq!(store.ledger_len().await, 0);
}

#[tokio::test]
async fn test_packing_reserves_stock_with_outbound_sale_entries() {
    let f = confirmed_order(EngineConfig::default()).await;

    let result = f
        .coordinator
        .update_status(f.order_id, OrderStatus::Packed, &OperationContext::system())
        .await;
    assert!(result.success);
    assert_eq!(result.order.unwrap().status, OrderStatus::Packed);

    assert_eq!(quantity(&f.store, f.a.id).await, 7);
    assert_eq!(quantity(&f.store, f.b.id).await, 5);

    let mut entries = f.store.ledger_entries_for_order(f.order_id).await.unwrap();
    entries.sort_by_key(|entry| entry.delta);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].delta, -5);
    assert_eq!(entries[1].delta, -3);
    for entry in &entries {
        assert_eq!(entry.transaction_type, TransactionType::Outbound);
        assert_eq!(entry.reason, ReasonCode::Sale);
        assert_eq!(entry.reference_type, Some(ReferenceType::Order));
        assert_eq!(entry.reference_id, Some(f.order_id.as_uuid()));
    }
}

#[tokio::test]
async fn test_illegal_transition_writes_nothing() {
    let f = confirmed_order(EngineConfig::default()).await;
    walk(
        &f.coordinator,
        f.order_id,
        &[OrderStatus::Packed, OrderStatus::Shipped, OrderStatus::Delivered],
    )
    .await;
    let ledger_before = f.store.ledger_len().await;

    let result = f
        .coordinator
        .update_status(f.order_id, OrderStatus::Packed, &OperationContext::system())
        .await;
    assert!(!result.success);
    assert_eq!(result.kind, Some(ErrorKind::InvalidTransition));
    assert!(result.order.is_none());

    assert_eq!(status(&f.store, f.order_id).await, OrderStatus::Delivered);
    assert_eq!(f.store.ledger_len().await, ledger_before);
    assert_eq!(quantity(&f.store, f.a.id).await, 7);
}

#[tokio::test]
async fn test_cancel_after_packing_releases_stock() {
    let f = confirmed_order(EngineConfig::default()).await;
    walk(&f.coordinator, f.order_id, &[OrderStatus::Packed, OrderStatus::Canceled]).await;

    assert_eq!(quantity(&f.store, f.a.id).await, 10);
    assert_eq!(quantity(&f.store, f.b.id).await, 10);

    let entries = f.store.ledger_entries_for_order(f.order_id).await.unwrap();
    let releases: Vec<_> = entries.iter().filter(|entry| entry.delta > 0).collect();
    assert_eq!(releases.len(), 2);
    assert!(releases.iter().all(|entry| {
        entry.reason == ReasonCode::OrderCancellation
            && entry.transaction_type == TransactionType::Inbound
    }));
    assert_eq!(entries.iter().map(|entry| entry.delta).sum::<i64>(), 0);

    for id in [f.a.id, f.b.id] {
        assert!(f.coordinator.reconcile(id).await.unwrap().is_consistent());
    }
}

#[tokio::test]
async fn test_cancel_before_fulfillment_has_no_inventory_effect() {
    let f = confirmed_order(EngineConfig::default()).await;
    walk(&f.coordinator, f.order_id, &[OrderStatus::Canceled]).await;

    assert_eq!(quantity(&f.store, f.a.id).await, 10);
    assert_eq!(f.store.ledger_len().await, 0);
}

#[tokio::test]
async fn test_full_return_restores_stock() {
    let f = confirmed_order(EngineConfig::default()).await;
    walk(
        &f.coordinator,
        f.order_id,
        &[
            OrderStatus::ShipmentRequested,
            OrderStatus::Packed,
            OrderStatus::Shipped,
            OrderStatus::Delivering,
            OrderStatus::Delivered,
            OrderStatus::ReturnRequested,
            OrderStatus::ReturnProcessing,
            OrderStatus::Returned,
        ],
    )
    .await;

    assert_eq!(quantity(&f.store, f.a.id).await, 10);
    let entries = f.store.ledger_entries_for_order(f.order_id).await.unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(
        entries
            .iter()
            .filter(|entry| entry.reason == ReasonCode::Return)
            .count(),
        2
    );

    let result = f
        .coordinator
        .update_status(f.order_id, OrderStatus::Canceled, &OperationContext::system())
        .await;
    assert_eq!(result.kind, Some(ErrorKind::InvalidTransition));
}

#[tokio::test]
async fn test_concurrent_updates_apply_once() {
    let f = confirmed_order(EngineConfig::default()).await;
    f.store.set_write_delay(Some(Duration::from_millis(20)));
    let ctx = OperationContext::system();

    let (packed, canceled) = tokio::join!(
        f.coordinator.update_status(f.order_id, OrderStatus::Packed, &ctx),
        f.coordinator.update_status(f.order_id, OrderStatus::Canceled, &ctx),
    );
    f.store.set_write_delay(None);

    assert_eq!(
        [packed.success, canceled.success]
            .iter()
            .filter(|ok| **ok)
            .count(),
        1
    );
    let loser = if packed.success { &canceled } else { &packed };
    assert!(matches!(
        loser.kind,
        Some(ErrorKind::Conflict) | Some(ErrorKind::InvalidTransition)
    ));

    if packed.success {
        assert_eq!(status(&f.store, f.order_id).await, OrderStatus::Packed);
        assert_eq!(quantity(&f.store, f.a.id).await, 7);
        assert_eq!(f.store.ledger_len().await, 2);
    } else {
        assert_eq!(status(&f.store, f.order_id).await, OrderStatus::Canceled);
        assert_eq!(quantity(&f.store, f.a.id).await, 10);
        assert_eq!(f.store.ledger_len().await, 0);
    }
}

#[tokio::test]
async fn test_same_transition_twice_only_reserves_once() {
    let f = confirmed_order(EngineConfig::default()).await;
    f.store.set_write_delay(Some(Duration::from_millis(20)));
    let ctx = OperationContext::system();

    let (first, second) = tokio::join!(
        f.coordinator.update_status(f.order_id, OrderStatus::Packed, &ctx),
        f.coordinator.update_status(f.order_id, OrderStatus::Packed, &ctx),
    );
    f.store.set_write_delay(None);

    assert!(first.success ^ second.success);
    assert_eq!(quantity(&f.store, f.a.id).await, 7);
    assert_eq!(quantity(&f.store, f.b.id).await, 5);
}

#[tokio::test]
async fn test_insufficient_stock_creates_nothing() {
    let store = InMemoryStore::new();
    let coordinator = coordinator(&store, EngineConfig::default());
    let scarce = stock(&store, 2, 100).await;

    let result = coordinator
        .create_order(
            CreateOrderRequest::new([(scarce.id, 3)]),
            &OperationContext::system(),
        )
        .await;
    assert!(!result.success);
    assert_eq!(result.kind, Some(ErrorKind::InsufficientInventory));
    assert!(result.message.contains("available 2"));
    assert_eq!(quantity(&store, scarce.id).await, 2);
    assert_eq!(store.ledger_len().await, 0);
}

#[tokio::test]
async fn test_reservation_beyond_stock_rolls_back_every_line() {
    let f = confirmed_order(EngineConfig::default()).await;
    // Someone else took most of B after the order was placed.
    f.coordinator
        .adjust_inventory(f.b.id, -8, ReasonCode::Damage, &OperationContext::system())
        .await
        .unwrap();

    let result = f
        .coordinator
        .update_status(f.order_id, OrderStatus::Packed, &OperationContext::system())
        .await;
    assert_eq!(result.kind, Some(ErrorKind::InsufficientInventory));

    assert_eq!(status(&f.store, f.order_id).await, OrderStatus::Confirmed);
    assert_eq!(quantity(&f.store, f.a.id).await, 10);
    assert_eq!(quantity(&f.store, f.b.id).await, 2);
    assert!(
        f.store
            .ledger_entries_for_order(f.order_id)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_ledger_failure_rolls_back_transition() {
    let f = confirmed_order(EngineConfig::default()).await;
    f.store.set_fail_on_ledger_append(true);

    let result = f
        .coordinator
        .update_status(f.order_id, OrderStatus::Packed, &OperationContext::system())
        .await;
    assert_eq!(result.kind, Some(ErrorKind::PersistenceFailure));

    f.store.set_fail_on_ledger_append(false);
    assert_eq!(status(&f.store, f.order_id).await, OrderStatus::Confirmed);
    assert_eq!(quantity(&f.store, f.a.id).await, 10);
    assert_eq!(quantity(&f.store, f.b.id).await, 10);
    assert_eq!(f.store.ledger_len().await, 0);
}

#[tokio::test]
async fn test_status_write_failure_rolls_back_inventory() {
    let f = confirmed_order(EngineConfig::default()).await;
    f.store.set_fail_on_status_update(true);

    let result = f
        .coordinator
        .update_status(f.order_id, OrderStatus::Packed, &OperationContext::system())
        .await;
    assert_eq!(result.kind, Some(ErrorKind::PersistenceFailure));

    f.store.set_fail_on_status_update(false);
    assert_eq!(status(&f.store, f.order_id).await, OrderStatus::Confirmed);
    assert_eq!(quantity(&f.store, f.a.id).await, 10);
    assert_eq!(f.store.ledger_len().await, 0);

    // The row locks were released with the failed unit of work.
    let retry = f
        .coordinator
        .update_status(f.order_id, OrderStatus::Packed, &OperationContext::system())
        .await;
    assert!(retry.success);
}

#[tokio::test]
async fn test_timeout_rolls_back_partial_work() {
    let f = confirmed_order(
        EngineConfig::default().with_operation_timeout(Duration::from_millis(50)),
    )
    .await;
    f.store.set_write_delay(Some(Duration::from_millis(200)));

    let result = f
        .coordinator
        .update_status(f.order_id, OrderStatus::Packed, &OperationContext::system())
        .await;
    assert_eq!(result.kind, Some(ErrorKind::Cancelled));

    f.store.set_write_delay(None);
    assert_eq!(status(&f.store, f.order_id).await, OrderStatus::Confirmed);
    assert_eq!(quantity(&f.store, f.a.id).await, 10);
    assert_eq!(f.store.ledger_len().await, 0);
}

#[tokio::test]
async fn test_cancel_token_interrupts_operation() {
    let f = confirmed_order(EngineConfig::default()).await;
    f.store.set_write_delay(Some(Duration::from_millis(200)));
    let ctx = OperationContext::system();
    let cancel = ctx.cancel.clone();

    let (result, ()) = tokio::join!(
        f.coordinator.update_status(f.order_id, OrderStatus::Packed, &ctx),
        async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            cancel.cancel();
        }
    );
    assert_eq!(result.kind, Some(ErrorKind::Cancelled));

    f.store.set_write_delay(None);
    assert_eq!(status(&f.store, f.order_id).await, OrderStatus::Confirmed);
    assert_eq!(f.store.ledger_len().await, 0);
}

#[tokio::test]
async fn test_manual_adjustments_and_drift_detection() {
    let store = InMemoryStore::new();
    let coordinator = coordinator(&store, EngineConfig::default());
    let record = stock(&store, 5, 100).await;
    let ctx = OperationContext::system();

    let updated = coordinator
        .adjust_inventory(record.id, 7, ReasonCode::Restock, &ctx)
        .await
        .unwrap();
    assert_eq!(updated.quantity, 12);

    let err = coordinator
        .adjust_inventory(record.id, -20, ReasonCode::Correction, &ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientInventory);

    let entries = store.ledger_entries(record.id).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].reference_type, Some(ReferenceType::Manual));
    assert!(coordinator.reconcile(record.id).await.unwrap().is_consistent());

    store.force_quantity(record.id, 11).await;
    let reconciliation = coordinator.reconcile(record.id).await.unwrap();
    assert!(!reconciliation.is_consistent());
    assert_eq!(reconciliation.expected_quantity, 12);
    assert_eq!(reconciliation.drift(), -1);
}

#[tokio::test]
async fn test_item_edits_keep_totals_consistent() {
    let store = InMemoryStore::new();
    let coordinator = coordinator(&store, EngineConfig::default());
    let a = stock(&store, 10, 100).await;
    let b = stock(&store, 10, 250).await;
    let ctx = OperationContext::system();

    let order_id = order_id(
        &coordinator
            .create_order(CreateOrderRequest::new([(a.id, 2)]), &ctx)
            .await,
    );

    let added = coordinator.add_item(order_id, b.id, 2, &ctx).await;
    assert_eq!(
        added.order.unwrap().totals.total_amount,
        Money::from_cents(700)
    );

    let details = coordinator.get_order(order_id).await.unwrap();
    let line_a = details
        .items
        .iter()
        .find(|item| item.inventory_id == a.id)
        .unwrap()
        .id;
    let updated = coordinator
        .update_item_quantity(order_id, line_a, 5, &ctx)
        .await;
    assert_eq!(
        updated.order.unwrap().totals.total_amount,
        Money::from_cents(1000)
    );

    let discounted = coordinator
        .set_discount(order_id, Money::from_cents(1500), &ctx)
        .await;
    let totals = discounted.order.unwrap().totals;
    assert_eq!(totals.final_total_amount, Money::zero());
    assert!(totals.is_consistent());

    let deleted = coordinator.delete_item(order_id, line_a, &ctx).await;
    let totals = deleted.order.unwrap().totals;
    assert_eq!(totals.total_amount, Money::from_cents(500));
    assert_eq!(totals.discount_amount, Money::from_cents(1500));

    let stored = store.get_order(order_id).await.unwrap().unwrap();
    assert_eq!(stored.totals, totals);
    assert_eq!(store.get_items(order_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_item_edits_rejected_outside_editable_statuses() {
    let f = confirmed_order(EngineConfig::default()).await;
    walk(&f.coordinator, f.order_id, &[OrderStatus::Packed]).await;
    let ctx = OperationContext::system();

    let added = f.coordinator.add_item(f.order_id, f.a.id, 1, &ctx).await;
    assert_eq!(added.kind, Some(ErrorKind::InvalidRequest));

    let discounted = f
        .coordinator
        .set_discount(f.order_id, Money::from_cents(10), &ctx)
        .await;
    assert_eq!(discounted.kind, Some(ErrorKind::InvalidRequest));
    assert_eq!(
        f.store.get_items(f.order_id).await.unwrap().len(),
        2
    );
}

#[tokio::test]
async fn test_add_item_counts_existing_lines_against_stock() {
    let store = InMemoryStore::new();
    let coordinator = coordinator(&store, EngineConfig::default());
    let a = stock(&store, 5, 100).await;
    let ctx = OperationContext::system();

    let order_id = order_id(
        &coordinator
            .create_order(CreateOrderRequest::new([(a.id, 4)]), &ctx)
            .await,
    );

    let result = coordinator.add_item(order_id, a.id, 2, &ctx).await;
    assert_eq!(result.kind, Some(ErrorKind::InsufficientInventory));
    assert_eq!(store.get_items(order_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_item_is_not_found() {
    let f = confirmed_order(EngineConfig::default()).await;
    let result = f
        .coordinator
        .delete_item(
            f.order_id,
            common::OrderItemId::new(),
            &OperationContext::system(),
        )
        .await;
    assert_eq!(result.kind, Some(ErrorKind::NotFound));
}

#[tokio::test]
async fn test_shipment_placeholder_and_tracking() {
    let f = confirmed_order(EngineConfig::default()).await;
    let ctx = OperationContext::system();

    let details = f.coordinator.get_order(f.order_id).await.unwrap();
    let placeholder = details.shipment.unwrap();
    assert!(!placeholder.has_tracking());

    let result = f
        .coordinator
        .record_tracking(f.order_id, " 1Z999 ", Some("UPS".to_string()), &ctx)
        .await;
    assert!(result.success);

    let shipment = f.store.get_shipment(f.order_id).await.unwrap().unwrap();
    assert_eq!(shipment.id, placeholder.id);
    assert_eq!(shipment.tracking_number.as_deref(), Some("1Z999"));
    assert_eq!(shipment.carrier.as_deref(), Some("UPS"));

    walk(&f.coordinator, f.order_id, &[OrderStatus::Canceled]).await;
    let closed = f
        .coordinator
        .record_tracking(f.order_id, "1Z000", None, &ctx)
        .await;
    assert_eq!(closed.kind, Some(ErrorKind::InvalidTransition));
}

#[tokio::test]
async fn test_without_placeholder_tracking_creates_shipment() {
    let f = confirmed_order(EngineConfig::default().with_shipment_placeholder(false)).await;
    assert!(f.store.get_shipment(f.order_id).await.unwrap().is_none());

    let result = f
        .coordinator
        .record_tracking(f.order_id, "TRK-1", None, &OperationContext::system())
        .await;
    assert!(result.success);
    assert!(
        f.store
            .get_shipment(f.order_id)
            .await
            .unwrap()
            .unwrap()
            .has_tracking()
    );
}

#[tokio::test]
async fn test_notifications_follow_commits_and_never_fail_operations() {
    let store = InMemoryStore::new();
    let in_app = RecordingSender::new(Channel::InApp);
    let chat = RecordingSender::new(Channel::ChatBot);
    chat.set_panic_on_send(true);

    let admin = UserId::new();
    let dispatcher = Dispatcher::new(
        Arc::new(store.clone()),
        Arc::new(StaticDirectory::new(vec![Recipient::new(admin, "ops")])),
        SenderRegistry::new()
            .with(Arc::new(in_app.clone()))
            .with(Arc::new(chat.clone())),
        DispatcherConfig::default().with_channels([Channel::ChatBot, Channel::InApp]),
    );
    let (handle, worker) = dispatcher.spawn();
    let notifier: Arc<dyn Notifier> = Arc::new(handle);

    let coordinator = OrderCoordinator::new(
        store.clone(),
        store.clone(),
        notifier,
        EngineConfig::default(),
    );
    let a = stock(&store, 10, 100).await;
    let ctx = OperationContext::new(Some(admin));

    let order_id = order_id(
        &coordinator
            .create_order(CreateOrderRequest::new([(a.id, 1)]), &ctx)
            .await,
    );
    assert!(
        coordinator
            .update_status(order_id, OrderStatus::Confirmed, &ctx)
            .await
            .success
    );
    // Rejected transitions emit nothing.
    assert!(
        !coordinator
            .update_status(order_id, OrderStatus::Returned, &ctx)
            .await
            .success
    );

    drop(coordinator);
    tokio::time::timeout(Duration::from_secs(5), worker)
        .await
        .unwrap()
        .unwrap();

    let notifications = store.notifications_for_order(order_id).await.unwrap();
    assert_eq!(notifications.len(), 2);
    let mut event_types: Vec<_> = notifications
        .iter()
        .map(|n| n.event_type.as_str())
        .collect();
    event_types.sort_unstable();
    assert_eq!(event_types, vec!["order_created", "order_status_changed"]);

    // The panicking chat sender runs first and costs in-app nothing.
    let received: Vec<_> = in_app.sent().into_iter().map(|(user, _)| user).collect();
    assert_eq!(received, vec![admin, admin]);
}

/// Delegates to an [`InMemoryStore`], stalling every `begin` after the first.
#[derive(Clone)]
struct SlowAfterFirstBegin {
    inner: InMemoryStore,
    begins: Arc<AtomicUsize>,
    stall: Duration,
}

#[async_trait]
impl Store for SlowAfterFirstBegin {
    type Uow = InMemoryUnitOfWork;

    async fn begin(&self) -> store::Result<Self::Uow> {
        if self.begins.fetch_add(1, Ordering::SeqCst) > 0 {
            tokio::time::sleep(self.stall).await;
        }
        self.inner.begin().await
    }

    async fn get_order(&self, id: OrderId) -> store::Result<Option<Order>> {
        self.inner.get_order(id).await
    }

    async fn get_items(&self, order_id: OrderId) -> store::Result<Vec<OrderItem>> {
        self.inner.get_items(order_id).await
    }

    async fn get_shipment(&self, order_id: OrderId) -> store::Result<Option<Shipment>> {
        self.inner.get_shipment(order_id).await
    }

    async fn get_inventory(&self, id: InventoryId) -> store::Result<Option<InventoryRecord>> {
        self.inner.get_inventory(id).await
    }

    async fn ledger_entries(&self, inventory_id: InventoryId) -> store::Result<Vec<LedgerEntry>> {
        self.inner.ledger_entries(inventory_id).await
    }

    async fn ledger_entries_for_order(
        &self,
        order_id: OrderId,
    ) -> store::Result<Vec<LedgerEntry>> {
        self.inner.ledger_entries_for_order(order_id).await
    }
}

#[derive(Default)]
struct CollectingNotifier {
    events: Mutex<Vec<OrderEvent>>,
}

impl Notifier for CollectingNotifier {
    fn notify(&self, event: OrderEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[tokio::test]
async fn test_slow_shipment_placeholder_does_not_fail_committed_order() {
    let inner = InMemoryStore::new();
    let record = stock(&inner, 5, 100).await;
    let slow = SlowAfterFirstBegin {
        inner: inner.clone(),
        begins: Arc::new(AtomicUsize::new(0)),
        stall: Duration::from_millis(300),
    };
    let notifier = Arc::new(CollectingNotifier::default());
    let coordinator = OrderCoordinator::new(
        slow,
        inner.clone(),
        notifier.clone(),
        EngineConfig::default().with_operation_timeout(Duration::from_millis(100)),
    );

    let result = coordinator
        .create_order(
            CreateOrderRequest::new([(record.id, 1)]),
            &OperationContext::system(),
        )
        .await;
    let order_id = order_id(&result);

    assert_eq!(status(&inner, order_id).await, OrderStatus::PendingConfirmation);
    assert_eq!(inner.get_items(order_id).await.unwrap().len(), 1);
    assert!(inner.get_shipment(order_id).await.unwrap().is_none());

    let events = notifier.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type(), "order_created");
    assert_eq!(events[0].order_id, order_id);
}

#[tokio::test]
async fn test_results_carry_persisted_timestamps() {
    let f = confirmed_order(EngineConfig::default()).await;
    let ctx = OperationContext::system();

    let packed = f
        .coordinator
        .update_status(f.order_id, OrderStatus::Packed, &ctx)
        .await;
    let stored = f.store.get_order(f.order_id).await.unwrap().unwrap();
    assert_eq!(packed.order.as_ref(), Some(&stored));

    let store = InMemoryStore::new();
    let coordinator = coordinator(&store, EngineConfig::default());
    let record = stock(&store, 5, 100).await;
    let created = coordinator
        .create_order(CreateOrderRequest::new([(record.id, 1)]), &ctx)
        .await;
    let id = order_id(&created);
    let discounted = coordinator
        .set_discount(id, Money::from_cents(10), &ctx)
        .await;
    let stored = store.get_order(id).await.unwrap().unwrap();
    assert_eq!(discounted.order.as_ref(), Some(&stored));
}

#[tokio::test]
async fn test_oversized_amounts_are_rejected_without_panicking() {
    let store = InMemoryStore::new();
    let coordinator = coordinator(&store, EngineConfig::default());
    let ctx = OperationContext::system();

    let record = stock(&store, 1, 100).await;
    let err = coordinator
        .adjust_inventory(record.id, i64::MAX, ReasonCode::Restock, &ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    assert_eq!(quantity(&store, record.id).await, 1);
    assert_eq!(store.ledger_len().await, 0);

    let pricey = stock(&store, 10, i64::MAX / 2 + 1).await;
    let result = coordinator
        .create_order(CreateOrderRequest::new([(pricey.id, 2)]), &ctx)
        .await;
    assert!(!result.success);
    assert_eq!(result.kind, Some(ErrorKind::InvalidRequest));
    assert!(result.order.is_none());
}
