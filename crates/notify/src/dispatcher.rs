//! Bounded-queue notification dispatcher.
//!
//! Callers hand events to a [`DispatcherHandle`], which never blocks: when the
//! queue is full or closed the event is dropped with a warning and a metric.
//! The [`Dispatcher`] drains the queue on its own task and delivers events
//! concurrently, at most `workers` at a time.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use common::NotificationId;
use domain::{Channel, Notification, NotificationDelivery, OrderEvent};
use futures_util::FutureExt;
use store::NotificationStore;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::channel::{ChannelSender, OutboundMessage, SenderRegistry};
use crate::recipients::Recipient;
use crate::config::DispatcherConfig;
use crate::recipients::RecipientDirectory;
use crate::template;

/// Receives committed order events. Must return immediately.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: OrderEvent);
}

/// Notifier that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, event: OrderEvent) {
        debug!(order_id = %event.order_id, event_type = event.event_type(), "notification discarded");
    }
}

/// Sending half of the dispatcher queue.
///
/// The dispatcher shuts down once every handle is dropped and the queue is
/// drained.
#[derive(Debug, Clone)]
pub struct DispatcherHandle {
    tx: mpsc::Sender<OrderEvent>,
}

impl Notifier for DispatcherHandle {
    fn notify(&self, event: OrderEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(
                    order_id = %event.order_id,
                    event_type = event.event_type(),
                    "notification queue full, dropping event"
                );
                metrics::counter!("notification_queue_dropped_total", "reason" => "full")
                    .increment(1);
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                warn!(
                    order_id = %event.order_id,
                    event_type = event.event_type(),
                    "notification queue closed, dropping event"
                );
                metrics::counter!("notification_queue_dropped_total", "reason" => "closed")
                    .increment(1);
            }
        }
    }
}

/// Outcome of delivering one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Set once the notification row was stored.
    pub notification_id: Option<NotificationId>,
    pub sent: usize,
    pub failed: usize,
    /// Enabled channels skipped because no sender is registered.
    pub skipped: Vec<Channel>,
}

/// Delivers order events to every enabled channel and recipient.
pub struct Dispatcher {
    store: Arc<dyn NotificationStore>,
    directory: Arc<dyn RecipientDirectory>,
    senders: SenderRegistry,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        directory: Arc<dyn RecipientDirectory>,
        senders: SenderRegistry,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            store,
            directory,
            senders,
            config,
        }
    }

    /// Starts the worker loop on its own task.
    ///
    /// Await the returned join handle after dropping every
    /// [`DispatcherHandle`] to wait for queued and in-flight deliveries.
    pub fn spawn(self) -> (DispatcherHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(self.config.queue_capacity.max(1));
        let task = tokio::spawn(self.run(rx));
        (DispatcherHandle { tx }, task)
    }

    /// Drains `rx` until it closes, then waits for in-flight deliveries.
    pub async fn run(self, mut rx: mpsc::Receiver<OrderEvent>) {
        let workers = self.config.workers.max(1);
        info!(workers, capacity = self.config.queue_capacity, "notification dispatcher started");

        let dispatcher = Arc::new(self);
        let semaphore = Arc::new(Semaphore::new(workers));
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                received = rx.recv() => {
                    let Some(event) = received else {
                        break;
                    };
                    let Ok(permit) = semaphore.clone().acquire_owned().await else {
                        break;
                    };
                    let dispatcher = dispatcher.clone();
                    tasks.spawn(async move {
                        let _permit = permit;
                        dispatcher.deliver_isolated(event).await;
                    });
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "notification task failed");
                    }
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "notification task failed");
            }
        }
        info!("notification dispatcher stopped");
    }

    /// Runs [`deliver`](Self::deliver), containing any panic to this event.
    async fn deliver_isolated(&self, event: OrderEvent) {
        let order_id = event.order_id;
        let event_type = event.event_type();
        if let Err(panic) = AssertUnwindSafe(self.deliver(&event)).catch_unwind().await {
            let panic_msg = panic_message(&*panic);
            error!(%order_id, event_type, panic = %panic_msg, "notification delivery panicked");
        }
    }

    /// One send, bounded by `send_timeout`, with a panic reported as a failure.
    async fn send_one(
        &self,
        sender: &dyn ChannelSender,
        recipient: &Recipient,
        message: &OutboundMessage,
    ) -> Result<(), String> {
        let timeout = self.config.send_timeout;
        let attempt = AssertUnwindSafe(sender.send(recipient, message)).catch_unwind();
        match tokio::time::timeout(timeout, attempt).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(e))) => Err(e.to_string()),
            Ok(Err(panic)) => Err(format!("Sender panicked: {}", panic_message(&*panic))),
            Err(_) => Err(format!("Timed out after {timeout:?}")),
        }
    }

    /// Persists and delivers one event. Failures are recorded, never returned.
    #[tracing::instrument(skip(self, event), fields(order_id = %event.order_id, event_type = event.event_type()))]
    pub async fn deliver(&self, event: &OrderEvent) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        let rendered = template::render(event);

        let notification = Notification {
            id: NotificationId::new(),
            order_id: event.order_id,
            event_type: event.event_type().to_string(),
            title: rendered.title,
            message: rendered.message,
            created_at: Utc::now(),
        };
        if let Err(e) = self.store.insert_notification(&notification).await {
            error!(error = %e, "failed to store notification");
            return report;
        }
        report.notification_id = Some(notification.id);

        let recipients = match self.directory.admin_users().await {
            Ok(recipients) => recipients,
            Err(e) => {
                error!(error = %e, "failed to resolve notification recipients");
                return report;
            }
        };

        let message = OutboundMessage {
            notification_id: notification.id,
            order_id: notification.order_id,
            title: notification.title,
            message: notification.message,
        };

        for &channel in &self.config.channels {
            let Some(sender) = self.senders.get(channel) else {
                debug!(%channel, "no sender registered for channel");
                report.skipped.push(channel);
                continue;
            };

            for recipient in &recipients {
                let delivery = match self.send_one(sender.as_ref(), recipient, &message).await {
                    Ok(()) => {
                        report.sent += 1;
                        NotificationDelivery::sent(message.notification_id, channel, recipient.user_id)
                    }
                    Err(reason) => {
                        report.failed += 1;
                        warn!(%channel, recipient = %recipient.user_id, error = %reason, "notification delivery failed");
                        NotificationDelivery::failed(
                            message.notification_id,
                            channel,
                            recipient.user_id,
                            reason,
                        )
                    }
                };
                metrics::counter!(
                    "notifications_delivered_total",
                    "channel" => channel.as_str(),
                    "status" => delivery.status.as_str()
                )
                .increment(1);

                if let Err(e) = self.store.insert_delivery(&delivery).await {
                    warn!(%channel, error = %e, "failed to record notification delivery");
                }
            }
        }

        report
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
