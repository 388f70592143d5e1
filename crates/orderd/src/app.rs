//! Component wiring.

use std::sync::Arc;

use domain::Channel;
use notify::{
    ChatWebhookConfig, ChatWebhookSender, Dispatcher, InAppSender, SenderRegistry,
    StaticDirectory,
};
use orders::OrderCoordinator;
use store::{CatalogPrices, NotificationStore, Store};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::StartupError;

/// A running coordinator and its notification dispatcher.
pub struct App<S, C>
where
    S: Store,
    C: CatalogPrices,
{
    coordinator: Arc<OrderCoordinator<S, C>>,
    dispatcher: JoinHandle<()>,
}

impl<S, C> App<S, C>
where
    S: Store,
    C: CatalogPrices,
{
    /// Starts the dispatcher and builds the coordinator on top of it.
    pub fn start(
        store: S,
        catalog: C,
        notifications: Arc<dyn NotificationStore>,
        config: &Config,
    ) -> Result<Self, StartupError> {
        let senders = build_senders(config)?;
        info!(
            channels = ?config.dispatcher.channels,
            senders = senders.len(),
            admins = config.admins.len(),
            "notification channels configured"
        );

        let dispatcher = Dispatcher::new(
            notifications,
            Arc::new(StaticDirectory::new(config.admins.clone())),
            senders,
            config.dispatcher.clone(),
        );
        let (handle, task) = dispatcher.spawn();

        let coordinator = OrderCoordinator::new(store, catalog, Arc::new(handle), config.engine.clone());
        Ok(Self {
            coordinator: Arc::new(coordinator),
            dispatcher: task,
        })
    }

    pub fn coordinator(&self) -> &Arc<OrderCoordinator<S, C>> {
        &self.coordinator
    }

    /// Drops the coordinator and waits for queued notifications to go out.
    ///
    /// Clones of [`coordinator`](Self::coordinator) keep the queue open; drop
    /// them first.
    pub async fn shutdown(self) {
        drop(self.coordinator);
        if let Err(e) = self.dispatcher.await {
            error!(error = %e, "notification dispatcher failed");
        }
        info!("order engine stopped");
    }
}

/// Registers a sender for every enabled channel that has one.
fn build_senders(config: &Config) -> Result<SenderRegistry, StartupError> {
    let mut senders = SenderRegistry::new();
    for &channel in &config.dispatcher.channels {
        match channel {
            Channel::InApp => senders.register(Arc::new(InAppSender::new())),
            Channel::ChatBot => match &config.chat_webhook_url {
                Some(url) => senders.register(Arc::new(ChatWebhookSender::new(
                    ChatWebhookConfig::new(url.clone()),
                )?)),
                None => warn!("chat_bot channel enabled without NOTIFY_CHAT_WEBHOOK_URL, skipping"),
            },
            Channel::Email => warn!("email channel has no sender, skipping"),
        }
    }
    Ok(senders)
}
