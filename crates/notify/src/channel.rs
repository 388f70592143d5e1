//! Channel sender seam and registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{NotificationId, OrderId};
use domain::Channel;
use serde::Serialize;

use crate::Result;
use crate::recipients::Recipient;

/// What a sender delivers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub notification_id: NotificationId,
    pub order_id: OrderId,
    pub title: String,
    pub message: String,
}

/// Delivers messages on one channel.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    fn channel(&self) -> Channel;

    async fn send(&self, recipient: &Recipient, message: &OutboundMessage) -> Result<()>;
}

/// Senders keyed by the channel they serve.
#[derive(Clone, Default)]
pub struct SenderRegistry {
    senders: HashMap<Channel, Arc<dyn ChannelSender>>,
}

impl SenderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a sender, replacing any previous sender for its channel.
    pub fn register(&mut self, sender: Arc<dyn ChannelSender>) {
        self.senders.insert(sender.channel(), sender);
    }

    pub fn with(mut self, sender: Arc<dyn ChannelSender>) -> Self {
        self.register(sender);
        self
    }

    pub fn get(&self, channel: Channel) -> Option<&Arc<dyn ChannelSender>> {
        self.senders.get(&channel)
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}
