use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use common::UserId;
use domain::Channel;
use tokio::sync::RwLock;

use crate::Result;
use crate::channel::{ChannelSender, OutboundMessage};
use crate::recipients::Recipient;

const DEFAULT_INBOX_CAPACITY: usize = 100;

/// In-app inbox: keeps the latest messages per user.
#[derive(Clone)]
pub struct InAppSender {
    inboxes: Arc<RwLock<HashMap<UserId, VecDeque<OutboundMessage>>>>,
    capacity: usize,
}

impl Default for InAppSender {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_INBOX_CAPACITY)
    }
}

impl InAppSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inbox keeping at most `capacity` messages per user; oldest go first.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inboxes: Arc::default(),
            capacity: capacity.max(1),
        }
    }

    /// Messages for `user`, newest last.
    pub async fn inbox(&self, user: UserId) -> Vec<OutboundMessage> {
        self.inboxes
            .read()
            .await
            .get(&user)
            .map(|inbox| inbox.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChannelSender for InAppSender {
    fn channel(&self) -> Channel {
        Channel::InApp
    }

    async fn send(&self, recipient: &Recipient, message: &OutboundMessage) -> Result<()> {
        let mut inboxes = self.inboxes.write().await;
        let inbox = inboxes.entry(recipient.user_id).or_default();
        if inbox.len() == self.capacity {
            inbox.pop_front();
        }
        inbox.push_back(message.clone());
        Ok(())
    }
}
