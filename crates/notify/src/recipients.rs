//! Recipient lookup.

use async_trait::async_trait;
use common::UserId;
use serde::{Deserialize, Serialize};

use crate::Result;

/// A user who receives order notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub user_id: UserId,
    pub display_name: String,
    pub email: Option<String>,
    /// Chat identifier used by the chat-bot channel.
    pub chat_id: Option<String>,
}

impl Recipient {
    pub fn new(user_id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            email: None,
            chat_id: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_chat_id(mut self, chat_id: impl Into<String>) -> Self {
        self.chat_id = Some(chat_id.into());
        self
    }
}

/// Resolves who should hear about order events.
#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    async fn admin_users(&self) -> Result<Vec<Recipient>>;
}

/// Fixed recipient list, typically built from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    recipients: Vec<Recipient>,
}

impl StaticDirectory {
    pub fn new(recipients: Vec<Recipient>) -> Self {
        Self { recipients }
    }
}

#[async_trait]
impl RecipientDirectory for StaticDirectory {
    async fn admin_users(&self) -> Result<Vec<Recipient>> {
        Ok(self.recipients.clone())
    }
}
