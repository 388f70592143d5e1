use std::time::Duration;

use async_trait::async_trait;
use domain::Channel;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use crate::channel::{ChannelSender, OutboundMessage};
use crate::recipients::Recipient;
use crate::{Result, SendError};

/// Chat-bot webhook configuration.
#[derive(Debug, Clone)]
pub struct ChatWebhookConfig {
    /// Webhook endpoint URL.
    pub endpoint: String,

    /// Request timeout.
    pub timeout: Duration,
}

impl ChatWebhookConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Serialize)]
struct ChatPayload<'a> {
    chat_id: &'a str,
    recipient: &'a str,
    title: &'a str,
    text: &'a str,
    order_id: String,
}

/// Posts messages to a chat-bot webhook, one request per recipient.
pub struct ChatWebhookSender {
    client: Client,
    config: ChatWebhookConfig,
}

impl ChatWebhookSender {
    pub fn new(config: ChatWebhookConfig) -> Result<Self> {
        if config.endpoint.is_empty() {
            return Err(SendError::Rejected(
                "chat webhook endpoint not configured".to_string(),
            ));
        }
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl ChannelSender for ChatWebhookSender {
    fn channel(&self) -> Channel {
        Channel::ChatBot
    }

    async fn send(&self, recipient: &Recipient, message: &OutboundMessage) -> Result<()> {
        let chat_id = recipient
            .chat_id
            .as_deref()
            .ok_or_else(|| SendError::MissingAddress {
                channel: Channel::ChatBot,
                recipient: recipient.display_name.clone(),
            })?;

        let payload = ChatPayload {
            chat_id,
            recipient: &recipient.display_name,
            title: &message.title,
            text: &message.message,
            order_id: message.order_id.to_string(),
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!(endpoint = %self.config.endpoint, chat_id, "chat message posted");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            warn!(endpoint = %self.config.endpoint, status = %status, "chat webhook refused message");
            Err(SendError::Rejected(format!(
                "HTTP {} - {}",
                status,
                body.chars().take(200).collect::<String>()
            )))
        }
    }
}
