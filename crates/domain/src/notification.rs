//! Notification and per-channel delivery records.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use common::{NotificationId, OrderId, UserId};
use serde::{Deserialize, Serialize};

/// Delivery channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    InApp,
    ChatBot,
    Email,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::InApp, Channel::ChatBot, Channel::Email];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::InApp => "in_app",
            Channel::ChatBot => "chat_bot",
            Channel::Email => "email",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown channel name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown channel: {0}")]
pub struct UnknownChannel(pub String);

impl FromStr for Channel {
    type Err = UnknownChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .into_iter()
            .find(|channel| channel.as_str() == s.trim())
            .ok_or_else(|| UnknownChannel(s.to_string()))
    }
}

/// Outcome of one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
        }
    }
}

/// Error returned when parsing an unknown delivery status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown delivery status: {0}")]
pub struct UnknownDeliveryStatus(pub String);

impl FromStr for DeliveryStatus {
    type Err = UnknownDeliveryStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(DeliveryStatus::Sent),
            "failed" => Ok(DeliveryStatus::Failed),
            other => Err(UnknownDeliveryStatus(other.to_string())),
        }
    }
}

/// A rendered notification about one order event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub order_id: OrderId,
    pub event_type: String,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// One channel/recipient delivery attempt for a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationDelivery {
    pub notification_id: NotificationId,
    pub channel: Channel,
    pub recipient: UserId,
    pub status: DeliveryStatus,
    pub failure_reason: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

impl NotificationDelivery {
    pub fn sent(notification_id: NotificationId, channel: Channel, recipient: UserId) -> Self {
        Self {
            notification_id,
            channel,
            recipient,
            status: DeliveryStatus::Sent,
            failure_reason: None,
            attempted_at: Utc::now(),
        }
    }

    pub fn failed(
        notification_id: NotificationId,
        channel: Channel,
        recipient: UserId,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            notification_id,
            channel,
            recipient,
            status: DeliveryStatus::Failed,
            failure_reason: Some(reason.into()),
            attempted_at: Utc::now(),
        }
    }
}
