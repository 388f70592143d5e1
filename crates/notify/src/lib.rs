//! Order notification dispatch.
//!
//! The order coordinator hands committed events to a [`Notifier`]. The
//! production notifier is a [`DispatcherHandle`] feeding a bounded queue that
//! a [`Dispatcher`] drains on its own task: it renders a template, stores the
//! notification, and sends it on every enabled channel to every admin
//! recipient, recording one delivery row per attempt.

pub mod channel;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod recipients;
pub mod senders;
pub mod template;

pub use channel::{ChannelSender, OutboundMessage, SenderRegistry};
pub use config::DispatcherConfig;
pub use dispatcher::{DeliveryReport, Dispatcher, DispatcherHandle, NoopNotifier, Notifier};
pub use error::{Result, SendError};
pub use recipients::{Recipient, RecipientDirectory, StaticDirectory};
pub use senders::{ChatWebhookConfig, ChatWebhookSender, InAppSender, RecordingSender};
