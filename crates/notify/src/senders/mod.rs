//! Built-in channel senders.

mod in_app;
mod memory;
mod webhook;

pub use in_app::InAppSender;
pub use memory::RecordingSender;
pub use webhook::{ChatWebhookConfig, ChatWebhookSender};
