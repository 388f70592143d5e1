use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use common::UserId;
use domain::Channel;

use crate::channel::{ChannelSender, OutboundMessage};
use crate::recipients::Recipient;
use crate::{Result, SendError};

#[derive(Default)]
struct RecordingState {
    sent: Vec<(UserId, OutboundMessage)>,
    fail_with: Option<String>,
    panic_on_send: bool,
    send_delay: Option<Duration>,
}

/// Sender that records every message it is asked to deliver.
///
/// Can be told to fail or to panic, for exercising the dispatcher's
/// failure isolation.
#[derive(Clone)]
pub struct RecordingSender {
    channel: Channel,
    state: Arc<RwLock<RecordingState>>,
}

impl RecordingSender {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            state: Arc::default(),
        }
    }

    /// Makes every send fail with `reason`, or succeed again with `None`.
    pub fn set_fail_with(&self, reason: Option<&str>) {
        self.write().fail_with = reason.map(str::to_string);
    }

    pub fn set_panic_on_send(&self, panic: bool) {
        self.write().panic_on_send = panic;
    }

    /// Makes every send wait `delay` before doing anything else.
    pub fn set_send_delay(&self, delay: Option<Duration>) {
        self.write().send_delay = delay;
    }

    /// Messages delivered so far, with their recipient.
    pub fn sent(&self) -> Vec<(UserId, OutboundMessage)> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .sent
            .clone()
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, RecordingState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ChannelSender for RecordingSender {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn send(&self, recipient: &Recipient, message: &OutboundMessage) -> Result<()> {
        let delay = self.write().send_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.write();
        if state.panic_on_send {
            drop(state);
            panic!("recording sender told to panic");
        }
        if let Some(reason) = &state.fail_with {
            return Err(SendError::Rejected(reason.clone()));
        }
        state.sent.push((recipient.user_id, message.clone()));
        Ok(())
    }
}
