use std::time::Duration;

use domain::Channel;

/// Dispatcher configuration.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Capacity of the event queue; events beyond it are dropped.
    pub queue_capacity: usize,

    /// Maximum number of events delivered concurrently.
    pub workers: usize,

    /// Channels to deliver on, in order.
    pub channels: Vec<Channel>,

    /// Upper bound on a single send; a slower send is recorded as failed.
    pub send_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            workers: 8,
            channels: vec![Channel::InApp],
            send_timeout: Duration::from_secs(10),
        }
    }
}

impl DispatcherConfig {
    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity.max(1);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_channels(mut self, channels: impl IntoIterator<Item = Channel>) -> Self {
        self.channels = Vec::new();
        for channel in channels {
            if !self.channels.contains(&channel) {
                self.channels.push(channel);
            }
        }
        self
    }

    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    pub fn is_enabled(&self, channel: Channel) -> bool {
        self.channels.contains(&channel)
    }
}
