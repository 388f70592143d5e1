use domain::Channel;
use thiserror::Error;

/// Errors raised while delivering a notification on one channel.
///
/// These never leave the dispatcher: each one becomes a `failed` delivery
/// row carrying its display text.
#[derive(Debug, Error)]
pub enum SendError {
    /// The recipient has no address for this channel.
    #[error("Recipient {recipient} has no {channel} address")]
    MissingAddress { channel: Channel, recipient: String },

    /// The remote end answered but refused the message.
    #[error("Rejected: {0}")]
    Rejected(String),

    /// The request never completed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Recipient lookup failed.
    #[error("Directory error: {0}")]
    Directory(String),
}

/// Result type for notification operations.
pub type Result<T> = std::result::Result<T, SendError>;
