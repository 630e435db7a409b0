//! The notification delivery seam.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("no webhook configured for channel {0}")]
    UnknownChannel(String),
    #[error("webhook returned {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Opaque identifier of the chat channel a message goes to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelRef(String);

impl ChannelRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ChannelRef {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Delivers a text message to a channel.
///
/// Implementations make a single attempt; retries are the caller's call
/// and the scheduler never makes one.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, channel: &ChannelRef, text: &str) -> Result<(), NotifyError>;
}
