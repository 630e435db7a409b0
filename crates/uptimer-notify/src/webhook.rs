//! Webhook delivery.
//!
//! Each channel id maps to a webhook URL; ids without an explicit mapping
//! fall back to the default URL when one is configured.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::sender::{ChannelRef, Notifier, NotifyError};

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts `{"content": text}` to a chat webhook.
pub struct WebhookNotifier {
    client: Client,
    default_url: Option<String>,
    channels: HashMap<String, String>,
}

impl WebhookNotifier {
    /// Create a notifier. `default_url` serves every channel that has no
    /// dedicated webhook.
    pub fn new(default_url: Option<String>) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(SEND_TIMEOUT)
            .user_agent(concat!("uptimer/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            default_url: default_url.filter(|u| !u.is_empty()),
            channels: HashMap::new(),
        })
    }

    /// Route a specific channel to its own webhook.
    pub fn with_channel(mut self, channel: impl Into<String>, url: impl Into<String>) -> Self {
        self.channels.insert(channel.into(), url.into());
        self
    }

    fn resolve(&self, channel: &ChannelRef) -> Result<&str, NotifyError> {
        self.channels
            .get(channel.as_str())
            .or(self.default_url.as_ref())
            .map(String::as_str)
            .ok_or_else(|| NotifyError::UnknownChannel(channel.to_string()))
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, channel: &ChannelRef, text: &str) -> Result<(), NotifyError> {
        let url = self.resolve(channel)?;
        let payload = serde_json::json!({ "content": text });

        let response = self.client.post(url).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(%channel, %status, "webhook delivered");
        Ok(())
    }
}
