//! Domain types for the uptimer state store.
//!
//! [`MonitorConfig`] is persisted as one flat JSON record whose field names
//! are camelCase (`targetUrl`, `pollIntervalMillis`, ...).

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Smallest poll interval an operator may configure, in seconds.
pub const MIN_POLL_INTERVAL_SECS: u64 = 5;

/// Smallest poll interval, in milliseconds.
pub const MIN_POLL_INTERVAL_MILLIS: u64 = MIN_POLL_INTERVAL_SECS * 1000;

/// Poll interval used when nothing else is configured.
pub const DEFAULT_POLL_INTERVAL_MILLIS: u64 = 60_000;

/// What to monitor and how often.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MonitorConfig {
    /// Endpoint currently being probed. Empty until an operator sets one.
    #[serde(default)]
    pub target_url: String,
    pub poll_interval_millis: u64,
    pub monitoring_enabled: bool,
    /// Previously active target URLs, oldest first, without duplicates.
    #[serde(default)]
    pub url_history: Vec<String>,
    /// Who to mention in alerts.
    #[serde(default)]
    pub notification_target_id: Option<String>,
    /// The only channel allowed to issue commands; alerts go here too.
    #[serde(default)]
    pub command_channel_id: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            target_url: String::new(),
            poll_interval_millis: DEFAULT_POLL_INTERVAL_MILLIS,
            monitoring_enabled: true,
            url_history: Vec::new(),
            notification_target_id: None,
            command_channel_id: String::new(),
        }
    }
}

impl MonitorConfig {
    /// Both a target and a command channel are required before probing.
    pub fn is_runnable(&self) -> bool {
        !self.target_url.is_empty() && !self.command_channel_id.is_empty()
    }

    /// The poll cadence, never shorter than [`MIN_POLL_INTERVAL_MILLIS`] even
    /// if the stored record was edited by hand.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_millis.max(MIN_POLL_INTERVAL_MILLIS))
    }

    /// Point the monitor at `url`, moving the current target into history.
    ///
    /// The old target is appended only when it is non-empty, differs from
    /// `url`, and is not already in the history. Returns whether the target
    /// changed.
    pub fn retarget(&mut self, url: &str) -> bool {
        if self.target_url == url {
            return false;
        }
        let previous = std::mem::replace(&mut self.target_url, url.to_string());
        if !previous.is_empty() && !self.url_history.contains(&previous) {
            self.url_history.push(previous);
        }
        true
    }

    /// Mention prefix for alerts, if a notification target is set.
    pub fn mention(&self) -> Option<&str> {
        self.notification_target_id
            .as_deref()
            .filter(|id| !id.is_empty())
    }
}

/// `http://` or `https://` followed by something.
pub fn is_http_url(url: &str) -> bool {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .is_some_and(|rest| !rest.is_empty())
}
