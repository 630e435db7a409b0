//! uptimer.toml daemon configuration.
//!
//! Holds process-level settings (listen port, debounce threshold, probe
//! timeout, webhooks) and the seed values for the monitor config. The seed
//! is written to the state store only on first boot; after that the store
//! is authoritative and operators change it through commands.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use uptimer_health::SchedulerSettings;
use uptimer_state::{MIN_POLL_INTERVAL_MILLIS, MonitorConfig, is_http_url};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub server: ServerConfig,
    pub monitor: MonitorSettings,
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub confirm_threshold: u32,
    pub probe_timeout_ms: u64,
    pub fallback_interval_ms: u64,
    // Seed values, used only when the store is empty.
    pub target_url: String,
    pub poll_interval_secs: u64,
    pub enabled: bool,
    pub command_channel_id: String,
    pub notification_target_id: Option<String>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            confirm_threshold: 3,
            probe_timeout_ms: 10_000,
            fallback_interval_ms: 60_000,
            target_url: String::new(),
            poll_interval_secs: 60,
            enabled: true,
            command_channel_id: String::new(),
            notification_target_id: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Webhook used for any channel without its own entry.
    pub webhook_url: Option<String>,
    /// Channel id → webhook URL.
    pub channels: HashMap<String, String>,
}

impl DaemonConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DaemonConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject settings the scheduler cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        let m = &self.monitor;
        if m.probe_timeout_ms == 0 {
            anyhow::bail!("[monitor] probe_timeout_ms must be greater than 0");
        }
        if m.fallback_interval_ms < MIN_POLL_INTERVAL_MILLIS {
            anyhow::bail!(
                "[monitor] fallback_interval_ms must be at least {MIN_POLL_INTERVAL_MILLIS}, got {}",
                m.fallback_interval_ms
            );
        }
        if !m.target_url.is_empty() && !is_http_url(&m.target_url) {
            anyhow::bail!(
                "[monitor] target_url {:?} must start with http:// or https://",
                m.target_url
            );
        }
        Ok(())
    }

    /// The monitor config written on first boot.
    pub fn seed_config(&self) -> MonitorConfig {
        let m = &self.monitor;
        MonitorConfig {
            target_url: m.target_url.clone(),
            poll_interval_millis: m.poll_interval_secs.saturating_mul(1000),
            monitoring_enabled: m.enabled,
            url_history: Vec::new(),
            notification_target_id: m.notification_target_id.clone(),
            command_channel_id: m.command_channel_id.clone(),
        }
    }

    pub fn scheduler_settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            confirm_threshold: self.monitor.confirm_threshold,
            probe_timeout: Duration::from_millis(self.monitor.probe_timeout_ms),
            fallback_interval: Duration::from_millis(self.monitor.fallback_interval_ms),
        }
    }

    /// A starter file with every section filled in.
    pub fn scaffold() -> Self {
        let mut config = DaemonConfig::default();
        config.monitor.target_url = "https://example.com/".to_string();
        config.monitor.command_channel_id = "000000000000000000".to_string();
        config.notify.webhook_url =
            Some("https://discord.com/api/webhooks/<id>/<token>".to_string());
        config
    }
}
