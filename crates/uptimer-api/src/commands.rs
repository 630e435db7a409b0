//! Operator commands.
//!
//! Every mutation follows write-then-apply: the new config is persisted
//! first, and only after that succeeds are the scheduler and debounce
//! tracker touched. A failed write leaves everything as it was.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use uptimer_health::{DebounceSnapshot, ProbeOutcome, Scheduler};
use uptimer_state::{ConfigStore, MIN_POLL_INTERVAL_SECS, MonitorConfig, StateError, is_http_url};

/// Errors returned by command operations.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("invalid url {0:?}: must start with http:// or https://")]
    InvalidUrl(String),

    #[error("interval of {0}s is below the minimum of {min}s", min = MIN_POLL_INTERVAL_SECS)]
    IntervalTooSmall(u64),

    #[error("channel id must not be empty")]
    InvalidChannel,

    #[error("no target url configured")]
    NoTarget,

    #[error("monitor config unavailable: {0}")]
    ConfigUnavailable(#[source] StateError),

    #[error("failed to persist monitor config: {0}")]
    ConfigPersist(#[source] StateError),
}

pub type CommandResult<T> = Result<T, CommandError>;

/// Result of a one-off probe.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub url: String,
    #[serde(flatten)]
    pub outcome: ProbeOutcome,
}

/// Everything an operator might want to see at once.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub config: MonitorConfig,
    pub debounce: DebounceSnapshot,
    pub running: bool,
    pub interval_ms: Option<u64>,
}

/// The operations exposed to the command surface.
#[derive(Clone)]
pub struct Commands {
    store: Arc<dyn ConfigStore>,
    scheduler: Arc<Scheduler>,
    /// Serializes load-modify-save sequences.
    edit: Arc<Mutex<()>>,
}

impl Commands {
    pub fn new(store: Arc<dyn ConfigStore>, scheduler: Arc<Scheduler>) -> Self {
        Self {
            store,
            scheduler,
            edit: Arc::new(Mutex::new(())),
        }
    }

    fn load(&self) -> CommandResult<MonitorConfig> {
        self.store.load_config().map_err(CommandError::ConfigUnavailable)
    }

    fn persist(&self, config: &MonitorConfig) -> CommandResult<()> {
        self.store.save_config(config).map_err(CommandError::ConfigPersist)
    }

    /// Whether `channel` may issue commands.
    pub fn authorize(&self, channel: &str) -> CommandResult<bool> {
        let config = self.load()?;
        Ok(!config.command_channel_id.is_empty() && config.command_channel_id == channel)
    }

    /// Point the monitor at a new URL and start its debounce over.
    pub async fn set_target_url(&self, url: &str) -> CommandResult<MonitorConfig> {
        let url = url.trim();
        if !is_http_url(url) {
            return Err(CommandError::InvalidUrl(url.to_string()));
        }

        let _edit = self.edit.lock().await;
        let mut config = self.load()?;
        let changed = config.retarget(url);
        self.persist(&config)?;

        self.scheduler.reset_debounce().await;
        info!(%url, changed, history = config.url_history.len(), "target url set");
        Ok(config)
    }

    /// Change the poll interval and restart the timer with it.
    pub async fn set_poll_interval(&self, seconds: u64) -> CommandResult<MonitorConfig> {
        if seconds < MIN_POLL_INTERVAL_SECS {
            return Err(CommandError::IntervalTooSmall(seconds));
        }

        let _edit = self.edit.lock().await;
        let mut config = self.load()?;
        config.poll_interval_millis = seconds.saturating_mul(1000);
        self.persist(&config)?;

        self.scheduler.start().await;
        info!(seconds, "poll interval set");
        Ok(config)
    }

    /// Set or clear who gets mentioned in alerts.
    pub async fn set_notification_target(&self, id: Option<String>) -> CommandResult<MonitorConfig> {
        let id = id.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        let _edit = self.edit.lock().await;
        let mut config = self.load()?;
        config.notification_target_id = id;
        self.persist(&config)?;

        info!(notify_target = ?config.notification_target_id, "notification target set");
        Ok(config)
    }

    /// Move command rights (and alerts) to another channel.
    pub async fn set_command_channel(&self, id: &str) -> CommandResult<MonitorConfig> {
        let id = id.trim();
        if id.is_empty() {
            return Err(CommandError::InvalidChannel);
        }

        let _edit = self.edit.lock().await;
        let mut config = self.load()?;
        config.command_channel_id = id.to_string();
        self.persist(&config)?;

        info!(channel = %id, "command channel set");
        Ok(config)
    }

    /// Flip monitoring on or off. Returns the new state.
    pub async fn toggle_monitoring(&self) -> CommandResult<bool> {
        let _edit = self.edit.lock().await;
        let mut config = self.load()?;
        config.monitoring_enabled = !config.monitoring_enabled;
        self.persist(&config)?;

        if config.monitoring_enabled {
            self.scheduler.start().await;
        } else {
            self.scheduler.stop().await;
        }
        info!(enabled = config.monitoring_enabled, "monitoring toggled");
        Ok(config.monitoring_enabled)
    }

    /// Forget the debounce state and restart the timer.
    pub async fn force_reset(&self) {
        let _edit = self.edit.lock().await;
        self.scheduler.reset_debounce().await;
        self.scheduler.start().await;
        info!("monitor force-reset");
    }

    /// Previously monitored URLs, oldest first.
    pub fn history(&self) -> CommandResult<Vec<String>> {
        Ok(self.load()?.url_history)
    }

    /// Probe the current target once, bypassing the debounce.
    pub async fn check_now(&self) -> CommandResult<CheckReport> {
        let config = self.load()?;
        if config.target_url.is_empty() {
            return Err(CommandError::NoTarget);
        }
        let outcome = self.scheduler.check(&config.target_url).await;
        Ok(CheckReport {
            url: config.target_url,
            outcome,
        })
    }

    pub async fn status(&self) -> CommandResult<StatusReport> {
        let config = self.load()?;
        Ok(StatusReport {
            config,
            debounce: self.scheduler.debounce().await,
            running: self.scheduler.is_running().await,
            interval_ms: self
                .scheduler
                .interval()
                .await
                .map(|d| d.as_millis() as u64),
        })
    }
}
