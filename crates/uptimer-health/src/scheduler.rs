//! Scheduler: the background timer that drives probe cycles.
//!
//! A cycle is: reload config, probe the target, feed the debounce tracker,
//! and send an alert when a transition is confirmed. Cycles never overlap:
//! each timer task awaits its cycle before taking the next tick (missed
//! ticks are skipped), and every cycle runs under one cycle lock, including
//! the immediate cycle performed by [`Scheduler::start`].
//!
//! Each cycle runs as its own task. A panic inside one is logged and the
//! timer keeps ticking; tearing the timer down does not cancel a cycle that
//! is already probing. Such a straggler may still update the tracker but
//! sends nothing if [`Scheduler::stop`] was called while it ran.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use uptimer_notify::{Alert, AlertKind, ChannelRef, Notifier};
use uptimer_state::{
    ConfigStore, DEFAULT_POLL_INTERVAL_MILLIS, MIN_POLL_INTERVAL_MILLIS, MonitorConfig,
};

use crate::debounce::{
    ConfirmedStatus, DEFAULT_CONFIRM_THRESHOLD, DebounceSnapshot, DebounceTracker, Transition,
};
use crate::probe::{DEFAULT_PROBE_TIMEOUT, ProbeOutcome, Prober};

/// Tunables that are not part of the persisted monitor config.
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Consecutive disagreeing probes needed to confirm a transition.
    pub confirm_threshold: u32,
    pub probe_timeout: Duration,
    /// Timer period used when the config cannot be read at start. Never
    /// shorter than the minimum poll interval.
    pub fallback_interval: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            confirm_threshold: DEFAULT_CONFIRM_THRESHOLD,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            fallback_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MILLIS),
        }
    }
}

/// Why a cycle did not reach the debounce tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The config store could not be read or decoded.
    ConfigUnavailable,
    /// `monitoringEnabled` is false.
    Disabled,
    /// Target URL or command channel is empty.
    Incomplete,
    /// The tracker was reset while the probe was in flight.
    TargetChanged,
}

/// What a single cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Skipped(SkipReason),
    Observed(Transition),
}

/// Running timer task.
struct TimerSlot {
    handle: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
    interval: Duration,
}

/// Counts live timer tasks; decremented when the task is dropped.
struct TimerGuard(Arc<Shared>);

impl TimerGuard {
    fn new(shared: Arc<Shared>) -> Self {
        shared.active_timers.fetch_add(1, Ordering::SeqCst);
        Self(shared)
    }
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        self.0.active_timers.fetch_sub(1, Ordering::SeqCst);
    }
}

/// State shared between the scheduler handle, its timer, and cycle tasks.
struct Shared {
    store: Arc<dyn ConfigStore>,
    prober: Arc<dyn Prober>,
    notifier: Arc<dyn Notifier>,
    settings: SchedulerSettings,
    tracker: Mutex<DebounceTracker>,
    /// Held for the whole of a cycle.
    cycle_lock: Mutex<()>,
    /// Bumped by every `stop()`; a cycle that sees it change sends nothing.
    stops: AtomicU64,
    active_timers: AtomicUsize,
}

impl Shared {
    async fn run_cycle(&self) -> CycleOutcome {
        let _cycle = self.cycle_lock.lock().await;
        let stops = self.stops.load(Ordering::SeqCst);
        // Taken before the config read so a retarget that lands in between
        // still invalidates this cycle.
        let epoch = self.tracker.lock().await.epoch();

        // Always re-read: an external edit applies on the very next tick.
        let config = match self.store.load_config() {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "monitor config unavailable, skipping cycle");
                return CycleOutcome::Skipped(SkipReason::ConfigUnavailable);
            }
        };
        if !config.monitoring_enabled {
            debug!("monitoring disabled, skipping cycle");
            return CycleOutcome::Skipped(SkipReason::Disabled);
        }
        if !config.is_runnable() {
            debug!("target or command channel not configured, skipping cycle");
            return CycleOutcome::Skipped(SkipReason::Incomplete);
        }

        let outcome = self
            .prober
            .probe(&config.target_url, self.settings.probe_timeout)
            .await;
        debug!(
            url = %config.target_url,
            reachable = outcome.reachable,
            status = ?outcome.status,
            elapsed_ms = outcome.elapsed_ms,
            "probe finished"
        );

        let transition = {
            let mut tracker = self.tracker.lock().await;
            if tracker.epoch() != epoch {
                debug!(url = %config.target_url, "tracker reset during probe, discarding result");
                return CycleOutcome::Skipped(SkipReason::TargetChanged);
            }
            tracker.observe(outcome.reachable, self.settings.confirm_threshold)
        };

        if let Transition::Confirmed(status) = transition {
            if self.stops.load(Ordering::SeqCst) != stops {
                info!(url = %config.target_url, ?status, "scheduler stopped mid-cycle, alert dropped");
            } else {
                self.send_alert(&config, status).await;
            }
        }

        CycleOutcome::Observed(transition)
    }

    async fn send_alert(&self, config: &MonitorConfig, status: ConfirmedStatus) {
        let kind = match status {
            ConfirmedStatus::Up => AlertKind::Recovered,
            ConfirmedStatus::Down => AlertKind::Outage,
            ConfirmedStatus::Unknown => return,
        };
        let alert = Alert::new(kind, config.target_url.as_str()).with_mention(config.mention());
        let channel = ChannelRef::new(config.command_channel_id.as_str());

        // One attempt only; the tracker has already moved on.
        match self.notifier.notify(&channel, &alert.render()).await {
            Ok(()) => info!(%channel, url = %config.target_url, ?kind, "alert sent"),
            Err(e) => error!(%channel, url = %config.target_url, error = %e, "failed to send alert"),
        }
    }

    fn current_interval(&self) -> Duration {
        match self.store.load_config() {
            Ok(config) => config.poll_interval(),
            Err(e) => {
                let fallback = self
                    .settings
                    .fallback_interval
                    .max(Duration::from_millis(MIN_POLL_INTERVAL_MILLIS));
                warn!(
                    error = %e,
                    ?fallback,
                    "monitor config unavailable, using fallback interval"
                );
                fallback
            }
        }
    }
}

/// Run one cycle in its own task so a panic cannot take the caller down.
async fn run_isolated(shared: Arc<Shared>) -> Option<CycleOutcome> {
    match tokio::spawn(async move { shared.run_cycle().await }).await {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            error!(error = %e, "probe cycle aborted");
            None
        }
    }
}

/// The timer loop. Ticks are serialized by awaiting each cycle in turn.
async fn run_timer(
    shared: Arc<Shared>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
    _guard: TimerGuard,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_isolated(shared.clone()).await;
            }
            _ = shutdown.changed() => {
                debug!("scheduler timer shutting down");
                break;
            }
        }
    }
}

/// Stop a timer task and wait until it is gone.
async fn teardown(slot: TimerSlot) {
    let _ = slot.shutdown_tx.send(true);
    slot.handle.abort();
    let _ = slot.handle.await;
}

/// Owns the probe cadence and the debounce state for the monitored target.
pub struct Scheduler {
    shared: Arc<Shared>,
    slot: Mutex<Option<TimerSlot>>,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn ConfigStore>,
        prober: Arc<dyn Prober>,
        notifier: Arc<dyn Notifier>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                prober,
                notifier,
                settings,
                tracker: Mutex::new(DebounceTracker::new()),
                cycle_lock: Mutex::new(()),
                stops: AtomicU64::new(0),
                active_timers: AtomicUsize::new(0),
            }),
            slot: Mutex::new(None),
        }
    }

    /// (Re)start the timer.
    ///
    /// Any running timer is torn down first, then one cycle runs right
    /// away, then a new timer is installed with the interval from the
    /// current config. Calling this again is how interval changes apply.
    pub async fn start(&self) {
        let mut slot = self.slot.lock().await;
        if let Some(old) = slot.take() {
            teardown(old).await;
            debug!("previous scheduler timer torn down");
        }

        let interval = self.shared.current_interval();
        run_isolated(self.shared.clone()).await;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let guard = TimerGuard::new(self.shared.clone());
        let handle = tokio::spawn(run_timer(self.shared.clone(), interval, shutdown_rx, guard));

        *slot = Some(TimerSlot {
            handle,
            shutdown_tx,
            interval,
        });
        info!(?interval, "scheduler started");
    }

    /// Stop the timer. In-flight probes finish but send no alert.
    pub async fn stop(&self) {
        // Bump before waiting on the slot: a `start()` cycle still holding
        // it must already see the stop.
        self.shared.stops.fetch_add(1, Ordering::SeqCst);
        let mut slot = self.slot.lock().await;
        if let Some(old) = slot.take() {
            teardown(old).await;
            info!("scheduler stopped");
        }
    }

    /// Run one cycle immediately, outside the timer.
    ///
    /// Returns `None` if the cycle panicked.
    pub async fn tick(&self) -> Option<CycleOutcome> {
        run_isolated(self.shared.clone()).await
    }

    /// Probe `url` once without touching the debounce state.
    pub async fn check(&self, url: &str) -> ProbeOutcome {
        self.shared
            .prober
            .probe(url, self.shared.settings.probe_timeout)
            .await
    }

    /// Forget the confirmed status and any pending run.
    pub async fn reset_debounce(&self) {
        self.shared.tracker.lock().await.reset();
        info!("debounce state reset");
    }

    pub async fn debounce(&self) -> DebounceSnapshot {
        self.shared.tracker.lock().await.snapshot()
    }

    pub async fn is_running(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    /// Period of the running timer, if any.
    pub async fn interval(&self) -> Option<Duration> {
        self.slot.lock().await.as_ref().map(|s| s.interval)
    }

    /// Number of timer tasks currently alive. Never more than one.
    pub fn active_timers(&self) -> usize {
        self.shared.active_timers.load(Ordering::SeqCst)
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.get_mut().take() {
            let _ = slot.shutdown_tx.send(true);
            slot.handle.abort();
        }
    }
}
