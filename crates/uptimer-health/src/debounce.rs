//! Debounce engine.
//!
//! Turns a stream of raw reachability results into confirmed Up/Down
//! transitions. A transition is confirmed only after `threshold`
//! consecutive results disagree with the confirmed status; one agreeing
//! result in between starts the count over.
//!
//! The window is counted in probe cycles, not wall-clock time, so its real
//! duration scales with the poll interval.

use serde::Serialize;
use tracing::{debug, info, warn};

/// Consecutive disagreeing probes needed to confirm a transition.
pub const DEFAULT_CONFIRM_THRESHOLD: u32 = 3;

/// Last confirmed status of the monitored target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmedStatus {
    /// Nothing observed since start or since the last reset.
    Unknown,
    Up,
    Down,
}

impl ConfirmedStatus {
    fn from_reachable(reachable: bool) -> Self {
        if reachable {
            ConfirmedStatus::Up
        } else {
            ConfirmedStatus::Down
        }
    }

    /// `Some(true)` for Up, `Some(false)` for Down.
    pub fn as_reachable(self) -> Option<bool> {
        match self {
            ConfirmedStatus::Unknown => None,
            ConfirmedStatus::Up => Some(true),
            ConfirmedStatus::Down => Some(false),
        }
    }
}

/// What a single observation did to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// First observation; status set without notifying.
    Initialized,
    /// Agrees with the confirmed status, nothing pending.
    NoChange,
    /// Agrees with the confirmed status and cancelled a pending run.
    Stabilized,
    /// Disagrees, but the run is still below the threshold.
    Pending { count: u32, threshold: u32 },
    /// The run reached the threshold; this is the new status.
    Confirmed(ConfirmedStatus),
}

/// Snapshot of the tracker for status reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebounceSnapshot {
    pub confirmed_status: ConfirmedStatus,
    pub pending_counter: u32,
}

/// Debounce state for the monitored target.
#[derive(Debug)]
pub struct DebounceTracker {
    status: ConfirmedStatus,
    pending: u32,
    /// Bumped on every reset so in-flight cycles can tell that the target
    /// they probed is no longer the one being tracked.
    epoch: u64,
}

impl Default for DebounceTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl DebounceTracker {
    pub fn new() -> Self {
        Self {
            status: ConfirmedStatus::Unknown,
            pending: 0,
            epoch: 0,
        }
    }

    /// Record one probe result.
    ///
    /// `threshold` values below 1 are treated as 1.
    pub fn observe(&mut self, reachable: bool, threshold: u32) -> Transition {
        let threshold = threshold.max(1);

        let Some(current) = self.status.as_reachable() else {
            self.status = ConfirmedStatus::from_reachable(reachable);
            self.pending = 0;
            info!(status = ?self.status, "monitor initialised");
            return Transition::Initialized;
        };

        if reachable == current {
            if self.pending > 0 {
                debug!(cancelled = self.pending, "pending transition cancelled");
                self.pending = 0;
                return Transition::Stabilized;
            }
            debug!(status = ?self.status, "status unchanged");
            return Transition::NoChange;
        }

        self.pending += 1;
        if self.pending >= threshold {
            self.status = ConfirmedStatus::from_reachable(reachable);
            self.pending = 0;
            if reachable {
                info!(threshold, "target confirmed up");
            } else {
                warn!(threshold, "target confirmed down");
            }
            return Transition::Confirmed(self.status);
        }

        debug!(count = self.pending, threshold, "transition pending");
        Transition::Pending {
            count: self.pending,
            threshold,
        }
    }

    /// Forget everything; the next observation initialises again.
    pub fn reset(&mut self) {
        self.status = ConfirmedStatus::Unknown;
        self.pending = 0;
        self.epoch += 1;
    }

    pub fn status(&self) -> ConfirmedStatus {
        self.status
    }

    pub fn pending(&self) -> u32 {
        self.pending
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn snapshot(&self) -> DebounceSnapshot {
        DebounceSnapshot {
            confirmed_status: self.status,
            pending_counter: self.pending,
        }
    }
}
