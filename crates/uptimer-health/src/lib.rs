//! uptimer-health: probing, debouncing, and the polling scheduler.
//!
//! # Architecture
//!
//! ```text
//! Scheduler
//!   ├── Timer task (one at most, restarted by start())
//!   │   └── Cycle task per tick
//!   │       ├── ConfigStore::load_config() (fresh every cycle)
//!   │       ├── Prober::probe() → ProbeOutcome
//!   │       ├── DebounceTracker::observe() → Transition
//!   │       └── Notifier::notify() on Transition::Confirmed
//!   └── DebounceTracker (behind a mutex, reset on retarget)
//! ```
//!
//! # Debouncing
//!
//! A status change is confirmed only after `confirm_threshold` consecutive
//! probes (default 3) disagree with the current status. The very first
//! probe initialises the status without an alert, so restarting the process
//! never floods the channel.

pub mod debounce;
pub mod probe;
pub mod scheduler;

pub use debounce::{ConfirmedStatus, DebounceSnapshot, DebounceTracker, Transition};
pub use probe::{HttpProber, ProbeOutcome, Prober};
pub use scheduler::{CycleOutcome, Scheduler, SchedulerSettings, SkipReason};
