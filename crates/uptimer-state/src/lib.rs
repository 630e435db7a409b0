//! uptimer-state: the monitor configuration and where it lives.
//!
//! Backed by [redb](https://docs.rs/redb). The whole [`MonitorConfig`] is a
//! single JSON document stored under one key, so every read and write is
//! atomic. Callers depend on the [`ConfigStore`] trait rather than on redb;
//! [`StateStore`] is the production implementation and also offers an
//! in-memory backend for tests.
//!
//! A missing or undecodable record is reported as an error, never papered
//! over with defaults. The scheduler treats that as "config unavailable"
//! and skips the cycle.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::{ConfigStore, StateStore};
pub use types::*;
