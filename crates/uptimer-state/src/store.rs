//! StateStore: redb-backed persistence for the monitor config.
//!
//! The config is JSON-serialized into a single row of the documents table.
//! Each save is one write transaction, so readers observe either the old
//! record or the new one. The store supports both on-disk and in-memory
//! backends (the latter for testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::MonitorConfig;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Read/write access to the one [`MonitorConfig`] record.
///
/// Implementations must make `save_config` atomic: after an error the
/// previously stored record is still the one returned by `load_config`.
pub trait ConfigStore: Send + Sync {
    /// Load the current config. Missing or malformed records are errors.
    fn load_config(&self) -> StateResult<MonitorConfig>;

    /// Durably replace the stored config.
    fn save_config(&self, config: &MonitorConfig) -> StateResult<()>;
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Storage))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(DOCUMENTS).map_err(map_err!(Storage))?;
        txn.commit().map_err(map_err!(Storage))?;
        Ok(())
    }

    /// Write `config` only if no record exists yet. Returns true if written.
    pub fn seed_config(&self, config: &MonitorConfig) -> StateResult<bool> {
        let value = serde_json::to_vec(config).map_err(map_err!(Encode))?;
        let txn = self.db.begin_write().map_err(map_err!(Storage))?;
        let written;
        {
            let mut table = txn.open_table(DOCUMENTS).map_err(map_err!(Storage))?;
            let exists = table
                .get(MONITOR_CONFIG_KEY)
                .map_err(map_err!(Storage))?
                .is_some();
            if !exists {
                table
                    .insert(MONITOR_CONFIG_KEY, value.as_slice())
                    .map_err(map_err!(Storage))?;
            }
            written = !exists;
        }
        txn.commit().map_err(map_err!(Storage))?;
        debug!(written, "monitor config seeded");
        Ok(written)
    }
}

impl ConfigStore for StateStore {
    fn load_config(&self) -> StateResult<MonitorConfig> {
        let txn = self.db.begin_read().map_err(map_err!(Storage))?;
        let table = txn.open_table(DOCUMENTS).map_err(map_err!(Storage))?;
        match table.get(MONITOR_CONFIG_KEY).map_err(map_err!(Storage))? {
            Some(guard) => {
                serde_json::from_slice(guard.value()).map_err(map_err!(Malformed))
            }
            None => Err(StateError::Missing),
        }
    }

    fn save_config(&self, config: &MonitorConfig) -> StateResult<()> {
        let value = serde_json::to_vec(config).map_err(map_err!(Encode))?;
        let txn = self.db.begin_write().map_err(map_err!(Storage))?;
        {
            let mut table = txn.open_table(DOCUMENTS).map_err(map_err!(Storage))?;
            table
                .insert(MONITOR_CONFIG_KEY, value.as_slice())
                .map_err(map_err!(Storage))?;
        }
        txn.commit().map_err(map_err!(Storage))?;
        debug!(target_url = %config.target_url, "monitor config stored");
        Ok(())
    }
}
