//! Config store errors.

use thiserror::Error;

pub type StateResult<T> = Result<T, StateError>;

/// Why the monitor config could not be read or written.
///
/// Every variant except [`StateError::Missing`] means the record, or the
/// database holding it, is unusable right now.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("cannot open config database: {0}")]
    Open(String),

    /// Transaction, table, or I/O failure inside redb.
    #[error("config storage failure: {0}")]
    Storage(String),

    #[error("cannot encode monitor config: {0}")]
    Encode(String),

    /// The stored bytes are not a valid monitor config.
    #[error("stored monitor config is malformed: {0}")]
    Malformed(String),

    #[error("no monitor config stored")]
    Missing,
}

impl StateError {
    /// The record simply has not been written yet.
    pub fn is_missing(&self) -> bool {
        matches!(self, StateError::Missing)
    }
}
