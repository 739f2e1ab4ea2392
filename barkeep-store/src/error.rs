//! Store error types.

use barkeep_core::CoreError;
use thiserror::Error;

/// Errors that can occur in the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row could not be turned back into a model.
    #[error("Corrupt row in {table}: {reason}")]
    CorruptRow {
        /// Table the row came from.
        table: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// A model failed validation before it was stored.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The repository lock was poisoned by a panicking writer.
    #[error("Repository lock poisoned")]
    Poisoned,
}

impl From<CoreError> for StoreError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Serialization(e) => Self::Serialization(e),
            other => Self::InvalidData(other.to_string()),
        }
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Serialization(e) => Self::Serialization(e),
            StoreError::InvalidData(msg) => Self::InvalidData(msg),
            other => Self::Repository(other.to_string()),
        }
    }
}
