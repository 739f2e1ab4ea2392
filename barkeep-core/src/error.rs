//! Core error types for `Barkeep`.

use thiserror::Error;

/// Core error type for `Barkeep` operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A named entity (recipe, catalog record) does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A model failed validation.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The persistence collaborator failed.
    #[error("Repository error: {0}")]
    Repository(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl CoreError {
    /// Returns true if this error means the requested entity is missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
