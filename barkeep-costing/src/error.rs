//! Costing error types.
//!
//! Matching and costing never fail a calculation; the only fallible step is
//! turning recipe text into a structured ingredient.

use thiserror::Error;

/// Error type for ingredient text parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The ingredient text was blank.
    #[error("Ingredient text is empty")]
    Empty,

    /// No leading quantity was found.
    #[error("No amount found in '{0}'")]
    MissingAmount(String),

    /// The quantity could not be read as a number.
    #[error("Invalid amount '{0}'")]
    InvalidAmount(String),

    /// The unit is not in the conversion table.
    #[error("Unknown unit '{0}'")]
    UnknownUnit(String),

    /// A quantity was found but no ingredient name followed it.
    #[error("No ingredient name in '{0}'")]
    MissingName(String),
}

impl From<ParseError> for barkeep_core::CoreError {
    fn from(err: ParseError) -> Self {
        Self::InvalidData(err.to_string())
    }
}
