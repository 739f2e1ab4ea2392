// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `Barkeep` Core
//!
//! Core types, models, and traits for the `Barkeep` workspace.
//!
//! This crate provides the foundational abstractions used across all other
//! `Barkeep` crates, including:
//!
//! - Domain models (catalog records, recipes, cost calculations)
//! - Error types
//! - The repository trait the crawler and costing engine persist through
//!
//! ## Key Types
//!
//! ### Catalog
//! - [`CatalogRecord`] - One retailer product
//! - [`PriceHistoryEntry`] - Append-only price observation
//! - [`CatalogStats`] - Aggregate catalog counts
//!
//! ### Recipes
//! - [`Recipe`] - Named cocktail with ordered ingredients
//! - [`RecipeIngredient`] - One recipe line with matching hints
//!
//! ### Costing
//! - [`CostTier`] - Cheapest / mid-range / premium bucket
//! - [`MatchResult`] - Ranked ingredient match
//! - [`CostCalculation`] - Durable per-recipe cost record

pub mod error;
pub mod models;
pub mod traits;

// Re-export error types
pub use error::CoreError;

// Re-export all model types
pub use models::{
    // Catalog
    CatalogRecord,
    CatalogStats,
    PriceHistoryEntry,
    // Recipes
    Amount,
    DEFAULT_SERVING_SIZE_ML,
    IngredientKind,
    Recipe,
    RecipeIngredient,
    // Costing
    CostCalculation,
    CostTier,
    IngredientCostBreakdown,
    MatchResult,
    Resolution,
};

// Re-export traits
pub use traits::{CandidateQuery, CatalogRepository};
