//! Domain models for Barkeep.
//!
//! This module contains the core data structures shared by the crawler, the
//! costing engine and the persistence layer.
//!
//! ## Submodules
//!
//! - [`catalog`] - Retailer products and price history
//! - [`recipe`] - Recipes and their ingredients
//! - [`cost`] - Match results and cost calculations

mod catalog;
mod cost;
mod recipe;

// Re-export everything at the models level
pub use catalog::{CatalogRecord, CatalogStats, PriceHistoryEntry};
pub use cost::{CostCalculation, CostTier, IngredientCostBreakdown, MatchResult, Resolution};
pub use recipe::{Amount, DEFAULT_SERVING_SIZE_ML, IngredientKind, Recipe, RecipeIngredient};
#[cfg(test)]
mod serde_tests;
