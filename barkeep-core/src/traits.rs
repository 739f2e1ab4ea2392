//! Trait definitions for Barkeep.
//!
//! The costing and crawling code never issues raw queries. Everything it
//! needs from storage goes through the narrow [`CatalogRepository`] seam, so
//! the pure logic can be tested without a database.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::models::{CatalogRecord, CostCalculation, PriceHistoryEntry, Recipe};

/// Hint describing which catalog records could plausibly match an ingredient.
///
/// A record is a candidate if any keyword occurs in its name, brand or
/// subcategory, or if its category is one of `categories`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateQuery {
    /// Lowercase keywords to search for.
    pub keywords: Vec<String>,
    /// Category names to include wholesale.
    pub categories: Vec<String>,
    /// Maximum number of records to return, in external-id order.
    ///
    /// Ingredient queries leave this unset; every candidate is scored.
    pub limit: Option<usize>,
}

impl CandidateQuery {
    /// Creates a query from keywords.
    pub fn new(keywords: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            keywords: keywords.into_iter().map(Into::into).collect(),
            categories: Vec::new(),
            limit: None,
        }
    }

    /// Adds a category to include.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(category.into());
        self
    }

    /// Caps the number of results.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns true if the query cannot match anything.
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty() && self.categories.is_empty()
    }
}

/// Persistence collaborator for the crawler and the costing engine.
///
/// Implementations must be safe to share between threads; the costing path
/// may be called from several requests at once.
pub trait CatalogRepository: Send + Sync {
    /// Inserts or updates a record keyed by its external id.
    ///
    /// Returns `true` if the record is new or its price changed, which is
    /// exactly when a price-history entry should be appended.
    fn upsert_catalog_record(&self, record: &CatalogRecord) -> Result<bool, CoreError>;

    /// Appends a price observation.
    fn append_price_history(&self, entry: &PriceHistoryEntry) -> Result<(), CoreError>;

    /// Loads a recipe by name.
    fn load_recipe(&self, name: &str) -> Result<Option<Recipe>, CoreError>;

    /// Appends a cost calculation. Earlier calculations are kept.
    fn append_cost_calculation(&self, calculation: &CostCalculation) -> Result<(), CoreError>;

    /// Returns catalog records that could match the hint.
    fn query_candidates(&self, hint: &CandidateQuery) -> Result<Vec<CatalogRecord>, CoreError>;
}
