//! Catalog types.
//!
//! This module contains the retailer-side data the crawler produces:
//! - [`CatalogRecord`] - One product as listed by the retailer
//! - [`PriceHistoryEntry`] - Append-only price observation
//! - [`CatalogStats`] - Aggregate counts over the stored catalog

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Catalog Record
// ============================================================================

/// A single product listed by the retailer.
///
/// Identity is [`external_id`](Self::external_id), which is stable across
/// crawls. Numeric fields that could not be parsed from the listing are
/// `None` rather than zero, so that downstream cost math never silently uses
/// a bogus value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    /// Retailer's stable product identifier.
    pub external_id: String,
    /// Product name as listed.
    pub name: String,
    /// Brand or producer.
    pub brand: Option<String>,
    /// Top-level category (e.g. "Spirits").
    pub category: Option<String>,
    /// Most specific category (e.g. "Whisky").
    pub subcategory: Option<String>,
    /// Container volume in millilitres.
    pub volume_ml: Option<f64>,
    /// Alcohol by volume, in percent.
    pub abv_percent: Option<f64>,
    /// Price currently charged.
    pub current_price: Option<f64>,
    /// Price without any active promotion.
    pub regular_price: Option<f64>,
    /// Country of manufacture.
    pub country_of_origin: Option<String>,
    /// Product page on the retailer's site.
    #[serde(default)]
    pub url: Option<String>,
    /// When the crawler last saw this record.
    pub last_seen_at: DateTime<Utc>,
}

impl CatalogRecord {
    /// Creates a record with only an identifier and a name.
    pub fn new(external_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            name: name.into(),
            brand: None,
            category: None,
            subcategory: None,
            volume_ml: None,
            abv_percent: None,
            current_price: None,
            regular_price: None,
            country_of_origin: None,
            url: None,
            last_seen_at: Utc::now(),
        }
    }

    /// Sets the brand.
    #[must_use]
    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    /// Sets the top-level category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Sets the subcategory.
    #[must_use]
    pub fn with_subcategory(mut self, subcategory: impl Into<String>) -> Self {
        self.subcategory = Some(subcategory.into());
        self
    }

    /// Sets the container volume.
    #[must_use]
    pub fn with_volume_ml(mut self, volume_ml: f64) -> Self {
        self.volume_ml = Some(volume_ml);
        self
    }

    /// Sets the alcohol content.
    #[must_use]
    pub fn with_abv(mut self, abv_percent: f64) -> Self {
        self.abv_percent = Some(abv_percent);
        self
    }

    /// Sets an undiscounted price.
    #[must_use]
    pub fn with_price(mut self, price: f64) -> Self {
        self.current_price = Some(price);
        self.regular_price = Some(price);
        self
    }

    /// Sets a promotional price alongside the regular one.
    #[must_use]
    pub fn with_sale_price(mut self, current: f64, regular: f64) -> Self {
        self.current_price = Some(current);
        self.regular_price = Some(regular);
        self
    }

    /// Sets the country of origin.
    #[must_use]
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country_of_origin = Some(country.into());
        self
    }

    /// Enforces `current_price <= regular_price`.
    ///
    /// A missing or lower regular price is replaced by the current price.
    pub fn normalize_prices(&mut self) {
        if let Some(current) = self.current_price {
            match self.regular_price {
                Some(regular) if regular >= current => {}
                _ => self.regular_price = Some(current),
            }
        }
    }

    /// Returns true if a promotion is active.
    pub fn is_on_sale(&self) -> bool {
        matches!(
            (self.current_price, self.regular_price),
            (Some(current), Some(regular)) if current < regular
        )
    }

    /// Returns true if the record has a usable price and volume.
    pub fn is_costable(&self) -> bool {
        matches!(
            (self.current_price, self.volume_ml),
            (Some(price), Some(volume)) if price > 0.0 && volume > 0.0
        )
    }

    /// Returns the current price per millilitre, if costable.
    pub fn price_per_ml(&self) -> Option<f64> {
        if !self.is_costable() {
            return None;
        }
        Some(self.current_price? / self.volume_ml?)
    }

    /// Returns true if either price differs from `other`'s.
    pub fn price_differs(&self, other: &Self) -> bool {
        self.current_price != other.current_price || self.regular_price != other.regular_price
    }
}

// ============================================================================
// Price History
// ============================================================================

/// One observed price for a catalog record.
///
/// Entries are append-only and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistoryEntry {
    /// External id of the record the price belongs to.
    pub external_id: String,
    /// Price charged at observation time.
    pub price: f64,
    /// Regular price at observation time.
    pub regular_price: Option<f64>,
    /// When the price was observed.
    pub observed_at: DateTime<Utc>,
}

impl PriceHistoryEntry {
    /// Builds an entry from a record's current price.
    ///
    /// Returns `None` when the record has no price.
    pub fn from_record(record: &CatalogRecord) -> Option<Self> {
        Some(Self {
            external_id: record.external_id.clone(),
            price: record.current_price?,
            regular_price: record.regular_price,
            observed_at: record.last_seen_at,
        })
    }
}

// ============================================================================
// Catalog Stats
// ============================================================================

/// Aggregate counts over the stored catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogStats {
    /// Number of catalog records.
    pub total_records: usize,
    /// Records per top-level category.
    pub by_category: BTreeMap<String, usize>,
    /// Records currently on sale.
    pub on_sale: usize,
    /// Number of price-history entries.
    pub price_history_entries: usize,
    /// Number of stored recipes.
    pub recipes: usize,
    /// Number of stored cost calculations.
    pub cost_calculations: usize,
    /// Most recent `last_seen_at` across the catalog.
    pub last_crawled_at: Option<DateTime<Utc>>,
}
