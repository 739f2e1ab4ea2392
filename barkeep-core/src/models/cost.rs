//! Cost calculation types.
//!
//! This module contains the outputs of the costing engine:
//! - [`CostTier`] - Cost-preference bucket
//! - [`MatchResult`] - One ranked ingredient match
//! - [`IngredientCostBreakdown`] - Cost of one recipe line
//! - [`CostCalculation`] - Durable, append-only cost record for a recipe

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::recipe::IngredientKind;
use crate::error::CoreError;

// ============================================================================
// Cost Tier
// ============================================================================

/// Cost-preference bucket used to select among matched products.
///
/// The three price tiers are terciles of the matched candidates' prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CostTier {
    /// Lowest third of candidate prices.
    Cheapest,
    /// Middle third of candidate prices.
    #[default]
    MidRange,
    /// Highest third of candidate prices.
    Premium,
    /// Highest score regardless of price.
    BestMatch,
}

impl CostTier {
    /// Returns all tiers in display order.
    pub fn all() -> &'static [CostTier] {
        &[
            CostTier::Cheapest,
            CostTier::MidRange,
            CostTier::Premium,
            CostTier::BestMatch,
        ]
    }

    /// Returns the price tercile (0..3) this tier selects from.
    ///
    /// `BestMatch` ignores price and returns `None`.
    pub fn tercile(self) -> Option<usize> {
        match self {
            Self::Cheapest => Some(0),
            Self::MidRange => Some(1),
            Self::Premium => Some(2),
            Self::BestMatch => None,
        }
    }

    /// Returns the tier for a tercile index.
    pub fn from_tercile(index: usize) -> Self {
        match index {
            0 => Self::Cheapest,
            1 => Self::MidRange,
            _ => Self::Premium,
        }
    }
}

impl fmt::Display for CostTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Cheapest => "cheapest",
            Self::MidRange => "mid_range",
            Self::Premium => "premium",
            Self::BestMatch => "best_match",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for CostTier {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "cheapest" | "cheap" | "lowest" => Ok(Self::Cheapest),
            "mid_range" | "mid" | "midrange" => Ok(Self::MidRange),
            "premium" | "top" => Ok(Self::Premium),
            "best_match" | "best" => Ok(Self::BestMatch),
            other => Err(CoreError::InvalidData(format!("unknown cost tier: {other}"))),
        }
    }
}

// ============================================================================
// Match Result
// ============================================================================

/// A scored pairing of a recipe ingredient with a catalog record.
///
/// Derived and recomputable; never stored on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Position of the ingredient within its recipe.
    pub ingredient_index: usize,
    /// External id of the matched catalog record.
    pub external_id: String,
    /// Additive match score.
    pub score: i32,
    /// Price tier the candidate falls in.
    pub tier: CostTier,
}

// ============================================================================
// Ingredient Cost Breakdown
// ============================================================================

/// How an ingredient's cost was determined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    /// Costed from a matched catalog product.
    Resolved {
        /// External id of the product.
        external_id: String,
        /// Product name.
        name: String,
        /// Product brand.
        brand: Option<String>,
        /// Container volume used for the ratio.
        volume_ml: f64,
        /// Price used for the cost.
        current_price: f64,
        /// Regular price at calculation time.
        regular_price: Option<f64>,
        /// Match score of the product.
        score: i32,
    },
    /// Costed from a flat per-millilitre estimate.
    Estimated {
        /// Estimated cost per millilitre.
        cost_per_ml: f64,
    },
    /// No plausible product; not costed.
    Unresolved,
}

/// Cost of a single recipe line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientCostBreakdown {
    /// Ingredient text as written.
    pub display_text: String,
    /// Role of the ingredient.
    pub kind: IngredientKind,
    /// Amount in millilitres, if liquid or converted.
    pub amount_ml: Option<f64>,
    /// How the cost was determined.
    pub resolution: Resolution,
    /// Cost of the amount used; `None` when unresolved.
    pub item_cost: Option<f64>,
    /// Promotion savings for the amount used.
    pub savings_amount: Option<f64>,
    /// True when the requested tier was empty and the best overall match was used.
    #[serde(default)]
    pub tier_fallback: bool,
}

impl IngredientCostBreakdown {
    /// Returns true if this line was costed from a catalog product.
    pub fn is_resolved(&self) -> bool {
        matches!(self.resolution, Resolution::Resolved { .. })
    }

    /// Returns true if this line could not be costed.
    pub fn is_unresolved(&self) -> bool {
        matches!(self.resolution, Resolution::Unresolved)
    }

    /// Returns true if this line used a flat estimate.
    pub fn is_estimated(&self) -> bool {
        matches!(self.resolution, Resolution::Estimated { .. })
    }
}

// ============================================================================
// Cost Calculation
// ============================================================================

/// A cost calculation for one recipe at one tier.
///
/// Calculations are appended to storage, never overwritten, so cost trends
/// can be reconstructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostCalculation {
    /// Name of the costed recipe.
    pub recipe_name: String,
    /// Requested tier.
    pub tier: CostTier,
    /// Per-ingredient lines in recipe order.
    pub breakdown: Vec<IngredientCostBreakdown>,
    /// Sum of resolved and estimated line costs.
    pub total_cost: f64,
    /// Number of lines that could not be costed.
    pub unresolved_count: usize,
    /// Sum of promotion savings.
    pub total_savings: f64,
    /// Multiplier used for the suggested price.
    pub markup_multiplier: f64,
    /// Suggested menu price (`total_cost * markup_multiplier`).
    pub suggested_price: f64,
    /// `suggested_price - total_cost`.
    pub margin: f64,
    /// Cost per millilitre of the finished serving.
    pub cost_per_ml: Option<f64>,
    /// When this calculation was produced.
    pub computed_at: DateTime<Utc>,
}

impl CostCalculation {
    /// Returns true if every ingredient was costed.
    pub fn is_complete(&self) -> bool {
        self.unresolved_count == 0
    }

    /// Returns the display text of every unresolved ingredient.
    pub fn unresolved_ingredients(&self) -> Vec<&str> {
        self.breakdown
            .iter()
            .filter(|b| b.is_unresolved())
            .map(|b| b.display_text.as_str())
            .collect()
    }
}
