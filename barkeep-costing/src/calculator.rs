//! Recipe cost calculation.
//!
//! The calculator turns ranked candidates into a [`CostCalculation`]. It
//! never fails: ingredients it cannot cost are reported as unresolved.

use barkeep_core::{
    CatalogRecord, CatalogRepository, CoreError, CostCalculation, CostTier,
    IngredientCostBreakdown, IngredientKind, Recipe, RecipeIngredient, Resolution,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::matcher::{IngredientMatcher, PriceTerciles, ScoredCandidate};
use crate::mixers::MixerEstimates;
use crate::units::{approx_ml, ingredient_name};

/// Default multiplier from cost to suggested menu price.
pub const DEFAULT_MARKUP_MULTIPLIER: f64 = 3.0;
/// Default decimals for line items and totals.
pub const DEFAULT_CURRENCY_DECIMALS: u32 = 4;
/// Decimals for the suggested menu price.
pub const SUGGESTED_PRICE_DECIMALS: u32 = 2;

const MAX_DECIMALS: u32 = 10;

// ============================================================================
// Settings
// ============================================================================

/// Costing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSettings {
    /// Multiplier from cost to suggested price.
    #[serde(default = "default_markup_multiplier")]
    pub markup_multiplier: f64,

    /// Decimals kept for line items and totals.
    #[serde(default = "default_currency_decimals")]
    pub currency_decimals: u32,

    /// Flat estimates for unmatched mixers.
    #[serde(default)]
    pub mixers: MixerEstimates,
}

fn default_markup_multiplier() -> f64 {
    DEFAULT_MARKUP_MULTIPLIER
}

fn default_currency_decimals() -> u32 {
    DEFAULT_CURRENCY_DECIMALS
}

impl Default for CostSettings {
    fn default() -> Self {
        Self {
            markup_multiplier: DEFAULT_MARKUP_MULTIPLIER,
            currency_decimals: DEFAULT_CURRENCY_DECIMALS,
            mixers: MixerEstimates::default(),
        }
    }
}

impl CostSettings {
    /// Sets the markup multiplier.
    #[must_use]
    pub fn with_markup(mut self, markup_multiplier: f64) -> Self {
        self.markup_multiplier = markup_multiplier;
        self
    }

    /// Sets the currency decimals.
    #[must_use]
    pub fn with_currency_decimals(mut self, decimals: u32) -> Self {
        self.currency_decimals = decimals;
        self
    }

    /// Replaces the mixer estimates.
    #[must_use]
    pub fn with_mixers(mut self, mixers: MixerEstimates) -> Self {
        self.mixers = mixers;
        self
    }
}

/// Rounds half away from zero to `decimals` places.
pub fn round_currency(value: f64, decimals: u32) -> f64 {
    let exponent = i32::try_from(decimals.min(MAX_DECIMALS)).unwrap_or(0);
    let factor = 10f64.powi(exponent);
    (value * factor).round() / factor
}

// ============================================================================
// Calculator
// ============================================================================

/// Computes recipe costs from ranked candidates.
#[derive(Debug, Clone, Default)]
pub struct CostCalculator {
    settings: CostSettings,
    matcher: IngredientMatcher,
}

impl CostCalculator {
    /// Creates a calculator with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a calculator with the given settings.
    pub fn with_settings(settings: CostSettings) -> Self {
        Self {
            settings,
            matcher: IngredientMatcher::new(),
        }
    }

    /// Returns the settings.
    pub fn settings(&self) -> &CostSettings {
        &self.settings
    }

    fn round(&self, value: f64) -> f64 {
        round_currency(value, self.settings.currency_decimals)
    }

    /// Computes the cost of `recipe` at `tier`.
    ///
    /// `matches[i]` holds the ranked candidates for ingredient `i`; missing
    /// entries count as no candidates.
    pub fn compute_cost(
        &self,
        recipe: &Recipe,
        matches: &[Vec<ScoredCandidate<'_>>],
        tier: CostTier,
    ) -> CostCalculation {
        let breakdown: Vec<IngredientCostBreakdown> = recipe
            .ingredients
            .iter()
            .enumerate()
            .map(|(i, ingredient)| {
                let ranked = matches.get(i).map_or(&[][..], Vec::as_slice);
                self.cost_line(ingredient, ranked, tier)
            })
            .collect();

        let total_cost = self.round(breakdown.iter().filter_map(|b| b.item_cost).sum());
        let total_savings = self.round(breakdown.iter().filter_map(|b| b.savings_amount).sum());
        let unresolved_count = breakdown.iter().filter(|b| b.is_unresolved()).count();
        let suggested_price = round_currency(
            total_cost * self.settings.markup_multiplier,
            SUGGESTED_PRICE_DECIMALS,
        );
        let margin = self.round(suggested_price - total_cost);
        let cost_per_ml = (recipe.serving_size_ml > 0.0)
            .then(|| self.round(total_cost / recipe.serving_size_ml));

        if unresolved_count > 0 {
            warn!(
                recipe = %recipe.name,
                unresolved = unresolved_count,
                "Recipe has unresolved ingredients"
            );
        }
        debug!(
            recipe = %recipe.name,
            tier = %tier,
            total_cost,
            suggested_price,
            "Computed recipe cost"
        );

        CostCalculation {
            recipe_name: recipe.name.clone(),
            tier,
            breakdown,
            total_cost,
            unresolved_count,
            total_savings,
            markup_multiplier: self.settings.markup_multiplier,
            suggested_price,
            margin,
            cost_per_ml,
            computed_at: Utc::now(),
        }
    }

    /// Computes the cost at every tier.
    pub fn cost_options(
        &self,
        recipe: &Recipe,
        matches: &[Vec<ScoredCandidate<'_>>],
    ) -> Vec<CostCalculation> {
        CostTier::all()
            .iter()
            .map(|tier| self.compute_cost(recipe, matches, *tier))
            .collect()
    }

    fn cost_line(
        &self,
        ingredient: &RecipeIngredient,
        ranked: &[ScoredCandidate<'_>],
        tier: CostTier,
    ) -> IngredientCostBreakdown {
        let amount_ml = approx_ml(ingredient.amount, &ingredient.unit);
        let costable: Vec<&ScoredCandidate<'_>> =
            ranked.iter().filter(|c| c.record.is_costable()).collect();

        if let Some((chosen, tier_fallback)) = select(&costable, tier) {
            return self.resolved_line(ingredient, amount_ml, chosen, tier_fallback);
        }

        if ingredient.kind == IngredientKind::Alcohol {
            debug!(ingredient = %ingredient.display_text, "No costable candidate");
            return IngredientCostBreakdown {
                display_text: ingredient.display_text.clone(),
                kind: ingredient.kind,
                amount_ml: Some(amount_ml),
                resolution: Resolution::Unresolved,
                item_cost: None,
                savings_amount: None,
                tier_fallback: false,
            };
        }

        let cost_per_ml = self
            .settings
            .mixers
            .cost_per_ml(&ingredient_name(&ingredient.display_text));
        IngredientCostBreakdown {
            display_text: ingredient.display_text.clone(),
            kind: ingredient.kind,
            amount_ml: Some(amount_ml),
            resolution: Resolution::Estimated { cost_per_ml },
            item_cost: Some(self.round(amount_ml * cost_per_ml)),
            savings_amount: None,
            tier_fallback: false,
        }
    }

    fn resolved_line(
        &self,
        ingredient: &RecipeIngredient,
        amount_ml: f64,
        chosen: &ScoredCandidate<'_>,
        tier_fallback: bool,
    ) -> IngredientCostBreakdown {
        let record = chosen.record;
        // select() only returns costable records
        let price = record.current_price.unwrap_or_default();
        let volume = record.volume_ml.unwrap_or(1.0);
        let ratio = amount_ml / volume;

        let savings_amount = match record.regular_price {
            Some(regular) if regular > price => Some(self.round((regular - price) * ratio)),
            _ => None,
        };

        IngredientCostBreakdown {
            display_text: ingredient.display_text.clone(),
            kind: ingredient.kind,
            amount_ml: Some(amount_ml),
            resolution: Resolution::Resolved {
                external_id: record.external_id.clone(),
                name: record.name.clone(),
                brand: record.brand.clone(),
                volume_ml: volume,
                current_price: price,
                regular_price: record.regular_price,
                score: chosen.score,
            },
            item_cost: Some(self.round(ratio * price)),
            savings_amount,
            tier_fallback,
        }
    }

    // ========================================================================
    // Repository-backed costing
    // ========================================================================

    /// Returns true if the repository should be searched for `ingredient`.
    ///
    /// Alcohol is always searched. Mixers and garnishes are only searched
    /// when they name a brand or category; otherwise they use the flat
    /// estimate.
    pub fn wants_candidates(ingredient: &RecipeIngredient) -> bool {
        ingredient.kind == IngredientKind::Alcohol
            || ingredient.brand_preference.is_some()
            || ingredient.category_hint.is_some()
    }

    /// Loads candidate records for every ingredient of `recipe`.
    ///
    /// # Errors
    ///
    /// Returns the repository's error if a query fails.
    pub fn gather_candidates(
        &self,
        repository: &dyn CatalogRepository,
        recipe: &Recipe,
    ) -> Result<Vec<Vec<CatalogRecord>>, CoreError> {
        recipe
            .ingredients
            .iter()
            .map(|ingredient| {
                if !Self::wants_candidates(ingredient) {
                    return Ok(Vec::new());
                }
                let query = self.matcher.candidate_query(ingredient);
                if query.is_empty() {
                    return Ok(Vec::new());
                }
                repository.query_candidates(&query)
            })
            .collect()
    }

    /// Ranks gathered candidates for every ingredient.
    pub fn rank_all<'a>(
        &self,
        recipe: &Recipe,
        candidates: &'a [Vec<CatalogRecord>],
    ) -> Vec<Vec<ScoredCandidate<'a>>> {
        recipe
            .ingredients
            .iter()
            .zip(candidates)
            .map(|(ingredient, records)| self.matcher.rank(ingredient, records))
            .collect()
    }

    /// Loads a recipe, costs it at `tier`, and appends the calculation.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if no recipe has that name, or the
    /// repository's error if loading, querying or appending fails.
    #[instrument(skip(self, repository))]
    pub fn cost_recipe(
        &self,
        repository: &dyn CatalogRepository,
        recipe_name: &str,
        tier: CostTier,
    ) -> Result<CostCalculation, CoreError> {
        let recipe = repository
            .load_recipe(recipe_name)?
            .ok_or_else(|| CoreError::NotFound(format!("recipe '{recipe_name}'")))?;

        let candidates = self.gather_candidates(repository, &recipe)?;
        let ranked = self.rank_all(&recipe, &candidates);
        let calculation = self.compute_cost(&recipe, &ranked, tier);
        repository.append_cost_calculation(&calculation)?;
        Ok(calculation)
    }
}

/// Picks a candidate for `tier` from costable, ranked candidates.
///
/// Returns the candidate and whether the tier was empty and a substitute
/// was used instead. The substitute is the best match, except for an empty
/// premium tier (fewer than three prices), which takes the dearest bottle.
fn select<'c, 'a>(
    costable: &[&'c ScoredCandidate<'a>],
    tier: CostTier,
) -> Option<(&'c ScoredCandidate<'a>, bool)> {
    let best = *costable.first()?;
    let Some(tercile) = tier.tercile() else {
        return Some((best, false));
    };

    let terciles = PriceTerciles::new(costable.iter().filter_map(|c| c.record.current_price));
    let in_tier = costable
        .iter()
        .find(|c| c.record.current_price.and_then(|p| terciles.tercile(p)) == Some(tercile));
    if let Some(chosen) = in_tier {
        return Some((*chosen, false));
    }
    let substitute = match tier {
        CostTier::Premium => dearest(costable).unwrap_or(best),
        _ => best,
    };
    Some((substitute, true))
}

/// Highest-priced candidate; ties go to the better-ranked one.
fn dearest<'c, 'a>(costable: &[&'c ScoredCandidate<'a>]) -> Option<&'c ScoredCandidate<'a>> {
    costable.iter().copied().fold(None, |top, candidate| {
        match (top, candidate.record.current_price) {
            (Some(top), Some(price))
                if top
                    .record
                    .current_price
                    .is_some_and(|top_price| top_price >= price) =>
            {
                Some(top)
            }
            (_, Some(_)) => Some(candidate),
            (top, None) => top,
        }
    })
}
