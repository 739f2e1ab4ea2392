//! Ingredient-to-product matching.
//!
//! Scoring is additive over independent signals, each worth a fixed weight.
//! The matcher is pure: identical inputs always produce the same ordered
//! output, including tie-breaks.

use std::cmp::Ordering;

use barkeep_core::{CandidateQuery, CatalogRecord, CostTier, MatchResult, RecipeIngredient};
use serde::Serialize;
use tracing::trace;

use crate::aliases::{contains_phrase, find_alias, infer_category, normalize, tokens, AlcoholAlias};
use crate::units::ingredient_name;

/// Normalized ingredient name equals the product name.
pub const EXACT_NAME_WEIGHT: i32 = 100;
/// Product brand equals the preferred brand.
pub const BRAND_WEIGHT: i32 = 50;
/// Product category path matches the alcohol type.
pub const ALCOHOL_TYPE_WEIGHT: i32 = 30;
/// Product top-level category equals the inferred category.
pub const CATEGORY_WEIGHT: i32 = 20;
/// Product ABV meets the minimum.
pub const ABV_SUFFICIENT_WEIGHT: i32 = 10;
/// Product ABV is below the minimum.
pub const ABV_INSUFFICIENT_WEIGHT: i32 = -20;
/// Each shared token not already counted by another signal.
pub const KEYWORD_WEIGHT: i32 = 5;
/// Product price is in the middle tercile of plausible candidates.
pub const PRICE_RANGE_WEIGHT: i32 = 5;

// ============================================================================
// Signals
// ============================================================================

/// Which signals fired for one candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchSignals {
    /// Exact name match.
    pub exact_name: bool,
    /// Preferred brand match.
    pub brand: bool,
    /// Alcohol-type match.
    pub alcohol_type: bool,
    /// Top-level category match.
    pub category: bool,
    /// `Some(true)` if ABV is sufficient, `Some(false)` if too low, `None` if unknown.
    pub abv: Option<bool>,
    /// Shared tokens not counted elsewhere.
    pub keyword_hits: usize,
    /// Middle-tercile price.
    pub price_range: bool,
}

impl MatchSignals {
    /// Returns true if anything identifies the candidate as the ingredient.
    ///
    /// ABV and price only refine a match; on their own they are not one.
    pub fn is_plausible(&self) -> bool {
        self.exact_name || self.brand || self.alcohol_type || self.category || self.keyword_hits > 0
    }

    /// Returns the additive score.
    pub fn score(&self) -> i32 {
        let mut score = 0;
        if self.exact_name {
            score += EXACT_NAME_WEIGHT;
        }
        if self.brand {
            score += BRAND_WEIGHT;
        }
        if self.alcohol_type {
            score += ALCOHOL_TYPE_WEIGHT;
        }
        if self.category {
            score += CATEGORY_WEIGHT;
        }
        match self.abv {
            Some(true) => score += ABV_SUFFICIENT_WEIGHT,
            Some(false) => score += ABV_INSUFFICIENT_WEIGHT,
            None => {}
        }
        score += KEYWORD_WEIGHT * i32::try_from(self.keyword_hits).unwrap_or(i32::MAX / KEYWORD_WEIGHT);
        if self.price_range {
            score += PRICE_RANGE_WEIGHT;
        }
        score
    }
}

/// A candidate with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate<'a> {
    /// The catalog record.
    pub record: &'a CatalogRecord,
    /// Total score.
    pub score: i32,
    /// Signals that produced the score.
    pub signals: MatchSignals,
}

// ============================================================================
// Price Terciles
// ============================================================================

/// Splits a set of prices into thirds.
///
/// Equal prices always share a tercile: a price's position is the index of
/// its first occurrence in the sorted list.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTerciles {
    sorted: Vec<f64>,
}

impl PriceTerciles {
    /// Builds terciles from prices; non-finite values are ignored.
    pub fn new(prices: impl IntoIterator<Item = f64>) -> Self {
        let mut sorted: Vec<f64> = prices.into_iter().filter(|p| p.is_finite()).collect();
        sorted.sort_by(f64::total_cmp);
        Self { sorted }
    }

    /// Returns the tercile (0, 1 or 2) of a price.
    pub fn tercile(&self, price: f64) -> Option<usize> {
        if self.sorted.is_empty() || !price.is_finite() {
            return None;
        }
        let position = self.sorted.partition_point(|p| *p < price);
        Some((position * 3 / self.sorted.len()).min(2))
    }

    /// Returns the tier a price falls in.
    pub fn tier(&self, price: f64) -> Option<CostTier> {
        self.tercile(price).map(CostTier::from_tercile)
    }
}

// ============================================================================
// Ingredient Profile
// ============================================================================

/// Normalized view of an ingredient, computed once per ranking.
struct Profile {
    name: String,
    tokens: Vec<String>,
    brand: Option<String>,
    alias: Option<&'static AlcoholAlias>,
    type_hint: Option<String>,
    category: Option<String>,
    min_abv: Option<f64>,
}

impl Profile {
    fn new(ingredient: &RecipeIngredient) -> Self {
        let name = ingredient_name(&ingredient.display_text);
        let type_hint = ingredient
            .alcohol_type_hint
            .as_deref()
            .map(normalize)
            .filter(|h| !h.is_empty());
        let alias = type_hint
            .as_deref()
            .and_then(find_alias)
            .or_else(|| find_alias(&name));
        let category = infer_category(
            ingredient.category_hint.as_deref(),
            ingredient.alcohol_type_hint.as_deref(),
            &name,
        )
        .map(|c| normalize(&c));

        Self {
            tokens: tokens(&name),
            name: normalize(&name),
            brand: ingredient
                .brand_preference
                .as_deref()
                .map(normalize)
                .filter(|b| !b.is_empty()),
            alias,
            type_hint,
            category,
            min_abv: ingredient.min_abv_percent,
        }
    }

    fn alcohol_type_matches(&self, record: &CatalogRecord) -> bool {
        let (category, subcategory) = (record.category.as_deref(), record.subcategory.as_deref());
        if let Some(alias) = self.alias {
            return alias.matches_category_path(category, subcategory);
        }
        let Some(hint) = &self.type_hint else {
            return false;
        };
        [subcategory, category]
            .into_iter()
            .flatten()
            .any(|part| contains_phrase(&normalize(part), hint))
    }

    /// Tokens already accounted for by the brand or type signals.
    fn counted_tokens(&self, signals: &MatchSignals) -> Vec<String> {
        let mut counted = Vec::new();
        if signals.brand {
            if let Some(brand) = &self.brand {
                counted.extend(tokens(brand));
            }
        }
        if signals.alcohol_type {
            if let Some(alias) = self.alias {
                counted.extend(alias.words().map(ToString::to_string));
            }
            if let Some(hint) = &self.type_hint {
                counted.extend(tokens(hint));
            }
        }
        counted
    }

    fn signals(&self, record: &CatalogRecord) -> MatchSignals {
        let mut signals = MatchSignals {
            exact_name: !self.name.is_empty() && self.name == normalize(&record.name),
            brand: match (&self.brand, &record.brand) {
                (Some(wanted), Some(brand)) => *wanted == normalize(brand),
                _ => false,
            },
            alcohol_type: self.alcohol_type_matches(record),
            category: match (&self.category, &record.category) {
                (Some(wanted), Some(category)) => *wanted == normalize(category),
                _ => false,
            },
            abv: match (self.min_abv, record.abv_percent) {
                (Some(min), Some(abv)) => Some(abv >= min),
                _ => None,
            },
            keyword_hits: 0,
            price_range: false,
        };

        // an exact name match already accounts for every token
        if !signals.exact_name {
            let counted = self.counted_tokens(&signals);
            let mut product_tokens = tokens(&record.name);
            if let Some(brand) = &record.brand {
                product_tokens.extend(tokens(brand));
            }
            signals.keyword_hits = self
                .tokens
                .iter()
                .filter(|t| !counted.contains(t))
                .filter(|t| product_tokens.contains(t))
                .count();
        }
        signals
    }
}

// ============================================================================
// Verification
// ============================================================================

/// Coarse quality of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchQuality {
    /// Score below 20.
    Poor,
    /// Score from 20 to 49.
    Good,
    /// Score of 50 or more.
    Excellent,
}

impl MatchQuality {
    /// Classifies a score.
    pub fn from_score(score: i32) -> Self {
        match score {
            s if s < 20 => Self::Poor,
            s if s < 50 => Self::Good,
            _ => Self::Excellent,
        }
    }
}

impl std::fmt::Display for MatchQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Poor => "Poor",
            Self::Good => "Good",
            Self::Excellent => "Excellent",
        };
        f.write_str(s)
    }
}

/// Pass/fail checks of a match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VerificationChecks {
    /// Category or alcohol type agrees.
    pub category_match: bool,
    /// ABV meets the minimum, or no minimum applies.
    pub abv_sufficient: bool,
    /// Brand agrees, or no brand is preferred.
    pub brand_match: bool,
    /// Name shares at least one token.
    pub name_similarity: bool,
}

/// How well one product fits one ingredient, and why not.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchVerification {
    /// External id of the product.
    pub external_id: String,
    /// Product name.
    pub name: String,
    /// Score without the price bonus.
    pub score: i32,
    /// Quality bucket.
    pub quality: MatchQuality,
    /// Individual checks.
    pub checks: VerificationChecks,
    /// Human-readable problems.
    pub issues: Vec<String>,
}

// ============================================================================
// Matcher
// ============================================================================

/// Ranks catalog records against recipe ingredients.
#[derive(Debug, Clone, Copy, Default)]
pub struct IngredientMatcher;

impl IngredientMatcher {
    /// Creates a matcher.
    pub fn new() -> Self {
        Self
    }

    /// Scores and ranks candidates, best first.
    ///
    /// Candidates with no identifying signal, or a final score of zero or
    /// less, are excluded. Ties go to the lower current price (unknown
    /// prices last), then to the lower external id.
    pub fn rank<'a>(
        &self,
        ingredient: &RecipeIngredient,
        candidates: &'a [CatalogRecord],
    ) -> Vec<ScoredCandidate<'a>> {
        let profile = Profile::new(ingredient);

        let plausible: Vec<(&CatalogRecord, MatchSignals)> = candidates
            .iter()
            .map(|record| (record, profile.signals(record)))
            .filter(|(_, signals)| signals.is_plausible())
            .collect();

        let terciles = PriceTerciles::new(plausible.iter().filter_map(|(r, _)| r.current_price));

        let mut ranked: Vec<ScoredCandidate<'a>> = plausible
            .into_iter()
            .map(|(record, mut signals)| {
                signals.price_range = record
                    .current_price
                    .and_then(|p| terciles.tercile(p))
                    .is_some_and(|t| t == 1);
                ScoredCandidate {
                    record,
                    score: signals.score(),
                    signals,
                }
            })
            .filter(|c| c.score > 0)
            .collect();

        ranked.sort_by(compare_ranked);
        trace!(
            ingredient = %ingredient.display_text,
            candidates = candidates.len(),
            ranked = ranked.len(),
            "Ranked candidates"
        );
        ranked
    }

    /// Returns the signals for one candidate, without the price bonus.
    pub fn signals(&self, ingredient: &RecipeIngredient, record: &CatalogRecord) -> MatchSignals {
        Profile::new(ingredient).signals(record)
    }

    /// Explains how well `record` fits `ingredient`.
    pub fn verify(&self, ingredient: &RecipeIngredient, record: &CatalogRecord) -> MatchVerification {
        let profile = Profile::new(ingredient);
        let signals = profile.signals(record);
        let score = signals.score();
        let mut issues = Vec::new();

        let category_match = signals.category || signals.alcohol_type;
        if !category_match {
            if let Some(wanted) = &profile.category {
                issues.push(format!(
                    "Category mismatch: expected {wanted}, found {}",
                    record.category.as_deref().unwrap_or("none")
                ));
            }
        }
        if let (Some(min), Some(abv)) = (ingredient.min_abv_percent, record.abv_percent) {
            if abv < min {
                issues.push(format!("ABV too low: {abv}% < {min}%"));
            }
        }
        if let Some(brand) = &ingredient.brand_preference {
            if !signals.brand {
                issues.push(format!("Brand mismatch: expected {brand}"));
            }
        }
        if !record.is_costable() {
            issues.push("Missing price or volume".to_string());
        }

        MatchVerification {
            external_id: record.external_id.clone(),
            name: record.name.clone(),
            score,
            quality: MatchQuality::from_score(score),
            checks: VerificationChecks {
                category_match,
                abv_sufficient: signals.abv != Some(false),
                brand_match: ingredient.brand_preference.is_none() || signals.brand,
                name_similarity: signals.exact_name || signals.keyword_hits > 0,
            },
            issues,
        }
    }

    /// Builds the repository query for an ingredient's candidates.
    pub fn candidate_query(&self, ingredient: &RecipeIngredient) -> CandidateQuery {
        let profile = Profile::new(ingredient);
        let mut keywords = profile.tokens.clone();
        if let Some(alias) = profile.alias {
            keywords.extend(alias.words().map(ToString::to_string));
        }
        if let Some(brand) = &profile.brand {
            keywords.extend(tokens(brand));
        }
        if let Some(hint) = &profile.type_hint {
            keywords.extend(tokens(hint));
        }
        let mut unique: Vec<String> = Vec::new();
        for keyword in keywords {
            if !unique.contains(&keyword) {
                unique.push(keyword);
            }
        }

        // unbounded: a cap applied before scoring would drop candidates by
        // storage order rather than by price or fit
        let mut query = CandidateQuery::new(unique);
        if query.keywords.is_empty() {
            if let Some(category) = infer_category(
                ingredient.category_hint.as_deref(),
                ingredient.alcohol_type_hint.as_deref(),
                &ingredient.display_text,
            ) {
                query = query.with_category(category);
            }
        }
        query
    }

    /// Converts a ranking into match results tagged with price tiers.
    ///
    /// Candidates without a price are tagged [`CostTier::BestMatch`].
    pub fn match_results(ingredient_index: usize, ranked: &[ScoredCandidate<'_>]) -> Vec<MatchResult> {
        let terciles = PriceTerciles::new(ranked.iter().filter_map(|c| c.record.current_price));
        ranked
            .iter()
            .map(|c| MatchResult {
                ingredient_index,
                external_id: c.record.external_id.clone(),
                score: c.score,
                tier: c
                    .record
                    .current_price
                    .and_then(|p| terciles.tier(p))
                    .unwrap_or(CostTier::BestMatch),
            })
            .collect()
    }
}

fn compare_ranked(a: &ScoredCandidate<'_>, b: &ScoredCandidate<'_>) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| match (a.record.current_price, b.record.current_price) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.record.external_id.cmp(&b.record.external_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use barkeep_core::{Amount, IngredientKind};

    fn spirit(id: &str, name: &str, sub: &str, price: f64) -> CatalogRecord {
        CatalogRecord::new(id, name)
            .with_category("Spirits")
            .with_subcategory(sub)
            .with_price(price)
            .with_volume_ml(750.0)
            .with_abv(40.0)
    }

    fn vodka() -> RecipeIngredient {
        RecipeIngredient::new("60ml Vodka", Amount::Millilitres(60.0), "ml")
            .with_alcohol_type("vodka")
            .with_category("Spirits")
            .with_min_abv(40.0)
    }

    #[test]
    fn test_exact_name_wins() {
        let bitters = RecipeIngredient::new("Angostura Bitters", Amount::Millilitres(1.25), "dash")
            .with_kind(IngredientKind::Mixer);
        let candidates = vec![
            spirit("1", "Smirnoff Vodka", "Vodka", 29.95),
            spirit("2", "Bombay Sapphire Gin", "Gin", 34.95),
            spirit("3", "Bacardi Superior Rum", "Rum", 27.95),
            CatalogRecord::new("4", "Angostura Bitters")
                .with_category("Bitters")
                .with_price(12.95)
                .with_volume_ml(200.0),
        ];

        let ranked = IngredientMatcher::new().rank(&bitters, &candidates);
        assert_eq!(ranked[0].record.external_id, "4");
        assert!(ranked[0].score >= EXACT_NAME_WEIGHT);
        // the unrelated spirits carry no signal at all
        assert_eq!(ranked.len(), 1);
    }

    #[test]
    fn test_abv_penalty() {
        let candidates = vec![
            spirit("a", "Wodka Lite", "Vodka", 25.0).with_abv(37.5),
            spirit("b", "Wodka Classic", "Vodka", 25.0),
        ];
        let ranked = IngredientMatcher::new().rank(&vodka(), &candidates);

        assert_eq!(ranked[0].record.external_id, "b");
        assert_eq!(ranked[0].score - ranked[1].score, 30);
        assert_eq!(ranked[1].signals.abv, Some(false));
    }

    #[test]
    fn test_type_and_category_signals() {
        let candidates = vec![spirit("1", "Tito's Handmade", "Vodka", 30.0)];
        let ranked = IngredientMatcher::new().rank(&vodka(), &candidates);
        let top = &ranked[0];
        assert!(top.signals.alcohol_type);
        assert!(top.signals.category);
        assert_eq!(top.signals.keyword_hits, 0);
        assert_eq!(
            top.score,
            ALCOHOL_TYPE_WEIGHT + CATEGORY_WEIGHT + ABV_SUFFICIENT_WEIGHT
        );
    }

    #[test]
    fn test_type_words_not_double_counted() {
        // "vodka" in the product name is already covered by the type signal
        let candidates = vec![spirit("1", "Smirnoff Vodka", "Vodka", 30.0)];
        let ranked = IngredientMatcher::new().rank(&vodka(), &candidates);
        assert_eq!(ranked[0].signals.keyword_hits, 0);
    }

    #[test]
    fn test_brand_preference() {
        let ingredient = vodka().with_brand("Grey Goose");
        let candidates = vec![
            spirit("1", "Smirnoff No. 21", "Vodka", 30.0).with_brand("Smirnoff"),
            spirit("2", "Grey Goose", "Vodka", 55.0).with_brand("Grey Goose"),
        ];
        let ranked = IngredientMatcher::new().rank(&ingredient, &candidates);
        assert_eq!(ranked[0].record.external_id, "2");
        assert!(ranked[0].signals.brand);
        assert_eq!(ranked[0].signals.keyword_hits, 0);
    }

    #[test]
    fn test_keyword_overlap() {
        let ingredient = RecipeIngredient::new("30ml Elderflower Liqueur", Amount::Millilitres(30.0), "ml");
        let candidates = vec![
            CatalogRecord::new("1", "St-Germain Elderflower Liqueur")
                .with_category("Spirits")
                .with_subcategory("Liqueur"),
        ];
        let ranked = IngredientMatcher::new().rank(&ingredient, &candidates);
        // "liqueur" is counted by the type signal, "elderflower" by keywords
        assert_eq!(ranked[0].signals.keyword_hits, 1);
        assert!(ranked[0].signals.alcohol_type);
    }

    #[test]
    fn test_excludes_signal_free_candidates() {
        let candidates = vec![
            CatalogRecord::new("1", "Pinot Noir")
                .with_category("Wine")
                .with_price(18.0)
                .with_abv(13.0),
        ];
        assert!(IngredientMatcher::new().rank(&vodka(), &candidates).is_empty());
    }

    #[test]
    fn test_excludes_non_positive_scores() {
        // category match (+20) and ABV penalty (-20) net to zero
        let ingredient = RecipeIngredient::new("60ml Spirit", Amount::Millilitres(60.0), "ml")
            .with_category("Spirits")
            .with_min_abv(40.0);
        let candidates = vec![
            CatalogRecord::new("1", "Low Proof Thing")
                .with_category("Spirits")
                .with_abv(20.0),
        ];
        assert!(IngredientMatcher::new().rank(&ingredient, &candidates).is_empty());
    }

    #[test]
    fn test_middle_tercile_bonus() {
        let candidates = vec![
            spirit("a", "Vodka One", "Vodka", 20.0),
            spirit("b", "Vodka Two", "Vodka", 30.0),
            spirit("c", "Vodka Three", "Vodka", 40.0),
        ];
        let ranked = IngredientMatcher::new().rank(&vodka(), &candidates);
        assert_eq!(ranked[0].record.external_id, "b");
        assert!(ranked[0].signals.price_range);
        assert_eq!(ranked[0].score - ranked[1].score, PRICE_RANGE_WEIGHT);
        // the rest tie and fall back to price
        assert_eq!(ranked[1].record.external_id, "a");
        assert_eq!(ranked[2].record.external_id, "c");
    }

    #[test]
    fn test_tie_break_is_deterministic() {
        let mut candidates = vec![
            spirit("z", "Vodka Z", "Vodka", 25.0),
            spirit("y", "Vodka Y", "Vodka", 25.0),
            CatalogRecord::new("x", "Vodka X").with_category("Spirits").with_subcategory("Vodka").with_abv(40.0),
            spirit("w", "Vodka W", "Vodka", 25.0),
        ];
        let matcher = IngredientMatcher::new();
        let first: Vec<String> = matcher
            .rank(&vodka(), &candidates)
            .iter()
            .map(|c| c.record.external_id.clone())
            .collect();
        assert_eq!(first, vec!["w", "y", "z", "x"]);

        candidates.reverse();
        let second: Vec<String> = matcher
            .rank(&vodka(), &candidates)
            .iter()
            .map(|c| c.record.external_id.clone())
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_price_terciles() {
        let terciles = PriceTerciles::new([10.0, 20.0, 20.0, 30.0, 40.0, 50.0]);
        assert_eq!(terciles.tercile(10.0), Some(0));
        assert_eq!(terciles.tercile(20.0), Some(0));
        assert_eq!(terciles.tercile(30.0), Some(1));
        assert_eq!(terciles.tercile(40.0), Some(2));
        assert_eq!(terciles.tercile(50.0), Some(2));
        assert_eq!(PriceTerciles::new([]).tercile(5.0), None);
    }

    #[test]
    fn test_verify_reports_issues() {
        let record = spirit("1", "Wodka Lite", "Vodka", 25.0).with_abv(37.5);
        let report = IngredientMatcher::new().verify(&vodka().with_brand("Absolut"), &record);
        assert!(report.checks.category_match);
        assert!(!report.checks.abv_sufficient);
        assert!(!report.checks.brand_match);
        assert_eq!(report.issues.len(), 2);
        assert!(report.issues[0].starts_with("ABV too low"));
        assert_eq!(report.quality, MatchQuality::Good);
    }

    #[test]
    fn test_candidate_query() {
        let query = IngredientMatcher::new().candidate_query(&vodka().with_brand("Grey Goose"));
        assert!(query.keywords.contains(&"vodka".to_string()));
        assert!(query.keywords.contains(&"grey".to_string()));
        assert!(query.categories.is_empty());
        assert_eq!(query.limit, None);
    }

    #[test]
    fn test_match_results_tag_tiers() {
        let candidates = vec![
            spirit("a", "Vodka One", "Vodka", 20.0),
            spirit("b", "Vodka Two", "Vodka", 30.0),
            spirit("c", "Vodka Three", "Vodka", 40.0),
        ];
        let ranked = IngredientMatcher::new().rank(&vodka(), &candidates);
        let results = IngredientMatcher::match_results(0, &ranked);
        let tier_of = |id: &str| results.iter().find(|r| r.external_id == id).unwrap().tier;
        assert_eq!(tier_of("a"), CostTier::Cheapest);
        assert_eq!(tier_of("b"), CostTier::MidRange);
        assert_eq!(tier_of("c"), CostTier::Premium);
    }
}
