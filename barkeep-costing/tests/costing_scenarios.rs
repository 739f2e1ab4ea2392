//! End-to-end costing scenarios against an in-memory repository.

use std::sync::Mutex;

use barkeep_core::{
    Amount, CandidateQuery, CatalogRecord, CatalogRepository, CoreError, CostCalculation,
    CostTier, IngredientKind, PriceHistoryEntry, Recipe, RecipeIngredient, Resolution,
};
use barkeep_costing::{default_recipes, CostCalculator, IngredientMatcher, MatchQuality};

#[derive(Default)]
struct MemoryRepository {
    records: Vec<CatalogRecord>,
    recipes: Vec<Recipe>,
    calculations: Mutex<Vec<CostCalculation>>,
}

impl MemoryRepository {
    fn with_records(records: Vec<CatalogRecord>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    fn with_recipe(mut self, recipe: Recipe) -> Self {
        self.recipes.push(recipe);
        self
    }
}

impl CatalogRepository for MemoryRepository {
    fn upsert_catalog_record(&self, _record: &CatalogRecord) -> Result<bool, CoreError> {
        Ok(false)
    }

    fn append_price_history(&self, _entry: &PriceHistoryEntry) -> Result<(), CoreError> {
        Ok(())
    }

    fn load_recipe(&self, name: &str) -> Result<Option<Recipe>, CoreError> {
        Ok(self.recipes.iter().find(|r| r.name == name).cloned())
    }

    fn append_cost_calculation(&self, calculation: &CostCalculation) -> Result<(), CoreError> {
        self.calculations.lock().unwrap().push(calculation.clone());
        Ok(())
    }

    fn query_candidates(&self, hint: &CandidateQuery) -> Result<Vec<CatalogRecord>, CoreError> {
        let matches = |record: &CatalogRecord| {
            let haystack = format!(
                "{} {} {}",
                record.name,
                record.brand.as_deref().unwrap_or_default(),
                record.subcategory.as_deref().unwrap_or_default()
            )
            .to_lowercase();
            hint.keywords.iter().any(|k| haystack.contains(k.as_str()))
                || record
                    .category
                    .as_ref()
                    .is_some_and(|c| hint.categories.contains(c))
        };
        Ok(self
            .records
            .iter()
            .filter(|r| matches(r))
            .take(hint.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }
}

fn vodka_bottle(id: &str, name: &str, price: f64) -> CatalogRecord {
    CatalogRecord::new(id, name)
        .with_category("Spirits")
        .with_subcategory("Vodka")
        .with_volume_ml(750.0)
        .with_abv(40.0)
        .with_price(price)
}

fn vodka(ml: f64) -> RecipeIngredient {
    RecipeIngredient::new(format!("{ml}ml Vodka"), Amount::Millilitres(ml), "ml")
        .with_alcohol_type("vodka")
        .with_category("Spirits")
        .with_min_abv(40.0)
}

#[test]
fn test_exact_match_outranks_everything() {
    let ingredient = RecipeIngredient::new("Angostura Bitters", Amount::Millilitres(1.25), "dash")
        .with_kind(IngredientKind::Mixer)
        .with_category("Spirits");
    let candidates = vec![
        vodka_bottle("1", "Smirnoff Vodka", 29.95),
        CatalogRecord::new("2", "Angostura Aromatic Bitters")
            .with_category("Spirits")
            .with_price(14.95),
        CatalogRecord::new("3", "Angostura Bitters")
            .with_category("Spirits")
            .with_price(12.95),
    ];

    let matcher = IngredientMatcher::new();
    let ranked = matcher.rank(&ingredient, &candidates);
    assert_eq!(ranked[0].record.external_id, "3");
    assert!(ranked[0].score >= 100);
    assert_eq!(
        matcher.verify(&ingredient, &candidates[2]).quality,
        MatchQuality::Excellent
    );
}

#[test]
fn test_abv_shortfall_costs_thirty_points() {
    let candidates = vec![
        vodka_bottle("low", "Vodka Light", 25.0).with_abv(35.0),
        vodka_bottle("ok", "Vodka Light", 25.0),
    ];
    let ranked = IngredientMatcher::new().rank(&vodka(60.0), &candidates);
    let score = |id: &str| ranked.iter().find(|c| c.record.external_id == id).unwrap().score;
    assert_eq!(score("ok") - score("low"), 30);
}

#[test]
fn test_single_bottle_cost() {
    let repo = MemoryRepository::with_records(vec![vodka_bottle("v", "House Vodka", 24.0)])
        .with_recipe(Recipe::new("Shot").with_ingredient(vodka(60.0)));

    let calc = CostCalculator::new()
        .cost_recipe(&repo, "Shot", CostTier::MidRange)
        .unwrap();

    assert_eq!(calc.total_cost, 1.92);
    assert_eq!(calc.breakdown[0].item_cost, Some(1.92));
    assert_eq!(calc.suggested_price, 5.76);
    assert!(calc.is_complete());
    // a single candidate sits in the cheapest tercile
    assert!(calc.breakdown[0].tier_fallback);
    assert_eq!(repo.calculations.lock().unwrap().len(), 1);
}

#[test]
fn test_unresolved_alcohol_is_counted_not_zeroed() {
    let repo = MemoryRepository::with_records(vec![vodka_bottle("v", "House Vodka", 24.0)])
        .with_recipe(
            Recipe::new("Mystery")
                .with_ingredient(vodka(60.0))
                .with_ingredient(
                    RecipeIngredient::new("30ml Unobtainium", Amount::Millilitres(30.0), "ml")
                        .with_alcohol_type("unobtainium"),
                ),
        );

    let calc = CostCalculator::new()
        .cost_recipe(&repo, "Mystery", CostTier::BestMatch)
        .unwrap();

    assert_eq!(calc.unresolved_count, 1);
    assert_eq!(calc.unresolved_ingredients(), vec!["30ml Unobtainium"]);
    assert_eq!(calc.breakdown[1].resolution, Resolution::Unresolved);
    assert_eq!(calc.breakdown[1].item_cost, None);
    assert_eq!(calc.total_cost, 1.92);
}

#[test]
fn test_candidates_scoring_zero_leave_ingredient_unresolved() {
    // a category hit cancelled out by the ABV penalty
    let cream = CatalogRecord::new("rc", "Rumchata")
        .with_category("Spirits")
        .with_subcategory("Cream Liqueur")
        .with_volume_ml(750.0)
        .with_abv(13.75)
        .with_price(30.0);
    let rum = RecipeIngredient::new("45ml Dark Rum", Amount::Millilitres(45.0), "ml")
        .with_alcohol_type("rum")
        .with_category("Spirits")
        .with_min_abv(40.0);
    let repo = MemoryRepository::with_records(vec![cream])
        .with_recipe(Recipe::new("Dark Shot").with_ingredient(rum.clone()));

    let matcher = IngredientMatcher::new();
    let returned = repo.query_candidates(&matcher.candidate_query(&rum)).unwrap();
    assert_eq!(returned.len(), 1);
    assert_eq!(matcher.signals(&rum, &returned[0]).score(), 0);

    let calc = CostCalculator::new()
        .cost_recipe(&repo, "Dark Shot", CostTier::BestMatch)
        .unwrap();
    assert_eq!(calc.unresolved_count, 1);
    assert_eq!(calc.breakdown[0].resolution, Resolution::Unresolved);
    assert_eq!(calc.breakdown[0].item_cost, None);
    assert_eq!(calc.total_cost, 0.0);
}

#[test]
fn test_sale_savings() {
    let record = CatalogRecord::new("g", "Sale Gin")
        .with_category("Spirits")
        .with_subcategory("Gin")
        .with_volume_ml(700.0)
        .with_sale_price(28.0, 30.0);
    let recipe = Recipe::new("Gin Shot").with_ingredient(
        RecipeIngredient::new("60ml Gin", Amount::Millilitres(60.0), "ml").with_alcohol_type("gin"),
    );

    let calculator = CostCalculator::new();
    let candidates = vec![vec![record]];
    let ranked = calculator.rank_all(&recipe, &candidates);
    let calc = calculator.compute_cost(&recipe, &ranked, CostTier::BestMatch);

    assert_eq!(calc.breakdown[0].savings_amount, Some(0.1714));
    assert_eq!(calc.total_savings, 0.1714);
    assert_eq!(calc.breakdown[0].item_cost, Some(2.4));
}

#[test]
fn test_ranking_is_repeatable() {
    let candidates = vec![
        vodka_bottle("c", "Vodka C", 30.0),
        vodka_bottle("a", "Vodka A", 30.0),
        vodka_bottle("b", "Vodka B", 30.0),
    ];
    let matcher = IngredientMatcher::new();
    let ids = |records: &[CatalogRecord]| -> Vec<String> {
        matcher
            .rank(&vodka(60.0), records)
            .iter()
            .map(|c| c.record.external_id.clone())
            .collect()
    };

    let first = ids(&candidates);
    assert_eq!(first, ["a", "b", "c"]);
    let mut shuffled = candidates.clone();
    shuffled.rotate_left(1);
    assert_eq!(ids(&shuffled), first);
}

#[test]
fn test_missing_recipe_is_not_found() {
    let repo = MemoryRepository::default();
    let err = CostCalculator::new()
        .cost_recipe(&repo, "Nope", CostTier::MidRange)
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_default_moscow_mule_costs_mixers() {
    let recipe = default_recipes()
        .into_iter()
        .find(|r| r.name == "Moscow Mule")
        .unwrap();
    let repo = MemoryRepository::with_records(vec![vodka_bottle("v", "House Vodka", 24.0)])
        .with_recipe(recipe);

    let calc = CostCalculator::new()
        .cost_recipe(&repo, "Moscow Mule", CostTier::BestMatch)
        .unwrap();

    assert!(calc.is_complete());
    assert!(calc.breakdown[0].is_resolved());
    assert!(calc.breakdown[1].is_estimated());
    assert!(calc.breakdown[2].is_estimated());
    // 1.92 vodka + 0.30 lime + 0.54 ginger beer
    assert_eq!(calc.total_cost, 2.76);
}
