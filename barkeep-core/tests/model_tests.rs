//! Integration tests for core model types.

use barkeep_core::{
    Amount, CandidateQuery, CatalogRecord, CostTier, IngredientKind, Recipe, RecipeIngredient,
};

#[test]
fn test_recipe_roundtrip_preserves_order() {
    let recipe = Recipe::new("Negroni")
        .with_category("Classic")
        .with_ingredient(RecipeIngredient::new("30ml Gin", Amount::Millilitres(30.0), "ml"))
        .with_ingredient(RecipeIngredient::new(
            "30ml Campari",
            Amount::Millilitres(30.0),
            "ml",
        ))
        .with_ingredient(
            RecipeIngredient::new("30ml Sweet Vermouth", Amount::Millilitres(30.0), "ml")
                .with_alcohol_type("vermouth"),
        );

    let json = serde_json::to_string(&recipe).unwrap();
    let parsed: Recipe = serde_json::from_str(&json).unwrap();
    let names: Vec<_> = parsed.ingredients.iter().map(|i| i.display_text.as_str()).collect();
    assert_eq!(names, ["30ml Gin", "30ml Campari", "30ml Sweet Vermouth"]);
    assert!(parsed.validate().is_ok());
}

#[test]
fn test_sale_record_invariant_after_normalize() {
    let mut record = CatalogRecord::new("9", "Bacardi Superior").with_sale_price(18.0, 22.0);
    record.normalize_prices();
    assert!(record.current_price <= record.regular_price);
    assert!(record.is_on_sale());
}

#[test]
fn test_candidate_query_builder() {
    let query = CandidateQuery::new(["vodka"]).with_category("Spirits").with_limit(50);
    assert!(!query.is_empty());
    assert_eq!(query.limit, Some(50));
    assert!(CandidateQuery::default().is_empty());
}

#[test]
fn test_mixer_kind_not_alcohol() {
    assert!(!IngredientKind::Mixer.is_alcohol());
    assert_eq!(CostTier::default(), CostTier::MidRange);
}
