//! Serde tests for core types.
//!
//! These cover the wire details other crates rely on: field defaults when
//! reading older JSON, enum spellings, and optional fields staying `None`.

use chrono::Utc;
use serde_json::json;

use crate::{
    Amount, CatalogRecord, CostTier, IngredientKind, Recipe, RecipeIngredient,
    DEFAULT_SERVING_SIZE_ML,
};

// ============================================================================
// Recipe Serde Tests
// ============================================================================

#[test]
fn test_recipe_defaults_when_fields_missing() {
    let json = json!({
        "name": "Gimlet",
        "ingredients": [{
            "display_text": "60ml Gin",
            "amount": { "millilitres": 60.0 },
            "unit": "ml"
        }]
    });

    let recipe: Recipe = serde_json::from_value(json).unwrap();
    assert_eq!(recipe.serving_size_ml, DEFAULT_SERVING_SIZE_ML);
    assert!(recipe.category.is_none());
    let ingredient = &recipe.ingredients[0];
    assert_eq!(ingredient.kind, IngredientKind::Alcohol);
    assert_eq!(ingredient.amount, Amount::Millilitres(60.0));
    assert!(ingredient.brand_preference.is_none());
}

#[test]
fn test_ingredient_kind_lowercase() {
    let ingredient = RecipeIngredient::new("1 whole Lime Wheel", Amount::Count(1.0), "whole")
        .with_kind(IngredientKind::Garnish);
    let value = serde_json::to_value(&ingredient).unwrap();
    assert_eq!(value["kind"], "garnish");
    assert_eq!(value["amount"]["count"], 1.0);
}

// ============================================================================
// Cost Tier Serde Tests
// ============================================================================

#[test]
fn test_cost_tier_snake_case() {
    let test_cases = vec![
        (r#""cheapest""#, CostTier::Cheapest),
        (r#""mid_range""#, CostTier::MidRange),
        (r#""premium""#, CostTier::Premium),
        (r#""best_match""#, CostTier::BestMatch),
    ];

    for (json, expected) in test_cases {
        let result: CostTier = serde_json::from_str(json).unwrap();
        assert_eq!(result, expected, "Failed for {json}");
        assert_eq!(serde_json::to_string(&expected).unwrap(), json);
    }
}

// ============================================================================
// Catalog Record Serde Tests
// ============================================================================

#[test]
fn test_catalog_record_url_optional() {
    let json = json!({
        "external_id": "12345",
        "name": "Tanqueray London Dry Gin",
        "brand": "Tanqueray",
        "category": "Spirits",
        "subcategory": "Gin",
        "volume_ml": 750.0,
        "abv_percent": 47.3,
        "current_price": 32.95,
        "regular_price": 32.95,
        "country_of_origin": "United Kingdom",
        "last_seen_at": Utc::now(),
    });

    let record: CatalogRecord = serde_json::from_value(json).unwrap();
    assert!(record.url.is_none());
    assert!(record.is_costable());
    assert!(!record.is_on_sale());
}
