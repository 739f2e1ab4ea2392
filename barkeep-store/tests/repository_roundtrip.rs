//! File-backed repository tests: persistence across reopen, and costing
//! through SQLite candidate queries.

use barkeep_core::{CatalogRecord, CostTier, Recipe, Resolution};
use barkeep_costing::{default_recipes, ingredient_from_text, CostCalculator};
use barkeep_store::{ingest_record, SqliteRepository};

fn house_vodka() -> CatalogRecord {
    CatalogRecord::new("v", "House Vodka")
        .with_category("Spirits")
        .with_subcategory("Vodka")
        .with_volume_ml(750.0)
        .with_abv(40.0)
        .with_price(24.0)
}

#[test]
fn test_data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("barkeep.db");

    {
        let repo = SqliteRepository::open(&path).unwrap();
        ingest_record(&repo, &house_vodka()).unwrap();
        for recipe in default_recipes() {
            repo.save_recipe(&recipe).unwrap();
        }
    }

    let repo = SqliteRepository::open(&path).unwrap();
    let stats = repo.catalog_stats().unwrap();
    assert_eq!(stats.total_records, 1);
    assert_eq!(stats.price_history_entries, 1);
    assert_eq!(stats.recipes, default_recipes().len());
    assert!(!ingest_record(&repo, &house_vodka()).unwrap());
}

#[test]
fn test_cost_recipe_through_sqlite() {
    let repo = SqliteRepository::open_in_memory().unwrap();
    ingest_record(&repo, &house_vodka()).unwrap();
    let mule = default_recipes()
        .into_iter()
        .find(|r| r.name == "Moscow Mule")
        .unwrap();
    repo.save_recipe(&mule).unwrap();

    let calc = CostCalculator::new()
        .cost_recipe(&repo, "Moscow Mule", CostTier::BestMatch)
        .unwrap();
    assert_eq!(calc.total_cost, 2.76);
    assert!(calc.is_complete());

    let history = repo.cost_history("Moscow Mule", None).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].total_cost, calc.total_cost);
    assert_eq!(history[0].breakdown.len(), calc.breakdown.len());
}

#[test]
fn test_cheapest_tier_sees_every_candidate() {
    let repo = SqliteRepository::open_in_memory().unwrap();
    for i in 0..600 {
        let price = if i == 599 { 19.95 } else { 40.0 };
        let record = CatalogRecord::new(format!("{i:05}"), "Bourbon Whiskey")
            .with_category("Spirits")
            .with_subcategory("Bourbon")
            .with_volume_ml(750.0)
            .with_abv(40.0)
            .with_price(price);
        ingest_record(&repo, &record).unwrap();
    }
    let recipe = Recipe::new("Bourbon Neat")
        .with_ingredient(ingredient_from_text("60ml Bourbon Whiskey").unwrap());
    repo.save_recipe(&recipe).unwrap();

    let calc = CostCalculator::new()
        .cost_recipe(&repo, "Bourbon Neat", CostTier::Cheapest)
        .unwrap();
    match &calc.breakdown[0].resolution {
        Resolution::Resolved { external_id, current_price, .. } => {
            assert_eq!(external_id, "00599");
            assert_eq!(*current_price, 19.95);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_export_contains_everything() {
    let repo = SqliteRepository::open_in_memory().unwrap();
    ingest_record(&repo, &house_vodka()).unwrap();
    repo.save_recipe(&default_recipes()[0]).unwrap();

    let export = repo.export().unwrap();
    assert_eq!(export.records.len(), 1);
    assert_eq!(export.recipes.len(), 1);
    assert_eq!(export.stats.total_records, 1);

    let json = serde_json::to_value(&export).unwrap();
    assert_eq!(json["records"][0]["external_id"], "v");
}
