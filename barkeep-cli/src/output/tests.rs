//! CLI output formatting tests.
//!
//! These tests verify that CLI output is correctly formatted for both
//! text and JSON output modes.

use barkeep_core::{
    CatalogRecord, CatalogStats, CostCalculation, CostTier, IngredientCostBreakdown,
    IngredientKind, Recipe, Resolution,
};
use chrono::Utc;

fn calculation() -> CostCalculation {
    CostCalculation {
        recipe_name: "Moscow Mule".into(),
        tier: CostTier::MidRange,
        breakdown: vec![
            IngredientCostBreakdown {
                display_text: "60ml Vodka".into(),
                kind: IngredientKind::Alcohol,
                amount_ml: Some(60.0),
                resolution: Resolution::Resolved {
                    external_id: "v1".into(),
                    name: "House Vodka".into(),
                    brand: None,
                    volume_ml: 750.0,
                    current_price: 22.0,
                    regular_price: Some(24.0),
                    score: 65,
                },
                item_cost: Some(1.76),
                savings_amount: Some(0.16),
                tier_fallback: true,
            },
            IngredientCostBreakdown {
                display_text: "120ml Ginger Beer".into(),
                kind: IngredientKind::Mixer,
                amount_ml: Some(120.0),
                resolution: Resolution::Estimated { cost_per_ml: 0.0045 },
                item_cost: Some(0.54),
                savings_amount: None,
                tier_fallback: false,
            },
            IngredientCostBreakdown {
                display_text: "15ml Unobtainium".into(),
                kind: IngredientKind::Alcohol,
                amount_ml: Some(15.0),
                resolution: Resolution::Unresolved,
                item_cost: None,
                savings_amount: None,
                tier_fallback: false,
            },
        ],
        total_cost: 2.3,
        unresolved_count: 1,
        total_savings: 0.16,
        markup_multiplier: 3.0,
        suggested_price: 6.9,
        margin: 4.6,
        cost_per_ml: Some(0.0192),
        computed_at: Utc::now(),
    }
}

#[cfg(test)]
mod text_formatter_tests {
    use super::super::text::TextFormatter;
    use super::*;

    #[test]
    fn test_format_cost_breakdown() {
        let output = TextFormatter::new(false).format_cost(&calculation());

        assert!(output.contains("Moscow Mule Cost Breakdown (mid_range)"));
        assert!(output.contains("House Vodka [v1] (best match; tier empty) $1.76"));
        assert!(output.contains("estimate at $0.0045/ml $0.54"));
        assert!(output.contains("no match ?"));
        assert!(output.contains("on sale, save $0.16"));
        assert!(output.contains("Total cost:      $2.30"));
        assert!(output.contains("Suggested price: $6.90 (3x markup)"));
        assert!(output.contains("1 unresolved: 15ml Unobtainium"));
    }

    #[test]
    fn test_format_cost_options() {
        let mut cheap = calculation();
        cheap.tier = CostTier::Cheapest;
        cheap.unresolved_count = 0;
        let output = TextFormatter::new(false).format_cost_options(&[cheap, calculation()]);

        assert!(output.contains("cheapest"));
        assert!(output.contains("mid_range"));
        assert_eq!(output.matches("unresolved").count(), 1);
    }

    #[test]
    fn test_format_products() {
        let formatter = TextFormatter::new(false);
        assert_eq!(formatter.format_products(&[]), "No products found");

        let records = vec![
            CatalogRecord::new("12345", "A Very Long Single Malt Scotch Whisky Name 18 Year Old")
                .with_brand("Distillery")
                .with_category("Spirits")
                .with_price(129.95),
            CatalogRecord::new("678", "House Red").with_category("Wine"),
        ];
        let output = formatter.format_products(&records);
        assert!(output.contains("12345"));
        assert!(output.contains("..."));
        assert!(output.contains("$129.95"));
        assert!(output.contains("N/A"));
    }

    #[test]
    fn test_format_stats() {
        let mut stats = CatalogStats {
            total_records: 3,
            on_sale: 1,
            ..CatalogStats::default()
        };
        stats.by_category.insert("Spirits".into(), 2);
        stats.by_category.insert("Wine".into(), 1);

        let output = TextFormatter::new(false).format_stats(&stats);
        assert!(output.contains("Total products:   3"));
        assert!(output.contains("Spirits"));
        assert!(output.contains("Last crawled:     never"));
    }

    #[test]
    fn test_format_recipe_list() {
        let formatter = TextFormatter::new(false);
        assert!(formatter.format_recipe_list(&[]).contains("load-defaults"));

        let recipes = barkeep_costing::default_recipes();
        let output = formatter.format_recipe_list(&recipes);
        assert!(output.contains("Negroni"));
        assert_eq!(output.lines().count(), recipes.len() + 2);
    }

    #[test]
    fn test_format_recipe() {
        let recipe = barkeep_costing::default_recipes()
            .into_iter()
            .find(|r| r.name == "Moscow Mule")
            .unwrap();
        let output = TextFormatter::new(false).format_recipe(&recipe);
        assert!(output.starts_with("Moscow Mule"));
        assert!(output.contains("[mixer]"));
    }

    #[test]
    fn test_format_history_empty() {
        let output = TextFormatter::new(false).format_history("Negroni", &[]);
        assert_eq!(output, "No cost calculations for Negroni yet");
    }

    #[test]
    fn test_no_ansi_without_colors() {
        let output = TextFormatter::new(false).format_cost(&calculation());
        assert!(!output.contains('\x1b'));
        let colored = TextFormatter::new(true).format_cost(&calculation());
        assert!(colored.contains('\x1b'));
    }
}

#[cfg(test)]
mod json_formatter_tests {
    use super::super::json::JsonFormatter;
    use super::*;

    #[test]
    fn test_cost_calculation_json() {
        let json = JsonFormatter::new(false).format(&calculation()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["tier"], "mid_range");
        assert_eq!(value["breakdown"][0]["resolution"]["status"], "resolved");
        assert_eq!(value["breakdown"][1]["resolution"]["status"], "estimated");
        assert_eq!(value["breakdown"][2]["item_cost"], serde_json::Value::Null);
        assert_eq!(value["unresolved_count"], 1);
    }

    #[test]
    fn test_pretty_output() {
        let recipe = Recipe::new("Neat");
        let compact = JsonFormatter::new(false).format(&recipe).unwrap();
        let pretty = JsonFormatter::new(true).format(&recipe).unwrap();
        assert!(!compact.contains('\n'));
        assert!(pretty.contains('\n'));
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&compact).unwrap(),
            serde_json::from_str::<serde_json::Value>(&pretty).unwrap()
        );
    }
}
