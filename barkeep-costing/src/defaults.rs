//! Built-in cocktail recipes.

use barkeep_core::{IngredientKind, Recipe, RecipeIngredient};

use crate::units::convert;

use IngredientKind::{Alcohol, Garnish, Mixer};

/// One line of a built-in recipe.
struct Line {
    name: &'static str,
    amount: f64,
    unit: &'static str,
    kind: IngredientKind,
    /// Retailer category and subcategory.
    path: Option<(&'static str, &'static str)>,
    min_abv: Option<f64>,
}

const fn spirit(name: &'static str, amount: f64, sub: &'static str, min_abv: f64) -> Line {
    Line {
        name,
        amount,
        unit: "ml",
        kind: Alcohol,
        path: Some(("Spirits", sub)),
        min_abv: Some(min_abv),
    }
}

const fn liqueur(name: &'static str, amount: f64) -> Line {
    Line {
        name,
        amount,
        unit: "ml",
        kind: Alcohol,
        path: Some(("Spirits", "Liqueur")),
        min_abv: None,
    }
}

const fn wine(name: &'static str, amount: f64, sub: &'static str) -> Line {
    Line {
        name,
        amount,
        unit: "ml",
        kind: Alcohol,
        path: Some(("Wine", sub)),
        min_abv: None,
    }
}

const fn mixer(name: &'static str, amount: f64, unit: &'static str) -> Line {
    Line {
        name,
        amount,
        unit,
        kind: Mixer,
        path: None,
        min_abv: None,
    }
}

const fn garnish(name: &'static str, amount: f64, unit: &'static str) -> Line {
    Line {
        name,
        amount,
        unit,
        kind: Garnish,
        path: None,
        min_abv: None,
    }
}

const RECIPES: &[(&str, f64, &[Line])] = &[
    (
        "Old Fashioned",
        100.0,
        &[
            spirit("Bourbon Whiskey", 60.0, "Whisky", 40.0),
            mixer("Simple Syrup", 10.0, "ml"),
            mixer("Angostura Bitters", 2.0, "dash"),
        ],
    ),
    (
        "Margarita",
        150.0,
        &[
            spirit("Silver Tequila", 60.0, "Tequila", 38.0),
            liqueur("Triple Sec", 30.0),
            mixer("Fresh Lime Juice", 30.0, "ml"),
        ],
    ),
    (
        "Martini",
        90.0,
        &[
            spirit("London Dry Gin", 75.0, "Gin", 40.0),
            wine("Dry Vermouth", 15.0, "Vermouth"),
        ],
    ),
    (
        "Moscow Mule",
        240.0,
        &[
            spirit("Vodka", 60.0, "Vodka", 40.0),
            mixer("Fresh Lime Juice", 15.0, "ml"),
            mixer("Ginger Beer", 180.0, "ml"),
        ],
    ),
    (
        "Whiskey Sour",
        120.0,
        &[
            spirit("Bourbon Whiskey", 60.0, "Whisky", 40.0),
            mixer("Fresh Lemon Juice", 30.0, "ml"),
            mixer("Simple Syrup", 20.0, "ml"),
        ],
    ),
    (
        "Cosmopolitan",
        100.0,
        &[
            spirit("Vodka", 45.0, "Vodka", 40.0),
            liqueur("Triple Sec", 15.0),
            mixer("Cranberry Juice", 30.0, "ml"),
            mixer("Fresh Lime Juice", 15.0, "ml"),
        ],
    ),
    (
        "Negroni",
        90.0,
        &[
            spirit("London Dry Gin", 30.0, "Gin", 40.0),
            wine("Sweet Vermouth", 30.0, "Vermouth"),
            liqueur("Campari", 30.0),
        ],
    ),
    (
        "Manhattan",
        75.0,
        &[
            spirit("Rye Whiskey", 60.0, "Whisky", 40.0),
            wine("Sweet Vermouth", 30.0, "Vermouth"),
            mixer("Angostura Bitters", 2.0, "dash"),
        ],
    ),
    (
        "Daiquiri",
        75.0,
        &[
            spirit("White Rum", 60.0, "Rum", 40.0),
            mixer("Fresh Lime Juice", 30.0, "ml"),
            mixer("Simple Syrup", 15.0, "ml"),
        ],
    ),
    (
        "Piña Colada",
        240.0,
        &[
            spirit("White Rum", 60.0, "Rum", 40.0),
            mixer("Coconut Cream", 60.0, "ml"),
            mixer("Pineapple Juice", 120.0, "ml"),
        ],
    ),
    (
        "Mojito",
        240.0,
        &[
            spirit("White Rum", 60.0, "Rum", 40.0),
            mixer("Fresh Lime Juice", 30.0, "ml"),
            mixer("Simple Syrup", 20.0, "ml"),
            mixer("Club Soda", 120.0, "ml"),
            garnish("Fresh Mint", 8.0, "leaves"),
        ],
    ),
    (
        "Long Island Iced Tea",
        240.0,
        &[
            spirit("Vodka", 15.0, "Vodka", 40.0),
            spirit("White Rum", 15.0, "Rum", 40.0),
            spirit("London Dry Gin", 15.0, "Gin", 40.0),
            spirit("Silver Tequila", 15.0, "Tequila", 38.0),
            liqueur("Triple Sec", 15.0),
            mixer("Fresh Lemon Juice", 30.0, "ml"),
            mixer("Cola", 120.0, "ml"),
        ],
    ),
    (
        "Gimlet",
        75.0,
        &[
            spirit("London Dry Gin", 60.0, "Gin", 40.0),
            mixer("Fresh Lime Juice", 15.0, "ml"),
            mixer("Simple Syrup", 15.0, "ml"),
        ],
    ),
    (
        "Dark and Stormy",
        240.0,
        &[
            spirit("Dark Rum", 60.0, "Rum", 40.0),
            mixer("Ginger Beer", 180.0, "ml"),
            mixer("Fresh Lime Juice", 15.0, "ml"),
        ],
    ),
    (
        "Sazerac",
        75.0,
        &[
            spirit("Rye Whiskey", 60.0, "Whisky", 40.0),
            liqueur("Absinthe", 5.0),
            mixer("Simple Syrup", 10.0, "ml"),
            mixer("Peychaud's Bitters", 2.0, "dash"),
        ],
    ),
    (
        "Mint Julep",
        120.0,
        &[
            spirit("Bourbon Whiskey", 75.0, "Whisky", 40.0),
            mixer("Simple Syrup", 15.0, "ml"),
            garnish("Fresh Mint", 8.0, "leaves"),
        ],
    ),
];

fn display_text(line: &Line) -> String {
    if line.unit == "ml" {
        format!("{}ml {}", line.amount, line.name)
    } else {
        format!("{} {} {}", line.amount, line.unit, line.name)
    }
}

fn build(line: &Line) -> Option<RecipeIngredient> {
    let amount = convert(line.amount, line.unit).ok()?;
    let mut ingredient = RecipeIngredient::new(display_text(line), amount, line.unit).with_kind(line.kind);
    if let Some((category, subcategory)) = line.path {
        ingredient = ingredient
            .with_category(category)
            .with_alcohol_type(subcategory.to_lowercase());
    }
    if let Some(min_abv) = line.min_abv {
        ingredient = ingredient.with_min_abv(min_abv);
    }
    Some(ingredient)
}

/// Returns the built-in cocktail recipes.
pub fn default_recipes() -> Vec<Recipe> {
    RECIPES
        .iter()
        .map(|(name, serving, lines)| {
            lines
                .iter()
                .filter_map(build)
                .fold(
                    Recipe::new(*name)
                        .with_category("Cocktail")
                        .with_serving_size(*serving),
                    Recipe::with_ingredient,
                )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let recipes = default_recipes();
        assert_eq!(recipes.len(), RECIPES.len());
        for recipe in &recipes {
            recipe.validate().unwrap();
            assert!(recipe.alcohol_count() > 0, "{} has no alcohol", recipe.name);
        }
    }

    #[test]
    fn test_old_fashioned_lines() {
        let recipes = default_recipes();
        let old_fashioned = recipes.iter().find(|r| r.name == "Old Fashioned").unwrap();
        assert_eq!(old_fashioned.serving_size_ml, 100.0);

        let bourbon = &old_fashioned.ingredients[0];
        assert_eq!(bourbon.display_text, "60ml Bourbon Whiskey");
        assert_eq!(bourbon.alcohol_type_hint.as_deref(), Some("whisky"));
        assert_eq!(bourbon.category_hint.as_deref(), Some("Spirits"));
        assert_eq!(bourbon.min_abv_percent, Some(40.0));

        let bitters = &old_fashioned.ingredients[2];
        assert_eq!(bitters.display_text, "2 dash Angostura Bitters");
        assert_eq!(bitters.amount_ml(), Some(1.25));
        assert_eq!(bitters.kind, IngredientKind::Mixer);
    }
}
