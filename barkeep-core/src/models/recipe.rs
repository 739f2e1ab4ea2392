//! Recipe types.
//!
//! - [`Recipe`] - A named cocktail with ordered ingredients
//! - [`RecipeIngredient`] - One line of a recipe
//! - [`Amount`] - Volume or count of an ingredient
//! - [`IngredientKind`] - Alcohol, mixer or garnish

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Serving size assumed when a recipe does not state one.
pub const DEFAULT_SERVING_SIZE_ML: f64 = 120.0;

// ============================================================================
// Ingredient Kind
// ============================================================================

/// What role an ingredient plays in a drink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IngredientKind {
    /// Spirits, liqueurs, wine and beer.
    #[default]
    Alcohol,
    /// Juices, syrups, sodas and bitters.
    Mixer,
    /// Garnishes.
    Garnish,
}

impl IngredientKind {
    /// Returns true for alcoholic ingredients.
    pub fn is_alcohol(self) -> bool {
        self == Self::Alcohol
    }
}

impl fmt::Display for IngredientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Alcohol => "alcohol",
            Self::Mixer => "mixer",
            Self::Garnish => "garnish",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for IngredientKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "alcohol" | "spirit" | "liquor" => Ok(Self::Alcohol),
            "mixer" => Ok(Self::Mixer),
            "garnish" => Ok(Self::Garnish),
            other => Err(CoreError::InvalidData(format!(
                "unknown ingredient kind: {other}"
            ))),
        }
    }
}

// ============================================================================
// Amount
// ============================================================================

/// Parsed quantity of an ingredient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Amount {
    /// A liquid volume, already converted to millilitres.
    Millilitres(f64),
    /// A count of whole items (wedges, leaves, pinches).
    Count(f64),
}

impl Amount {
    /// Returns the volume in millilitres, if this is a liquid amount.
    pub fn as_ml(self) -> Option<f64> {
        match self {
            Self::Millilitres(ml) => Some(ml),
            Self::Count(_) => None,
        }
    }

    /// Returns the raw numeric value.
    pub fn value(self) -> f64 {
        match self {
            Self::Millilitres(v) | Self::Count(v) => v,
        }
    }
}

// ============================================================================
// Recipe Ingredient
// ============================================================================

/// One ingredient line of a recipe, e.g. `"60ml Bourbon Whiskey"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    /// Text as written in the recipe.
    pub display_text: String,
    /// Parsed quantity.
    pub amount: Amount,
    /// Unit as written (`ml`, `oz`, `dash`...).
    pub unit: String,
    /// Role in the drink.
    #[serde(default)]
    pub kind: IngredientKind,
    /// Kind of alcohol expected (e.g. "vodka").
    #[serde(default)]
    pub alcohol_type_hint: Option<String>,
    /// Retailer category expected (e.g. "Spirits").
    #[serde(default)]
    pub category_hint: Option<String>,
    /// Minimum acceptable alcohol content.
    #[serde(default)]
    pub min_abv_percent: Option<f64>,
    /// Preferred brand, if any.
    #[serde(default)]
    pub brand_preference: Option<String>,
}

impl RecipeIngredient {
    /// Creates an alcoholic ingredient with no hints.
    pub fn new(display_text: impl Into<String>, amount: Amount, unit: impl Into<String>) -> Self {
        Self {
            display_text: display_text.into(),
            amount,
            unit: unit.into(),
            kind: IngredientKind::Alcohol,
            alcohol_type_hint: None,
            category_hint: None,
            min_abv_percent: None,
            brand_preference: None,
        }
    }

    /// Sets the ingredient kind.
    #[must_use]
    pub fn with_kind(mut self, kind: IngredientKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the alcohol-type hint.
    #[must_use]
    pub fn with_alcohol_type(mut self, hint: impl Into<String>) -> Self {
        self.alcohol_type_hint = Some(hint.into());
        self
    }

    /// Sets the category hint.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category_hint = Some(category.into());
        self
    }

    /// Sets the minimum ABV.
    #[must_use]
    pub fn with_min_abv(mut self, abv: f64) -> Self {
        self.min_abv_percent = Some(abv);
        self
    }

    /// Sets the preferred brand.
    #[must_use]
    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand_preference = Some(brand.into());
        self
    }

    /// Returns the amount in millilitres, if liquid.
    pub fn amount_ml(&self) -> Option<f64> {
        self.amount.as_ml()
    }
}

// ============================================================================
// Recipe
// ============================================================================

/// A named cocktail recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// Unique recipe name.
    pub name: String,
    /// Free-form category (e.g. "Classic").
    #[serde(default)]
    pub category: Option<String>,
    /// Size of one finished serving.
    #[serde(default = "default_serving_size")]
    pub serving_size_ml: f64,
    /// Ingredients in recipe order.
    pub ingredients: Vec<RecipeIngredient>,
}

fn default_serving_size() -> f64 {
    DEFAULT_SERVING_SIZE_ML
}

impl Recipe {
    /// Creates an empty recipe.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: None,
            serving_size_ml: DEFAULT_SERVING_SIZE_ML,
            ingredients: Vec::new(),
        }
    }

    /// Sets the category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Sets the serving size.
    #[must_use]
    pub fn with_serving_size(mut self, serving_size_ml: f64) -> Self {
        self.serving_size_ml = serving_size_ml;
        self
    }

    /// Appends an ingredient.
    #[must_use]
    pub fn with_ingredient(mut self, ingredient: RecipeIngredient) -> Self {
        self.ingredients.push(ingredient);
        self
    }

    /// Validates the recipe.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidData`] for an empty name, no ingredients,
    /// a non-positive serving size, or a negative ingredient amount.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::InvalidData("recipe name is empty".into()));
        }
        if self.ingredients.is_empty() {
            return Err(CoreError::InvalidData(format!(
                "recipe '{}' has no ingredients",
                self.name
            )));
        }
        if self.serving_size_ml <= 0.0 || !self.serving_size_ml.is_finite() {
            return Err(CoreError::InvalidData(format!(
                "recipe '{}' has invalid serving size {}",
                self.name, self.serving_size_ml
            )));
        }
        if let Some(bad) = self
            .ingredients
            .iter()
            .find(|i| i.amount.value() < 0.0 || !i.amount.value().is_finite())
        {
            return Err(CoreError::InvalidData(format!(
                "ingredient '{}' has an invalid amount",
                bad.display_text
            )));
        }
        Ok(())
    }

    /// Returns the number of alcoholic ingredients.
    pub fn alcohol_count(&self) -> usize {
        self.ingredients.iter().filter(|i| i.kind.is_alcohol()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn old_fashioned() -> Recipe {
        Recipe::new("Old Fashioned")
            .with_ingredient(
                RecipeIngredient::new("60ml Bourbon Whiskey", Amount::Millilitres(60.0), "ml")
                    .with_alcohol_type("whiskey"),
            )
            .with_ingredient(
                RecipeIngredient::new("10ml Simple Syrup", Amount::Millilitres(10.0), "ml")
                    .with_kind(IngredientKind::Mixer),
            )
    }

    #[test]
    fn test_valid_recipe() {
        let recipe = old_fashioned();
        assert!(recipe.validate().is_ok());
        assert_eq!(recipe.alcohol_count(), 1);
        assert_eq!(recipe.serving_size_ml, DEFAULT_SERVING_SIZE_ML);
    }

    #[test]
    fn test_empty_recipe_rejected() {
        assert!(Recipe::new("Nothing").validate().is_err());
        assert!(Recipe::new("  ").validate().is_err());
    }

    #[test]
    fn test_bad_serving_size_rejected() {
        let recipe = old_fashioned().with_serving_size(0.0);
        assert!(recipe.validate().is_err());
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("Mixer".parse::<IngredientKind>().unwrap(), IngredientKind::Mixer);
        assert!("soda".parse::<IngredientKind>().is_err());
    }

    #[test]
    fn test_amount_ml() {
        assert_eq!(Amount::Millilitres(30.0).as_ml(), Some(30.0));
        assert_eq!(Amount::Count(1.0).as_ml(), None);
    }
}
