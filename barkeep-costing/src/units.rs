//! Unit conversion and free-text ingredient parsing.
//!
//! Recipe lines look like `"60ml Bourbon Whiskey"`, `"2 dash Angostura
//! Bitters"` or `"1 1/2 oz London Dry Gin"`. Liquid units are converted to
//! millilitres; count units (`whole`, `leaves`, `pinch`) stay counts and
//! carry an approximate volume for flat-rate estimates.

use std::sync::LazyLock;

use barkeep_core::{Amount, IngredientKind, RecipeIngredient};
use regex::Regex;

use crate::aliases::{classify_kind, find_alias};
use crate::error::ParseError;

static QUANTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+\s+\d+/\d+|\d+/\d+|\d+(?:[.,]\d+)?)\s*(.*)$").expect("Invalid regex")
});
static UNIT_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(fl\.?\s*oz|[A-Za-z]+)\.?(?:\s+|$)(.*)$").expect("Invalid regex")
});

// ============================================================================
// Unit Table
// ============================================================================

/// How a unit measures an ingredient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnitKind {
    /// A volume; the value is millilitres per unit.
    Volume(f64),
    /// A count of items; the value is an approximate volume per item.
    Count(f64),
}

/// A known unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unit {
    /// Canonical spelling.
    pub name: &'static str,
    /// Volume or count.
    pub kind: UnitKind,
}

/// Canonical unit used when a quantity has no unit (`"2 limes"`).
pub const DEFAULT_COUNT_UNIT: &str = "whole";

const UNITS: &[(&[&str], UnitKind)] = &[
    (&["ml", "milliliter", "milliliters", "millilitre", "millilitres"], UnitKind::Volume(1.0)),
    (&["oz", "ounce", "ounces", "fl oz", "floz"], UnitKind::Volume(29.5735)),
    (&["tbsp", "tablespoon", "tablespoons"], UnitKind::Volume(14.7868)),
    (&["tsp", "teaspoon", "teaspoons"], UnitKind::Volume(4.92892)),
    (&["dash", "dashes"], UnitKind::Volume(0.625)),
    (&["splash", "splashes"], UnitKind::Volume(5.0)),
    (&["drop", "drops"], UnitKind::Volume(0.05)),
    (&["cl"], UnitKind::Volume(10.0)),
    (&["dl"], UnitKind::Volume(100.0)),
    (&["l", "liter", "liters", "litre", "litres"], UnitKind::Volume(1000.0)),
    (&["cup", "cups"], UnitKind::Volume(236.588)),
    (&["pint", "pints"], UnitKind::Volume(473.176)),
    (&["shot", "shots", "jigger", "jiggers"], UnitKind::Volume(44.3603)),
    (&["pony", "ponies"], UnitKind::Volume(22.1802)),
    (&["whole"], UnitKind::Count(1.0)),
    (&["leaves", "leaf"], UnitKind::Count(0.1)),
    (&["pinch", "pinches"], UnitKind::Count(0.5)),
];

/// Looks up a unit by any of its spellings.
pub fn lookup_unit(unit: &str) -> Option<Unit> {
    let key = unit.trim().trim_end_matches('.').to_lowercase();
    let key = key.split_whitespace().collect::<Vec<_>>().join(" ");
    UNITS.iter().find_map(|(names, kind)| {
        names.contains(&key.as_str()).then(|| Unit {
            name: names[0],
            kind: *kind,
        })
    })
}

/// Converts a quantity in `unit` to an [`Amount`].
///
/// # Errors
///
/// Returns [`ParseError::UnknownUnit`] if the unit is not in the table.
pub fn convert(value: f64, unit: &str) -> Result<Amount, ParseError> {
    let unit = lookup_unit(unit).ok_or_else(|| ParseError::UnknownUnit(unit.to_string()))?;
    Ok(match unit.kind {
        UnitKind::Volume(ml) => Amount::Millilitres(value * ml),
        UnitKind::Count(_) => Amount::Count(value),
    })
}

/// Returns an amount as millilitres, approximating counts.
pub fn approx_ml(amount: Amount, unit: &str) -> f64 {
    match amount {
        Amount::Millilitres(ml) => ml,
        Amount::Count(n) => match lookup_unit(unit).map(|u| u.kind) {
            Some(UnitKind::Count(each)) => n * each,
            _ => n,
        },
    }
}

// ============================================================================
// Text Parsing
// ============================================================================

/// A recipe line split into quantity and name.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedIngredient {
    /// Parsed quantity.
    pub amount: Amount,
    /// Canonical unit.
    pub unit: String,
    /// Ingredient name without the quantity.
    pub name: String,
}

fn parse_number(text: &str) -> Result<f64, ParseError> {
    let invalid = || ParseError::InvalidAmount(text.to_string());
    let fraction = |part: &str| -> Result<f64, ParseError> {
        match part.split_once('/') {
            Some((num, den)) => {
                let num: f64 = num.trim().parse().map_err(|_| invalid())?;
                let den: f64 = den.trim().parse().map_err(|_| invalid())?;
                if den == 0.0 {
                    return Err(invalid());
                }
                Ok(num / den)
            }
            None => part.replace(',', ".").parse().map_err(|_| invalid()),
        }
    };

    let mut parts = text.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(whole), Some(frac)) => Ok(fraction(whole)? + fraction(frac)?),
        (Some(single), None) => fraction(single),
        _ => Err(invalid()),
    }
}

/// Parses a recipe line such as `"60ml Vodka"` or `"2 dash Angostura Bitters"`.
///
/// A quantity with no recognised unit is a count (`"2 Lime Wedges"`).
///
/// # Errors
///
/// Returns a [`ParseError`] if the text is blank, has no leading quantity,
/// or has nothing after the quantity.
pub fn parse_ingredient(text: &str) -> Result<ParsedIngredient, ParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ParseError::Empty);
    }
    let caps = QUANTITY
        .captures(text)
        .ok_or_else(|| ParseError::MissingAmount(text.to_string()))?;
    let value = parse_number(&caps[1])?;
    let rest = caps[2].trim();

    let (unit, name) = match UNIT_WORD.captures(rest) {
        Some(word) => match lookup_unit(&word[1]) {
            Some(unit) => (unit, word.get(2).map_or("", |m| m.as_str()).trim()),
            None => (count_unit(), rest),
        },
        None => (count_unit(), rest),
    };
    let name = name.strip_prefix("of ").unwrap_or(name).trim();
    if name.is_empty() {
        return Err(ParseError::MissingName(text.to_string()));
    }

    let amount = match unit.kind {
        UnitKind::Volume(ml) => Amount::Millilitres(value * ml),
        UnitKind::Count(_) => Amount::Count(value),
    };
    Ok(ParsedIngredient {
        amount,
        unit: unit.name.to_string(),
        name: name.to_string(),
    })
}

fn count_unit() -> Unit {
    Unit {
        name: DEFAULT_COUNT_UNIT,
        kind: UnitKind::Count(1.0),
    }
}

/// Returns the name part of a recipe line, or the whole line if it has no
/// leading quantity.
pub fn ingredient_name(display_text: &str) -> String {
    parse_ingredient(display_text)
        .map_or_else(|_| display_text.trim().to_string(), |p| p.name)
}

/// Builds a [`RecipeIngredient`] from a recipe line, inferring kind and
/// alcohol hints from the name.
///
/// # Errors
///
/// See [`parse_ingredient`].
pub fn ingredient_from_text(text: &str) -> Result<RecipeIngredient, ParseError> {
    let parsed = parse_ingredient(text)?;
    let kind = classify_kind(&parsed.name);
    let mut ingredient =
        RecipeIngredient::new(text.trim(), parsed.amount, parsed.unit).with_kind(kind);
    if kind == IngredientKind::Alcohol {
        if let Some(alias) = find_alias(&parsed.name) {
            ingredient = ingredient
                .with_alcohol_type(alias.key)
                .with_category(alias.category);
        }
    }
    Ok(ingredient)
}
