// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `Barkeep` Costing
//!
//! Ingredient matching and recipe cost calculation.
//!
//! Everything here is pure and synchronous. The only I/O is through the
//! [`barkeep_core::CatalogRepository`] seam in
//! [`CostCalculator::cost_recipe`].
//!
//! ## Modules
//!
//! - [`units`] - Unit conversion and recipe-line parsing
//! - [`aliases`] - Alcohol-type aliases and ingredient classification
//! - [`matcher`] - Additive scoring of catalog records against ingredients
//! - [`calculator`] - Tier selection and cost totals
//! - [`mixers`] - Flat estimates for unmatched mixers
//! - [`defaults`] - Built-in cocktail recipes
//!
//! ## Example
//!
//! ```ignore
//! use barkeep_costing::{CostCalculator, IngredientMatcher};
//! use barkeep_core::CostTier;
//!
//! let calculator = CostCalculator::new();
//! let candidates = calculator.gather_candidates(&repository, &recipe)?;
//! let ranked = calculator.rank_all(&recipe, &candidates);
//! let cost = calculator.compute_cost(&recipe, &ranked, CostTier::MidRange);
//! println!("{}: ${:.2}", cost.recipe_name, cost.total_cost);
//! ```

pub mod aliases;
pub mod calculator;
pub mod defaults;
pub mod error;
pub mod matcher;
pub mod mixers;
pub mod units;

pub use calculator::{
    round_currency, CostCalculator, CostSettings, DEFAULT_CURRENCY_DECIMALS,
    DEFAULT_MARKUP_MULTIPLIER,
};
pub use defaults::default_recipes;
pub use error::ParseError;
pub use matcher::{
    IngredientMatcher, MatchQuality, MatchSignals, MatchVerification, PriceTerciles,
    ScoredCandidate, VerificationChecks,
};
pub use mixers::MixerEstimates;
pub use units::{ingredient_from_text, parse_ingredient, ParsedIngredient};
