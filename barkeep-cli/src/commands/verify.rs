//! Verify command - explain which products each ingredient matches.

use anyhow::Result;
use barkeep_core::{CatalogRecord, CoreError, IngredientKind, Recipe};
use barkeep_costing::{CostCalculator, IngredientMatcher, MatchVerification};
use clap::Args;
use serde::Serialize;

use super::{print_json, Session};
use crate::output::TextFormatter;
use crate::Cli;

/// Arguments for the verify command.
#[derive(Args)]
pub struct VerifyArgs {
    /// Recipe name.
    pub recipe: String,

    /// Candidates to show per ingredient.
    #[arg(long, short = 'n', default_value = "3")]
    pub top: usize,
}

/// Verification of one recipe line.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientReport {
    pub display_text: String,
    pub kind: IngredientKind,
    /// True when the line is priced from the flat mixer table.
    pub estimated: bool,
    pub candidates: Vec<MatchVerification>,
}

/// Builds the verification report for a recipe from gathered candidates.
pub fn verify_recipe(
    recipe: &Recipe,
    candidates: &[Vec<CatalogRecord>],
    top: usize,
) -> Vec<IngredientReport> {
    let matcher = IngredientMatcher::new();
    recipe
        .ingredients
        .iter()
        .zip(candidates)
        .map(|(ingredient, records)| {
            let ranked = matcher.rank(ingredient, records);
            IngredientReport {
                display_text: ingredient.display_text.clone(),
                kind: ingredient.kind,
                estimated: !CostCalculator::wants_candidates(ingredient),
                candidates: ranked
                    .iter()
                    .take(top)
                    .map(|c| matcher.verify(ingredient, c.record))
                    .collect(),
            }
        })
        .collect()
}

/// Runs the verify command.
pub fn run(args: &VerifyArgs, cli: &Cli) -> Result<()> {
    let session = Session::open(cli)?;
    let recipe = session
        .repo
        .get_recipe(&args.recipe)?
        .ok_or_else(|| CoreError::NotFound(format!("recipe '{}'", args.recipe)))?;

    let candidates = session.calculator().gather_candidates(&session.repo, &recipe)?;
    let reports = verify_recipe(&recipe, &candidates, args.top);

    if !print_json(cli, &reports)? {
        println!(
            "{}",
            TextFormatter::new(!cli.no_color).format_verification(&recipe.name, &reports)
        );
    }
    Ok(())
}
