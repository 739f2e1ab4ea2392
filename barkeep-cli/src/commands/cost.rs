//! Cost commands - price a recipe and show past calculations.

use anyhow::Result;
use barkeep_core::{CatalogRepository, CoreError, CostCalculation, CostTier};
use clap::Args;
use tracing::info;

use super::{print_json, Session};
use crate::output::TextFormatter;
use crate::Cli;

/// Arguments for the cost command.
#[derive(Args)]
pub struct CostArgs {
    /// Recipe name.
    pub recipe: String,

    /// Price tier: cheapest, mid_range, premium or best_match.
    #[arg(long, short, default_value = "mid_range")]
    pub tier: CostTier,

    /// Cost at every tier and show the options side by side.
    #[arg(long)]
    pub all_tiers: bool,
}

/// Arguments for the history command.
#[derive(Args)]
pub struct HistoryArgs {
    /// Recipe name.
    pub recipe: String,

    /// Limit number of calculations to show.
    #[arg(long, short, default_value = "10")]
    pub limit: usize,
}

/// Runs the cost command.
pub fn run(args: &CostArgs, cli: &Cli) -> Result<()> {
    let session = Session::open(cli)?;
    let calculator = session.calculator();
    let formatter = TextFormatter::new(!cli.no_color);

    if !args.all_tiers {
        let calculation = calculator.cost_recipe(&session.repo, &args.recipe, args.tier)?;
        if !print_json(cli, &calculation)? {
            println!("{}", formatter.format_cost(&calculation));
        }
        return Ok(());
    }

    let options = cost_options(&session, &args.recipe)?;
    if !print_json(cli, &options)? {
        let chosen = options
            .iter()
            .find(|c| c.tier == args.tier)
            .or_else(|| options.first());
        if let Some(chosen) = chosen {
            println!("{}", formatter.format_cost(chosen));
            println!();
        }
        println!("{}", formatter.format_cost_options(&options));
    }
    Ok(())
}

/// Costs a recipe at every tier and stores each calculation.
fn cost_options(session: &Session, recipe_name: &str) -> Result<Vec<CostCalculation>> {
    let calculator = session.calculator();
    let recipe = session
        .repo
        .load_recipe(recipe_name)?
        .ok_or_else(|| CoreError::NotFound(format!("recipe '{recipe_name}'")))?;

    let candidates = calculator.gather_candidates(&session.repo, &recipe)?;
    let ranked = calculator.rank_all(&recipe, &candidates);
    let options = calculator.cost_options(&recipe, &ranked);
    for calculation in &options {
        session.repo.append_cost_calculation(calculation)?;
    }
    info!(recipe = %recipe.name, tiers = options.len(), "Costed every tier");
    Ok(options)
}

/// Runs the history command.
pub fn history(args: &HistoryArgs, cli: &Cli) -> Result<()> {
    let session = Session::open(cli)?;
    if session.repo.get_recipe(&args.recipe)?.is_none() {
        return Err(CoreError::NotFound(format!("recipe '{}'", args.recipe)).into());
    }
    let history = session.repo.cost_history(&args.recipe, Some(args.limit))?;
    if !print_json(cli, &history)? {
        println!(
            "{}",
            TextFormatter::new(!cli.no_color).format_history(&args.recipe, &history)
        );
    }
    Ok(())
}
