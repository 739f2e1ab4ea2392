//! Catalog commands - list products, show statistics, export.

use std::path::PathBuf;

use anyhow::{Context, Result};
use barkeep_store::save_json;
use clap::Args;
use tracing::info;

use super::{print_json, Session};
use crate::output::TextFormatter;
use crate::Cli;

/// Arguments for the products command.
#[derive(Args)]
pub struct ProductsArgs {
    /// Filter by category.
    #[arg(long, short)]
    pub category: Option<String>,

    /// Filter by name or brand.
    #[arg(long, short)]
    pub search: Option<String>,

    /// Show one record and its price history.
    #[arg(long, conflicts_with_all = ["category", "search"])]
    pub id: Option<String>,

    /// Limit number of products to show.
    #[arg(long, short, default_value = "20")]
    pub limit: usize,
}

/// Arguments for the export command.
#[derive(Args)]
pub struct ExportArgs {
    /// Output file.
    #[arg(long, short, default_value = "barkeep_export.json")]
    pub output: PathBuf,
}

/// Runs the products command.
pub fn products(args: &ProductsArgs, cli: &Cli) -> Result<()> {
    let session = Session::open(cli)?;
    let formatter = TextFormatter::new(!cli.no_color);

    if let Some(id) = &args.id {
        let record = session
            .repo
            .get_catalog_record(id)?
            .with_context(|| format!("no catalog record '{id}'"))?;
        let history = session.repo.price_history(id)?;
        if !print_json(cli, &serde_json::json!({ "record": record, "priceHistory": history }))? {
            println!("{}", formatter.format_record(&record, &history));
        }
        return Ok(());
    }

    let records = session.repo.list_catalog_records(
        args.category.as_deref(),
        args.search.as_deref(),
        Some(args.limit),
    )?;
    if !print_json(cli, &records)? {
        println!("{}", formatter.format_products(&records));
    }
    Ok(())
}

/// Runs the stats command.
pub fn stats(cli: &Cli) -> Result<()> {
    let session = Session::open(cli)?;
    let stats = session.repo.catalog_stats()?;
    if !print_json(cli, &stats)? {
        println!("{}", TextFormatter::new(!cli.no_color).format_stats(&stats));
    }
    Ok(())
}

/// Runs the export command.
pub async fn export(args: &ExportArgs, cli: &Cli) -> Result<()> {
    let session = Session::open(cli)?;
    let export = session.repo.export()?;
    save_json(&args.output, &export)
        .await
        .with_context(|| format!("writing {}", args.output.display()))?;
    info!(
        path = %args.output.display(),
        records = export.records.len(),
        recipes = export.recipes.len(),
        "Exported catalog"
    );

    let summary = serde_json::json!({
        "path": args.output.display().to_string(),
        "records": export.records.len(),
        "recipes": export.recipes.len(),
    });
    if !print_json(cli, &summary)? && !cli.quiet {
        println!(
            "Exported {} records and {} recipes to {}",
            export.records.len(),
            export.recipes.len(),
            args.output.display()
        );
    }
    Ok(())
}
