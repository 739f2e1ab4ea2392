//! Init command - create the database and show where data lives.

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use super::{descriptor_cache, print_json, Session};
use crate::output::TextFormatter;
use crate::Cli;

/// What `init` reports.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitOutput<'a> {
    pub database: String,
    pub descriptor_cache: String,
    pub descriptor_cached: bool,
    pub settings: &'a barkeep_store::CrawlSettings,
}

/// Runs the init command.
pub async fn run(cli: &Cli) -> Result<()> {
    let session = Session::open(cli)?;
    let cache = descriptor_cache(&session.settings);
    let descriptor_cached = cache.load().await.is_some();
    info!(database = %session.settings.database_path.display(), "Database ready");

    let output = InitOutput {
        database: session.settings.database_path.display().to_string(),
        descriptor_cache: cache.path().display().to_string(),
        descriptor_cached,
        settings: &session.settings,
    };
    if print_json(cli, &output)? {
        return Ok(());
    }

    let formatter = TextFormatter::new(!cli.no_color);
    println!("{}", formatter.format_init(&output));
    Ok(())
}
