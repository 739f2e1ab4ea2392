//! CLI command implementations.

pub mod catalog;
pub mod cost;
pub mod crawl;
pub mod discover;
pub mod init;
pub mod recipe;
pub mod verify;

use anyhow::{Context, Result};
use barkeep_costing::CostCalculator;
use barkeep_store::{CrawlSettings, DescriptorCache, SqliteRepository};
use serde::Serialize;

use crate::output::JsonFormatter;
use crate::{Cli, OutputFormat};

/// Settings and an open repository for one command.
pub struct Session {
    /// Settings read from the environment, with CLI overrides applied.
    pub settings: CrawlSettings,
    /// The catalog database.
    pub repo: SqliteRepository,
}

impl Session {
    /// Reads settings and opens the database.
    pub fn open(cli: &Cli) -> Result<Self> {
        let settings = settings(cli);
        let repo = SqliteRepository::open(&settings.database_path).with_context(|| {
            format!("opening database {}", settings.database_path.display())
        })?;
        Ok(Self { settings, repo })
    }

    /// Returns a calculator configured from the settings.
    pub fn calculator(&self) -> CostCalculator {
        CostCalculator::with_settings(self.settings.cost_settings())
    }
}

/// Reads settings from the environment and applies CLI overrides.
pub fn settings(cli: &Cli) -> CrawlSettings {
    let mut settings = CrawlSettings::from_env();
    if let Some(path) = &cli.database {
        settings.database_path.clone_from(path);
    }
    settings
}

/// Returns the descriptor cache for the settings.
pub fn descriptor_cache(settings: &CrawlSettings) -> DescriptorCache {
    DescriptorCache::new(settings.descriptor_cache_path.clone())
}

/// Prints `value` as JSON if the JSON format was chosen.
///
/// Returns `true` if it printed.
pub fn print_json<T: Serialize>(cli: &Cli, value: &T) -> Result<bool> {
    if cli.format != OutputFormat::Json {
        return Ok(false);
    }
    println!("{}", JsonFormatter::new(cli.pretty).format(value)?);
    Ok(true)
}
