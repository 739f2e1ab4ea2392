// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! Barkeep CLI - liquor catalog crawling and cocktail costing from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Create the database
//! barkeep init
//!
//! # Discover the search endpoint and cache it
//! barkeep discover
//!
//! # Crawl one category, or all of them
//! barkeep crawl spirits --max-pages 5
//! barkeep crawl-all
//!
//! # Load the default cocktails and cost one
//! barkeep recipe load-defaults
//! barkeep cost "Moscow Mule" --tier cheapest
//! barkeep cost Negroni --all-tiers --format json --pretty
//!
//! # Explain the matches behind a cost
//! barkeep verify Negroni
//! ```

mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use barkeep_core::CoreError;
use barkeep_fetch::{CrawlError, DiscoveryError};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{catalog, cost, crawl, discover, init, recipe, verify};

// ============================================================================
// CLI Definition
// ============================================================================

/// Barkeep CLI - liquor catalog crawler and cocktail cost calculator.
#[derive(Parser)]
#[command(name = "barkeep")]
#[command(about = "Liquor catalog crawler and cocktail cost calculator")]
#[command(long_about = r#"
Barkeep politely crawls a liquor retailer's product catalog into a local
SQLite database and prices cocktail recipes against it.

Crawling is paced (2-5 s between requests by default), avoids a daily
quiet window, and stops when the remote looks unhealthy.

Configuration comes from the environment:
  MIN_REQUEST_DELAY / MAX_REQUEST_DELAY   Seconds between requests
  MAX_RETRIES                             Retries for transient failures
  AVOID_HOURS_START / AVOID_HOURS_END     Local quiet window (hours)
  ROTATE_USER_AGENTS                      true / false
  BARKEEP_DATABASE                        SQLite path
  RUST_LOG                                Log filter

Examples:
  barkeep init                       # Create the database
  barkeep crawl spirits              # Crawl one category
  barkeep recipe load-defaults       # Load classic cocktails
  barkeep cost Negroni --all-tiers   # Cost at every tier
"#)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// SQLite database path (overrides BARKEEP_DATABASE).
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Create the database and show where data lives.
    Init,

    /// Discover the catalog search endpoint and cache it.
    Discover(discover::DiscoverArgs),

    /// Crawl one category into the database.
    Crawl(crawl::CrawlArgs),

    /// Crawl every category into the database.
    CrawlAll(crawl::CrawlAllArgs),

    /// List catalog records.
    #[command(visible_alias = "p")]
    Products(catalog::ProductsArgs),

    /// Show catalog statistics.
    Stats,

    /// Export the catalog and recipes as JSON.
    Export(catalog::ExportArgs),

    /// Manage recipes.
    Recipe(recipe::RecipeArgs),

    /// Cost a recipe against the catalog.
    #[command(visible_alias = "c")]
    Cost(cost::CostArgs),

    /// Show which products an ingredient matches and why.
    Verify(verify::VerifyArgs),

    /// Show stored cost calculations for a recipe.
    History(cost::HistoryArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// The circuit breaker is open.
    CircuitOpen = 2,
    /// Transient failures outlasted every retry.
    CrawlFailed = 3,
    /// The remote rejected a request.
    PermanentRequest = 4,
    /// The cached endpoint no longer matches; rediscover.
    EndpointStale = 5,
    /// Discovery found no search endpoint.
    EndpointNotFound = 6,
    /// A named recipe or record does not exist.
    NotFound = 7,
    /// Interrupted.
    Cancelled = 130,
}

impl ExitCode {
    /// Maps an error to the exit code for its most specific cause.
    pub fn for_error(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if let Some(crawl) = cause.downcast_ref::<CrawlError>() {
                return match crawl {
                    CrawlError::CircuitOpen { .. } => Self::CircuitOpen,
                    CrawlError::CrawlFailed { .. } => Self::CrawlFailed,
                    CrawlError::PermanentRequest(_) | CrawlError::ShapeMismatch(_) => {
                        Self::PermanentRequest
                    }
                    CrawlError::EndpointStale { .. } => Self::EndpointStale,
                    CrawlError::Cancelled => Self::Cancelled,
                    CrawlError::Discovery(DiscoveryError::EndpointNotFound { .. }) => {
                        Self::EndpointNotFound
                    }
                    CrawlError::Discovery(_) => Self::Error,
                };
            }
            if let Some(DiscoveryError::EndpointNotFound { .. }) = cause.downcast_ref() {
                return Self::EndpointNotFound;
            }
            if cause
                .downcast_ref::<CoreError>()
                .is_some_and(CoreError::is_not_found)
            {
                return Self::NotFound;
            }
        }
        Self::Error
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let default = if verbose { "barkeep=debug,info" } else { "barkeep=info,warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let code = match run(&cli).await {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {e:#}");
            }
            ExitCode::for_error(&e)
        }
    };

    if code != ExitCode::Success {
        std::process::exit(code as i32);
    }
}

async fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Init => init::run(cli).await,
        Commands::Discover(args) => discover::run(args, cli).await,
        Commands::Crawl(args) => crawl::run(args, cli).await,
        Commands::CrawlAll(args) => crawl::run_all(args, cli).await,
        Commands::Products(args) => catalog::products(args, cli),
        Commands::Stats => catalog::stats(cli),
        Commands::Export(args) => catalog::export(args, cli).await,
        Commands::Recipe(args) => recipe::run(args, cli).await,
        Commands::Cost(args) => cost::run(args, cli),
        Commands::Verify(args) => verify::run(args, cli),
        Commands::History(args) => cost::history(args, cli),
    }
}
