// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Barkeep Store
//!
//! Persistence and configuration for Barkeep.
//!
//! This crate provides:
//!
//! - **SqliteRepository**: The catalog, recipes, price history and cost
//!   calculations in one SQLite file
//! - **Ingest**: Draining crawl streams into the repository
//! - **DescriptorCache**: The last discovered search endpoint, as JSON
//! - **CrawlSettings**: Environment-driven configuration
//!
//! ## Usage
//!
//! ```ignore
//! use barkeep_store::{ingest_stream, CrawlSettings, SqliteRepository};
//!
//! let settings = CrawlSettings::from_env();
//! let repo = SqliteRepository::open(&settings.database_path)?;
//!
//! let report = ingest_stream(&repo, "Spirits", fetcher.fetch_category("Spirits", 24, &cancel)).await?;
//! println!("{} records, {} changed", report.seen, report.changed);
//! ```

pub mod descriptor_cache;
pub mod error;
pub mod ingest;
pub mod persistence;
pub mod settings;
pub mod sqlite;

pub use descriptor_cache::DescriptorCache;
pub use error::StoreError;
pub use ingest::{ingest_record, ingest_stream, IngestReport};
pub use persistence::{
    default_cache_dir, default_data_dir, default_database_path, default_descriptor_path,
    load_json, load_json_opt, save_json,
};
pub use settings::CrawlSettings;
pub use sqlite::{CatalogExport, SqliteRepository};
