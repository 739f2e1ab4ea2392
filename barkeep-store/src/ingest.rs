//! Persisting crawled records.
//!
//! A record is upserted on every sighting, but price history only grows
//! when the record is new or one of its prices moved. Re-ingesting an
//! unchanged catalog therefore leaves history untouched.

use barkeep_core::{CatalogRecord, CatalogRepository, PriceHistoryEntry};
use barkeep_fetch::CrawlError;
use futures::{pin_mut, Stream, StreamExt};
use tracing::{debug, info, instrument, warn};

use crate::error::StoreError;

/// Outcome of ingesting one category stream.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Category that was crawled.
    pub category: String,
    /// Records received from the stream.
    pub seen: usize,
    /// Records that were new or changed price.
    pub changed: usize,
    /// Records whose prices were unchanged.
    pub unchanged: usize,
    /// Crawl error that ended the stream early, if any.
    pub stopped: Option<CrawlError>,
}

impl IngestReport {
    /// Creates an empty report for a category.
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            ..Self::default()
        }
    }

    /// Returns true if the stream ran to completion.
    pub fn is_complete(&self) -> bool {
        self.stopped.is_none()
    }
}

/// Upserts one record and appends a price observation if it changed.
///
/// Returns whether the record was new or changed.
///
/// # Errors
///
/// Returns an error if the repository rejects the write.
pub fn ingest_record<R>(repo: &R, record: &CatalogRecord) -> Result<bool, StoreError>
where
    R: CatalogRepository + ?Sized,
{
    let mut record = record.clone();
    record.normalize_prices();

    let changed = repo.upsert_catalog_record(&record)?;
    if changed {
        if let Some(entry) = PriceHistoryEntry::from_record(&record) {
            repo.append_price_history(&entry)?;
        } else {
            debug!(external_id = %record.external_id, "No price to record");
        }
    }
    Ok(changed)
}

/// Drains a crawl stream into the repository.
///
/// Crawl errors end the stream and are kept in the report; records already
/// persisted stay persisted. Repository errors abort immediately.
///
/// # Errors
///
/// Returns an error if a write fails.
#[instrument(skip(repo, records))]
pub async fn ingest_stream<R, S>(
    repo: &R,
    category: &str,
    records: S,
) -> Result<IngestReport, StoreError>
where
    R: CatalogRepository + ?Sized,
    S: Stream<Item = Result<CatalogRecord, CrawlError>>,
{
    let mut report = IngestReport::new(category);
    pin_mut!(records);

    while let Some(item) = records.next().await {
        match item {
            Ok(record) => {
                report.seen += 1;
                if ingest_record(repo, &record)? {
                    report.changed += 1;
                } else {
                    report.unchanged += 1;
                }
            }
            Err(err) => {
                warn!(error = %err, seen = report.seen, "Crawl stopped early");
                report.stopped = Some(err);
                break;
            }
        }
    }

    info!(
        seen = report.seen,
        changed = report.changed,
        unchanged = report.unchanged,
        complete = report.is_complete(),
        "Ingested category"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::SqliteRepository;
    use futures::stream;

    fn rum(id: &str, price: f64) -> CatalogRecord {
        CatalogRecord::new(id, format!("Rum {id}"))
            .with_category("Spirits")
            .with_subcategory("Rum")
            .with_price(price)
    }

    #[tokio::test]
    async fn test_reingest_adds_no_history() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        let batch = || stream::iter(vec![Ok(rum("r1", 20.0)), Ok(rum("r2", 25.0))]);

        let first = ingest_stream(&repo, "Spirits", batch()).await.unwrap();
        assert_eq!(first.changed, 2);
        let second = ingest_stream(&repo, "Spirits", batch()).await.unwrap();
        assert_eq!(second.changed, 0);
        assert_eq!(second.unchanged, 2);

        assert_eq!(repo.price_history("r1").unwrap().len(), 1);
        assert_eq!(repo.catalog_stats().unwrap().price_history_entries, 2);
    }

    #[tokio::test]
    async fn test_price_change_appends_history() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        ingest_record(&repo, &rum("r1", 20.0)).unwrap();
        assert!(ingest_record(&repo, &rum("r1", 18.0)).unwrap());

        let history = repo.price_history("r1").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].price, 18.0);
    }

    #[tokio::test]
    async fn test_stream_error_keeps_progress() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        let records = stream::iter(vec![
            Ok(rum("r1", 20.0)),
            Err(CrawlError::Cancelled),
            Ok(rum("r2", 25.0)),
        ]);

        let report = ingest_stream(&repo, "Spirits", records).await.unwrap();
        assert_eq!(report.seen, 1);
        assert!(matches!(report.stopped, Some(CrawlError::Cancelled)));
        assert!(repo.get_catalog_record("r1").unwrap().is_some());
        assert!(repo.get_catalog_record("r2").unwrap().is_none());
    }

    #[test]
    fn test_unpriced_record_has_no_history() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        let record = CatalogRecord::new("x", "Mystery Bottle");
        assert!(ingest_record(&repo, &record).unwrap());
        assert!(repo.price_history("x").unwrap().is_empty());
    }
}
