//! Crawl commands - pull catalog categories into the database.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use barkeep_fetch::{
    category_label, CancelHandle, CatalogFetcher, CrawlContext, CrawlError, EndpointHealth,
    HttpTransport, CATEGORIES,
};
use barkeep_store::{ingest_stream, IngestReport};
use clap::Args;
use serde::Serialize;
use tracing::{info, warn};

use super::discover::{resolve_descriptor, source_label};
use super::{descriptor_cache, print_json, Session};
use crate::output::TextFormatter;
use crate::Cli;

/// Arguments for the crawl command.
#[derive(Args)]
pub struct CrawlArgs {
    /// Category slug or label (wine, beer-cider, spirits, coolers, non-alcoholic).
    pub category: String,

    /// Stop after this many pages.
    #[arg(long, short = 'p')]
    pub max_pages: Option<usize>,

    /// Records per page (overrides BARKEEP_PAGE_SIZE).
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Rediscover the endpoint instead of using the cached descriptor.
    #[arg(long)]
    pub rediscover: bool,
}

/// Arguments for the crawl-all command.
#[derive(Args)]
pub struct CrawlAllArgs {
    /// Only these categories (repeatable). Defaults to every category.
    #[arg(long = "category", short = 'c')]
    pub categories: Vec<String>,

    /// Stop each category after this many pages.
    #[arg(long, short = 'p')]
    pub max_pages: Option<usize>,

    /// Rediscover the endpoint instead of using the cached descriptor.
    #[arg(long)]
    pub rediscover: bool,
}

/// JSON shape of one category's crawl.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlOutput {
    pub category: String,
    pub seen: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&IngestReport> for CrawlOutput {
    fn from(report: &IngestReport) -> Self {
        Self {
            category: report.category.clone(),
            seen: report.seen,
            changed: report.changed,
            unchanged: report.unchanged,
            complete: report.is_complete(),
            error: report.stopped.as_ref().map(ToString::to_string),
        }
    }
}

/// Resolves category names to labels, rejecting unknown ones.
pub fn resolve_categories(names: &[String]) -> Result<Vec<&'static str>> {
    if names.is_empty() {
        return Ok(CATEGORIES.iter().map(|(_, label)| *label).collect());
    }
    names
        .iter()
        .map(|name| {
            category_label(name).with_context(|| {
                let known: Vec<&str> = CATEGORIES.iter().map(|(slug, _)| *slug).collect();
                format!("unknown category '{name}' (known: {})", known.join(", "))
            })
        })
        .collect()
}

/// Whether a crawl-all run should move on to the next category after `err`.
fn continue_after(err: &CrawlError) -> bool {
    matches!(
        err,
        CrawlError::CrawlFailed { .. } | CrawlError::PermanentRequest(_)
    )
}

/// Runs the crawl command.
pub async fn run(args: &CrawlArgs, cli: &Cli) -> Result<()> {
    let labels = resolve_categories(std::slice::from_ref(&args.category))?;
    let reports = crawl(cli, &labels, args.max_pages, args.page_size, args.rediscover).await?;
    finish(cli, reports)
}

/// Runs the crawl-all command.
pub async fn run_all(args: &CrawlAllArgs, cli: &Cli) -> Result<()> {
    let labels = resolve_categories(&args.categories)?;
    let reports = crawl(cli, &labels, args.max_pages, None, args.rediscover).await?;
    finish(cli, reports)
}

async fn crawl(
    cli: &Cli,
    labels: &[&str],
    max_pages: Option<usize>,
    page_size: Option<usize>,
    rediscover: bool,
) -> Result<Vec<IngestReport>> {
    let session = Session::open(cli)?;
    let settings = &session.settings;
    let ctx = Arc::new(CrawlContext::new(settings.crawl_config()));

    let (descriptor, source) = resolve_descriptor(settings, &ctx, rediscover).await?;
    info!(base_url = %descriptor.base_url, source = source_label(source), "Endpoint ready");

    let transport = HttpTransport::for_descriptor(&descriptor, ctx.agents.clone(), ctx.timeout)?;
    let fetcher = CatalogFetcher::new(Arc::new(descriptor), Arc::new(transport), ctx.clone())
        .with_config(settings.fetcher_config().with_max_pages(max_pages))
        .with_health(Arc::new(EndpointHealth::new(settings.stale_threshold)));
    let page_size = page_size.unwrap_or(fetcher.config().page_size);

    let cancel = Arc::new(CancelHandle::new());
    let listener = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted; stopping before the next page");
                cancel.cancel();
            }
        })
    };

    let mut reports = Vec::with_capacity(labels.len());
    for label in labels {
        let token = cancel.token();
        let records = fetcher.fetch_category(label, page_size, &token);
        let report = ingest_stream(&session.repo, label, records).await?;

        let stop = report.stopped.as_ref().is_some_and(|e| !continue_after(e));
        if let Some(CrawlError::EndpointStale { .. }) = &report.stopped {
            descriptor_cache(settings).clear().await?;
            warn!("Endpoint descriptor is stale and was cleared; run `barkeep discover`");
        }
        reports.push(report);
        if stop {
            break;
        }
    }
    listener.abort();

    Ok(reports)
}

/// Prints reports and turns the first crawl error into the command's error.
fn finish(cli: &Cli, mut reports: Vec<IngestReport>) -> Result<()> {
    let outputs: Vec<CrawlOutput> = reports.iter().map(CrawlOutput::from).collect();
    if !print_json(cli, &outputs)? && !cli.quiet {
        let formatter = TextFormatter::new(!cli.no_color);
        for report in &reports {
            println!("{}", formatter.format_crawl_report(report));
        }
        if reports.len() > 1 {
            let total: usize = reports.iter().map(|r| r.seen).sum();
            let changed: usize = reports.iter().map(|r| r.changed).sum();
            println!();
            println!("Crawl complete: {total} records, {changed} new or changed");
        }
    }

    match reports.iter_mut().find_map(|r| r.stopped.take()) {
        Some(err) => Err(err.into()),
        None if reports.is_empty() => bail!("nothing was crawled"),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use barkeep_fetch::AttemptError;

    #[test]
    fn test_resolve_categories() {
        assert_eq!(resolve_categories(&[]).unwrap().len(), CATEGORIES.len());
        assert_eq!(
            resolve_categories(&["spirits".into(), "Beer & Cider".into()]).unwrap(),
            vec!["Spirits", "Beer & Cider"]
        );
        let err = resolve_categories(&["sake".into()]).unwrap_err();
        assert!(err.to_string().contains("unknown category 'sake'"));
    }

    #[test]
    fn test_continue_after() {
        assert!(continue_after(&CrawlError::CrawlFailed {
            attempts: 4,
            last_error: AttemptError::transient("timeout"),
        }));
        assert!(!continue_after(&CrawlError::CircuitOpen { attempts: 0 }));
        assert!(!continue_after(&CrawlError::EndpointStale { consecutive: 3 }));
        assert!(!continue_after(&CrawlError::Cancelled));
    }

    #[test]
    fn test_crawl_output_from_report() {
        let mut report = IngestReport::new("Wine");
        report.seen = 10;
        report.changed = 4;
        report.unchanged = 6;
        report.stopped = Some(CrawlError::Cancelled);

        let output = CrawlOutput::from(&report);
        assert!(!output.complete);
        assert_eq!(output.error.as_deref(), Some("Crawl cancelled"));
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["seen"], 10);
    }
}
