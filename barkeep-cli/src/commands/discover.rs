//! Discover command - find the catalog search endpoint and cache it.

use std::sync::Arc;

use anyhow::{Context, Result};
use barkeep_fetch::{
    CrawlContext, DescriptorSource, EndpointDescriptor, EndpointDiscovery, HttpClient,
    HttpPageRenderer,
};
use barkeep_store::CrawlSettings;
use clap::Args;
use serde::Serialize;
use tracing::{info, warn};

use super::{descriptor_cache, print_json, settings};
use crate::output::TextFormatter;
use crate::Cli;

/// Arguments for the discover command.
#[derive(Args)]
pub struct DiscoverArgs {
    /// Listing page to inspect (overrides BARKEEP_TARGET_URL).
    #[arg(long)]
    pub target: Option<String>,

    /// Only show the cached descriptor; do not contact the site.
    #[arg(long, conflicts_with = "clear")]
    pub cached: bool,

    /// Delete the cached descriptor.
    #[arg(long)]
    pub clear: bool,
}

/// JSON shape of a descriptor report.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptorOutput<'a> {
    pub source: &'static str,
    pub descriptor: &'a EndpointDescriptor,
}

/// Labels a descriptor source for output.
pub fn source_label(source: DescriptorSource) -> &'static str {
    match source {
        DescriptorSource::Discovered => "discovered",
        DescriptorSource::Cached => "cached",
    }
}

/// Runs the discover command.
pub async fn run(args: &DiscoverArgs, cli: &Cli) -> Result<()> {
    let mut settings = settings(cli);
    if let Some(target) = &args.target {
        settings.target_url.clone_from(target);
    }
    let cache = descriptor_cache(&settings);

    if args.clear {
        let removed = cache.clear().await?;
        if !cli.quiet {
            println!(
                "{}",
                if removed { "Cached descriptor removed" } else { "No cached descriptor" }
            );
        }
        return Ok(());
    }

    let (descriptor, source) = if args.cached {
        let descriptor = cache
            .load()
            .await
            .context("no cached descriptor; run `barkeep discover`")?;
        (descriptor, DescriptorSource::Cached)
    } else {
        let ctx = CrawlContext::new(settings.crawl_config());
        resolve_descriptor(&settings, &ctx, true).await?
    };

    let output = DescriptorOutput {
        source: source_label(source),
        descriptor: &descriptor,
    };
    if print_json(cli, &output)? {
        return Ok(());
    }
    let formatter = TextFormatter::new(!cli.no_color);
    println!("{}", formatter.format_descriptor(&descriptor, source));
    Ok(())
}

/// Returns a descriptor for crawling.
///
/// Uses the cache unless `rediscover` is set. A fresh discovery is cached;
/// if it fails, the cached descriptor is used when there is one.
pub async fn resolve_descriptor(
    settings: &CrawlSettings,
    ctx: &CrawlContext,
    rediscover: bool,
) -> Result<(EndpointDescriptor, DescriptorSource)> {
    let cache = descriptor_cache(settings);
    let cached = cache.load().await;

    if !rediscover {
        if let Some(descriptor) = cached {
            info!(base_url = %descriptor.base_url, "Using cached endpoint descriptor");
            return Ok((descriptor, DescriptorSource::Cached));
        }
    }

    let http = HttpClient::with_timeout(ctx.timeout)?;
    let renderer = HttpPageRenderer::new(http, ctx.pacer.clone(), ctx.agents.clone());
    let discovery = EndpointDiscovery::new(Arc::new(renderer), settings.discovery_config());

    let (descriptor, source) = discovery.discover_or_cached(cached).await?;
    if source == DescriptorSource::Discovered {
        if let Err(e) = cache.save(&descriptor).await {
            warn!(error = %e, "Failed to cache endpoint descriptor");
        }
    }
    Ok((descriptor, source))
}
