//! Paginated category crawl.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use barkeep_core::CatalogRecord;
use futures::stream::{self, Stream};
use tracing::{debug, info, instrument, warn};

use super::parser::{parse_search_response, SearchPage};
use super::transport::SearchTransport;
use crate::cancel::CancelToken;
use crate::context::CrawlContext;
use crate::descriptor::{EndpointDescriptor, PageQuery};
use crate::error::CrawlError;

/// Default records per page.
pub const DEFAULT_PAGE_SIZE: usize = 24;

/// Default cap on the pagination offset.
pub const DEFAULT_MAX_OFFSET: usize = 5000;

/// Default consecutive shape mismatches before the endpoint is stale.
pub const DEFAULT_STALE_THRESHOLD: u32 = 3;

// ============================================================================
// Endpoint Health
// ============================================================================

/// Tracks consecutive shape mismatches against one descriptor.
///
/// Shared across every category crawled with the same descriptor.
#[derive(Debug)]
pub struct EndpointHealth {
    consecutive: AtomicU32,
    threshold: u32,
}

impl EndpointHealth {
    /// Creates a tracker with the given stale threshold (at least 1).
    pub fn new(threshold: u32) -> Self {
        Self {
            consecutive: AtomicU32::new(0),
            threshold: threshold.max(1),
        }
    }

    /// Records a mismatch and returns the consecutive count.
    pub fn record_shape_mismatch(&self) -> u32 {
        self.consecutive.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Records a well-formed response.
    pub fn record_success(&self) {
        self.consecutive.store(0, Ordering::SeqCst);
    }

    /// Returns the consecutive mismatch count.
    pub fn consecutive_mismatches(&self) -> u32 {
        self.consecutive.load(Ordering::SeqCst)
    }

    /// Returns true once the threshold is reached.
    pub fn is_stale(&self) -> bool {
        self.consecutive_mismatches() >= self.threshold
    }

    /// Returns the stale threshold.
    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}

impl Default for EndpointHealth {
    fn default() -> Self {
        Self::new(DEFAULT_STALE_THRESHOLD)
    }
}

// ============================================================================
// Fetcher Config
// ============================================================================

/// Pagination limits for a crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetcherConfig {
    /// Records per page when the caller does not choose.
    pub page_size: usize,
    /// Offset at which pagination stops.
    pub max_offset: usize,
    /// Optional cap on pages per category.
    pub max_pages: Option<usize>,
}

impl FetcherConfig {
    /// Sets the page cap.
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Sets the offset cap.
    #[must_use]
    pub fn with_max_offset(mut self, max_offset: usize) -> Self {
        self.max_offset = max_offset;
        self
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_offset: DEFAULT_MAX_OFFSET,
            max_pages: None,
        }
    }
}

// ============================================================================
// Catalog Fetcher
// ============================================================================

struct PageState {
    offset: usize,
    pages: usize,
    yielded: usize,
    buffer: VecDeque<CatalogRecord>,
    seen: HashSet<String>,
    done: bool,
}

impl PageState {
    fn new() -> Self {
        Self {
            offset: 0,
            pages: 0,
            yielded: 0,
            buffer: VecDeque::new(),
            seen: HashSet::new(),
            done: false,
        }
    }
}

/// Crawls categories through a discovered search endpoint.
pub struct CatalogFetcher {
    descriptor: Arc<EndpointDescriptor>,
    transport: Arc<dyn SearchTransport>,
    ctx: Arc<CrawlContext>,
    config: FetcherConfig,
    health: Arc<EndpointHealth>,
}

impl CatalogFetcher {
    /// Creates a fetcher with default limits.
    pub fn new(
        descriptor: Arc<EndpointDescriptor>,
        transport: Arc<dyn SearchTransport>,
        ctx: Arc<CrawlContext>,
    ) -> Self {
        Self {
            descriptor,
            transport,
            ctx,
            config: FetcherConfig::default(),
            health: Arc::new(EndpointHealth::default()),
        }
    }

    /// Sets pagination limits.
    #[must_use]
    pub fn with_config(mut self, config: FetcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Shares a health tracker.
    #[must_use]
    pub fn with_health(mut self, health: Arc<EndpointHealth>) -> Self {
        self.health = health;
        self
    }

    /// Returns the descriptor in use.
    pub fn descriptor(&self) -> &EndpointDescriptor {
        &self.descriptor
    }

    /// Returns the health tracker.
    pub fn health(&self) -> &Arc<EndpointHealth> {
        &self.health
    }

    /// Returns the pagination limits.
    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Streams every record of a category.
    ///
    /// The stream is finite and always starts at offset 0. It ends after
    /// the first error it yields. `cancel` is observed before each page,
    /// while waiting for a pacer slot and during retry backoff; once it
    /// fires no further request is sent. A page whose response has the wrong shape
    /// is skipped until `stale_threshold` consecutive mismatches, at which
    /// point [`CrawlError::EndpointStale`] is yielded.
    pub fn fetch_category<'a>(
        &'a self,
        category: &str,
        page_size: usize,
        cancel: &CancelToken,
    ) -> impl Stream<Item = Result<CatalogRecord, CrawlError>> + 'a {
        let category = category.to_string();
        let cancel = cancel.clone();
        let page_size = page_size.max(1);

        stream::unfold(PageState::new(), move |mut state| {
            let category = category.clone();
            let cancel = cancel.clone();
            async move {
                loop {
                    if let Some(record) = state.buffer.pop_front() {
                        state.yielded += 1;
                        return Some((Ok(record), state));
                    }
                    if state.done {
                        info!(
                            %category,
                            records = state.yielded,
                            pages = state.pages,
                            "Category crawl finished"
                        );
                        return None;
                    }
                    if let Some(err) = self.before_dispatch(&cancel) {
                        state.done = true;
                        return Some((Err(err), state));
                    }

                    let result = self
                        .fetch_page(&category, state.offset, page_size, &cancel)
                        .await;
                    state.pages += 1;
                    match result {
                        Ok(page) => {
                            self.health.record_success();
                            self.advance(&mut state, page, page_size);
                        }
                        Err(CrawlError::ShapeMismatch(e)) => {
                            let consecutive = self.health.record_shape_mismatch();
                            if consecutive >= self.health.threshold() {
                                warn!(consecutive, "Endpoint stale");
                                state.done = true;
                                return Some((Err(CrawlError::EndpointStale { consecutive }), state));
                            }
                            warn!(
                                error = %e,
                                offset = state.offset,
                                consecutive,
                                "Skipping page with unexpected shape"
                            );
                            state.offset += page_size;
                            state.done = self.limits_reached(&state);
                        }
                        Err(err) => {
                            state.done = true;
                            return Some((Err(err), state));
                        }
                    }
                }
            }
        })
    }

    fn before_dispatch(&self, cancel: &CancelToken) -> Option<CrawlError> {
        if cancel.is_cancelled() {
            info!("Crawl cancelled before next page");
            return Some(CrawlError::Cancelled);
        }
        if self.health.is_stale() {
            return Some(CrawlError::EndpointStale {
                consecutive: self.health.consecutive_mismatches(),
            });
        }
        None
    }

    fn advance(&self, state: &mut PageState, page: SearchPage, page_size: usize) {
        let fresh: Vec<CatalogRecord> = page
            .records
            .into_iter()
            .filter(|r| state.seen.insert(r.external_id.clone()))
            .collect();
        debug!(
            offset = state.offset,
            items = page.item_count,
            fresh = fresh.len(),
            total = ?page.total_count,
            "Page parsed"
        );
        state.buffer.extend(fresh);

        if page.item_count == 0 {
            state.done = true;
            return;
        }
        state.offset += page.item_count;
        let exhausted = match page.total_count {
            Some(total) => state.offset >= total,
            None => page.item_count < page_size,
        };
        state.done = exhausted || self.limits_reached(state);
    }

    fn limits_reached(&self, state: &PageState) -> bool {
        if state.offset >= self.config.max_offset {
            info!(offset = state.offset, "Maximum offset reached");
            return true;
        }
        self.config.max_pages.is_some_and(|max| state.pages >= max)
    }

    #[instrument(skip(self, cancel), fields(descriptor = %self.descriptor.base_url))]
    async fn fetch_page(
        &self,
        category: &str,
        offset: usize,
        page_size: usize,
        cancel: &CancelToken,
    ) -> Result<SearchPage, CrawlError> {
        let request = self
            .descriptor
            .build_request(&PageQuery::category(category, offset, page_size));
        let shape = &self.descriptor.response_shape;
        let transport = &self.transport;
        let request = &request;

        self.ctx
            .call_until_cancelled(cancel, || async move {
                let body = transport.send(request).await?;
                parse_search_response(&body, shape)
            })
            .await
    }
}

impl std::fmt::Debug for CatalogFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogFetcher")
            .field("base_url", &self.descriptor.base_url)
            .field("config", &self.config)
            .field("health", &self.health)
            .finish_non_exhaustive()
    }
}
