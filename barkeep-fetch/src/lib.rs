// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `Barkeep` Fetch
//!
//! The polite crawling pipeline for the `Barkeep` workspace.
//!
//! This crate collects product data from a retailer that exposes no public
//! API. It includes:
//!
//! ## Politeness
//!
//! - [`pacer::Pacer`] - Randomized spacing between requests and a quiet-hours blackout
//! - [`breaker::CircuitBreaker`] - Rolling-window circuit breaker
//! - [`retry::RetryPolicy`] - Exponential backoff for transient failures
//! - [`agents::UserAgentPool`] - User-agent rotation
//! - [`context::CrawlContext`] - All of the above composed around one call
//! - [`cancel::CancelHandle`] - Stops a crawl at its next suspension point
//!
//! ## Discovery and Crawling
//!
//! - [`discovery::EndpointDiscovery`] - Finds the internal search endpoint
//! - [`descriptor::EndpointDescriptor`] - What discovery found
//! - [`catalog::CatalogFetcher`] - Streams a category's records
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use barkeep_fetch::{CancelToken, CatalogFetcher, CrawlContext, HttpTransport};
//! use futures::StreamExt;
//!
//! let ctx = Arc::new(CrawlContext::default());
//! let transport = HttpTransport::for_descriptor(&descriptor, ctx.agents.clone(), ctx.timeout)?;
//! let fetcher = CatalogFetcher::new(Arc::new(descriptor), Arc::new(transport), ctx);
//!
//! let mut records = Box::pin(fetcher.fetch_category("Spirits", 24, &CancelToken::never()));
//! while let Some(record) = records.next().await {
//!     println!("{}", record?.name);
//! }
//! ```

// Core modules
pub mod agents;
pub mod breaker;
pub mod cancel;
pub mod catalog;
pub mod context;
pub mod descriptor;
pub mod discovery;
pub mod error;
pub mod host;
pub mod pacer;
pub mod retry;

// Re-export key types at crate root

// Errors
pub use error::{AttemptError, CrawlError, DiscoveryError, FailureKind, HttpError};

// Politeness
pub use agents::UserAgentPool;
pub use breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use cancel::{CancelHandle, CancelToken};
pub use context::{CrawlConfig, CrawlContext, CrawlContextBuilder};
pub use pacer::{BlackoutWindow, Clock, Pacer, PacerConfig, PacerSlot, SystemClock};
pub use retry::RetryPolicy;

// Descriptor & Discovery
pub use descriptor::{
    EndpointDescriptor, HttpMethod, PageQuery, PaginationScheme, QueryGrammar, RequestEncoding,
    ResponseShape, SearchRequest,
};
pub use discovery::{
    ApiSignature, DescriptorSource, DiscoveryConfig, EndpointDiscovery, HttpPageRenderer,
    Interaction, PageRenderer,
};

// Catalog
pub use catalog::{
    category_label, CatalogFetcher, EndpointHealth, FetcherConfig, HttpTransport,
    SearchTransport, CATEGORIES,
};

// Host APIs
pub use host::http::{HttpClient, HttpResponse};
