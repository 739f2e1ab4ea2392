//! Host APIs for the crawling pipeline.
//!
//! - [`http`] - HTTP client with tracing and domain allowlist

pub mod http;

// Re-export key types
pub use http::{HttpClient, HttpResponse};
