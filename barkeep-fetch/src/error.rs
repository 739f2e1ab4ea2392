//! Crawl error types.
//!
//! Failures are classified once, where they happen, into a [`FailureKind`].
//! Nothing downstream inspects remote error bodies.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

// ============================================================================
// Failure Kind
// ============================================================================

/// Classification of a single failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Timeout, connection reset, 5xx or 429. Worth retrying.
    TransientNetwork,
    /// 4xx or auth rejection. Retrying cannot help.
    PermanentRequest,
    /// The response did not have the expected structure.
    ShapeMismatch,
    /// The crawl was cancelled before the request was sent.
    Cancelled,
}

impl FailureKind {
    /// Returns true if a retry may succeed.
    pub fn is_transient(self) -> bool {
        self == Self::TransientNetwork
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TransientNetwork => "transient network",
            Self::PermanentRequest => "permanent request",
            Self::ShapeMismatch => "shape mismatch",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Attempt Error
// ============================================================================

/// Failure of one attempt at a remote operation.
#[derive(Debug, Clone, Error)]
#[error("{kind} failure: {context}")]
pub struct AttemptError {
    /// What kind of failure this was.
    pub kind: FailureKind,
    /// Human-readable context (URL, status, parser detail).
    pub context: String,
    /// HTTP status, if a response was received.
    pub status: Option<u16>,
    /// Server-requested wait before retrying.
    pub retry_after: Option<Duration>,
}

impl AttemptError {
    fn new(kind: FailureKind, context: impl Into<String>) -> Self {
        Self {
            kind,
            context: context.into(),
            status: None,
            retry_after: None,
        }
    }

    /// Creates a transient failure.
    pub fn transient(context: impl Into<String>) -> Self {
        Self::new(FailureKind::TransientNetwork, context)
    }

    /// Creates a permanent failure.
    pub fn permanent(context: impl Into<String>) -> Self {
        Self::new(FailureKind::PermanentRequest, context)
    }

    /// Creates a shape-mismatch failure.
    pub fn shape(context: impl Into<String>) -> Self {
        Self::new(FailureKind::ShapeMismatch, context)
    }

    /// Creates a cancellation; the attempt was never dispatched.
    pub fn cancelled(context: impl Into<String>) -> Self {
        Self::new(FailureKind::Cancelled, context)
    }

    /// Classifies a non-success HTTP status.
    ///
    /// 408, 429 and 5xx are transient; every other status is permanent.
    pub fn from_status(status: u16, context: impl Into<String>) -> Self {
        let kind = if status == 408 || status == 429 || status >= 500 {
            FailureKind::TransientNetwork
        } else {
            FailureKind::PermanentRequest
        };
        Self {
            kind,
            context: context.into(),
            status: Some(status),
            retry_after: None,
        }
    }

    /// Attaches a server-provided retry delay.
    #[must_use]
    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }
}

impl From<reqwest::Error> for AttemptError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::from_status(status.as_u16(), err.to_string());
        }
        if err.is_decode() {
            return Self::shape(err.to_string());
        }
        if err.is_builder() || err.is_redirect() {
            return Self::permanent(err.to_string());
        }
        // timeouts, connect failures, resets and body errors
        Self::transient(err.to_string())
    }
}

impl From<HttpError> for AttemptError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Request(e) => e.into(),
            HttpError::Timeout => Self::transient("request timed out"),
            other @ (HttpError::DomainNotAllowed(_) | HttpError::InvalidUrl(_)) => {
                Self::permanent(other.to_string())
            }
        }
    }
}

// ============================================================================
// Crawl Error
// ============================================================================

/// Error surfaced by the crawling pipeline.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The remote rejected the request; it was not retried.
    #[error("Request rejected: {0}")]
    PermanentRequest(AttemptError),

    /// The response did not match the expected shape.
    #[error("Unexpected response shape: {0}")]
    ShapeMismatch(AttemptError),

    /// The circuit breaker is open; nothing was sent.
    #[error("Circuit open after {attempts} attempt(s); remote considered unhealthy")]
    CircuitOpen {
        /// Attempts already made for this operation.
        attempts: u32,
    },

    /// Transient failures persisted through every retry.
    #[error("Crawl failed after {attempts} attempt(s): {last_error}")]
    CrawlFailed {
        /// Number of attempts made.
        attempts: u32,
        /// The final failure.
        last_error: AttemptError,
    },

    /// Too many consecutive shape mismatches; rediscover the endpoint.
    #[error("Endpoint stale after {consecutive} consecutive shape mismatches")]
    EndpointStale {
        /// Consecutive mismatches observed.
        consecutive: u32,
    },

    /// The crawl was cancelled before the next request was sent.
    #[error("Crawl cancelled")]
    Cancelled,

    /// The endpoint could not be discovered.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}

impl CrawlError {
    /// Returns true if the remote may recover without rediscovery.
    pub fn is_recoverable_later(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. } | Self::CrawlFailed { .. })
    }
}

// ============================================================================
// Discovery Error
// ============================================================================

/// Error type for endpoint discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// No exchange matching the search-API signature was observed.
    #[error("No search endpoint found on {target} after {interactions} interaction(s)")]
    EndpointNotFound {
        /// Page that was inspected.
        target: String,
        /// Interactions performed.
        interactions: usize,
    },

    /// The page could not be rendered.
    #[error("Render failed: {0}")]
    Render(String),

    /// HTTP error while rendering.
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// Invalid target URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

// ============================================================================
// HTTP Error
// ============================================================================

/// HTTP-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Request error.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Domain not allowed.
    #[error("Domain not allowed: {0}")]
    DomainNotAllowed(String),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Timeout.
    #[error("Request timed out")]
    Timeout,
}
