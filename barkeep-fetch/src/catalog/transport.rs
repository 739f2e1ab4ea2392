//! Transport seam for search requests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::agents::UserAgentPool;
use crate::descriptor::{EndpointDescriptor, SearchRequest};
use crate::error::{AttemptError, HttpError};
use crate::host::http::HttpClient;

/// Sends one search request and returns the decoded JSON body.
///
/// Implementations classify every failure into an [`AttemptError`]; they do
/// not retry, pace or consult the circuit breaker themselves.
#[async_trait]
pub trait SearchTransport: Send + Sync {
    /// Sends `request`.
    async fn send(&self, request: &SearchRequest) -> Result<Value, AttemptError>;
}

/// [`SearchTransport`] over reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: HttpClient,
    agents: Arc<UserAgentPool>,
}

impl HttpTransport {
    /// Creates a transport restricted to the descriptor's hosts.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn for_descriptor(
        descriptor: &EndpointDescriptor,
        agents: Arc<UserAgentPool>,
        timeout: Duration,
    ) -> Result<Self, HttpError> {
        let http = HttpClient::with_timeout(timeout)?.with_allowed_domains(descriptor.allowed_hosts());
        Ok(Self { http, agents })
    }

    /// Creates a transport from an existing client.
    pub fn new(http: HttpClient, agents: Arc<UserAgentPool>) -> Self {
        Self { http, agents }
    }
}

#[async_trait]
impl SearchTransport for HttpTransport {
    #[instrument(skip(self, request), fields(url = %request.url))]
    async fn send(&self, request: &SearchRequest) -> Result<Value, AttemptError> {
        let response = self.http.send(request, self.agents.pick()).await?;
        if !response.is_success() {
            return Err(AttemptError::from_status(
                response.status,
                format!("{} returned status {}", request.url, response.status),
            )
            .with_retry_after(response.retry_after));
        }

        serde_json::from_str(&response.body).map_err(|e| {
            debug!(error = %e, bytes = response.body.len(), "Response is not JSON");
            AttemptError::shape(format!("response body is not JSON: {e}"))
        })
    }
}
