//! HTTP client with tracing and domain allowlist.
//!
//! This module provides a wrapped HTTP client that adds:
//! - Request/response tracing
//! - Domain allowlist so a crawl never wanders off the retailer
//! - Per-request user agents
//! - Fully buffered responses the classifiers can inspect

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::{header, Client, Response};
use tracing::{debug, instrument};
use url::Url;

use crate::descriptor::{HttpMethod, SearchRequest};
use crate::error::HttpError;

/// Default request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// HTTP Response
// ============================================================================

/// A fully read HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// `Content-Type` header, if present.
    pub content_type: Option<String>,
    /// `Retry-After` header in seconds, if present.
    pub retry_after: Option<Duration>,
    /// Response body.
    pub body: String,
}

impl HttpResponse {
    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns true if the content type is JSON.
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"))
    }
}

// ============================================================================
// HTTP Client
// ============================================================================

/// HTTP client wrapper with tracing and domain allowlist.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    allowed_domains: Option<Vec<String>>,
}

impl HttpClient {
    /// Creates a new HTTP client with default settings.
    ///
    /// # Errors
    ///
    /// Fails if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, HttpError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a new HTTP client with a custom timeout.
    ///
    /// # Errors
    ///
    /// Fails if the TLS backend cannot be initialized.
    pub fn with_timeout(timeout: Duration) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            inner: client,
            allowed_domains: None,
        })
    }

    /// Restricts requests to the given domains and their subdomains.
    #[must_use]
    pub fn with_allowed_domains(mut self, domains: Vec<String>) -> Self {
        self.allowed_domains = Some(domains);
        self
    }

    /// Checks if a URL's domain is allowed.
    fn is_domain_allowed(&self, url: &str) -> Result<(), HttpError> {
        let parsed = Url::parse(url).map_err(|e| HttpError::InvalidUrl(e.to_string()))?;

        let Some(ref allowed) = self.allowed_domains else {
            return Ok(()); // No restrictions
        };

        let host = parsed
            .host_str()
            .ok_or_else(|| HttpError::InvalidUrl("No host in URL".to_string()))?;

        let allowed = allowed
            .iter()
            .any(|domain| host == domain || host.ends_with(&format!(".{domain}")));

        if allowed {
            Ok(())
        } else {
            Err(HttpError::DomainNotAllowed(host.to_string()))
        }
    }

    /// Performs a GET request for a page.
    #[instrument(skip(self, headers, user_agent), fields(url = %url))]
    pub async fn get(
        &self,
        url: &str,
        headers: &BTreeMap<String, String>,
        user_agent: &str,
    ) -> Result<HttpResponse, HttpError> {
        self.is_domain_allowed(url)?;
        debug!("GET request");

        let mut builder = self
            .inner
            .get(url)
            .header(header::USER_AGENT, user_agent);
        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        capture(builder.send().await?).await
    }

    /// Sends a search request.
    #[instrument(skip(self, request, user_agent), fields(method = %request.method, url = %request.url))]
    pub async fn send(
        &self,
        request: &SearchRequest,
        user_agent: &str,
    ) -> Result<HttpResponse, HttpError> {
        self.is_domain_allowed(&request.url)?;
        debug!("Search request");

        let mut builder = match request.method {
            HttpMethod::Get => self.inner.get(&request.url),
            HttpMethod::Post => self.inner.post(&request.url),
        }
        .header(header::USER_AGENT, user_agent);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        capture(builder.send().await?).await
    }
}

async fn capture(response: Response) -> Result<HttpResponse, HttpError> {
    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);
    let retry_after = response.retry_after_secs().map(Duration::from_secs);
    debug!(status, "Response received");
    let body = response.text().await?;
    Ok(HttpResponse {
        status,
        content_type,
        retry_after,
        body,
    })
}

// ============================================================================
// Response Extensions
// ============================================================================

/// Extension trait for Response handling.
pub trait ResponseExt {
    /// Check if the response indicates rate limiting.
    fn is_rate_limited(&self) -> bool;

    /// Get the Retry-After header value in seconds.
    fn retry_after_secs(&self) -> Option<u64>;
}

impl ResponseExt for Response {
    fn is_rate_limited(&self) -> bool {
        self.status() == reqwest::StatusCode::TOO_MANY_REQUESTS
    }

    fn retry_after_secs(&self) -> Option<u64> {
        self.headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> HttpClient {
        HttpClient::new().unwrap()
    }

    #[test]
    fn test_domain_allowlist() {
        let client = client().with_allowed_domains(vec![
            "lcbo.com".to_string(),
            "platform.cloud.coveo.com".to_string(),
        ]);

        assert!(client.is_domain_allowed("https://lcbo.com/en/products").is_ok());
        assert!(client
            .is_domain_allowed("https://platform.cloud.coveo.com/rest/search/v2")
            .is_ok());

        // Subdomain matching
        assert!(client.is_domain_allowed("https://www.lcbo.com/en").is_ok());

        // Not allowed
        assert!(client.is_domain_allowed("https://notlcbo.com/").is_err());
        assert!(client.is_domain_allowed("https://evil.com/steal").is_err());
    }

    #[test]
    fn test_no_domain_restrictions() {
        assert!(client().is_domain_allowed("https://any.domain.com").is_ok());
    }

    #[test]
    fn test_invalid_url() {
        let client = client().with_allowed_domains(vec!["example.com".to_string()]);
        assert!(matches!(
            client.is_domain_allowed("not-a-valid-url"),
            Err(HttpError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_response_json_detection() {
        let response = HttpResponse {
            status: 200,
            content_type: Some("application/json; charset=UTF-8".into()),
            retry_after: None,
            body: "{}".into(),
        };
        assert!(response.is_success());
        assert!(response.is_json());
    }
}
