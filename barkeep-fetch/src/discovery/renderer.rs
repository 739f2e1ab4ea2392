//! Page rendering seam for endpoint discovery.
//!
//! A [`PageRenderer`] plays the role of a controlled browser: it loads the
//! target page, performs one [`Interaction`], and reports the network
//! exchanges that interaction caused.
//!
//! [`HttpPageRenderer`] is the shipped implementation. It has no script
//! engine; instead it reads the search-client configuration the page embeds
//! in inline script (endpoint URI, access token, pipeline) and replays each
//! interaction as the request the page's own script would send.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::agents::UserAgentPool;
use crate::descriptor::{HttpMethod, SearchRequest};
use crate::error::DiscoveryError;
use crate::host::http::{HttpClient, HttpResponse};
use crate::pacer::Pacer;

/// Results requested by replayed listing interactions.
const INTERACTION_PAGE_SIZE: usize = 24;

// ============================================================================
// Interaction
// ============================================================================

/// A simulated user action on the target page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    /// Initial page load.
    Load,
    /// Scroll to the bottom, loading the next page of results.
    Scroll,
    /// Type a term into the search box.
    Search(String),
    /// Open the category menu and pick a category.
    OpenCategoryMenu(String),
}

impl fmt::Display for Interaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load => f.write_str("load"),
            Self::Scroll => f.write_str("scroll"),
            Self::Search(term) => write!(f, "search '{term}'"),
            Self::OpenCategoryMenu(category) => write!(f, "open category '{category}'"),
        }
    }
}

// ============================================================================
// Observed traffic
// ============================================================================

/// One request/response pair observed during an interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedExchange {
    /// Outbound request.
    pub request: SearchRequest,
    /// Response received.
    pub response: HttpResponse,
}

/// Result of rendering a page and performing one interaction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderedPage {
    /// Final page URL.
    pub url: String,
    /// Page HTML.
    pub html: String,
    /// Exchanges triggered by the interaction.
    pub exchanges: Vec<ObservedExchange>,
}

/// Controlled browser context used by discovery.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Renders `url`, performs `interaction`, and reports what was observed.
    async fn render(
        &self,
        url: &str,
        interaction: &Interaction,
    ) -> Result<RenderedPage, DiscoveryError>;
}

// ============================================================================
// Script Config
// ============================================================================

/// Search-client settings embedded in page script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptConfig {
    /// REST endpoint of the search service.
    pub rest_uri: Option<String>,
    /// Access token or API key.
    pub access_token: Option<String>,
    /// Query pipeline name.
    pub query_pipeline: Option<String>,
    /// Organization identifier.
    pub organization_id: Option<String>,
}

static REST_URI_RE: LazyLock<Regex> =
    LazyLock::new(|| setting_regex("(?:restUri|searchEndpointUri|searchApiUrl)"));
static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| setting_regex("(?:accessToken|apiKey|searchApiKey)"));
static PIPELINE_RE: LazyLock<Regex> =
    LazyLock::new(|| setting_regex("(?:queryPipeline|pipeline)"));
static ORGANIZATION_RE: LazyLock<Regex> = LazyLock::new(|| setting_regex("organizationId"));

/// Matches `key: 'value'`, `"key": "value"` and `key = "value"`.
fn setting_regex(key_pattern: &str) -> Regex {
    Regex::new(&format!(
        r#"["']?{key_pattern}["']?\s*[:=]\s*["']([^"']+)["']"#
    ))
    .expect("Invalid regex")
}

fn capture_setting(html: &str, re: &Regex) -> Option<String> {
    re.captures(html).map(|c| c[1].to_string())
}

impl ScriptConfig {
    /// Extracts settings from page HTML.
    pub fn extract(html: &str) -> Self {
        Self {
            rest_uri: capture_setting(html, &REST_URI_RE),
            access_token: capture_setting(html, &TOKEN_RE),
            query_pipeline: capture_setting(html, &PIPELINE_RE),
            organization_id: capture_setting(html, &ORGANIZATION_RE),
        }
    }

    /// Returns the search URL the page script would call.
    pub fn search_url(&self) -> Option<String> {
        let rest = self.rest_uri.as_deref()?.trim_end_matches('/');
        let mut url = if rest.to_ascii_lowercase().contains("/search") {
            Url::parse(rest).ok()?
        } else {
            Url::parse(&format!("{rest}/search/v2")).ok()?
        };
        if let Some(org) = &self.organization_id {
            url.query_pairs_mut().append_pair("organizationId", org);
        }
        Some(url.to_string())
    }
}

// ============================================================================
// HTTP Page Renderer
// ============================================================================

#[derive(Debug, Clone)]
struct LoadedPage {
    url: String,
    html: String,
    script: ScriptConfig,
}

/// Renderer that fetches the page over HTTP and replays interactions.
///
/// The page itself is fetched once per renderer and reused for later
/// interactions. Every request waits for a pacer slot.
pub struct HttpPageRenderer {
    http: HttpClient,
    pacer: Arc<Pacer>,
    agents: Arc<UserAgentPool>,
    session: Mutex<Option<LoadedPage>>,
}

impl HttpPageRenderer {
    /// Creates a renderer.
    pub fn new(http: HttpClient, pacer: Arc<Pacer>, agents: Arc<UserAgentPool>) -> Self {
        Self {
            http,
            pacer,
            agents,
            session: Mutex::new(None),
        }
    }

    async fn load(&self, url: &str) -> Result<LoadedPage, DiscoveryError> {
        let mut session = self.session.lock().await;
        if let Some(page) = session.as_ref().filter(|p| p.url == url) {
            return Ok(page.clone());
        }

        let headers = BTreeMap::from([(
            "accept".to_string(),
            "text/html,application/xhtml+xml".to_string(),
        )]);
        let response = {
            let _slot = self.pacer.wait_for_slot().await;
            self.http.get(url, &headers, self.agents.pick()).await?
        };
        if !response.is_success() {
            return Err(DiscoveryError::Render(format!(
                "{url} returned status {}",
                response.status
            )));
        }

        let script = ScriptConfig::extract(&response.body);
        debug!(
            has_rest_uri = script.rest_uri.is_some(),
            has_token = script.access_token.is_some(),
            "Page loaded"
        );
        let page = LoadedPage {
            url: url.to_string(),
            html: response.body,
            script,
        };
        *session = Some(page.clone());
        Ok(page)
    }

    fn interaction_request(page: &LoadedPage, interaction: &Interaction) -> Option<SearchRequest> {
        let url = page.script.search_url()?;
        let (query, offset, filter) = match interaction {
            Interaction::Load => (String::new(), 0, None),
            Interaction::Scroll => (String::new(), INTERACTION_PAGE_SIZE, None),
            Interaction::Search(term) => (term.clone(), 0, None),
            Interaction::OpenCategoryMenu(category) => (
                String::new(),
                0,
                Some(format!("@ec_category==\"Products|{category}\"")),
            ),
        };

        let mut body = json!({
            "q": query,
            "firstResult": offset,
            "numberOfResults": INTERACTION_PAGE_SIZE,
        });
        if let Some(pipeline) = &page.script.query_pipeline {
            body["pipeline"] = Value::from(pipeline.clone());
        }
        if let Some(filter) = filter {
            body["aq"] = Value::from(filter);
        }

        let mut headers = BTreeMap::from([
            ("content-type".to_string(), "application/json".to_string()),
            ("referer".to_string(), page.url.clone()),
        ]);
        if let Some(origin) = origin_of(&page.url) {
            headers.insert("origin".into(), origin);
        }
        if let Some(token) = &page.script.access_token {
            headers.insert("authorization".into(), format!("Bearer {token}"));
        }

        Some(SearchRequest {
            method: HttpMethod::Post,
            url,
            headers,
            body: Some(body),
        })
    }
}

#[async_trait]
impl PageRenderer for HttpPageRenderer {
    #[instrument(skip(self), fields(interaction = %interaction))]
    async fn render(
        &self,
        url: &str,
        interaction: &Interaction,
    ) -> Result<RenderedPage, DiscoveryError> {
        let page = self.load(url).await?;
        let mut rendered = RenderedPage {
            url: page.url.clone(),
            html: page.html.clone(),
            exchanges: Vec::new(),
        };

        let Some(request) = Self::interaction_request(&page, interaction) else {
            debug!("Page exposes no search client, nothing to replay");
            return Ok(rendered);
        };

        let result = {
            let _slot = self.pacer.wait_for_slot().await;
            self.http.send(&request, self.agents.pick()).await
        };
        match result {
            Ok(response) => rendered.exchanges.push(ObservedExchange { request, response }),
            Err(e) => warn!(error = %e, "Replayed request failed"),
        }
        Ok(rendered)
    }
}

impl fmt::Debug for HttpPageRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpPageRenderer").finish_non_exhaustive()
    }
}

/// Returns `scheme://host[:port]` of a URL.
pub(crate) fn origin_of(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    let origin = url.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}
