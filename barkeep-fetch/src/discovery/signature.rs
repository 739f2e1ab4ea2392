//! Search-API signature matching and descriptor extraction.

use std::collections::BTreeMap;

use chrono::Utc;
use serde_json::{Map, Value};
use url::Url;

use super::renderer::{origin_of, ObservedExchange, RenderedPage, ScriptConfig};
use crate::descriptor::{
    EndpointDescriptor, PaginationScheme, QueryGrammar, RequestEncoding, ResponseShape,
    CATEGORY_PLACEHOLDER,
};

/// Spellings of the free-text query parameter.
pub const QUERY_ALIASES: &[&str] = &["q", "query", "searchTerm", "keyword", "text"];
/// Spellings of an offset-style pagination parameter.
pub const OFFSET_ALIASES: &[&str] = &["firstResult", "offset", "start", "from", "skip"];
/// Spellings of a page-index pagination parameter.
pub const PAGE_ALIASES: &[&str] = &["page", "pageNumber", "pageIndex", "p"];
/// Spellings of the page-size parameter.
pub const PAGE_SIZE_ALIASES: &[&str] =
    &["numberOfResults", "limit", "size", "pageSize", "rows", "per_page"];
/// Spellings of the category filter parameter.
pub const CATEGORY_ALIASES: &[&str] = &["aq", "category", "filter", "cq", "fq"];
/// Response fields that may hold the results array.
pub const RESULTS_FIELDS: &[&str] = &["results", "products", "items", "hits", "docs"];
/// Response fields that may hold the total count.
pub const TOTAL_FIELDS: &[&str] = &["totalCount", "total", "totalResults", "nbHits", "count"];
/// Request headers worth carrying into the descriptor.
pub const REQUIRED_HEADER_NAMES: &[&str] =
    &["authorization", "x-api-key", "api-key", "origin", "referer"];

// ============================================================================
// Signature
// ============================================================================

/// What a search-API exchange looks like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSignature {
    /// Substring the request host must contain.
    pub host_contains: String,
    /// Substring the request path must contain.
    pub path_contains: String,
    /// Path substrings that disqualify a request (lowercase).
    pub path_excludes: Vec<String>,
}

impl ApiSignature {
    /// Creates a signature for the given host fragment.
    pub fn new(host_contains: impl Into<String>) -> Self {
        Self {
            host_contains: host_contains.into(),
            path_contains: "search".into(),
            path_excludes: vec!["querysuggest".into(), "facet".into()],
        }
    }

    /// Returns the response shape if `exchange` is a search-API call.
    pub fn matches(&self, exchange: &ObservedExchange) -> Option<ResponseShape> {
        let url = Url::parse(&exchange.request.url).ok()?;
        let host = url.host_str()?.to_ascii_lowercase();
        let path = url.path().to_ascii_lowercase();

        if !host.contains(&self.host_contains.to_ascii_lowercase())
            || !path.contains(&self.path_contains.to_ascii_lowercase())
            || self.path_excludes.iter().any(|ex| path.contains(ex.as_str()))
        {
            return None;
        }
        if !exchange.response.is_success() || !exchange.response.is_json() {
            return None;
        }

        let body: Value = serde_json::from_str(&exchange.response.body).ok()?;
        let object = body.as_object()?;
        let results_field = RESULTS_FIELDS
            .iter()
            .find(|f| object.get(**f).is_some_and(Value::is_array))?;
        let total_count_field = TOTAL_FIELDS
            .iter()
            .find(|f| object.get(**f).is_some_and(Value::is_number))?;

        Some(ResponseShape {
            results_field: (*results_field).to_string(),
            total_count_field: (*total_count_field).to_string(),
        })
    }
}

impl Default for ApiSignature {
    fn default() -> Self {
        Self::new("coveo")
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// Defaults for grammar parts an exchange does not reveal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarDefaults {
    /// Free-text query parameter.
    pub query_param: String,
    /// Offset parameter.
    pub offset_param: String,
    /// Page-size parameter.
    pub page_size_param: String,
    /// Template for filter-expression category values.
    pub category_template: String,
}

impl Default for GrammarDefaults {
    fn default() -> Self {
        Self {
            query_param: "q".into(),
            offset_param: "firstResult".into(),
            page_size_param: "numberOfResults".into(),
            category_template: format!("@ec_category==\"Products|{CATEGORY_PLACEHOLDER}\""),
        }
    }
}

fn find_alias(params: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .find(|alias| params.contains_key(**alias))
        .map(|alias| (*alias).to_string())
}

/// Builds a descriptor from a matching exchange.
pub fn extract_descriptor(
    exchange: &ObservedExchange,
    shape: ResponseShape,
    page: &RenderedPage,
    defaults: &GrammarDefaults,
) -> Option<EndpointDescriptor> {
    let url = Url::parse(&exchange.request.url).ok()?;

    let body_params = exchange
        .request
        .body
        .as_ref()
        .and_then(Value::as_object)
        .filter(|o| !o.is_empty())
        .cloned();

    let (encoding, base_url, mut params) = match body_params {
        Some(params) => (RequestEncoding::JsonBody, url.to_string(), params),
        None => {
            let params: Map<String, Value> = url
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), Value::from(v.into_owned())))
                .collect();
            let mut base = url.clone();
            base.set_query(None);
            (RequestEncoding::QueryString, base.to_string(), params)
        }
    };

    let query_param = find_alias(&params, QUERY_ALIASES).unwrap_or(defaults.query_param.clone());
    let (offset_param, pagination) = match find_alias(&params, OFFSET_ALIASES) {
        Some(name) => (name, PaginationScheme::Offset),
        None => match find_alias(&params, PAGE_ALIASES) {
            Some(name) => (name, PaginationScheme::Page),
            None => (defaults.offset_param.clone(), PaginationScheme::Offset),
        },
    };
    let page_size_param =
        find_alias(&params, PAGE_SIZE_ALIASES).unwrap_or(defaults.page_size_param.clone());
    let category_param = find_alias(&params, CATEGORY_ALIASES);
    let category_template = match category_param.as_ref().and_then(|p| params.get(p)) {
        Some(Value::String(observed)) if observed.contains("==") => {
            defaults.category_template.clone()
        }
        _ => CATEGORY_PLACEHOLDER.to_string(),
    };

    for name in [&query_param, &offset_param, &page_size_param]
        .into_iter()
        .chain(category_param.as_ref())
    {
        params.remove(name);
    }

    let required_headers = required_headers(exchange, page);

    Some(EndpointDescriptor {
        base_url,
        required_headers,
        grammar: QueryGrammar {
            encoding,
            query_param,
            category_param,
            category_template,
            offset_param,
            page_size_param,
            fixed_params: params.into_iter().collect(),
        },
        pagination,
        response_shape: shape,
        source_page: page.url.clone(),
        discovered_at: Utc::now(),
    })
}

fn required_headers(exchange: &ObservedExchange, page: &RenderedPage) -> BTreeMap<String, String> {
    let mut headers: BTreeMap<String, String> = exchange
        .request
        .headers
        .iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
        .filter(|(k, _)| REQUIRED_HEADER_NAMES.contains(&k.as_str()))
        .collect();

    let has_credentials = ["authorization", "x-api-key", "api-key"]
        .iter()
        .any(|h| headers.contains_key(*h));
    if !has_credentials {
        if let Some(token) = ScriptConfig::extract(&page.html).access_token {
            headers.insert("authorization".into(), format!("Bearer {token}"));
        }
    }
    if !headers.contains_key("origin") {
        if let Some(origin) = origin_of(&page.url) {
            headers.insert("origin".into(), origin);
        }
    }
    headers
        .entry("referer".into())
        .or_insert_with(|| page.url.clone());
    headers
}
