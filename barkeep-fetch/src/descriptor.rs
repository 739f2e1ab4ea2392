//! Endpoint descriptor.
//!
//! An [`EndpointDescriptor`] is the discovered shape of the retailer's
//! internal search API: where it lives, which headers it insists on, how its
//! query parameters are spelled and where results sit in the response. It is
//! immutable once discovered and shared behind an `Arc`. When the remote
//! changes shape the whole descriptor is replaced by a fresh discovery.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

/// Placeholder substituted with the category label in category filters.
pub const CATEGORY_PLACEHOLDER: &str = "{category}";

// ============================================================================
// Grammar
// ============================================================================

/// How parameters are carried in a search request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestEncoding {
    /// `GET` with parameters in the query string.
    QueryString,
    /// `POST` with parameters in a JSON object body.
    JsonBody,
}

impl RequestEncoding {
    /// HTTP method used with this encoding.
    pub fn method(self) -> HttpMethod {
        match self {
            Self::QueryString => HttpMethod::Get,
            Self::JsonBody => HttpMethod::Post,
        }
    }
}

/// HTTP method of a search request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
        })
    }
}

/// How the pagination parameter counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationScheme {
    /// The parameter is the number of records to skip.
    Offset,
    /// The parameter is a zero-based page index.
    Page,
}

/// Parameter names understood by the search API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryGrammar {
    /// Parameter encoding.
    pub encoding: RequestEncoding,
    /// Free-text query parameter.
    pub query_param: String,
    /// Category filter parameter, if the API has one.
    pub category_param: Option<String>,
    /// Value template for the category filter; contains [`CATEGORY_PLACEHOLDER`].
    pub category_template: String,
    /// Pagination parameter.
    pub offset_param: String,
    /// Page-size parameter.
    pub page_size_param: String,
    /// Parameters sent unchanged with every request.
    #[serde(default)]
    pub fixed_params: BTreeMap<String, Value>,
}

/// Where the interesting parts of a response live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseShape {
    /// Field holding the results array.
    pub results_field: String,
    /// Field holding the total result count.
    pub total_count_field: String,
}

impl Default for ResponseShape {
    fn default() -> Self {
        Self {
            results_field: "results".into(),
            total_count_field: "totalCount".into(),
        }
    }
}

// ============================================================================
// Endpoint Descriptor
// ============================================================================

/// Discovered shape of the remote search API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    /// Search endpoint URL without query string.
    pub base_url: String,
    /// Headers the endpoint requires (origin, referer, credentials).
    pub required_headers: BTreeMap<String, String>,
    /// Parameter grammar.
    pub grammar: QueryGrammar,
    /// Pagination scheme.
    pub pagination: PaginationScheme,
    /// Response layout.
    pub response_shape: ResponseShape,
    /// Page the endpoint was discovered from.
    pub source_page: String,
    /// When discovery produced this descriptor.
    pub discovered_at: DateTime<Utc>,
}

/// Parameters for one page of a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    /// Free-text query; empty for pure category listings.
    pub text: String,
    /// Category label to filter on.
    pub category: Option<String>,
    /// Records to skip.
    pub offset: usize,
    /// Records per page.
    pub page_size: usize,
}

impl PageQuery {
    /// Query listing a category.
    pub fn category(label: impl Into<String>, offset: usize, page_size: usize) -> Self {
        Self {
            text: String::new(),
            category: Some(label.into()),
            offset,
            page_size,
        }
    }
}

/// A fully built search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Absolute URL, including the query string for GET requests.
    pub url: String,
    /// Request headers.
    pub headers: BTreeMap<String, String>,
    /// JSON body for POST requests.
    pub body: Option<Value>,
}

impl EndpointDescriptor {
    /// Returns the host of the search endpoint.
    pub fn host(&self) -> Option<String> {
        Url::parse(&self.base_url)
            .ok()
            .and_then(|u| u.host_str().map(ToString::to_string))
    }

    /// Returns the hosts a client must be allowed to reach.
    pub fn allowed_hosts(&self) -> Vec<String> {
        let mut hosts: Vec<String> = self.host().into_iter().collect();
        if let Some(page_host) = Url::parse(&self.source_page)
            .ok()
            .and_then(|u| u.host_str().map(ToString::to_string))
        {
            if !hosts.contains(&page_host) {
                hosts.push(page_host);
            }
        }
        hosts
    }

    /// Builds the request for one page.
    pub fn build_request(&self, query: &PageQuery) -> SearchRequest {
        let grammar = &self.grammar;
        let mut params: Map<String, Value> = grammar
            .fixed_params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        params.insert(grammar.query_param.clone(), Value::from(query.text.clone()));
        let position = match self.pagination {
            PaginationScheme::Offset => query.offset,
            PaginationScheme::Page => query.offset / query.page_size.max(1),
        };
        params.insert(grammar.offset_param.clone(), Value::from(position));
        params.insert(grammar.page_size_param.clone(), Value::from(query.page_size));
        if let (Some(param), Some(label)) = (&grammar.category_param, &query.category) {
            let value = grammar.category_template.replace(CATEGORY_PLACEHOLDER, label);
            params.insert(param.clone(), Value::from(value));
        }

        let mut headers = self.required_headers.clone();
        headers
            .entry("accept".into())
            .or_insert_with(|| "application/json".into());

        match grammar.encoding {
            RequestEncoding::QueryString => {
                let url = match Url::parse(&self.base_url) {
                    Ok(mut url) => {
                        {
                            let mut pairs = url.query_pairs_mut();
                            for (key, value) in &params {
                                pairs.append_pair(key, &param_text(value));
                            }
                        }
                        url.to_string()
                    }
                    Err(_) => self.base_url.clone(),
                };
                SearchRequest {
                    method: HttpMethod::Get,
                    url,
                    headers,
                    body: None,
                }
            }
            RequestEncoding::JsonBody => {
                headers
                    .entry("content-type".into())
                    .or_insert_with(|| "application/json".into());
                SearchRequest {
                    method: HttpMethod::Post,
                    url: self.base_url.clone(),
                    headers,
                    body: Some(Value::Object(params)),
                }
            }
        }
    }
}

fn param_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
