//! Catalog crawling through a discovered endpoint.
//!
//! [`CatalogFetcher`] turns an [`EndpointDescriptor`](crate::EndpointDescriptor)
//! into a stream of [`CatalogRecord`](barkeep_core::CatalogRecord)s for one
//! category. Requests go through a [`SearchTransport`] so tests can replace
//! the network.

mod fetcher;
pub mod parser;
mod transport;

pub use fetcher::{
    CatalogFetcher, EndpointHealth, FetcherConfig, DEFAULT_MAX_OFFSET, DEFAULT_PAGE_SIZE,
    DEFAULT_STALE_THRESHOLD,
};
pub use parser::{parse_search_response, SearchPage};
pub use transport::{HttpTransport, SearchTransport};

/// Crawlable top-level categories as `(slug, label)` pairs.
///
/// The label is the value the retailer's category filter expects.
pub const CATEGORIES: &[(&str, &str)] = &[
    ("wine", "Wine"),
    ("beer-cider", "Beer & Cider"),
    ("spirits", "Spirits"),
    ("coolers", "Coolers"),
    ("non-alcoholic", "Non-Alcoholic"),
];

/// Resolves a category slug or label to its label.
pub fn category_label(name: &str) -> Option<&'static str> {
    let name = name.trim();
    CATEGORIES
        .iter()
        .find(|(slug, label)| slug.eq_ignore_ascii_case(name) || label.eq_ignore_ascii_case(name))
        .map(|(_, label)| *label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_label() {
        assert_eq!(category_label("spirits"), Some("Spirits"));
        assert_eq!(category_label("Beer & Cider"), Some("Beer & Cider"));
        assert_eq!(category_label(" BEER-CIDER "), Some("Beer & Cider"));
        assert_eq!(category_label("sake"), None);
    }
}
