//! Search response parsing and field normalization.
//!
//! Volume, ABV and price arrive as free text as often as numbers. Anything
//! that does not parse is left `None`; nothing defaults to zero.

use std::sync::LazyLock;

use barkeep_core::CatalogRecord;
use chrono::Utc;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::descriptor::ResponseShape;
use crate::error::AttemptError;

static PACK_VOLUME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*[x×]\s*(\d+(?:[.,]\d+)?)\s*(ml|cl|l)\b").expect("Invalid regex")
});
static VOLUME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*(ml|cl|l)\b").expect("Invalid regex")
});
static ABV: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*%").expect("Invalid regex"));
static PRICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$?\s*(\d[\d,]*(?:\.\d+)?)").expect("Invalid regex"));

// ============================================================================
// Field parsers
// ============================================================================

fn unit_factor(unit: &str) -> f64 {
    match unit.to_ascii_lowercase().as_str() {
        "l" => 1000.0,
        "cl" => 10.0,
        _ => 1.0,
    }
}

fn decimal(text: &str) -> Option<f64> {
    text.replace(',', ".").parse().ok()
}

/// Parses a container volume into millilitres.
///
/// Understands `750 mL`, `1.14L`, `70cl` and packs such as `6 x 355 mL`
/// (total volume of the pack).
pub fn parse_volume(text: &str) -> Option<f64> {
    if let Some(caps) = PACK_VOLUME.captures(text) {
        let count: f64 = caps[1].parse().ok()?;
        let each = decimal(&caps[2])? * unit_factor(&caps[3]);
        return Some(count * each).filter(|v| *v > 0.0);
    }
    let caps = VOLUME.captures(text)?;
    Some(decimal(&caps[1])? * unit_factor(&caps[2])).filter(|v| *v > 0.0)
}

/// Parses an alcohol percentage (`40%`, `13.5 %`).
pub fn parse_abv(text: &str) -> Option<f64> {
    let caps = ABV.captures(text)?;
    caps[1]
        .parse()
        .ok()
        .filter(|v: &f64| (0.0..=100.0).contains(v))
}

/// Parses a price (`$24.95`, `1,299.00`).
pub fn parse_price(text: &str) -> Option<f64> {
    let caps = PRICE.captures(text)?;
    caps[1].replace(',', "").parse().ok().filter(|v: &f64| *v >= 0.0)
}

fn number_or_text(value: &Value, parse: fn(&str) -> Option<f64>) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok().or_else(|| parse(s)),
        Value::Array(items) => items.iter().find_map(|v| number_or_text(v, parse)),
        _ => None,
    }
}

// ============================================================================
// Result items
// ============================================================================

/// Looks a field up in the item's `raw` block, then at the top level.
fn field<'a>(item: &'a Value, names: &[&str]) -> Option<&'a Value> {
    let raw = item.get("raw");
    names.iter().find_map(|name| {
        raw.and_then(|r| r.get(*name))
            .or_else(|| item.get(*name))
            .filter(|v| !v.is_null())
    })
}

fn text_field(item: &Value, names: &[&str]) -> Option<String> {
    match field(item, names)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => items
            .iter()
            .find_map(Value::as_str)
            .map(|s| s.trim().to_string()),
        _ => None,
    }
}

/// Splits a category path like `Products|Spirits|Whisky`.
///
/// When several paths are given the most specific one wins. Returns the
/// top-level category and the most specific subcategory.
fn category_path(value: &Value) -> (Option<String>, Option<String>) {
    let paths: Vec<&str> = match value {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };
    let Some(path) = paths.into_iter().max_by_key(|p| p.split('|').count()) else {
        return (None, None);
    };

    let parts: Vec<&str> = path
        .split('|')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    // a leading "Products" segment is the catalog root
    let parts = match parts.first() {
        Some(first) if first.eq_ignore_ascii_case("products") => &parts[1..],
        _ => &parts[..],
    };
    match parts {
        [] => (None, None),
        [only] => (Some((*only).to_string()), None),
        [first, .., last] => (Some((*first).to_string()), Some((*last).to_string())),
    }
}

/// Converts one result item into a record.
///
/// Returns `None` for items without an identifier or name.
pub fn parse_item(item: &Value) -> Option<CatalogRecord> {
    let external_id = text_field(item, &["permanentid", "lcbo_id", "sku", "id", "uniqueId"])?;
    let name = text_field(item, &["title", "systitle", "name"])?;

    let mut record = CatalogRecord::new(external_id, name);
    record.brand = text_field(item, &["ec_brand", "brand"]);
    if let Some(path) = field(item, &["ec_category", "category"]) {
        (record.category, record.subcategory) = category_path(path);
    }

    let price = field(item, &["ec_price", "price"]).and_then(|v| number_or_text(v, parse_price));
    let promo = field(item, &["ec_promo_price", "promo_price", "sale_price"])
        .and_then(|v| number_or_text(v, parse_price));
    record.regular_price = price;
    record.current_price = match (price, promo) {
        (Some(p), Some(sale)) if sale < p => Some(sale),
        (None, Some(sale)) => Some(sale),
        _ => price,
    };
    record.normalize_prices();

    record.volume_ml = field(item, &["lcbo_unit_volume", "volume", "size"])
        .and_then(|v| number_or_text(v, parse_volume))
        .or_else(|| parse_volume(&record.name));
    record.abv_percent = field(item, &["lcbo_alcohol_percent", "alcohol_percent", "abv"])
        .and_then(|v| number_or_text(v, parse_abv))
        .filter(|v| (0.0..=100.0).contains(v));
    record.country_of_origin = text_field(item, &["country_of_manufacture", "lcbo_country", "country"]);
    record.url = text_field(item, &["clickUri", "uri", "url"]);
    record.last_seen_at = Utc::now();
    Some(record)
}

// ============================================================================
// Search page
// ============================================================================

/// One parsed page of search results.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    /// Records parsed from the page.
    pub records: Vec<CatalogRecord>,
    /// Number of result items on the page, parseable or not.
    pub item_count: usize,
    /// Total results reported by the source.
    pub total_count: Option<usize>,
}

/// Parses a search response body.
///
/// # Errors
///
/// Returns a shape-mismatch [`AttemptError`] when the body is not an object
/// or lacks the results array.
pub fn parse_search_response(body: &Value, shape: &ResponseShape) -> Result<SearchPage, AttemptError> {
    let object = body
        .as_object()
        .ok_or_else(|| AttemptError::shape("response body is not a JSON object"))?;
    let items = object
        .get(&shape.results_field)
        .and_then(Value::as_array)
        .ok_or_else(|| {
            AttemptError::shape(format!("missing '{}' array", shape.results_field))
        })?;
    let total_count = object
        .get(&shape.total_count_field)
        .and_then(Value::as_u64)
        .and_then(|n| usize::try_from(n).ok());

    let records: Vec<CatalogRecord> = items.iter().filter_map(parse_item).collect();
    if records.len() < items.len() {
        debug!(
            skipped = items.len() - records.len(),
            "Skipped result items without id or name"
        );
    }

    Ok(SearchPage {
        records,
        item_count: items.len(),
        total_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_volume_units() {
        assert_eq!(parse_volume("750 mL"), Some(750.0));
        assert_eq!(parse_volume("750ml bottle"), Some(750.0));
        assert_eq!(parse_volume("1.14L"), Some(1140.0));
        assert_eq!(parse_volume("1,5 L"), Some(1500.0));
        assert_eq!(parse_volume("70cl"), Some(700.0));
        assert_eq!(parse_volume("6 x 355 mL"), Some(2130.0));
        assert_eq!(parse_volume("magnum"), None);
        assert_eq!(parse_volume("0 mL"), None);
    }

    #[test]
    fn test_parse_abv() {
        assert_eq!(parse_abv("40%"), Some(40.0));
        assert_eq!(parse_abv("13.5 % alc./vol"), Some(13.5));
        assert_eq!(parse_abv("strong"), None);
        assert_eq!(parse_abv("140%"), None);
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("$24.95"), Some(24.95));
        assert_eq!(parse_price("1,299.00"), Some(1299.0));
        assert_eq!(parse_price("n/a"), None);
    }

    #[test]
    fn test_parse_coveo_item() {
        let item = json!({
            "title": "Bulleit Bourbon",
            "clickUri": "https://www.lcbo.com/en/bulleit-bourbon-12345",
            "raw": {
                "permanentid": "12345",
                "ec_brand": "Bulleit",
                "ec_category": ["Products", "Products|Spirits", "Products|Spirits|Whisky|Bourbon"],
                "ec_price": 39.95,
                "ec_promo_price": 35.95,
                "lcbo_unit_volume": "750 mL bottle",
                "lcbo_alcohol_percent": 45.0,
                "country_of_manufacture": "United States"
            }
        });

        let record = parse_item(&item).unwrap();
        assert_eq!(record.external_id, "12345");
        assert_eq!(record.brand.as_deref(), Some("Bulleit"));
        assert_eq!(record.category.as_deref(), Some("Spirits"));
        assert_eq!(record.subcategory.as_deref(), Some("Bourbon"));
        assert_eq!(record.current_price, Some(35.95));
        assert_eq!(record.regular_price, Some(39.95));
        assert!(record.is_on_sale());
        assert_eq!(record.volume_ml, Some(750.0));
        assert_eq!(record.abv_percent, Some(45.0));
    }

    #[test]
    fn test_unparseable_fields_stay_none() {
        let item = json!({
            "title": "Mystery Spirit",
            "raw": {
                "permanentid": 777,
                "ec_price": "call for price",
                "lcbo_unit_volume": "bottle",
                "lcbo_alcohol_percent": "unknown"
            }
        });
        let record = parse_item(&item).unwrap();
        assert_eq!(record.external_id, "777");
        assert!(record.current_price.is_none());
        assert!(record.regular_price.is_none());
        assert!(record.volume_ml.is_none());
        assert!(record.abv_percent.is_none());
    }

    #[test]
    fn test_promo_above_price_ignored() {
        let item = json!({
            "title": "Gin",
            "raw": {"permanentid": "1", "ec_price": 30.0, "ec_promo_price": 32.0}
        });
        let record = parse_item(&item).unwrap();
        assert_eq!(record.current_price, Some(30.0));
        assert_eq!(record.regular_price, Some(30.0));
    }

    #[test]
    fn test_item_without_id_skipped() {
        let body = json!({
            "totalCount": 2,
            "results": [
                {"title": "No Id"},
                {"title": "Has Id", "raw": {"permanentid": "5"}}
            ]
        });
        let page = parse_search_response(&body, &ResponseShape::default()).unwrap();
        assert_eq!(page.item_count, 2);
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.total_count, Some(2));
    }

    #[test]
    fn test_shape_mismatch() {
        let shape = ResponseShape::default();
        let err = parse_search_response(&json!({"items": []}), &shape).unwrap_err();
        assert_eq!(err.kind, crate::error::FailureKind::ShapeMismatch);
        assert!(parse_search_response(&json!([1, 2]), &shape).is_err());
    }
}
