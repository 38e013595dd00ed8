use html_escape::decode_html_entities;
use serde::Deserialize;
use serde_json::Value;

use crate::domain::{Price, ProductRecord};

static NULL: Value = Value::Null;

/// Raw output of the detail content script
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawDetail {
    pub url: String,
    /// Text of every `application/ld+json` script block
    pub json_ld: Vec<String>,
    pub heading: Option<String>,
    /// Text of the first match of each price selector, in priority order
    pub price_texts: Vec<Option<String>>,
    pub old_price: Option<String>,
    pub rating: Option<String>,
    pub reviews: Option<String>,
    pub description: Option<String>,
    pub specs: Vec<(String, String)>,
    pub seller: Option<String>,
}

/// Builds a [`ProductRecord`] from raw detail page output.
///
/// JSON-LD `Product` data is applied first, DOM values then fill in or
/// override individual fields.
#[derive(Debug, Clone, Default)]
pub struct DetailExtractor;

impl DetailExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, raw: &RawDetail) -> ProductRecord {
        let mut record = ProductRecord::new(raw.url.clone());

        for block in &raw.json_ld {
            match serde_json::from_str::<Value>(block) {
                Ok(value) => {
                    for node in product_nodes(&value) {
                        apply_json_ld(&mut record, node);
                    }
                }
                Err(e) => tracing::debug!("Skipping malformed JSON-LD block: {}", e),
            }
        }

        if record.name == "N/A" {
            if let Some(heading) = non_empty(raw.heading.as_deref()) {
                record.name = decode_html_entities(heading).to_string();
            }
        }

        if let Some(price) = raw
            .price_texts
            .iter()
            .flatten()
            .find_map(|text| parse_digits(text).filter(|n| *n > 0))
        {
            record.price = Price::Amount(price);
        }

        if let Some(old_price) = non_empty(raw.old_price.as_deref()) {
            record.old_price = old_price.to_string();
        }
        if let Some(rating) = non_empty(raw.rating.as_deref()) {
            record.rating = rating.to_string();
        }
        if let Some(reviews) = raw.reviews.as_deref().and_then(parse_digits) {
            record.reviews_count = reviews;
        }
        if let Some(description) = non_empty(raw.description.as_deref()) {
            record.set_description(&decode_html_entities(description));
        }

        for (key, value) in &raw.specs {
            let key = key.trim().trim_end_matches(':').trim();
            if !key.is_empty() {
                record.specs.insert(key.to_string(), value.trim().to_string());
            }
        }

        if let Some(seller) = non_empty(raw.seller.as_deref()) {
            record.seller = seller.to_string();
        }

        record
    }
}

/// Collect every object typed as a Product, looking through arrays and `@graph`
fn product_nodes(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().flat_map(product_nodes).collect(),
        Value::Object(map) => {
            let mut nodes = Vec::new();
            if is_product(map.get("@type")) {
                nodes.push(value);
            }
            if let Some(graph) = map.get("@graph") {
                nodes.extend(product_nodes(graph));
            }
            nodes
        }
        _ => Vec::new(),
    }
}

fn is_product(kind: Option<&Value>) -> bool {
    match kind {
        Some(Value::String(s)) => s.contains("Product"),
        Some(Value::Array(kinds)) => kinds.iter().any(|k| k.as_str() == Some("Product")),
        _ => false,
    }
}

fn apply_json_ld(record: &mut ProductRecord, node: &Value) {
    if let Some(name) = scalar_text(&node["name"]) {
        record.name = decode_html_entities(&name).to_string();
    }

    let brand = &node["brand"];
    if let Some(brand) = scalar_text(&brand["name"]).or_else(|| scalar_text(brand)) {
        record.brand = brand;
    }

    let offers = match &node["offers"] {
        Value::Array(items) => items.first().unwrap_or(&NULL),
        other => other,
    };
    if let Some(price) = scalar_text(&offers["price"]).and_then(|p| parse_amount(&p)) {
        record.price = Price::Amount(price);
    }
    if let Some(currency) = scalar_text(&offers["priceCurrency"]) {
        record.currency = currency;
    }

    let rating = &node["aggregateRating"];
    if let Some(value) = scalar_text(&rating["ratingValue"]) {
        record.rating = value;
    }
    if let Some(count) = scalar_text(&rating["reviewCount"]).and_then(|c| parse_digits(&c)) {
        record.reviews_count = count;
    }

    let description = scalar_text(&node["description"]).unwrap_or_default();
    record.set_description(&decode_html_entities(&description));
}

/// String or number rendered as text; `None` for anything else or empty strings
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

/// Keep only ASCII digits, e.g. `"1 299 ₽"` → `1299`
fn parse_digits(text: &str) -> Option<u64> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Decimal amount such as `"1299.00"`, rounded to whole units
fn parse_amount(text: &str) -> Option<u64> {
    text.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite() && *p > 0.0)
        .map(|p| p.round() as u64)
}
