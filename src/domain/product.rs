use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Maximum number of characters kept from a product description
pub const DESCRIPTION_LIMIT: usize = 300;

const UNAVAILABLE: &str = "N/A";

/// Product price in whole currency units.
///
/// Serialized as a bare number, or as `"N/A"` when the page exposed no price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "PriceRepr", into = "PriceRepr")]
pub enum Price {
    Amount(u64),
    #[default]
    Unavailable,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum PriceRepr {
    Number(u64),
    Text(String),
}

impl From<PriceRepr> for Price {
    fn from(repr: PriceRepr) -> Self {
        match repr {
            PriceRepr::Number(n) => Price::Amount(n),
            PriceRepr::Text(s) => s.trim().parse().map(Price::Amount).unwrap_or_default(),
        }
    }
}

impl From<Price> for PriceRepr {
    fn from(price: Price) -> Self {
        match price {
            Price::Amount(n) => PriceRepr::Number(n),
            Price::Unavailable => PriceRepr::Text(UNAVAILABLE.to_string()),
        }
    }
}

impl Price {
    pub fn amount(&self) -> Option<u64> {
        match self {
            Price::Amount(n) => Some(*n),
            Price::Unavailable => None,
        }
    }

    /// Whether the price is known and above `limit`
    pub fn exceeds(&self, limit: u64) -> bool {
        self.amount().is_some_and(|n| n > limit)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Price::Amount(n) => write!(f, "{}", n),
            Price::Unavailable => f.write_str(UNAVAILABLE),
        }
    }
}

/// Flat record extracted from a single product detail page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductRecord {
    pub link: String,
    pub name: String,
    pub brand: String,
    pub price: Price,
    pub old_price: String,
    pub currency: String,
    pub rating: String,
    pub reviews_count: u64,
    pub description: String,
    pub specs: BTreeMap<String, String>,
    pub seller: String,
}

impl Default for ProductRecord {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl ProductRecord {
    pub fn new(link: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            name: UNAVAILABLE.to_string(),
            brand: UNAVAILABLE.to_string(),
            price: Price::Unavailable,
            old_price: "-".to_string(),
            currency: "RUB".to_string(),
            rating: UNAVAILABLE.to_string(),
            reviews_count: 0,
            description: String::new(),
            specs: BTreeMap::new(),
            seller: "Wildberries".to_string(),
        }
    }

    /// Set the description, keeping at most [`DESCRIPTION_LIMIT`] characters
    pub fn set_description(&mut self, text: &str) {
        self.description = text.trim().chars().take(DESCRIPTION_LIMIT).collect();
    }
}

/// Result of visiting one link: a parsed record or an error placeholder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScrapeOutcome {
    Failed { error: String, link: String },
    Parsed(ProductRecord),
}

impl ScrapeOutcome {
    pub fn failed(link: impl Into<String>, error: impl fmt::Display) -> Self {
        ScrapeOutcome::Failed {
            error: format!("Parse failed: {}", error),
            link: link.into(),
        }
    }

    pub fn link(&self) -> &str {
        match self {
            ScrapeOutcome::Failed { link, .. } => link,
            ScrapeOutcome::Parsed(record) => &record.link,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ScrapeOutcome::Failed { .. })
    }
}

/// Price observed for a link during a price-only check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceCheck {
    pub link: String,
    pub price: Price,
}
