use serde::{Deserialize, Serialize};
use url::Url;

use crate::app::{ParserError, Result};

/// Site-specific knowledge: URL shapes and the selector heuristics used by
/// the injected content scripts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Base URL used to resolve relative links (default: https://www.wildberries.ru)
    pub base_url: String,

    /// Host every product link must contain
    pub host: String,

    /// Path fragment identifying a listing (catalog or search) page
    pub listing_marker: String,

    /// Path fragment identifying a product detail page
    pub detail_marker: String,

    /// Anchor selectors tried in priority order when collecting product links
    pub link_selectors: Vec<String>,

    /// Data attributes carrying a bare product id
    pub id_attributes: Vec<String>,

    /// Selectors for the current price, in priority order
    pub price_selectors: Vec<String>,

    pub old_price_selector: String,
    pub rating_selector: String,
    pub reviews_selector: String,
    pub description_selector: String,
    pub spec_row_selector: String,
    pub spec_key_selector: String,
    pub spec_value_selector: String,
    pub seller_selector: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.wildberries.ru".to_string(),
            host: "wildberries.ru".to_string(),
            listing_marker: "/catalog/".to_string(),
            detail_marker: "detail.aspx".to_string(),
            link_selectors: vec![
                "a[href*=\"/catalog/\"][href*=\"detail.aspx\"]".to_string(),
                "a[href*=\"detail.aspx\"]".to_string(),
                ".product-card a[href*=\"detail.aspx\"]".to_string(),
                ".goods-card a[href*=\"detail.aspx\"]".to_string(),
                "article a[href*=\"detail.aspx\"]".to_string(),
                "[data-product-id] a[href*=\"detail.aspx\"]".to_string(),
                ".product-card__wrapper a".to_string(),
                ".product-card__link".to_string(),
                ".j-card-link".to_string(),
                ".card__link".to_string(),
                ".goods-item a[href*=\"detail.aspx\"]".to_string(),
            ],
            id_attributes: vec!["data-nm-id".to_string(), "data-product-id".to_string()],
            price_selectors: vec![
                "h2.mo-typography.mo-typography_variant_title2.mo-typography_variable-weight_title2.mo-typography_color_accent".to_string(),
                ".price-block__final-price".to_string(),
                ".final-price".to_string(),
                "[class*=\"final-price\"]".to_string(),
                ".price-block__price".to_string(),
                ".product-price__value".to_string(),
            ],
            old_price_selector: ".price-block__old-price, [class*=\"old-price\"], del".to_string(),
            rating_selector: ".address-rate-mini, [class*=\"rating\"]".to_string(),
            reviews_selector: ".product-rate__count, [class*=\"count\"]".to_string(),
            description_selector: ".collapsable__text, .description-text".to_string(),
            spec_row_selector: ".characteristics__item, .params-block__row, tr".to_string(),
            spec_key_selector:
                "td:first-child, th, .characteristics__name, .params-block__param".to_string(),
            spec_value_selector:
                "td:last-child, .characteristics__value, .params-block__value".to_string(),
            seller_selector: ".seller-info__name a, .seller-name".to_string(),
        }
    }
}

impl SiteConfig {
    /// Check that `url` is a listing page of this site
    pub fn validate_listing_url(&self, url: &str) -> Result<Url> {
        if !url.contains(&self.host) {
            return Err(ParserError::Config(format!(
                "Please open a {} page first",
                self.host
            )));
        }
        if !url.contains(&self.listing_marker) {
            return Err(ParserError::Config(format!(
                "Please open a catalog or search results page. The URL should contain \"{}\"",
                self.listing_marker
            )));
        }
        Ok(Url::parse(url)?)
    }

    /// URL of the `page`-th listing page; page 1 is the URL itself
    pub fn page_url(&self, listing: &Url, page: u32) -> String {
        if page <= 1 {
            return listing.to_string();
        }

        let mut url = listing.clone();
        let pairs: Vec<(String, String)> = listing
            .query_pairs()
            .filter(|(k, _)| k != "page")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(pairs)
            .append_pair("page", &page.to_string());
        url.to_string()
    }

    /// Canonical detail page URL for a bare product id
    pub fn product_url(&self, id: &str) -> String {
        format!(
            "{}/catalog/{}/{}",
            self.base_url.trim_end_matches('/'),
            id.trim(),
            self.detail_marker
        )
    }

    /// Resolve an href (absolute or relative) against the base URL
    pub fn resolve(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() {
            return None;
        }
        if href.starts_with("http://") || href.starts_with("https://") {
            return Url::parse(href).ok().map(String::from);
        }
        Url::parse(&self.base_url)
            .and_then(|base| base.join(href))
            .ok()
            .map(String::from)
    }

    /// Whether an absolute URL points at a product detail page of this site
    pub fn is_product_link(&self, url: &str) -> bool {
        url.contains(&self.host) && url.contains(&self.detail_marker)
    }
}
