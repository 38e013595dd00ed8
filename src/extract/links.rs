use serde::Deserialize;

use crate::extract::SiteConfig;

/// Raw output of the listing content script.
///
/// Each list preserves document order; `candidates` is additionally ordered by
/// selector priority.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawListing {
    pub candidates: Vec<String>,
    pub product_ids: Vec<String>,
    pub anchors: Vec<String>,
}

/// Turns raw listing output into a deduplicated, capped list of product URLs
#[derive(Debug, Clone)]
pub struct LinkCollector {
    site: SiteConfig,
}

impl LinkCollector {
    pub fn new(site: SiteConfig) -> Self {
        Self { site }
    }

    /// Apply the fallback chain: selector matches, then product ids, then any
    /// anchor that looks like a product page.
    pub fn collect(&self, raw: &RawListing, max: usize) -> Vec<String> {
        let mut links: Vec<String> = Vec::new();

        for href in &raw.candidates {
            if links.len() >= max {
                break;
            }
            if let Some(url) = self.site.resolve(href) {
                self.push_product(&mut links, url);
            }
        }

        for id in &raw.product_ids {
            if links.len() >= max {
                break;
            }
            if id.trim().is_empty() {
                continue;
            }
            self.push_product(&mut links, self.site.product_url(id));
        }

        for href in &raw.anchors {
            if links.len() >= max {
                break;
            }
            if let Some(url) = self.site.resolve(href) {
                self.push_product(&mut links, url);
            }
        }

        tracing::debug!("Collected {} product links", links.len());
        links
    }

    fn push_product(&self, links: &mut Vec<String>, url: String) {
        if self.site.is_product_link(&url) && !links.contains(&url) {
            links.push(url);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: u32) -> String {
        format!("https://www.wildberries.ru/catalog/{}/detail.aspx", id)
    }

    #[test]
    fn test_collect_dedups_and_keeps_order() {
        let collector = LinkCollector::new(SiteConfig::default());
        let raw = RawListing {
            candidates: vec![product(3), product(1), product(3), product(2)],
            ..Default::default()
        };
        assert_eq!(
            collector.collect(&raw, 10),
            vec![product(3), product(1), product(2)]
        );
    }

    #[test]
    fn test_collect_respects_max() {
        let collector = LinkCollector::new(SiteConfig::default());
        let raw = RawListing {
            candidates: (1..=30).map(product).collect(),
            product_ids: vec!["99".into()],
            ..Default::default()
        };
        let links = collector.collect(&raw, 20);
        assert_eq!(links.len(), 20);
        assert!(!links.contains(&product(99)));
    }

    #[test]
    fn test_collect_falls_back_to_ids_then_anchors() {
        let collector = LinkCollector::new(SiteConfig::default());
        let raw = RawListing {
            candidates: vec![product(1)],
            product_ids: vec!["2".into(), "".into(), "1".into()],
            anchors: vec![
                "https://www.wildberries.ru/lk/basket".into(),
                "/catalog/3/detail.aspx".into(),
                "https://other-shop.example/catalog/4/detail.aspx".into(),
            ],
        };
        assert_eq!(
            collector.collect(&raw, 10),
            vec![product(1), product(2), product(3)]
        );
    }

    #[test]
    fn test_collect_rejects_non_product_links() {
        let collector = LinkCollector::new(SiteConfig::default());
        let raw = RawListing {
            candidates: vec![
                "https://www.wildberries.ru/catalog/obuv".into(),
                "javascript:void(0)".into(),
            ],
            ..Default::default()
        };
        assert!(collector.collect(&raw, 10).is_empty());
    }

    #[test]
    fn test_raw_listing_deserializes_camel_case() {
        let raw: RawListing = serde_json::from_str(
            r#"{"candidates":["a"],"productIds":["1"],"anchors":[]}"#,
        )
        .unwrap();
        assert_eq!(raw.product_ids, vec!["1"]);
    }
}
