use crate::browser::{ContentScript, Handshake, PageRequest};
use crate::extract::SiteConfig;

/// Global the injected scripts install their entry points on
const NAMESPACE: &str = "__wbparser";

/// Generates the JavaScript injected into listing and detail pages.
///
/// Injected scripts only read the DOM and return raw values; normalisation
/// happens in [`LinkCollector`](crate::extract::LinkCollector) and
/// [`DetailExtractor`](crate::extract::DetailExtractor).
#[derive(Debug, Clone)]
pub struct ContentScripts {
    site: SiteConfig,
}

impl ContentScripts {
    pub fn new(site: SiteConfig) -> Self {
        Self { site }
    }

    /// Source of the script to inject. Installs the entry points, then
    /// announces readiness through the handshake slot.
    pub fn source(&self, script: ContentScript) -> String {
        let body = match script {
            ContentScript::Listing => self.listing_body(),
            ContentScript::Detail => self.detail_body(),
        };
        let handshake = quoted(script.handshake().as_str());

        format!(
            r#"
            (() => {{
                window.{NAMESPACE} = window.{NAMESPACE} || {{}};
                {body}
                window.{NAMESPACE}.ready = {handshake};
                return true;
            }})()
            "#
        )
    }

    /// Expression evaluating to `true` once `handshake` was announced
    pub fn handshake_script(&self, handshake: Handshake) -> String {
        format!(
            "!!(window.{NAMESPACE} && window.{NAMESPACE}.ready === {})",
            quoted(handshake.as_str())
        )
    }

    /// Expression answering a page request with raw JSON
    pub fn request_expression(&self, request: &PageRequest) -> String {
        match request {
            PageRequest::GetProductLinks { .. } => {
                format!("window.{NAMESPACE}.collectLinks()")
            }
            PageRequest::ParseDetail => format!("window.{NAMESPACE}.parseDetail()"),
        }
    }

    fn listing_body(&self) -> String {
        let link_selectors = json_list(&self.site.link_selectors);
        let id_selector = quoted(
            &self
                .site
                .id_attributes
                .iter()
                .map(|a| format!("[{}]", a))
                .collect::<Vec<_>>()
                .join(", "),
        );
        let id_attributes = json_list(&self.site.id_attributes);

        format!(
            r#"
                window.{NAMESPACE}.collectLinks = () => {{
                    const hrefOf = (a) => a.href || a.getAttribute('href') || '';
                    const candidates = [];
                    for (const selector of {link_selectors}) {{
                        document.querySelectorAll(selector).forEach(a => candidates.push(hrefOf(a)));
                    }}

                    const productIds = [];
                    document.querySelectorAll({id_selector}).forEach(el => {{
                        for (const attr of {id_attributes}) {{
                            const id = el.getAttribute(attr);
                            if (id) {{ productIds.push(id); break; }}
                        }}
                    }});

                    const anchors = Array.from(document.querySelectorAll('a[href]')).map(hrefOf);
                    return {{ candidates, productIds, anchors }};
                }};
            "#
        )
    }

    fn detail_body(&self) -> String {
        let site = &self.site;
        let price_selectors = json_list(&site.price_selectors);
        let old_price = quoted(&site.old_price_selector);
        let rating = quoted(&site.rating_selector);
        let reviews = quoted(&site.reviews_selector);
        let description = quoted(&site.description_selector);
        let spec_row = quoted(&site.spec_row_selector);
        let spec_key = quoted(&site.spec_key_selector);
        let spec_value = quoted(&site.spec_value_selector);
        let seller = quoted(&site.seller_selector);

        format!(
            r#"
                window.{NAMESPACE}.parseDetail = () => {{
                    const text = (selector) => {{
                        const el = document.querySelector(selector);
                        return el ? el.textContent.trim() : null;
                    }};

                    const jsonLd = Array.from(
                        document.querySelectorAll('script[type="application/ld+json"]')
                    ).map(s => s.textContent);

                    const specs = [];
                    document.querySelectorAll({spec_row}).forEach(row => {{
                        const key = row.querySelector({spec_key});
                        const value = row.querySelector({spec_value});
                        if (key && value) specs.push([key.textContent, value.textContent]);
                    }});

                    return {{
                        url: window.location.href,
                        jsonLd,
                        heading: text('h1'),
                        priceTexts: {price_selectors}.map(text),
                        oldPrice: text({old_price}),
                        rating: text({rating}),
                        reviews: text({reviews}),
                        description: text({description}),
                        specs,
                        seller: text({seller}),
                    }};
                }};
            "#
        )
    }
}

/// JavaScript string literal
fn quoted(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// JavaScript array literal of strings
fn json_list(items: &[String]) -> String {
    serde_json::Value::from(items.to_vec()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_script_announces_content_ready() {
        let scripts = ContentScripts::new(SiteConfig::default());
        let source = scripts.source(ContentScript::Listing);
        assert!(source.contains("collectLinks"));
        assert!(source.contains("\"content_ready\""));
        assert!(source.contains("data-nm-id"));
    }

    #[test]
    fn test_detail_script_announces_detail_ready() {
        let scripts = ContentScripts::new(SiteConfig::default());
        let source = scripts.source(ContentScript::Detail);
        assert!(source.contains("parseDetail"));
        assert!(source.contains("\"detail_ready\""));
        assert!(source.contains("application/ld+json"));
        assert!(source.contains(".price-block__final-price"));
    }

    #[test]
    fn test_selectors_are_escaped() {
        let site = SiteConfig {
            seller_selector: "a[title=\"it's\"]".to_string(),
            ..Default::default()
        };
        let source = ContentScripts::new(site).source(ContentScript::Detail);
        assert!(source.contains(r#""a[title=\"it's\"]""#));
    }

    #[test]
    fn test_handshake_and_requests() {
        let scripts = ContentScripts::new(SiteConfig::default());
        assert!(scripts
            .handshake_script(Handshake::DetailReady)
            .contains("=== \"detail_ready\""));
        assert_eq!(
            scripts.request_expression(&PageRequest::ParseDetail),
            "window.__wbparser.parseDetail()"
        );
        assert_eq!(
            scripts.request_expression(&PageRequest::GetProductLinks { max: 5 }),
            "window.__wbparser.collectLinks()"
        );
    }
}
