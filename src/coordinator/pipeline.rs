use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use crate::app::{ParserError, Result};
use crate::browser::{Browser, ContentScript, PageReply, PageRequest, TabId};
use crate::coordinator::config::PipelineConfig;
use crate::domain::{Price, PriceCheck, ScrapeJob, ScrapeOutcome};
use crate::extract::SiteConfig;
use crate::journal::Journal;

/// How a visit decides the injected script is ready for its request
#[derive(Debug, Clone, Copy)]
enum Readiness {
    /// Wait for the script's handshake, failing after the given budget
    Handshake(Duration),
    /// Sleep for a fixed time
    Settle(Duration),
}

/// Tab visits on top of a [`Browser`].
///
/// Every visit holds the tab lease from `open_tab` to `close_tab`, so at most
/// one coordinator-owned tab exists at any time, whichever task asked for it.
pub struct Pipeline {
    browser: Arc<dyn Browser>,
    config: PipelineConfig,
    journal: Journal,
    tab_lease: Mutex<()>,
}

impl Pipeline {
    pub fn new(browser: Arc<dyn Browser>, config: PipelineConfig, journal: Journal) -> Self {
        Self {
            browser,
            config,
            journal,
            tab_lease: Mutex::new(()),
        }
    }

    /// Visit every remaining link of `job` in order.
    ///
    /// `on_progress` is called before each visit. A failed visit stores a
    /// placeholder and the job moves on; the returned job is always complete.
    pub async fn scrape_details<F>(&self, mut job: ScrapeJob, mut on_progress: F) -> ScrapeJob
    where
        F: FnMut(&ScrapeJob) + Send,
    {
        while let Some(link) = job.current_link().map(str::to_string) {
            on_progress(&job);

            let outcome = self.parse_detail(&link).await;
            if let ScrapeOutcome::Failed { error, .. } = &outcome {
                self.journal
                    .error(format!("Error parsing {}: {}", link, error));
            }
            job.record(outcome);

            if !job.is_complete() {
                tokio::time::sleep(self.config.item_delay()).await;
            }
        }

        job
    }

    /// Visit one product page and extract its record
    pub async fn parse_detail(&self, link: &str) -> ScrapeOutcome {
        let readiness = Readiness::Handshake(self.config.detail_handshake_timeout());
        let reply = self
            .visit(link, ContentScript::Detail, readiness, PageRequest::ParseDetail)
            .await;

        match reply {
            Ok(PageReply::Detail(mut record)) => {
                if record.link.is_empty() {
                    record.link = link.to_string();
                }
                ScrapeOutcome::Parsed(*record)
            }
            Ok(PageReply::Links { .. }) => ScrapeOutcome::failed(
                link,
                ParserError::Extraction("detail page answered with a link list".to_string()),
            ),
            Err(e) => ScrapeOutcome::failed(link, e),
        }
    }

    /// Visit one listing page and return up to `max` product links
    pub async fn collect_links(&self, url: &str, max: usize) -> Result<Vec<String>> {
        let readiness = Readiness::Settle(self.config.listing_settle());
        let request = PageRequest::GetProductLinks { max };

        match self
            .visit(url, ContentScript::Listing, readiness, request)
            .await?
        {
            PageReply::Links { links } => Ok(links),
            PageReply::Detail(_) => Err(ParserError::Extraction(
                "listing page answered with a product record".to_string(),
            )),
        }
    }

    /// Collect links from `pages` consecutive listing pages.
    ///
    /// Duplicates across pages are dropped. A later page that fails or yields
    /// no links is logged and skipped; an error on the first page is returned.
    pub async fn collect_listing(
        &self,
        listing: &Url,
        site: &SiteConfig,
        pages: u32,
        max_per_page: usize,
    ) -> Result<Vec<String>> {
        let mut links: Vec<String> = Vec::new();

        for page in 1..=pages.max(1) {
            if page > 1 {
                tokio::time::sleep(self.config.page_delay()).await;
            }

            let url = site.page_url(listing, page);
            self.journal.info(format!("Parsing page {}: {}", page, url));

            let found = match self.collect_links(&url, max_per_page).await {
                Ok(found) => found,
                Err(e) if page == 1 => return Err(e),
                Err(e) => {
                    self.journal
                        .error(format!("Error collecting page {}: {}", page, e));
                    continue;
                }
            };

            if found.is_empty() {
                self.journal.info(format!("No products on page {}", page));
                continue;
            }

            let before = links.len();
            for link in found {
                if !links.contains(&link) {
                    links.push(link);
                }
            }
            self.journal.info(format!(
                "Found {} products on page {}",
                links.len() - before,
                page
            ));
        }

        Ok(links)
    }

    /// Read only the price of each link, one visit at a time.
    ///
    /// Links whose visit fails are reported with an unavailable price.
    pub async fn check_prices(&self, links: &[String]) -> Vec<PriceCheck> {
        let mut checks = Vec::with_capacity(links.len());

        for (i, link) in links.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.config.price_stagger()).await;
            }

            let readiness = Readiness::Handshake(self.config.price_handshake_timeout());
            let price = match self
                .visit(link, ContentScript::Detail, readiness, PageRequest::ParseDetail)
                .await
            {
                Ok(PageReply::Detail(record)) => record.price,
                Ok(PageReply::Links { .. }) => Price::Unavailable,
                Err(e) => {
                    self.journal
                        .error(format!("Error checking price of {}: {}", link, e));
                    Price::Unavailable
                }
            };

            checks.push(PriceCheck {
                link: link.clone(),
                price,
            });
        }

        checks
    }

    /// One tab visit. The tab is closed on every exit path.
    async fn visit(
        &self,
        url: &str,
        script: ContentScript,
        readiness: Readiness,
        request: PageRequest,
    ) -> Result<PageReply> {
        let _lease = self.tab_lease.lock().await;

        let tab = self.browser.open_tab(url).await?;
        let result = self.drive(tab, script, readiness, request).await;

        if let Err(e) = self.browser.close_tab(tab).await {
            warn!("Failed to close tab {}: {}", tab, e);
        }

        result
    }

    async fn drive(
        &self,
        tab: TabId,
        script: ContentScript,
        readiness: Readiness,
        request: PageRequest,
    ) -> Result<PageReply> {
        self.browser.wait_for_load(tab).await?;
        self.browser.inject(tab, script).await?;

        match readiness {
            Readiness::Handshake(limit) => {
                let handshake = script.handshake();
                tokio::time::timeout(limit, self.browser.wait_for_handshake(tab, handshake))
                    .await
                    .map_err(|_| ParserError::Timeout {
                        what: handshake.as_str().to_string(),
                        after: limit,
                    })??;
            }
            Readiness::Settle(delay) => tokio::time::sleep(delay).await,
        }

        debug!("Sending {:?} to tab {}", request, tab);
        self.browser.send(tab, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::testing::{fast_pipeline_config, FakeBrowser, PageBehavior};
    use crate::domain::ProductRecord;
    use crate::store::SqliteStore;

    fn pipeline(browser: Arc<FakeBrowser>) -> Pipeline {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        Pipeline::new(browser, fast_pipeline_config(), Journal::new(store))
    }

    fn links(n: usize) -> Vec<String> {
        (1..=n)
            .map(|i| format!("https://www.wildberries.ru/catalog/{}/detail.aspx", i))
            .collect()
    }

    #[tokio::test]
    async fn test_timeout_produces_placeholder_and_job_continues() {
        let links = links(5);
        let browser = Arc::new(FakeBrowser::new());
        browser.set(&links[2], PageBehavior::Silent);

        let pipeline = pipeline(browser.clone());
        let mut progress = Vec::new();
        let job = pipeline
            .scrape_details(ScrapeJob::new(links.clone()), |job| {
                progress.push(job.progress_text())
            })
            .await;

        assert!(job.is_complete());
        let results = job.results();
        assert_eq!(results.len(), 5);
        assert_eq!(job.failed_count(), 1);

        match &results[2] {
            ScrapeOutcome::Failed { error, link } => {
                assert_eq!(link, &links[2]);
                assert!(error.starts_with("Parse failed: Timeout waiting for detail_ready"));
            }
            other => panic!("expected placeholder, got {:?}", other),
        }
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.link(), links[i]);
        }

        assert_eq!(progress.first().unwrap(), "Parsing 1 of 5...");
        assert_eq!(progress.last().unwrap(), "Parsing 5 of 5...");
        assert_eq!(browser.opened().len(), 5);
        assert_eq!(browser.closed_count(), 5);
        assert_eq!(browser.max_open_tabs(), 1);
    }

    #[tokio::test]
    async fn test_load_error_is_captured() {
        let links = links(2);
        let browser = Arc::new(FakeBrowser::new());
        browser.set(&links[0], PageBehavior::LoadError);

        let pipeline = pipeline(browser.clone());
        let job = pipeline
            .scrape_details(ScrapeJob::new(links), |_| {})
            .await;

        assert!(job.results()[0].is_failed());
        assert!(!job.results()[1].is_failed());
        assert_eq!(browser.closed_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_job_opens_no_tab() {
        let browser = Arc::new(FakeBrowser::new());
        let pipeline = pipeline(browser.clone());

        let job = pipeline.scrape_details(ScrapeJob::new(vec![]), |_| {}).await;
        assert!(job.is_complete());
        assert!(job.results().is_empty());
        assert!(browser.opened().is_empty());
    }

    #[tokio::test]
    async fn test_collect_links_truncates_to_max() {
        let browser = Arc::new(FakeBrowser::new());
        let listing = "https://www.wildberries.ru/catalog/0/search.aspx?search=x";
        browser.set(listing, PageBehavior::Listing(links(30)));

        let pipeline = pipeline(browser.clone());
        let found = pipeline.collect_links(listing, 20).await.unwrap();
        assert_eq!(found.len(), 20);
        assert_eq!(browser.closed_count(), 1);
    }

    #[tokio::test]
    async fn test_collect_listing_skips_empty_page() {
        let site = SiteConfig::default();
        let listing = Url::parse("https://www.wildberries.ru/catalog/0/search.aspx?search=x").unwrap();
        let links = links(3);

        let browser = Arc::new(FakeBrowser::new());
        browser.set(listing.as_str(), PageBehavior::Listing(links[..1].to_vec()));
        browser.set(&site.page_url(&listing, 2), PageBehavior::Listing(vec![]));
        browser.set(
            &site.page_url(&listing, 3),
            PageBehavior::Listing(vec![links[0].clone(), links[2].clone()]),
        );

        let pipeline = pipeline(browser.clone());
        let found = pipeline.collect_listing(&listing, &site, 3, 100).await.unwrap();

        assert_eq!(found, vec![links[0].clone(), links[2].clone()]);
        assert_eq!(browser.opened().len(), 3);
        assert_eq!(browser.open_count(), 0);
    }

    #[tokio::test]
    async fn test_collect_listing_skips_failed_later_page() {
        let site = SiteConfig::default();
        let listing = Url::parse("https://www.wildberries.ru/catalog/0/search.aspx?search=x").unwrap();
        let links = links(2);

        let browser = Arc::new(FakeBrowser::new());
        browser.set(listing.as_str(), PageBehavior::Listing(links[..1].to_vec()));
        browser.set(&site.page_url(&listing, 2), PageBehavior::LoadError);
        browser.set(&site.page_url(&listing, 3), PageBehavior::Listing(links[1..].to_vec()));

        let pipeline = pipeline(browser.clone());
        let found = pipeline.collect_listing(&listing, &site, 3, 100).await.unwrap();

        assert_eq!(found, links);
        assert_eq!(browser.closed_count(), 3);
    }

    #[tokio::test]
    async fn test_collect_listing_fails_on_first_page_error() {
        let site = SiteConfig::default();
        let listing = Url::parse("https://www.wildberries.ru/catalog/0/search.aspx?search=x").unwrap();

        let browser = Arc::new(FakeBrowser::new());
        browser.set(listing.as_str(), PageBehavior::LoadError);

        let pipeline = pipeline(browser.clone());
        assert!(pipeline.collect_listing(&listing, &site, 3, 100).await.is_err());
        assert_eq!(browser.opened().len(), 1);
    }

    #[tokio::test]
    async fn test_check_prices_reports_unavailable_on_failure() {
        let links = links(2);
        let browser = Arc::new(FakeBrowser::new());
        let mut record = ProductRecord::new(&links[0]);
        record.price = Price::Amount(1999);
        browser.set(&links[0], PageBehavior::Product(record));
        browser.set(&links[1], PageBehavior::Silent);

        let pipeline = pipeline(browser.clone());
        let checks = pipeline.check_prices(&links).await;

        assert_eq!(checks[0].price, Price::Amount(1999));
        assert_eq!(checks[1].price, Price::Unavailable);
        assert_eq!(browser.closed_count(), 2);
    }
}
