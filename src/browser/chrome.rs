use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpBrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;

use crate::app::{ParserError, Result};
use crate::browser::config::BrowserConfig;
use crate::browser::{Browser, ContentScript, Handshake, PageReply, PageRequest, TabId};
use crate::extract::{ContentScripts, DetailExtractor, LinkCollector, RawDetail, RawListing, SiteConfig};

/// Headless Chrome driven through chromiumoxide
pub struct ChromeBrowser {
    browser: CdpBrowser,
    config: BrowserConfig,
    scripts: ContentScripts,
    links: LinkCollector,
    detail: DetailExtractor,
    tabs: Mutex<HashMap<TabId, Page>>,
    next_tab: AtomicU64,
}

impl ChromeBrowser {
    /// Launch a browser process with the given configuration
    pub async fn launch(config: BrowserConfig, site: SiteConfig) -> Result<Self> {
        let mut builder = CdpBrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-blink-features=AutomationControlled");

        if !config.headless {
            builder = builder.with_head();
        }

        let browser_config = builder
            .build()
            .map_err(|e| ParserError::Browser(format!("Failed to build browser config: {}", e)))?;

        let (browser, mut handler) = CdpBrowser::launch(browser_config).await.map_err(|e| {
            ParserError::Browser(format!(
                "Failed to launch browser: {}. Is Chrome or Chromium installed and in PATH?",
                e
            ))
        })?;

        tokio::spawn(async move {
            while let Some(_event) = handler.next().await {
                // Drive the CDP connection
            }
        });

        Ok(Self {
            browser,
            config,
            scripts: ContentScripts::new(site.clone()),
            links: LinkCollector::new(site),
            detail: DetailExtractor::new(),
            tabs: Mutex::new(HashMap::new()),
            next_tab: AtomicU64::new(1),
        })
    }

    fn page(&self, tab: TabId) -> Result<Page> {
        self.tabs
            .lock()
            .map_err(|e| ParserError::Browser(format!("Tab registry poisoned: {}", e)))?
            .get(&tab)
            .cloned()
            .ok_or_else(|| ParserError::Browser(format!("Unknown tab {}", tab)))
    }

    async fn evaluate<T: DeserializeOwned>(&self, page: &Page, expression: String) -> Result<T> {
        page.evaluate(expression)
            .await
            .map_err(|e| ParserError::Extraction(format!("Script execution failed: {}", e)))?
            .into_value()
            .map_err(|e| ParserError::Extraction(format!("Failed to parse result: {:?}", e)))
    }
}

#[async_trait]
impl Browser for ChromeBrowser {
    async fn open_tab(&self, url: &str) -> Result<TabId> {
        let page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| ParserError::Browser(format!("Failed to create page: {}", e)))?;

        if let Some(ref ua) = self.config.user_agent {
            page.set_user_agent(ua)
                .await
                .map_err(|e| ParserError::Browser(format!("Failed to set user agent: {}", e)))?;
        }

        let tab = self.next_tab.fetch_add(1, Ordering::Relaxed);
        self.tabs
            .lock()
            .map_err(|e| ParserError::Browser(format!("Tab registry poisoned: {}", e)))?
            .insert(tab, page);

        tracing::debug!("Opened tab {} at {}", tab, url);
        Ok(tab)
    }

    async fn wait_for_load(&self, tab: TabId) -> Result<()> {
        let page = self.page(tab)?;
        let navigation = page.wait_for_navigation();

        let loaded = match self.config.navigation_timeout() {
            Some(limit) => tokio::time::timeout(limit, navigation).await.map_err(|_| {
                ParserError::Timeout {
                    what: "page load".to_string(),
                    after: limit,
                }
            })?,
            None => navigation.await,
        };

        loaded.map_err(|e| ParserError::Browser(format!("Navigation failed: {}", e)))?;
        Ok(())
    }

    async fn inject(&self, tab: TabId, script: ContentScript) -> Result<()> {
        let page = self.page(tab)?;
        let _: bool = self.evaluate(&page, self.scripts.source(script)).await?;
        Ok(())
    }

    async fn wait_for_handshake(&self, tab: TabId, handshake: Handshake) -> Result<()> {
        let page = self.page(tab)?;
        let ready_check = self.scripts.handshake_script(handshake);

        loop {
            let ready: bool = self.evaluate(&page, ready_check.clone()).await.unwrap_or(false);
            if ready {
                tracing::debug!("Received {} from tab {}", handshake.as_str(), tab);
                return Ok(());
            }
            tokio::time::sleep(self.config.handshake_poll()).await;
        }
    }

    async fn send(&self, tab: TabId, request: PageRequest) -> Result<PageReply> {
        let page = self.page(tab)?;
        let expression = self.scripts.request_expression(&request);

        match request {
            PageRequest::GetProductLinks { max } => {
                let raw: RawListing = self.evaluate(&page, expression).await?;
                Ok(PageReply::Links {
                    links: self.links.collect(&raw, max),
                })
            }
            PageRequest::ParseDetail => {
                tokio::time::sleep(self.config.detail_settle()).await;
                let raw: RawDetail = self.evaluate(&page, expression).await?;
                Ok(PageReply::Detail(Box::new(self.detail.build(&raw))))
            }
        }
    }

    async fn close_tab(&self, tab: TabId) -> Result<()> {
        let page = self
            .tabs
            .lock()
            .map_err(|e| ParserError::Browser(format!("Tab registry poisoned: {}", e)))?
            .remove(&tab);

        match page {
            Some(page) => page
                .close()
                .await
                .map_err(|e| ParserError::Browser(format!("Failed to close page: {}", e))),
            None => Ok(()),
        }
    }
}
