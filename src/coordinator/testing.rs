//! In-memory browser and notifier used by the coordinator tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::app::{ParserError, Result};
use crate::browser::{Browser, ContentScript, Handshake, PageReply, PageRequest, TabId};
use crate::coordinator::config::PipelineConfig;
use crate::domain::ProductRecord;
use crate::notifier::{Notifier, NotifyOutcome};

/// What a fake tab does for a given URL
#[derive(Debug, Clone)]
pub enum PageBehavior {
    /// Product page answering with this record
    Product(ProductRecord),
    /// Listing page answering with these links
    Listing(Vec<String>),
    /// Loads but never sends its handshake
    Silent,
    /// Fails to load
    LoadError,
}

#[derive(Default)]
pub struct FakeBrowser {
    pages: Mutex<HashMap<String, PageBehavior>>,
    tabs: Mutex<HashMap<TabId, String>>,
    opened: Mutex<Vec<String>>,
    closed: AtomicUsize,
    max_open: AtomicUsize,
    next_tab: AtomicU64,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, url: &str, behavior: PageBehavior) {
        self.pages.lock().unwrap().insert(url.to_string(), behavior);
    }

    /// URLs of every tab opened so far, in order
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    pub fn closed_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn open_count(&self) -> usize {
        self.tabs.lock().unwrap().len()
    }

    /// Highest number of simultaneously open tabs
    pub fn max_open_tabs(&self) -> usize {
        self.max_open.load(Ordering::SeqCst)
    }

    fn behavior(&self, tab: TabId) -> Result<PageBehavior> {
        let url = self
            .tabs
            .lock()
            .unwrap()
            .get(&tab)
            .cloned()
            .ok_or_else(|| ParserError::Browser(format!("Unknown tab {}", tab)))?;

        Ok(self
            .pages
            .lock()
            .unwrap()
            .get(&url)
            .cloned()
            .unwrap_or_else(|| {
                let mut record = ProductRecord::new(&url);
                record.name = format!("Product at {}", url);
                PageBehavior::Product(record)
            }))
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn open_tab(&self, url: &str) -> Result<TabId> {
        let tab = self.next_tab.fetch_add(1, Ordering::SeqCst) + 1;
        let open = {
            let mut tabs = self.tabs.lock().unwrap();
            tabs.insert(tab, url.to_string());
            tabs.len()
        };
        self.max_open.fetch_max(open, Ordering::SeqCst);
        self.opened.lock().unwrap().push(url.to_string());
        Ok(tab)
    }

    async fn wait_for_load(&self, tab: TabId) -> Result<()> {
        match self.behavior(tab)? {
            PageBehavior::LoadError => Err(ParserError::Browser("Navigation failed".to_string())),
            _ => Ok(()),
        }
    }

    async fn inject(&self, tab: TabId, _script: ContentScript) -> Result<()> {
        self.behavior(tab).map(|_| ())
    }

    async fn wait_for_handshake(&self, tab: TabId, _handshake: Handshake) -> Result<()> {
        match self.behavior(tab)? {
            PageBehavior::Silent => std::future::pending().await,
            _ => Ok(()),
        }
    }

    async fn send(&self, tab: TabId, request: PageRequest) -> Result<PageReply> {
        match (self.behavior(tab)?, request) {
            (PageBehavior::Listing(links), PageRequest::GetProductLinks { max }) => {
                Ok(PageReply::Links {
                    links: links.into_iter().take(max).collect(),
                })
            }
            (PageBehavior::Product(record), PageRequest::ParseDetail) => {
                Ok(PageReply::Detail(Box::new(record)))
            }
            (_, request) => Err(ParserError::Extraction(format!(
                "page cannot answer {:?}",
                request
            ))),
        }
    }

    async fn close_tab(&self, tab: TabId) -> Result<()> {
        self.tabs.lock().unwrap().remove(&tab);
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Notifier that records every call
#[derive(Default)]
pub struct RecordingNotifier {
    calls: Mutex<Vec<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, links: &[String]) -> NotifyOutcome {
        self.calls.lock().unwrap().push(links.to_vec());
        if links.is_empty() {
            NotifyOutcome::Skipped {
                reason: "empty product list".to_string(),
            }
        } else {
            NotifyOutcome::Delivered
        }
    }
}

/// Pipeline timing scaled down for tests
pub fn fast_pipeline_config() -> PipelineConfig {
    PipelineConfig {
        detail_handshake_timeout_ms: 50,
        price_handshake_timeout_ms: 50,
        min_delay_ms: 0,
        max_delay_ms: 1,
        listing_settle_ms: 0,
        page_delay_ms: 0,
        price_stagger_ms: 0,
    }
}
