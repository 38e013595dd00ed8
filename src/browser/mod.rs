//! Browser platform used by the coordinator.
//!
//! The coordinator never touches Chrome directly: it opens tabs, injects
//! content scripts, waits for their readiness handshake and exchanges one
//! request/reply per visit through the [`Browser`] trait.
//!
//! # Visit lifecycle
//!
//! ```text
//! open_tab → wait_for_load → inject → wait_for_handshake → send → close_tab
//! ```
//!
//! Timeouts are applied by the caller; `wait_for_handshake` itself waits as
//! long as it is polled.

mod chrome;
mod config;

pub use chrome::ChromeBrowser;
pub use config::BrowserConfig;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::app::Result;
use crate::domain::ProductRecord;

/// Opaque handle of an open tab
pub type TabId = u64;

/// Scripts that can be injected into a tab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentScript {
    /// Link collector for search and category pages
    Listing,
    /// Detail extractor for product pages
    Detail,
}

impl ContentScript {
    /// Handshake the script announces once it is installed
    pub fn handshake(self) -> Handshake {
        match self {
            ContentScript::Listing => Handshake::ContentReady,
            ContentScript::Detail => Handshake::DetailReady,
        }
    }
}

/// Readiness message sent by an injected script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Handshake {
    ContentReady,
    DetailReady,
}

impl Handshake {
    pub fn as_str(&self) -> &'static str {
        match self {
            Handshake::ContentReady => "content_ready",
            Handshake::DetailReady => "detail_ready",
        }
    }
}

/// Work request sent to an injected script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PageRequest {
    GetProductLinks { max: usize },
    ParseDetail,
}

/// Reply of an injected script to a [`PageRequest`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageReply {
    Links { links: Vec<String> },
    Detail(Box<ProductRecord>),
}

/// Tab-level browser operations
#[async_trait]
pub trait Browser: Send + Sync {
    /// Open a background tab at `url`
    async fn open_tab(&self, url: &str) -> Result<TabId>;

    /// Wait until the tab reports its page load as complete
    async fn wait_for_load(&self, tab: TabId) -> Result<()>;

    /// Inject a content script into the tab
    async fn inject(&self, tab: TabId, script: ContentScript) -> Result<()>;

    /// Wait for the injected script to announce `handshake`
    async fn wait_for_handshake(&self, tab: TabId, handshake: Handshake) -> Result<()>;

    /// Send a request to the injected script and await its single reply
    async fn send(&self, tab: TabId, request: PageRequest) -> Result<PageReply>;

    /// Close the tab
    async fn close_tab(&self, tab: TabId) -> Result<()>;
}
