use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the headless browser
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Whether to run the browser in headless mode (default: true)
    pub headless: bool,

    /// Page load timeout in seconds; unset means wait for the navigation
    /// event indefinitely
    pub navigation_timeout_secs: Option<u64>,

    /// Delay before reading a detail page, lets late price/rating widgets
    /// render (default: 3000)
    pub detail_settle_ms: u64,

    /// How often to poll an injected script for its readiness handshake
    /// (default: 250)
    pub handshake_poll_ms: u64,

    /// User agent string to use
    pub user_agent: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            navigation_timeout_secs: None,
            detail_settle_ms: 3000,
            handshake_poll_ms: 250,
            user_agent: Some(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                    .to_string(),
            ),
        }
    }
}

impl BrowserConfig {
    pub fn navigation_timeout(&self) -> Option<Duration> {
        self.navigation_timeout_secs.map(Duration::from_secs)
    }

    pub fn detail_settle(&self) -> Duration {
        Duration::from_millis(self.detail_settle_ms)
    }

    pub fn handshake_poll(&self) -> Duration {
        Duration::from_millis(self.handshake_poll_ms.max(10))
    }
}
