use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Timing of the detail-scraping pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Budget for the `detail_ready` handshake in milliseconds (default: 10000)
    pub detail_handshake_timeout_ms: u64,

    /// Budget for the handshake during price-only checks (default: 8000)
    pub price_handshake_timeout_ms: u64,

    /// Lower bound of the random pause between two detail pages (default: 4000)
    pub min_delay_ms: u64,

    /// Upper bound of the random pause between two detail pages (default: 6000)
    pub max_delay_ms: u64,

    /// Pause after injecting the listing script before collecting links
    /// (default: 3000)
    pub listing_settle_ms: u64,

    /// Pause between two listing pages of a multi-page collection (default: 2000)
    pub page_delay_ms: u64,

    /// Pause between two visits of a price-only check (default: 2000)
    pub price_stagger_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            detail_handshake_timeout_ms: 10_000,
            price_handshake_timeout_ms: 8_000,
            min_delay_ms: 4_000,
            max_delay_ms: 6_000,
            listing_settle_ms: 3_000,
            page_delay_ms: 2_000,
            price_stagger_ms: 2_000,
        }
    }
}

impl PipelineConfig {
    pub fn detail_handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.detail_handshake_timeout_ms)
    }

    pub fn price_handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.price_handshake_timeout_ms)
    }

    /// Random pause between two detail pages
    pub fn item_delay(&self) -> Duration {
        let (low, high) = if self.min_delay_ms <= self.max_delay_ms {
            (self.min_delay_ms, self.max_delay_ms)
        } else {
            (self.max_delay_ms, self.min_delay_ms)
        };
        Duration::from_millis(rand::thread_rng().gen_range(low..=high))
    }

    pub fn listing_settle(&self) -> Duration {
        Duration::from_millis(self.listing_settle_ms)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn price_stagger(&self) -> Duration {
        Duration::from_millis(self.price_stagger_ms)
    }
}

/// Behaviour of the monitor loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Maximum number of links read from the monitored page (default: 20)
    pub max_links: usize,

    /// Delay before the first check after monitoring starts (default: 6000)
    pub first_check_delay_ms: u64,

    /// Visit new products and drop those above the max price (default: false)
    pub apply_price_filter: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            max_links: 20,
            first_check_delay_ms: 6_000,
            apply_price_filter: false,
        }
    }
}

impl MonitorConfig {
    pub fn first_check_delay(&self) -> Duration {
        Duration::from_millis(self.first_check_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let config = PipelineConfig::default();
        assert_eq!(config.detail_handshake_timeout(), Duration::from_secs(10));
        assert_eq!(config.price_handshake_timeout(), Duration::from_secs(8));
        assert_eq!(config.listing_settle(), Duration::from_secs(3));
    }

    #[test]
    fn test_item_delay_within_bounds() {
        let config = PipelineConfig::default();
        for _ in 0..100 {
            let delay = config.item_delay();
            assert!(delay >= Duration::from_secs(4));
            assert!(delay <= Duration::from_secs(6));
        }
    }

    #[test]
    fn test_item_delay_tolerates_swapped_bounds() {
        let config = PipelineConfig {
            min_delay_ms: 20,
            max_delay_ms: 10,
            ..Default::default()
        };
        let delay = config.item_delay();
        assert!(delay >= Duration::from_millis(10) && delay <= Duration::from_millis(20));
    }

    #[test]
    fn test_monitor_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.max_links, 20);
        assert_eq!(config.first_check_delay(), Duration::from_secs(6));
        assert!(!config.apply_price_filter);
    }
}
