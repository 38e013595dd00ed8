use serde::{Deserialize, Serialize};

pub const DEFAULT_INTERVAL_MINUTES: u64 = 15;
/// One year
pub const MAX_INTERVAL_MINUTES: u64 = 365 * 1440;
pub const DEFAULT_MAX_PRICE: u64 = 50_000;

/// Persisted settings of the monitoring session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorSettings {
    pub target_url: Option<String>,
    pub interval_minutes: u64,
    pub max_price: u64,
    pub enabled: bool,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            target_url: None,
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            max_price: DEFAULT_MAX_PRICE,
            enabled: false,
        }
    }
}

/// Lifecycle of the monitor loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    Idle,
    Scheduled,
    Checking,
}

/// Summary of one monitor check
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckReport {
    /// Links found on the listing page
    pub found: usize,
    /// Links not present in the sent-set before this check
    pub new_links: Vec<String>,
    /// Links included in the notification
    pub notified: Vec<String>,
}
