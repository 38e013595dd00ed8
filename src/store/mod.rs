pub mod sqlite;

use crate::app::Result;
use crate::domain::{LogEntry, MonitorSettings, ScrapeOutcome};

pub use sqlite::SqliteStore;

/// Local key/value persistence shared by the coordinator and the CLI.
///
/// Writes are last-write-wins; there is no transaction spanning calls.
pub trait Store: Send + Sync {
    // Activity log
    fn append_log(&self, entry: &LogEntry) -> Result<()>;
    fn get_logs(&self) -> Result<Vec<LogEntry>>;
    fn clear_logs(&self) -> Result<()>;

    // Last scrape job result
    fn save_last_parse_result(&self, results: &[ScrapeOutcome]) -> Result<()>;
    fn get_last_parse_result(&self) -> Result<Option<Vec<ScrapeOutcome>>>;
    fn clear_last_parse_result(&self) -> Result<()>;

    // Monitor settings
    fn get_monitor_settings(&self) -> Result<MonitorSettings>;
    fn save_monitor_settings(&self, settings: &MonitorSettings) -> Result<()>;
    fn set_monitoring_enabled(&self, enabled: bool) -> Result<()>;

    // Sent-set
    fn get_sent_links(&self) -> Result<Vec<String>>;
    fn add_sent_links(&self, urls: &[String]) -> Result<usize>;
    fn clear_sent_links(&self) -> Result<()>;
}
