use std::sync::Arc;

use tracing::{error, info, warn};

use crate::domain::{LogEntry, Severity};
use crate::store::Store;

/// Activity log visible to the user.
///
/// Every message goes to `tracing` and is appended to the persisted `logs`
/// table. Storage failures are traced and otherwise ignored.
#[derive(Clone)]
pub struct Journal {
    store: Arc<dyn Store>,
}

impl Journal {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.record(message.into(), Severity::Info);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.record(message.into(), Severity::Success);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.record(message.into(), Severity::Error);
    }

    fn record(&self, message: String, severity: Severity) {
        match severity {
            Severity::Error => error!("{}", message),
            Severity::Info | Severity::Success => info!("{}", message),
        }

        let entry = LogEntry::new(message, severity);
        if let Err(e) = self.store.append_log(&entry) {
            warn!("Failed to persist log entry: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;

    #[test]
    fn test_journal_persists_entries() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let journal = Journal::new(store.clone());

        journal.info("Checking for new products");
        journal.success("Successfully sent to Telegram");
        journal.error("No monitor URL configured");

        let logs = store.get_logs().unwrap();
        let severities: Vec<_> = logs.iter().map(|l| l.severity).collect();
        assert_eq!(
            severities,
            vec![Severity::Info, Severity::Success, Severity::Error]
        );
        assert_eq!(logs[2].message, "No monitor URL configured");
    }
}
