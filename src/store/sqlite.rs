use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use rusqlite_migration::{Migrations, M};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::app::{ParserError, Result};
use crate::domain::{LogEntry, MonitorSettings, ScrapeOutcome, Severity};
use crate::store::Store;

const KEY_LAST_PARSE_RESULT: &str = "lastParseResult";
const KEY_MONITOR_URL: &str = "monitorUrl";
const KEY_MONITOR_INTERVAL: &str = "monitorInterval";
const KEY_MAX_PRICE: &str = "maxPrice";
const KEY_MONITORING_ENABLED: &str = "monitoringEnabled";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock()?;
        migrations
            .to_latest(&mut conn)
            .map_err(|e| ParserError::Other(format!("Migration failed: {}", e)))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            ParserError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn get_value<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let conn = self.lock()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn set_value<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, raw],
        )?;
        Ok(())
    }

    fn remove_value(&self, key: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM settings WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    }
}

impl Store for SqliteStore {
    fn append_log(&self, entry: &LogEntry) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO logs (message, severity, created_at) VALUES (?1, ?2, ?3)",
            params![
                entry.message,
                entry.severity.as_str(),
                entry.timestamp.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn get_logs(&self) -> Result<Vec<LogEntry>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT message, severity, created_at FROM logs ORDER BY id")?;

        let entries = stmt
            .query_map([], |row| {
                Ok(LogEntry {
                    message: row.get(0)?,
                    severity: Severity::parse(&row.get::<_, String>(1)?),
                    timestamp: row
                        .get::<_, String>(2)
                        .ok()
                        .and_then(|s| Self::parse_datetime(&s))
                        .unwrap_or_else(Utc::now),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    fn clear_logs(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM logs", [])?;
        Ok(())
    }

    fn save_last_parse_result(&self, results: &[ScrapeOutcome]) -> Result<()> {
        self.set_value(KEY_LAST_PARSE_RESULT, results)
    }

    fn get_last_parse_result(&self) -> Result<Option<Vec<ScrapeOutcome>>> {
        self.get_value(KEY_LAST_PARSE_RESULT)
    }

    fn clear_last_parse_result(&self) -> Result<()> {
        self.remove_value(KEY_LAST_PARSE_RESULT)
    }

    fn get_monitor_settings(&self) -> Result<MonitorSettings> {
        let defaults = MonitorSettings::default();
        Ok(MonitorSettings {
            target_url: self.get_value(KEY_MONITOR_URL)?,
            interval_minutes: self
                .get_value(KEY_MONITOR_INTERVAL)?
                .unwrap_or(defaults.interval_minutes),
            max_price: self.get_value(KEY_MAX_PRICE)?.unwrap_or(defaults.max_price),
            enabled: self
                .get_value(KEY_MONITORING_ENABLED)?
                .unwrap_or(defaults.enabled),
        })
    }

    fn save_monitor_settings(&self, settings: &MonitorSettings) -> Result<()> {
        match settings.target_url {
            Some(ref url) => self.set_value(KEY_MONITOR_URL, url)?,
            None => self.remove_value(KEY_MONITOR_URL)?,
        }
        self.set_value(KEY_MONITOR_INTERVAL, &settings.interval_minutes)?;
        self.set_value(KEY_MAX_PRICE, &settings.max_price)?;
        self.set_value(KEY_MONITORING_ENABLED, &settings.enabled)?;
        Ok(())
    }

    fn set_monitoring_enabled(&self, enabled: bool) -> Result<()> {
        self.set_value(KEY_MONITORING_ENABLED, &enabled)
    }

    fn get_sent_links(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT url FROM sent_links ORDER BY sent_at, url")?;
        let links = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(links)
    }

    fn add_sent_links(&self, urls: &[String]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();
        let mut added = 0;

        {
            let mut stmt =
                tx.prepare("INSERT OR IGNORE INTO sent_links (url, sent_at) VALUES (?1, ?2)")?;
            for url in urls {
                added += stmt.execute(params![url, now])?;
            }
        }

        tx.commit()?;
        Ok(added)
    }

    fn clear_sent_links(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM sent_links", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Price, ProductRecord};

    #[test]
    fn test_logs_append_and_clear() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .append_log(&LogEntry::new("first", Severity::Info))
            .unwrap();
        store
            .append_log(&LogEntry::new("second", Severity::Error))
            .unwrap();

        let logs = store.get_logs().unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].message, "first");
        assert_eq!(logs[1].severity, Severity::Error);

        store.clear_logs().unwrap();
        assert!(store.get_logs().unwrap().is_empty());
    }

    #[test]
    fn test_last_parse_result_roundtrip() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.get_last_parse_result().unwrap().is_none());

        let mut record = ProductRecord::new("https://www.wildberries.ru/catalog/1/detail.aspx");
        record.price = Price::Amount(1999);
        let results = vec![
            ScrapeOutcome::Parsed(record),
            ScrapeOutcome::failed("https://www.wildberries.ru/catalog/2/detail.aspx", "timeout"),
        ];
        store.save_last_parse_result(&results).unwrap();
        assert_eq!(store.get_last_parse_result().unwrap(), Some(results));

        store.clear_last_parse_result().unwrap();
        assert!(store.get_last_parse_result().unwrap().is_none());
    }

    #[test]
    fn test_monitor_settings_defaults() {
        let store = SqliteStore::in_memory().unwrap();
        let settings = store.get_monitor_settings().unwrap();
        assert_eq!(settings, MonitorSettings::default());
    }

    #[test]
    fn test_monitor_settings_save_and_toggle() {
        let store = SqliteStore::in_memory().unwrap();
        let settings = MonitorSettings {
            target_url: Some("https://www.wildberries.ru/catalog/obuv".into()),
            interval_minutes: 30,
            max_price: 12_000,
            enabled: true,
        };
        store.save_monitor_settings(&settings).unwrap();
        assert_eq!(store.get_monitor_settings().unwrap(), settings);

        store.set_monitoring_enabled(false).unwrap();
        let updated = store.get_monitor_settings().unwrap();
        assert!(!updated.enabled);
        assert_eq!(updated.target_url, settings.target_url);
    }

    #[test]
    fn test_sent_links_are_a_set() {
        let store = SqliteStore::in_memory().unwrap();
        let added = store
            .add_sent_links(&["https://a".to_string(), "https://b".to_string()])
            .unwrap();
        assert_eq!(added, 2);

        let added = store
            .add_sent_links(&["https://b".to_string(), "https://c".to_string()])
            .unwrap();
        assert_eq!(added, 1);

        let sent = store.get_sent_links().unwrap();
        assert_eq!(sent.len(), 3);
        assert!(sent.contains(&"https://a".to_string()));
        assert!(!sent.contains(&"https://z".to_string()));

        store.clear_sent_links().unwrap();
        assert!(store.get_sent_links().unwrap().is_empty());
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wbparser.db");

        {
            let store = SqliteStore::new(&path).unwrap();
            store.add_sent_links(&["https://a".to_string()]).unwrap();
        }

        let store = SqliteStore::new(&path).unwrap();
        assert_eq!(store.get_sent_links().unwrap(), vec!["https://a".to_string()]);
    }
}
