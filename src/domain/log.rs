use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "success" => Severity::Success,
            "error" => Severity::Error,
            _ => Severity::Info,
        }
    }
}

/// One line of the persisted activity log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub message: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
            timestamp: Utc::now(),
        }
    }

    /// `[HH:MM:SS] message` in local time
    pub fn display_line(&self) -> String {
        format!(
            "[{}] {}",
            self.timestamp.with_timezone(&Local).format("%H:%M:%S"),
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_roundtrip() {
        for severity in [Severity::Info, Severity::Success, Severity::Error] {
            assert_eq!(Severity::parse(severity.as_str()), severity);
        }
        assert_eq!(Severity::parse("unknown"), Severity::Info);
    }

    #[test]
    fn test_display_line_contains_message() {
        let entry = LogEntry::new("Auto-monitoring stopped", Severity::Info);
        let line = entry.display_line();
        assert!(line.starts_with('['));
        assert!(line.ends_with("Auto-monitoring stopped"));
    }
}
