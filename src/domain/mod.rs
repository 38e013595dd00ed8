pub mod job;
pub mod log;
pub mod monitor;
pub mod product;

pub use job::ScrapeJob;
pub use log::{LogEntry, Severity};
pub use monitor::{CheckReport, MonitorSettings, MonitorState};
pub use product::{Price, PriceCheck, ProductRecord, ScrapeOutcome};
