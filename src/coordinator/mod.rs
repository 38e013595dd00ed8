//! Long-lived coordinator owning the scrape job and the monitor loop.
//!
//! Control surfaces talk to it only through a [`CoordinatorHandle`]: commands
//! go in over a channel and are acknowledged at once, progress and results come
//! back as broadcast [`CoordinatorEvent`]s.
//!
//! # Scrape job
//!
//! ```text
//! StartParse{links}
//!   for each link, in order:
//!     open tab → load → inject detail script → detail_ready (10s) → parse → close tab
//!     failure stores a placeholder, the job moves on
//!     random 4-6s pause
//!   save lastParseResult → notify → AllParsed
//! ```
//!
//! # Monitor check
//!
//! ```text
//! listing tab → links (max 20) → diff against sent-set → notify new → add new to sent-set
//! ```

mod background;
mod config;
mod monitor;
mod pipeline;

#[cfg(test)]
mod testing;

pub use background::{
    spawn_coordinator, Command, CommandStatus, Coordinator, CoordinatorEvent, CoordinatorHandle,
};
pub use config::{MonitorConfig, PipelineConfig};
pub use monitor::{MonitorCheck, MonitorLoop};
pub use pipeline::Pipeline;
