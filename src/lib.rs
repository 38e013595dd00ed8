//! # wbparser
//!
//! Scrapes product listings and product pages from Wildberries in a headless
//! browser and reports new products to a Telegram chat.
//!
//! ## Architecture
//!
//! ```text
//! CLI → Coordinator → Pipeline → Browser (tab + injected script) → Extract
//!            │                                                       │
//!            └── Monitor loop ── sent-set ── Notifier ◄──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! # Scrape the first two pages of a search
//! wbparser parse "https://www.wildberries.ru/catalog/0/search.aspx?search=lamp" --pages 2
//!
//! # Watch a category every 15 minutes
//! wbparser monitor start "https://www.wildberries.ru/catalog/dom/svet" --interval 15m
//!
//! # Show the activity log
//! wbparser logs
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together config, store,
/// journal and notifier, and launches the browser on demand.
pub mod app;

/// Tab-level browser platform and its chromiumoxide implementation.
pub mod browser;

/// Command-line interface using clap.
///
/// - `parse <url>` - Collect links and scrape every product
/// - `monitor start|run|stop|status|test` - Watch a listing page
/// - `logs [--clear]` - Show or clear the activity log
/// - `results [--send]` - Show or resend the last parse result
pub mod cli;

/// Configuration loaded from `~/.config/wbparser/config.toml`.
pub mod config;

/// Command loop owning the scrape job and the monitor loop.
pub mod coordinator;

/// Foreground monitor daemon with a PID file.
pub mod daemon;

/// Core domain models.
///
/// - [`ScrapeJob`](domain::ScrapeJob): Cursor over a fixed link list
/// - [`ProductRecord`](domain::ProductRecord): Flat product data
/// - [`MonitorSettings`](domain::MonitorSettings): Persisted monitor session
pub mod domain;

/// Content scripts and normalisation of their raw output.
pub mod extract;

/// Activity log mirrored into storage.
pub mod journal;

/// Size-bounded Telegram notifications.
pub mod notifier;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;
