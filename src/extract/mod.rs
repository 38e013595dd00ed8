//! Content-script side of the scraper.
//!
//! The injected JavaScript only reads the page and returns raw values. Turning
//! those into product URLs and [`ProductRecord`](crate::domain::ProductRecord)s
//! happens here, in Rust, where it can be tested without a browser.
//!
//! ```text
//! ContentScripts (JS) → RawListing → LinkCollector  → Vec<url>
//!                     → RawDetail  → DetailExtractor → ProductRecord
//! ```

mod detail;
mod links;
mod scripts;
mod site;

pub use detail::{DetailExtractor, RawDetail};
pub use links::{LinkCollector, RawListing};
pub use scripts::ContentScripts;
pub use site::SiteConfig;
