//! Outbound notifications.
//!
//! A notification is a single size-bounded text message listing product links.
//! Delivery problems are reported as a [`NotifyOutcome`] and logged; they never
//! fail the job that triggered the notification.

mod message;
mod telegram;

pub use message::{compose_message, truncation_notice, MESSAGE_BUDGET};
pub use telegram::{TelegramConfig, TelegramNotifier, TelegramResponse};

use async_trait::async_trait;

/// What happened to a notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// Nothing was sent (empty input or missing configuration)
    Skipped { reason: String },
    /// The webhook acknowledged the message
    Delivered,
    /// The webhook answered with `ok: false`
    Rejected { reason: String },
    /// The request did not complete
    Failed { error: String },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send one message listing `links`
    async fn notify(&self, links: &[String]) -> NotifyOutcome;
}
