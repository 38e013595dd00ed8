use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::app::{ParserError, Result};
use crate::journal::Journal;
use crate::notifier::message::{compose_message, MESSAGE_BUDGET};
use crate::notifier::{Notifier, NotifyOutcome};

/// Telegram Bot API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot API base URL (default: https://api.telegram.org)
    pub api_base: String,

    /// Bot token issued by @BotFather
    pub bot_token: String,

    /// Target chat or channel id
    pub chat_id: String,

    /// Character budget of one message (default: 3500)
    pub max_message_chars: usize,

    /// Request timeout in seconds (default: 10)
    pub timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.telegram.org".to_string(),
            bot_token: String::new(),
            chat_id: String::new(),
            max_message_chars: MESSAGE_BUDGET,
            timeout_secs: 10,
        }
    }
}

impl TelegramConfig {
    pub fn is_configured(&self) -> bool {
        !self.bot_token.trim().is_empty() && !self.chat_id.trim().is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Body returned by `sendMessage`
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramResponse {
    pub ok: bool,
    pub description: Option<String>,
    pub error_code: Option<i64>,
}

impl TelegramResponse {
    pub fn failure_reason(&self) -> String {
        self.description
            .clone()
            .or_else(|| self.error_code.map(|c| c.to_string()))
            .unwrap_or_else(|| "unknown error".to_string())
    }
}

/// Sends link summaries to a Telegram chat with a single GET request
pub struct TelegramNotifier {
    client: Client,
    config: TelegramConfig,
    journal: Journal,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig, journal: Journal) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .gzip(true)
            .brotli(true)
            .user_agent(concat!("wbparser/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            config,
            journal,
        })
    }

    /// `sendMessage` URL with the text URL-encoded as a query parameter
    pub fn send_url(&self, text: &str) -> Result<Url> {
        let endpoint = format!(
            "{}/bot{}/sendMessage",
            self.config.api_base.trim_end_matches('/'),
            self.config.bot_token
        );
        Ok(Url::parse_with_params(
            &endpoint,
            &[
                ("chat_id", self.config.chat_id.as_str()),
                ("text", text),
                ("disable_web_page_preview", "true"),
            ],
        )?)
    }

    async fn deliver(&self, url: Url) -> Result<TelegramResponse> {
        let response = self.client.get(url).send().await?;
        self.journal
            .info(format!("Telegram API response status: {}", response.status()));

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(ParserError::from)
    }

    fn masked_token(&self) -> String {
        let prefix: String = self.config.bot_token.chars().take(10).collect();
        format!("{}...", prefix)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, links: &[String]) -> NotifyOutcome {
        self.journal.info("Preparing Telegram message");

        let Some(message) = compose_message(links, self.config.max_message_chars) else {
            self.journal.error("No products to send to Telegram");
            return NotifyOutcome::Skipped {
                reason: "empty product list".to_string(),
            };
        };

        if !self.config.is_configured() {
            self.journal
                .error("Telegram bot token or chat id is not configured");
            return NotifyOutcome::Skipped {
                reason: "telegram is not configured".to_string(),
            };
        }

        self.journal.info(format!(
            "Message length: {} characters",
            message.chars().count()
        ));
        self.journal
            .info(format!("Using bot token: {}", self.masked_token()));
        self.journal
            .info(format!("Using chat ID: {}", self.config.chat_id));

        let url = match self.send_url(&message) {
            Ok(url) => url,
            Err(e) => {
                self.journal.error(format!("Invalid Telegram URL: {}", e));
                return NotifyOutcome::Failed {
                    error: e.to_string(),
                };
            }
        };

        self.journal.info("Sending to Telegram API");
        match self.deliver(url).await {
            Ok(response) if response.ok => {
                self.journal.success("Successfully sent to Telegram");
                NotifyOutcome::Delivered
            }
            Ok(response) => {
                let reason = response.failure_reason();
                self.journal.error(format!("Telegram error: {}", reason));
                NotifyOutcome::Rejected { reason }
            }
            Err(e) => {
                self.journal.error(format!("Network error: {}", e));
                NotifyOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}
