//! Configuration management for wbparser.
//!
//! Configuration is read from `~/.config/wbparser/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use crate::browser::BrowserConfig;
use crate::coordinator::{MonitorConfig, PipelineConfig};
use crate::extract::SiteConfig;
use crate::notifier::TelegramConfig;
use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub browser: BrowserConfig,
    pub site: SiteConfig,
    pub pipeline: PipelineConfig,
    pub monitor: MonitorConfig,
    pub telegram: TelegramConfig,
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// Missing fields in the config file use default values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_config_path()?)
    }

    /// Load configuration from `path`, creating it with defaults if missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            Self::create_default_config(path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/wbparser/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("wbparser").join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> &'static str {
        r##"# wbparser configuration

[telegram]
# Bot token issued by @BotFather and the target chat id.
# Notifications are skipped while either is empty.
bot_token = ""
chat_id = ""

# Character budget of one message
max_message_chars = 3500

# Request timeout in seconds
timeout_secs = 10

[browser]
# Run Chrome without a visible window
headless = true

# Delay before reading a product page (milliseconds)
detail_settle_ms = 3000

# Poll interval for the content script handshake (milliseconds)
handshake_poll_ms = 250

# Page load timeout in seconds; leave unset to wait for the load event
# navigation_timeout_secs = 60

[pipeline]
# Handshake budget for product pages (milliseconds)
detail_handshake_timeout_ms = 10000

# Handshake budget during price checks (milliseconds)
price_handshake_timeout_ms = 8000

# Random pause between two product pages (milliseconds)
min_delay_ms = 4000
max_delay_ms = 6000

# Wait after loading a listing page before reading links (milliseconds)
listing_settle_ms = 3000

# Pause between listing pages (milliseconds)
page_delay_ms = 2000

# Pause between price checks (milliseconds)
price_stagger_ms = 2000

[monitor]
# Links read from the monitored page per check
max_links = 20

# Delay before the first check after `monitor start` (milliseconds)
first_check_delay_ms = 6000

# Visit each new product and skip those above the max price
apply_price_filter = false

[site]
base_url = "https://www.wildberries.ru"
"##
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
