pub mod commands;

use clap::{Parser, Subcommand};

use crate::domain::monitor::DEFAULT_MAX_PRICE;

#[derive(Parser)]
#[command(name = "wbparser")]
#[command(about = "Wildberries product scraper with Telegram notifications", long_about = None)]
pub struct Cli {
    /// Path to the SQLite database (default: data dir/wbparser/wbparser.db)
    #[arg(long, global = true)]
    pub db: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect product links from a listing page and scrape every product
    Parse {
        /// Catalog or search page URL
        url: String,

        /// Number of listing pages to visit
        #[arg(short, long, default_value_t = 1)]
        pages: u32,

        /// Maximum number of links collected per page
        #[arg(short, long, default_value_t = 10)]
        max_products: usize,
    },
    /// Watch a listing page for new products
    Monitor {
        #[command(subcommand)]
        action: MonitorAction,
    },
    /// Show the activity log
    Logs {
        /// Clear the log instead of printing it
        #[arg(long)]
        clear: bool,
    },
    /// Show the result of the last parse
    Results {
        /// Send the saved result to Telegram and clear it
        #[arg(long)]
        send: bool,
    },
}

#[derive(Subcommand)]
pub enum MonitorAction {
    /// Start a new monitoring session and run it in the foreground
    Start {
        /// Catalog or search page URL to watch
        url: String,

        /// Check interval (e.g., "15", "30m", "2h")
        #[arg(short, long, default_value = "15m")]
        interval: String,

        /// Maximum price in rubles
        #[arg(long, default_value_t = DEFAULT_MAX_PRICE)]
        max_price: u64,
    },
    /// Resume the saved monitoring session in the foreground
    Run,
    /// Stop the running monitor daemon
    Stop,
    /// Show monitor settings and daemon status
    Status,
    /// Clear the sent links and run one check now
    Test,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::try_parse_from(["wbparser", "parse", "https://www.wildberries.ru/catalog/dom"])
            .unwrap();
        match cli.command {
            Commands::Parse {
                pages,
                max_products,
                ..
            } => {
                assert_eq!(pages, 1);
                assert_eq!(max_products, 10);
            }
            _ => panic!("expected parse command"),
        }
    }
}
