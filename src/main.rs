use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use wbparser::app::AppContext;
use wbparser::cli::{commands, Cli, Commands, MonitorAction};
use wbparser::config::Config;
use wbparser::daemon;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let ctx = AppContext::new(config, cli.db)?;

    match cli.command {
        Commands::Parse {
            url,
            pages,
            max_products,
        } => {
            commands::parse_listing(&ctx, &url, pages, max_products).await?;
        }
        Commands::Monitor { action } => match action {
            MonitorAction::Start {
                url,
                interval,
                max_price,
            } => {
                let minutes = daemon::parse_interval(&interval).map_err(anyhow::Error::msg)?;
                commands::monitor_start(Arc::new(ctx), &url, minutes, max_price).await?;
            }
            MonitorAction::Run => {
                commands::monitor_run(Arc::new(ctx)).await?;
            }
            MonitorAction::Stop => {
                commands::monitor_stop(&ctx)?;
            }
            MonitorAction::Status => {
                commands::monitor_status(&ctx)?;
            }
            MonitorAction::Test => {
                commands::monitor_test(&ctx).await?;
            }
        },
        Commands::Logs { clear } => {
            commands::show_logs(&ctx, clear)?;
        }
        Commands::Results { send } => {
            commands::show_results(&ctx, send).await?;
        }
    }

    Ok(())
}
