use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

use crate::app::{AppContext, ParserError, Result};
use crate::coordinator::{Command, CommandStatus, CoordinatorEvent};
use crate::daemon::{self, format_interval, Daemon, MonitorRequest};
use crate::domain::{ScrapeOutcome, Severity};
use crate::notifier::{Notifier, NotifyOutcome};
use crate::store::Store;

/// Collect links from `pages` listing pages and scrape every product
pub async fn parse_listing(
    ctx: &AppContext,
    url: &str,
    pages: u32,
    max_products: usize,
) -> Result<()> {
    let listing = ctx.config.site.validate_listing_url(url)?;

    let browser = ctx.launch_browser().await?;
    let pipeline = ctx.pipeline(browser);

    println!("Collecting links from {} page(s)...", pages.max(1));
    let links = pipeline
        .collect_listing(&listing, &ctx.config.site, pages, max_products)
        .await?;

    if links.is_empty() {
        println!("No products found");
        return Ok(());
    }
    println!("Found {} products", links.len());

    let (handle, task) = ctx.spawn_coordinator(pipeline);
    let mut events = handle.subscribe();

    let results = match handle.send(Command::StartParse { links }).await? {
        CommandStatus::Started => wait_for_results(&mut events).await,
        CommandStatus::Rejected { reason } => Err(ParserError::Other(reason)),
        other => Err(ParserError::Other(format!("Unexpected reply: {:?}", other))),
    };

    handle.shutdown().await;
    let _ = task.await;

    let results = results?;
    let failed = results.iter().filter(|r| r.is_failed()).count();
    println!();
    for outcome in &results {
        println!("{}", format_outcome(outcome));
    }
    println!(
        "\nParse complete: {} products, {} failed",
        results.len(),
        failed
    );

    Ok(())
}

async fn wait_for_results(
    events: &mut broadcast::Receiver<CoordinatorEvent>,
) -> Result<Vec<ScrapeOutcome>> {
    loop {
        match events.recv().await {
            Ok(CoordinatorEvent::ParseProgress { text }) => println!("{}", text),
            Ok(CoordinatorEvent::AllParsed { data }) => return Ok(data),
            Ok(_) => {}
            Err(RecvError::Lagged(n)) => warn!("Missed {} coordinator events", n),
            Err(RecvError::Closed) => {
                return Err(ParserError::Other(
                    "Coordinator stopped before the job completed".to_string(),
                ))
            }
        }
    }
}

/// Start a new monitoring session in the foreground
pub async fn monitor_start(
    ctx: Arc<AppContext>,
    url: &str,
    interval_minutes: u64,
    max_price: u64,
) -> Result<()> {
    let listing = ctx.config.site.validate_listing_url(url)?;

    let request = MonitorRequest {
        url: listing.to_string(),
        interval_minutes,
        max_price,
    };
    Daemon::new(ctx, Some(request)).run().await
}

/// Resume the saved monitoring session in the foreground
pub async fn monitor_run(ctx: Arc<AppContext>) -> Result<()> {
    Daemon::new(ctx, None).run().await
}

pub fn monitor_stop(ctx: &AppContext) -> Result<()> {
    match daemon::stop_daemon() {
        Ok(()) => println!("Monitor daemon stopped"),
        Err(e) => println!("{}", e),
    }

    ctx.store.set_monitoring_enabled(false)?;
    ctx.journal.info("Auto-monitoring stopped");
    Ok(())
}

pub fn monitor_status(ctx: &AppContext) -> Result<()> {
    println!("{}", daemon::daemon_status());

    let settings = ctx.store.get_monitor_settings()?;
    match settings.target_url {
        Some(ref url) => {
            println!("URL:       {}", url);
            println!("Interval:  {}", format_interval(settings.interval_minutes));
            println!("Max price: {}₽", settings.max_price);
            println!(
                "Enabled:   {}",
                if settings.enabled { "yes" } else { "no" }
            );
        }
        None => println!("No monitor URL configured"),
    }

    println!("Sent links: {}", ctx.store.get_sent_links()?.len());
    Ok(())
}

/// Clear the sent-set and run one monitor check now
pub async fn monitor_test(ctx: &AppContext) -> Result<()> {
    if ctx.store.get_monitor_settings()?.target_url.is_none() {
        ctx.journal.error("No monitor URL configured");
        return Err(ParserError::Config(
            "No monitor URL configured. Run `wbparser monitor start <url>` first".to_string(),
        ));
    }

    ctx.store.clear_sent_links()?;
    ctx.journal.info("Cleared sent links for testing");

    let browser = ctx.launch_browser().await?;
    let (handle, task) = ctx.spawn_coordinator(ctx.pipeline(browser));
    let mut events = handle.subscribe();

    handle.send(Command::TestMonitoring).await?;

    let outcome = loop {
        match events.recv().await {
            Ok(CoordinatorEvent::MonitorChecked { found, new }) => {
                break Ok(format!("Check complete: {} products, {} new", found, new))
            }
            Ok(CoordinatorEvent::MonitorFailed { error }) => break Err(ParserError::Other(error)),
            Ok(_) => {}
            Err(RecvError::Lagged(n)) => warn!("Missed {} coordinator events", n),
            Err(RecvError::Closed) => {
                break Err(ParserError::Other(
                    "Coordinator stopped before the check completed".to_string(),
                ))
            }
        }
    };

    handle.shutdown().await;
    let _ = task.await;

    println!("{}", outcome?);
    Ok(())
}

pub fn show_logs(ctx: &AppContext, clear: bool) -> Result<()> {
    if clear {
        ctx.store.clear_logs()?;
        println!("Logs cleared");
        return Ok(());
    }

    let logs = ctx.store.get_logs()?;
    if logs.is_empty() {
        println!("No logs");
        return Ok(());
    }

    for entry in logs {
        let marker = match entry.severity {
            Severity::Error => "!",
            Severity::Success => "+",
            Severity::Info => " ",
        };
        println!("{} {}", marker, entry.display_line());
    }

    Ok(())
}

/// Print the saved result of the last parse, optionally sending it
pub async fn show_results(ctx: &AppContext, send: bool) -> Result<()> {
    let Some(results) = ctx.store.get_last_parse_result()? else {
        println!("No saved results");
        return Ok(());
    };

    for outcome in &results {
        println!("{}", format_outcome(outcome));
    }
    println!("\n{} products", results.len());

    if send {
        let links: Vec<String> = results.iter().map(|r| r.link().to_string()).collect();
        match ctx.notifier.notify(&links).await {
            NotifyOutcome::Delivered => {
                ctx.store.clear_last_parse_result()?;
                println!("Sent to Telegram");
            }
            NotifyOutcome::Skipped { reason }
            | NotifyOutcome::Rejected { reason }
            | NotifyOutcome::Failed { error: reason } => {
                println!("Not sent: {}", reason);
            }
        }
    }

    Ok(())
}

/// One summary line per outcome
fn format_outcome(outcome: &ScrapeOutcome) -> String {
    match outcome {
        ScrapeOutcome::Parsed(record) => format!(
            "{} | {} {} | {}",
            record.name, record.price, record.currency, record.link
        ),
        ScrapeOutcome::Failed { error, link } => format!("FAILED {} | {}", link, error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::domain::{Price, ProductRecord};

    fn ctx() -> AppContext {
        AppContext::in_memory(Config::default()).unwrap()
    }

    #[test]
    fn test_format_outcome() {
        let mut record = ProductRecord::new("https://www.wildberries.ru/catalog/1/detail.aspx");
        record.name = "Lamp".to_string();
        record.price = Price::Amount(1299);
        assert_eq!(
            format_outcome(&ScrapeOutcome::Parsed(record)),
            "Lamp | 1299 RUB | https://www.wildberries.ru/catalog/1/detail.aspx"
        );

        let failed = ScrapeOutcome::failed("https://x", "boom");
        assert_eq!(format_outcome(&failed), "FAILED https://x | Parse failed: boom");
    }

    #[test]
    fn test_logs_clear() {
        let ctx = ctx();
        ctx.journal.info("Checking for new products");
        assert_eq!(ctx.store.get_logs().unwrap().len(), 1);

        show_logs(&ctx, true).unwrap();
        assert!(ctx.store.get_logs().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unsent_results_are_kept() {
        let ctx = ctx();
        let results = vec![ScrapeOutcome::Parsed(ProductRecord::new(
            "https://www.wildberries.ru/catalog/1/detail.aspx",
        ))];
        ctx.store.save_last_parse_result(&results).unwrap();

        show_results(&ctx, true).await.unwrap();
        assert_eq!(ctx.store.get_last_parse_result().unwrap(), Some(results));
    }

    #[tokio::test]
    async fn test_monitor_test_without_url_fails_early() {
        let ctx = ctx();
        ctx.store
            .add_sent_links(&["https://www.wildberries.ru/catalog/1/detail.aspx".to_string()])
            .unwrap();

        let err = monitor_test(&ctx).await.unwrap_err();
        assert!(matches!(err, ParserError::Config(_)));
        assert_eq!(ctx.store.get_sent_links().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_parse_rejects_non_listing_url() {
        let ctx = ctx();
        let err = parse_listing(&ctx, "https://example.com/catalog/x", 1, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, ParserError::Config(_)));
    }
}
