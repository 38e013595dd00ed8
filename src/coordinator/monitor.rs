use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::app::{ParserError, Result};
use crate::coordinator::config::MonitorConfig;
use crate::coordinator::pipeline::Pipeline;
use crate::coordinator::CoordinatorEvent;
use crate::domain::{CheckReport, MonitorState};
use crate::journal::Journal;
use crate::notifier::Notifier;
use crate::store::Store;

/// A single monitor check: collect links, diff against the sent-set,
/// notify about the new ones and remember them.
pub struct MonitorCheck {
    pipeline: Arc<Pipeline>,
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    journal: Journal,
    config: MonitorConfig,
}

impl MonitorCheck {
    pub fn new(
        pipeline: Arc<Pipeline>,
        store: Arc<dyn Store>,
        notifier: Arc<dyn Notifier>,
        journal: Journal,
        config: MonitorConfig,
    ) -> Self {
        Self {
            pipeline,
            store,
            notifier,
            journal,
            config,
        }
    }

    pub async fn run(&self) -> Result<CheckReport> {
        let settings = self.store.get_monitor_settings()?;
        let Some(url) = settings.target_url.clone() else {
            self.journal.error("No monitor URL configured");
            return Err(ParserError::Config("No monitor URL configured".to_string()));
        };

        self.journal.info(format!(
            "Checking for new products on: {} (max price: {}₽)",
            url, settings.max_price
        ));

        let found = match self.pipeline.collect_links(&url, self.config.max_links).await {
            Ok(found) => found,
            Err(e) => {
                self.journal
                    .error(format!("Error during monitoring check: {}", e));
                return Err(e);
            }
        };

        if found.is_empty() {
            self.journal.error("No products found on monitored page");
            return Ok(CheckReport::default());
        }

        let sent: HashSet<String> = self.store.get_sent_links()?.into_iter().collect();
        let new_links: Vec<String> = found
            .iter()
            .filter(|link| !sent.contains(*link))
            .cloned()
            .collect();

        self.journal.info(format!(
            "Found {} total products, {} new",
            found.len(),
            new_links.len()
        ));

        if new_links.is_empty() {
            self.journal.info("No new products found");
            return Ok(CheckReport {
                found: found.len(),
                ..Default::default()
            });
        }

        let notified = if self.config.apply_price_filter {
            self.filter_by_price(&new_links, settings.max_price).await
        } else {
            self.journal.info(format!(
                "Sending all {} new products (price filter disabled)",
                new_links.len()
            ));
            new_links.clone()
        };

        if notified.is_empty() {
            self.journal.info("No new products within the price limit");
        } else {
            let outcome = self.notifier.notify(&notified).await;
            debug!("Monitor notification outcome: {:?}", outcome);
            self.journal
                .info(format!("Sent {} new products to Telegram", notified.len()));
        }

        let added = self.store.add_sent_links(&new_links)?;
        debug!("Added {} links to the sent-set", added);

        Ok(CheckReport {
            found: found.len(),
            new_links,
            notified,
        })
    }

    /// Keep the links whose price is unknown or within `max_price`
    async fn filter_by_price(&self, links: &[String], max_price: u64) -> Vec<String> {
        self.journal
            .info(format!("Checking prices of {} new products", links.len()));

        self.pipeline
            .check_prices(links)
            .await
            .into_iter()
            .filter_map(|check| {
                if check.price.exceeds(max_price) {
                    self.journal.info(format!(
                        "Skipping {} (price {}₽ above {}₽)",
                        check.link, check.price, max_price
                    ));
                    None
                } else {
                    Some(check.link)
                }
            })
            .collect()
    }
}

/// Periodic scheduler around a [`MonitorCheck`].
///
/// Stopping cancels the timer only; a check that is already running
/// finishes and closes its tab.
pub struct MonitorLoop {
    check: Arc<MonitorCheck>,
    events: broadcast::Sender<CoordinatorEvent>,
    first_check_delay: Duration,
    armed: Arc<AtomicBool>,
    checking: Arc<AtomicBool>,
    timer: Option<JoinHandle<()>>,
}

impl MonitorLoop {
    pub fn new(
        check: Arc<MonitorCheck>,
        events: broadcast::Sender<CoordinatorEvent>,
        first_check_delay: Duration,
    ) -> Self {
        Self {
            check,
            events,
            first_check_delay,
            armed: Arc::new(AtomicBool::new(false)),
            checking: Arc::new(AtomicBool::new(false)),
            timer: None,
        }
    }

    pub fn state(&self) -> MonitorState {
        if self.checking.load(Ordering::SeqCst) {
            MonitorState::Checking
        } else if self.armed.load(Ordering::SeqCst) {
            MonitorState::Scheduled
        } else {
            MonitorState::Idle
        }
    }

    /// Arm the timer, replacing any previous one. The first check runs after
    /// the configured delay, then every `interval`.
    pub fn start(&mut self, interval: Duration) {
        self.cancel_timer();

        let interval = interval.max(Duration::from_millis(1));
        let first = Instant::now() + self.first_check_delay;
        let check = self.check.clone();
        let checking = self.checking.clone();
        let events = self.events.clone();

        self.armed.store(true, Ordering::SeqCst);
        self.timer = Some(tokio::spawn(async move {
            let mut timer = tokio::time::interval_at(first, interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                timer.tick().await;
                let cycle = tokio::spawn(run_cycle(
                    check.clone(),
                    checking.clone(),
                    events.clone(),
                ));
                let _ = cycle.await;
            }
        }));

        info!("Monitor scheduled every {:?}", interval);
    }

    /// Cancel the timer
    pub fn stop(&mut self) {
        self.cancel_timer();
        info!("Monitor stopped");
    }

    /// Run one check outside the schedule
    pub fn check_now(&self) -> JoinHandle<()> {
        tokio::spawn(run_cycle(
            self.check.clone(),
            self.checking.clone(),
            self.events.clone(),
        ))
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.armed.store(false, Ordering::SeqCst);
    }
}

impl Drop for MonitorLoop {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

/// Clears the in-flight flag when a check ends, even by panic
struct CheckingGuard(Arc<AtomicBool>);

impl Drop for CheckingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

async fn run_cycle(
    check: Arc<MonitorCheck>,
    checking: Arc<AtomicBool>,
    events: broadcast::Sender<CoordinatorEvent>,
) {
    if checking.swap(true, Ordering::SeqCst) {
        debug!("Monitor check already running, skipping");
        let _ = events.send(CoordinatorEvent::MonitorFailed {
            error: "Monitor check already running".to_string(),
        });
        return;
    }
    let guard = CheckingGuard(checking);

    let event = match check.run().await {
        Ok(report) => CoordinatorEvent::MonitorChecked {
            found: report.found,
            new: report.new_links.len(),
        },
        Err(e) => CoordinatorEvent::MonitorFailed {
            error: e.to_string(),
        },
    };

    drop(guard);
    let _ = events.send(event);
}
