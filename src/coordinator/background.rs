use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::app::{ParserError, Result};
use crate::coordinator::config::MonitorConfig;
use crate::coordinator::monitor::{MonitorCheck, MonitorLoop};
use crate::coordinator::pipeline::Pipeline;
use crate::domain::monitor::{DEFAULT_INTERVAL_MINUTES, MAX_INTERVAL_MINUTES};
use crate::domain::{MonitorSettings, ScrapeJob, ScrapeOutcome};
use crate::journal::Journal;
use crate::notifier::Notifier;
use crate::store::Store;

/// Request sent to the coordinator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Command {
    /// Scrape the detail page of every link, in order
    StartParse { links: Vec<String> },
    /// Persist the monitor settings and arm the timer
    StartMonitoring {
        url: String,
        interval: u64,
        #[serde(rename = "maxPrice")]
        max_price: u64,
    },
    /// Cancel the monitor timer
    StopMonitoring,
    /// Run one monitor check now
    TestMonitoring,
    /// Stop the monitor and exit the command loop
    Shutdown,
}

/// Immediate acknowledgement of a [`Command`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommandStatus {
    Started,
    MonitoringStarted,
    MonitoringStopped,
    TestStarted,
    ShuttingDown,
    Rejected { reason: String },
}

/// Broadcast to every subscriber of the coordinator
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CoordinatorEvent {
    ParseProgress { text: String },
    AllParsed { data: Vec<ScrapeOutcome> },
    MonitorChecked { found: usize, new: usize },
    MonitorFailed { error: String },
}

struct Envelope {
    command: Command,
    reply: oneshot::Sender<CommandStatus>,
}

/// Handle to send commands to the coordinator
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<Envelope>,
    events: broadcast::Sender<CoordinatorEvent>,
}

impl CoordinatorHandle {
    /// Send a command and wait for its acknowledgement
    pub async fn send(&self, command: Command) -> Result<CommandStatus> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Envelope { command, reply })
            .await
            .map_err(|_| ParserError::Other("Coordinator is not running".to_string()))?;
        rx.await
            .map_err(|_| ParserError::Other("Coordinator dropped the command".to_string()))
    }

    /// Subscribe to progress and completion events
    pub fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.events.subscribe()
    }

    pub async fn shutdown(&self) {
        let _ = self.send(Command::Shutdown).await;
    }
}

/// Long-lived owner of the scrape job and the monitor loop.
///
/// Commands are handled one at a time; the job and the monitor checks run on
/// their own tasks and share the pipeline's tab lease.
pub struct Coordinator {
    pipeline: Arc<Pipeline>,
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    journal: Journal,
    monitor: MonitorLoop,
    events: broadcast::Sender<CoordinatorEvent>,
    job: Option<JoinHandle<()>>,
    rx: mpsc::Receiver<Envelope>,
}

impl Coordinator {
    /// Create a new coordinator and return a handle to communicate with it
    pub fn new(
        pipeline: Arc<Pipeline>,
        store: Arc<dyn Store>,
        notifier: Arc<dyn Notifier>,
        journal: Journal,
        monitor_config: MonitorConfig,
    ) -> (Self, CoordinatorHandle) {
        let (tx, rx) = mpsc::channel(32);
        let (events, _) = broadcast::channel(64);

        let first_check_delay = monitor_config.first_check_delay();
        let check = Arc::new(MonitorCheck::new(
            pipeline.clone(),
            store.clone(),
            notifier.clone(),
            journal.clone(),
            monitor_config,
        ));
        let monitor = MonitorLoop::new(check, events.clone(), first_check_delay);

        let handle = CoordinatorHandle {
            tx,
            events: events.clone(),
        };
        let coordinator = Self {
            pipeline,
            store,
            notifier,
            journal,
            monitor,
            events,
            job: None,
            rx,
        };
        (coordinator, handle)
    }

    /// Run the command loop until `Shutdown` or until every handle is dropped
    pub async fn run(mut self) {
        info!("Coordinator started");

        while let Some(Envelope { command, reply }) = self.rx.recv().await {
            debug!("Received command {:?}", command);
            let shutdown = command == Command::Shutdown;
            let status = self.handle(command);
            let _ = reply.send(status);

            if shutdown {
                break;
            }
        }

        self.monitor.stop();
        info!("Coordinator shutting down");
    }

    fn job_running(&self) -> bool {
        self.job.as_ref().is_some_and(|job| !job.is_finished())
    }

    fn handle(&mut self, command: Command) -> CommandStatus {
        match command {
            Command::StartParse { links } => self.start_parse(links),
            Command::StartMonitoring {
                url,
                interval,
                max_price,
            } => self.start_monitoring(url, interval, max_price),
            Command::StopMonitoring => {
                self.monitor.stop();
                if let Err(e) = self.store.set_monitoring_enabled(false) {
                    self.journal
                        .error(format!("Failed to persist monitoring state: {}", e));
                }
                self.journal.info("Auto-monitoring stopped");
                CommandStatus::MonitoringStopped
            }
            Command::TestMonitoring => {
                self.journal.info("Manual test of monitoring triggered");
                drop(self.monitor.check_now());
                CommandStatus::TestStarted
            }
            Command::Shutdown => CommandStatus::ShuttingDown,
        }
    }

    fn start_parse(&mut self, links: Vec<String>) -> CommandStatus {
        if self.job_running() {
            return CommandStatus::Rejected {
                reason: "A scrape job is already running".to_string(),
            };
        }

        let job = ScrapeJob::new(links);
        self.job = Some(tokio::spawn(run_job(
            job,
            self.pipeline.clone(),
            self.store.clone(),
            self.notifier.clone(),
            self.journal.clone(),
            self.events.clone(),
        )));
        CommandStatus::Started
    }

    fn start_monitoring(&mut self, url: String, interval: u64, max_price: u64) -> CommandStatus {
        if url.trim().is_empty() {
            return CommandStatus::Rejected {
                reason: "Monitor URL is empty".to_string(),
            };
        }

        let interval = if interval == 0 {
            DEFAULT_INTERVAL_MINUTES
        } else {
            interval
        };
        let Some(period) = interval
            .checked_mul(60)
            .filter(|_| interval <= MAX_INTERVAL_MINUTES)
            .map(Duration::from_secs)
        else {
            return CommandStatus::Rejected {
                reason: format!("Monitor interval of {} minutes is too large", interval),
            };
        };

        let settings = MonitorSettings {
            target_url: Some(url.clone()),
            interval_minutes: interval,
            max_price,
            enabled: true,
        };
        if let Err(e) = self.store.save_monitor_settings(&settings) {
            self.journal
                .error(format!("Failed to save monitor settings: {}", e));
            return CommandStatus::Rejected {
                reason: e.to_string(),
            };
        }

        self.journal.info(format!(
            "Starting auto-monitoring for: {} (every {} minutes, max price: {}₽)",
            url, interval, max_price
        ));
        self.monitor.start(period);
        CommandStatus::MonitoringStarted
    }
}

async fn run_job(
    job: ScrapeJob,
    pipeline: Arc<Pipeline>,
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    journal: Journal,
    events: broadcast::Sender<CoordinatorEvent>,
) {
    if job.is_empty() {
        journal.info("No links to parse");
    } else {
        journal.info(format!("Starting detail parsing of {} products", job.len()));
    }

    let job = pipeline
        .scrape_details(job, |job| {
            let text = job.progress_text();
            journal.info(text.as_str());
            let _ = events.send(CoordinatorEvent::ParseProgress { text });
        })
        .await;

    let failed = job.failed_count();
    let results = job.into_results();
    journal.success(format!(
        "All parsing completed: {} products, {} failed",
        results.len(),
        failed
    ));

    if let Err(e) = store.save_last_parse_result(&results) {
        journal.error(format!("Failed to save parse result: {}", e));
    }

    if results.is_empty() {
        journal.info("No products parsed");
    } else {
        let links: Vec<String> = results.iter().map(|r| r.link().to_string()).collect();
        let outcome = notifier.notify(&links).await;
        debug!("Job notification outcome: {:?}", outcome);
    }

    let _ = events.send(CoordinatorEvent::AllParsed { data: results });
}

/// Spawn the coordinator on the current runtime
pub fn spawn_coordinator(
    pipeline: Arc<Pipeline>,
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    journal: Journal,
    monitor_config: MonitorConfig,
) -> (CoordinatorHandle, JoinHandle<()>) {
    let (coordinator, handle) = Coordinator::new(pipeline, store, notifier, journal, monitor_config);
    let task = tokio::spawn(coordinator.run());
    (handle, task)
}
