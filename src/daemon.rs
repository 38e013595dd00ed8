//! Foreground monitor daemon.
//!
//! Keeps a coordinator alive with the monitor timer armed until SIGINT or
//! SIGTERM. A PID file lets `monitor stop` and `monitor status` find it from
//! another shell.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::app::{AppContext, ParserError, Result};
use crate::coordinator::{Command, CommandStatus, CoordinatorEvent};
use crate::domain::monitor::MAX_INTERVAL_MINUTES;
use crate::store::Store;

/// Parse an interval like "15", "30m", "2h" or "1d" into minutes.
///
/// A bare number is read as minutes.
pub fn parse_interval(s: &str) -> std::result::Result<u64, String> {
    let s = s.trim().to_lowercase();

    let minutes = if let Some(hours) = s.strip_suffix('h') {
        hours
            .parse::<u64>()
            .ok()
            .and_then(|h| h.checked_mul(60))
            .ok_or_else(|| format!("Invalid hours: {}", hours))?
    } else if let Some(days) = s.strip_suffix('d') {
        days.parse::<u64>()
            .ok()
            .and_then(|d| d.checked_mul(1440))
            .ok_or_else(|| format!("Invalid days: {}", days))?
    } else {
        let minutes = s.strip_suffix('m').unwrap_or(&s);
        minutes.parse::<u64>().map_err(|_| {
            format!("Invalid interval: {}. Use format like '15', '30m', '2h'", s)
        })?
    };

    if minutes == 0 {
        return Err("Interval must be at least one minute".to_string());
    }
    if minutes > MAX_INTERVAL_MINUTES {
        return Err(format!("Interval is too large: {}", format_interval(minutes)));
    }
    Ok(minutes)
}

/// Format an interval in minutes for display
pub fn format_interval(minutes: u64) -> String {
    if minutes >= 1440 && minutes.is_multiple_of(1440) {
        format!("{}d", minutes / 1440)
    } else if minutes >= 60 && minutes.is_multiple_of(60) {
        format!("{}h", minutes / 60)
    } else {
        format!("{}m", minutes)
    }
}

/// Settings for a new monitoring session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorRequest {
    pub url: String,
    pub interval_minutes: u64,
    pub max_price: u64,
}

/// Daemon runner
pub struct Daemon {
    ctx: Arc<AppContext>,
    request: Option<MonitorRequest>,
}

impl Daemon {
    /// `request` starts a new session; `None` resumes the persisted one
    pub fn new(ctx: Arc<AppContext>, request: Option<MonitorRequest>) -> Self {
        Self { ctx, request }
    }

    /// Get the PID file path
    pub fn pid_file_path() -> Option<PathBuf> {
        dirs::runtime_dir()
            .or_else(dirs::cache_dir)
            .map(|d| d.join("wbparser").join("monitor.pid"))
    }

    /// Check if another daemon is already running
    pub fn is_running() -> bool {
        Self::read_pid().is_some_and(Self::process_exists)
    }

    fn read_pid() -> Option<u32> {
        let pid_path = Self::pid_file_path()?;
        fs::read_to_string(pid_path).ok()?.trim().parse().ok()
    }

    #[cfg(unix)]
    fn process_exists(pid: u32) -> bool {
        use std::process::Command;
        Command::new("kill")
            .args(["-0", &pid.to_string()])
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    #[cfg(windows)]
    fn process_exists(pid: u32) -> bool {
        use std::process::Command;
        Command::new("tasklist")
            .args(["/FI", &format!("PID eq {}", pid)])
            .output()
            .map(|o| String::from_utf8_lossy(&o.stdout).contains(&pid.to_string()))
            .unwrap_or(false)
    }

    fn write_pid_file(&self) -> std::io::Result<()> {
        if let Some(pid_path) = Self::pid_file_path() {
            if let Some(parent) = pid_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut file = fs::File::create(&pid_path)?;
            writeln!(file, "{}", std::process::id())?;
        }
        Ok(())
    }

    fn remove_pid_file(&self) {
        if let Some(pid_path) = Self::pid_file_path() {
            let _ = fs::remove_file(pid_path);
        }
    }

    /// Print a message with timestamp
    fn log(&self, msg: &str) {
        println!("[{}] {}", Local::now().format("%Y-%m-%d %H:%M:%S"), msg);
    }

    /// Command that arms the monitor for this run.
    ///
    /// A new session resets the sent-set; resuming keeps it.
    fn start_command(&self) -> Result<Command> {
        if let Some(ref request) = self.request {
            self.ctx.store.clear_sent_links()?;
            self.ctx
                .journal
                .info("Cleared sent links for new monitoring session");
            return Ok(Command::StartMonitoring {
                url: request.url.clone(),
                interval: request.interval_minutes,
                max_price: request.max_price,
            });
        }

        let settings = self.ctx.store.get_monitor_settings()?;
        match settings.target_url {
            Some(url) if settings.enabled => Ok(Command::StartMonitoring {
                url,
                interval: settings.interval_minutes,
                max_price: settings.max_price,
            }),
            _ => Err(ParserError::Config(
                "Monitoring is not configured. Run `wbparser monitor start <url>` first"
                    .to_string(),
            )),
        }
    }

    /// Run the daemon
    pub async fn run(&self) -> Result<()> {
        if Self::is_running() {
            return Err(ParserError::Other(
                "Another monitor daemon is already running".to_string(),
            ));
        }

        let command = self.start_command()?;

        self.write_pid_file()
            .map_err(|e| ParserError::Other(format!("Failed to write PID file: {}", e)))?;

        let result = self.serve(command).await;
        self.remove_pid_file();
        result
    }

    async fn serve(&self, command: Command) -> Result<()> {
        let browser = self.ctx.launch_browser().await?;
        let (handle, task) = self.ctx.spawn_coordinator(self.ctx.pipeline(browser));
        let mut events = handle.subscribe();

        if let Command::StartMonitoring {
            ref url, interval, ..
        } = command
        {
            self.log(&format!(
                "Monitor daemon started for {} (every {}, PID: {})",
                url,
                format_interval(interval),
                std::process::id()
            ));
        }

        if let CommandStatus::Rejected { reason } = handle.send(command).await? {
            handle.shutdown().await;
            let _ = task.await;
            return Err(ParserError::Other(reason));
        }

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                res = &mut shutdown => {
                    if let Err(e) = res {
                        warn!("Signal handler failed: {}", e);
                    }
                    break;
                }
                event = events.recv() => match event {
                    Ok(CoordinatorEvent::MonitorChecked { found, new }) => {
                        self.log(&format!("Check complete: {} products, {} new", found, new));
                    }
                    Ok(CoordinatorEvent::MonitorFailed { error }) => {
                        self.log(&format!("Check failed: {}", error));
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(n)) => warn!("Missed {} coordinator events", n),
                    Err(RecvError::Closed) => break,
                },
            }
        }

        self.log("Daemon shutting down...");
        handle.shutdown().await;
        let _ = task.await;
        Ok(())
    }
}

#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => {},
        _ = sigint.recv() => {},
    }
    Ok(())
}

#[cfg(windows)]
async fn shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Stop a running daemon by reading PID file and sending signal
pub fn stop_daemon() -> Result<()> {
    let pid_path = Daemon::pid_file_path()
        .ok_or_else(|| ParserError::Other("Could not determine PID file path".to_string()))?;

    if !pid_path.exists() {
        return Err(ParserError::Other(
            "No monitor daemon is running (PID file not found)".to_string(),
        ));
    }

    let pid: u32 = fs::read_to_string(&pid_path)?
        .trim()
        .parse()
        .map_err(|_| ParserError::Other("Invalid PID in PID file".to_string()))?;

    #[cfg(unix)]
    let status = std::process::Command::new("kill")
        .args(["-TERM", &pid.to_string()])
        .status()?;

    #[cfg(windows)]
    let status = std::process::Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/F"])
        .status()?;

    if status.success() {
        let _ = fs::remove_file(&pid_path);
        Ok(())
    } else {
        Err(ParserError::Other(format!(
            "Failed to stop monitor daemon (PID {})",
            pid
        )))
    }
}

/// Check daemon status
pub fn daemon_status() -> String {
    match Daemon::read_pid() {
        Some(pid) if Daemon::process_exists(pid) => {
            format!("Monitor daemon is running (PID: {})", pid)
        }
        Some(_) => "Monitor daemon is not running (stale PID file)".to_string(),
        None => "Monitor daemon is not running".to_string(),
    }
}
