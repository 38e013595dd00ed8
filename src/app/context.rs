use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::app::error::{ParserError, Result};
use crate::browser::{Browser, ChromeBrowser};
use crate::config::Config;
use crate::coordinator::{spawn_coordinator, CoordinatorHandle, Pipeline};
use crate::journal::Journal;
use crate::notifier::TelegramNotifier;
use crate::store::sqlite::SqliteStore;

pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub journal: Journal,
    pub notifier: Arc<TelegramNotifier>,
}

impl AppContext {
    pub fn new(config: Config, db_path: Option<PathBuf>) -> Result<Self> {
        let db_path = match db_path {
            Some(p) => p,
            None => Self::default_db_path()?,
        };

        let store = Arc::new(SqliteStore::new(&db_path)?);
        Self::with_store(config, store)
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        Self::with_store(config, store)
    }

    fn with_store(config: Config, store: Arc<SqliteStore>) -> Result<Self> {
        let journal = Journal::new(store.clone());
        let notifier = Arc::new(TelegramNotifier::new(
            config.telegram.clone(),
            journal.clone(),
        )?);

        Ok(Self {
            config,
            store,
            journal,
            notifier,
        })
    }

    /// Launch Chrome with the configured browser and site settings
    pub async fn launch_browser(&self) -> Result<Arc<dyn Browser>> {
        let browser =
            ChromeBrowser::launch(self.config.browser.clone(), self.config.site.clone()).await?;
        Ok(Arc::new(browser))
    }

    pub fn pipeline(&self, browser: Arc<dyn Browser>) -> Arc<Pipeline> {
        Arc::new(Pipeline::new(
            browser,
            self.config.pipeline.clone(),
            self.journal.clone(),
        ))
    }

    /// Spawn a coordinator on top of `pipeline`
    pub fn spawn_coordinator(&self, pipeline: Arc<Pipeline>) -> (CoordinatorHandle, JoinHandle<()>) {
        spawn_coordinator(
            pipeline,
            self.store.clone(),
            self.notifier.clone(),
            self.journal.clone(),
            self.config.monitor.clone(),
        )
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| ParserError::Config("Could not find data directory".into()))?;
        let app_dir = data_dir.join("wbparser");
        std::fs::create_dir_all(&app_dir)?;
        Ok(app_dir.join("wbparser.db"))
    }
}
