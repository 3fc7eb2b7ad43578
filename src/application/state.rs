//! Shared application state handed to the command surface
//!
//! Owns the repositories and the orchestrator. The shell/IPC layer holds
//! one of these for the process lifetime and routes every command through
//! it.

use anyhow::Result;
use std::sync::Arc;

use crate::application::orchestrator::{CrawlOrchestrator, OrchestratorConfig};
use crate::domain::repositories::{ConfigRepository, JobRepository};
use crate::domain::services::ScrapeBackend;
use crate::infrastructure::chromium_backend::ChromiumBackend;
use crate::infrastructure::config_store::SqliteConfigStore;
use crate::infrastructure::database_connection::DatabaseConnection;
use crate::infrastructure::job_store::SqliteJobStore;
use crate::infrastructure::session::SessionConfig;

pub struct AppState<B: ScrapeBackend> {
    pub jobs: Arc<dyn JobRepository>,
    pub config: Arc<dyn ConfigRepository>,
    pub crawler: Arc<CrawlOrchestrator<B>>,
}

impl<B: ScrapeBackend> AppState<B> {
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        config: Arc<dyn ConfigRepository>,
        backend: Arc<B>,
        policy: OrchestratorConfig,
    ) -> Self {
        let crawler = Arc::new(CrawlOrchestrator::new(
            Arc::clone(&jobs),
            Arc::clone(&config),
            backend,
            policy,
        ));
        Self {
            jobs,
            config,
            crawler,
        }
    }
}

impl AppState<ChromiumBackend> {
    /// Open (and migrate) the store at `database_url` and wire the
    /// production Chromium backend.
    pub async fn initialize(database_url: &str, session_config: SessionConfig) -> Result<Self> {
        let db = DatabaseConnection::new(database_url).await?;
        db.migrate().await?;

        let jobs: Arc<dyn JobRepository> = Arc::new(SqliteJobStore::new(db.pool().clone()));
        let config: Arc<dyn ConfigRepository> = Arc::new(SqliteConfigStore::new(db.pool().clone()));
        let backend = Arc::new(ChromiumBackend::new(session_config));

        Ok(Self::new(
            jobs,
            config,
            backend,
            OrchestratorConfig::default(),
        ))
    }
}
