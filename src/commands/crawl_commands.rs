//! Crawler control commands exposed to the shell/IPC layer

use crate::application::state::AppState;
use crate::commands::CommandError;
use crate::domain::services::ScrapeBackend;

/// Begin a crawl run. Fails when one is already in progress.
pub async fn start_crawl<B: ScrapeBackend>(state: &AppState<B>) -> Result<(), CommandError> {
    state.crawler.start().await?;
    Ok(())
}

/// Request a cooperative stop of the current run. Idempotent.
pub async fn stop_crawl<B: ScrapeBackend>(state: &AppState<B>) {
    state.crawler.stop().await;
}

pub async fn is_crawler_running<B: ScrapeBackend>(state: &AppState<B>) -> bool {
    state.crawler.is_running().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::orchestrator::OrchestratorConfig;
    use crate::domain::services::{PageScrapeResult, ScrapeError, SessionError};
    use crate::infrastructure::config_store::SqliteConfigStore;
    use crate::infrastructure::database_connection::test_support::open_temp_database;
    use crate::infrastructure::job_store::SqliteJobStore;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct InstantBackend;

    #[async_trait]
    impl ScrapeBackend for InstantBackend {
        type Session = ();

        async fn acquire(&self, _worker_index: usize) -> Result<(), SessionError> {
            Ok(())
        }

        async fn scrape(
            &self,
            _session: &mut (),
            url: &str,
        ) -> Result<PageScrapeResult, ScrapeError> {
            Ok(PageScrapeResult {
                url: url.to_string(),
                title: "ok".to_string(),
                fields: Default::default(),
                soft_blocked: false,
            })
        }

        async fn release(&self, _session: ()) {}
    }

    #[tokio::test]
    async fn crawl_controls_drive_the_orchestrator() {
        let (db, _dir) = open_temp_database().await;
        let state = AppState::new(
            Arc::new(SqliteJobStore::new(db.pool().clone())),
            Arc::new(SqliteConfigStore::new(db.pool().clone())),
            Arc::new(InstantBackend),
            OrchestratorConfig::default(),
        );

        assert!(!is_crawler_running(&state).await);

        state
            .jobs
            .enqueue("https://shop.example/item/1")
            .await
            .unwrap();

        start_crawl(&state).await.unwrap();
        stop_crawl(&state).await;
        state.crawler.join().await.unwrap().unwrap();

        assert!(!is_crawler_running(&state).await);
    }
}
