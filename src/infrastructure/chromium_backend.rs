//! Production scrape backend: real Chromium sessions driven over CDP

use async_trait::async_trait;

use crate::domain::services::{PageScrapeResult, ScrapeBackend, ScrapeError, SessionError};
use crate::infrastructure::page_driver::PageDriver;
use crate::infrastructure::session::{BrowserSession, SessionConfig, SessionManager};

/// Wires the session manager and the page driver into the single seam the
/// orchestrator schedules through.
pub struct ChromiumBackend {
    sessions: SessionManager,
    driver: PageDriver,
}

impl ChromiumBackend {
    pub fn new(session_config: SessionConfig) -> Self {
        Self {
            sessions: SessionManager::new(session_config),
            driver: PageDriver::default(),
        }
    }

    pub fn with_driver(session_config: SessionConfig, driver: PageDriver) -> Self {
        Self {
            sessions: SessionManager::new(session_config),
            driver,
        }
    }
}

#[async_trait]
impl ScrapeBackend for ChromiumBackend {
    type Session = BrowserSession;

    async fn acquire(&self, worker_index: usize) -> Result<BrowserSession, SessionError> {
        self.sessions.acquire(worker_index).await
    }

    async fn scrape(
        &self,
        session: &mut BrowserSession,
        url: &str,
    ) -> Result<PageScrapeResult, ScrapeError> {
        self.driver.scrape(session, url).await
    }

    async fn release(&self, session: BrowserSession) {
        self.sessions.release(session).await;
    }
}
