//! Domain service traits for the crawl pipeline
//!
//! The orchestrator drives one seam: a backend that can open an isolated
//! browser session for a worker slot, scrape a URL with it, and tear it down
//! again. Production wires this to a real Chromium process; tests substitute
//! counting fakes.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::domain::job::ExtractedFields;

/// Outcome of one scrape attempt against a live page.
#[derive(Debug, Clone, Serialize)]
pub struct PageScrapeResult {
    pub url: String,
    pub title: String,
    pub fields: ExtractedFields,
    /// The page loaded but is a bot-defense response (rate limit, access
    /// denied). Retryable, unlike a hard navigation failure.
    pub soft_blocked: bool,
}

/// Failures while acquiring or launching a browser session.
///
/// Fatal for the one job attempt only, with one exception: a missing
/// executable means no further job can make progress either, so the
/// orchestrator aborts the whole run.
#[derive(Error, Debug, Clone)]
pub enum SessionError {
    #[error("no browser executable found (searched default install locations and the bundled browser directory)")]
    BrowserNotFound,

    #[error("failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("failed to prepare session profile directory '{dir}': {reason}")]
    ProfileDir { dir: String, reason: String },
}

/// Failures while driving a live page. The driver reports; the orchestrator
/// decides retry policy.
#[derive(Error, Debug, Clone)]
pub enum ScrapeError {
    #[error("navigation to '{url}' failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("page evaluation failed: {0}")]
    Evaluation(String),

    #[error("browser page closed mid-attempt")]
    PageClosed,
}

/// The browser seam the orchestrator schedules work through.
///
/// Contract: one session is exclusively owned by one job attempt. Whatever
/// `scrape` does, the caller must hand the session back through `release`
/// before the worker slot frees - including after a timeout abandoned the
/// scrape future.
#[async_trait]
pub trait ScrapeBackend: Send + Sync + 'static {
    type Session: Send + 'static;

    /// Open an isolated session for the given worker slot.
    async fn acquire(&self, worker_index: usize) -> Result<Self::Session, SessionError>;

    /// Navigate, emulate reading, extract fields, classify soft blocks.
    async fn scrape(
        &self,
        session: &mut Self::Session,
        url: &str,
    ) -> Result<PageScrapeResult, ScrapeError>;

    /// Tear the session down: terminate the process, remove its working
    /// directory. Must be idempotent and must never fail the caller.
    async fn release(&self, session: Self::Session);
}
