//! Crawl orchestrator
//!
//! The scheduler at the center of the core: claims pending jobs in bounded
//! batches, fans them out across `threadCount` worker slots, enforces the
//! per-job timeout and the soft-block retry policy, writes every outcome
//! back through the job store's atomic transitions, and supports
//! cooperative stop.

use futures::future::join_all;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{error, info, warn};

use crate::domain::repositories::{ConfigRepository, JobRepository, StoreError};
use crate::domain::services::{ScrapeBackend, ScrapeError, SessionError};
use crate::domain::settings::CrawlerSettings;

/// Fixed orchestration policy, distinct from the user-tunable
/// [`CrawlerSettings`] read from the config store per run.
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    /// Hard ceiling for one scrape attempt. On expiry the attempt is
    /// abandoned, its session force-released, and the job marked `error`.
    pub job_timeout: Duration,
    /// Additional attempts after a soft-blocked first attempt.
    pub soft_block_retries: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            job_timeout: Duration::from_secs(120),
            soft_block_retries: 2,
        }
    }
}

/// Run lifecycle: `Idle -> Running -> (Draining | Stopping) -> Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    /// The store ran out of pending jobs; in-flight work is finishing.
    Draining,
    /// `stop()` was requested; in-flight work is finishing.
    Stopping,
}

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("a crawl run is already in progress")]
    AlreadyRunning,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A failure that ended a whole run, surfaced to whoever triggered it.
#[derive(Error, Debug, Clone)]
pub enum RunError {
    #[error("run aborted, browser executable unavailable: {0}")]
    BrowserMissing(String),

    #[error("run aborted, job store failure: {0}")]
    Store(String),

    #[error("run task failed: {0}")]
    Join(String),
}

/// Per-attempt failure, recovered locally by the worker.
#[derive(Error, Debug)]
enum AttemptError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error("attempt timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

enum JobOutcome {
    Finished,
    /// The host has no browser executable; nothing else can progress.
    Fatal(String),
}

pub struct CrawlOrchestrator<B: ScrapeBackend> {
    jobs: Arc<dyn JobRepository>,
    config: Arc<dyn ConfigRepository>,
    backend: Arc<B>,
    policy: OrchestratorConfig,
    state: Arc<RwLock<RunState>>,
    stop_requested: Arc<AtomicBool>,
    last_run_error: Arc<std::sync::Mutex<Option<String>>>,
    run_task: AsyncMutex<Option<JoinHandle<Result<(), RunError>>>>,
}

impl<B: ScrapeBackend> CrawlOrchestrator<B> {
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        config: Arc<dyn ConfigRepository>,
        backend: Arc<B>,
        policy: OrchestratorConfig,
    ) -> Self {
        Self {
            jobs,
            config,
            backend,
            policy,
            state: Arc::new(RwLock::new(RunState::Idle)),
            stop_requested: Arc::new(AtomicBool::new(false)),
            last_run_error: Arc::new(std::sync::Mutex::new(None)),
            run_task: AsyncMutex::new(None),
        }
    }

    /// Begin a crawl run. Settings are read fresh here, so config edits
    /// affect the next run, never one already in flight.
    pub async fn start(&self) -> Result<(), OrchestratorError> {
        {
            let mut state = self.state.write().await;
            if *state != RunState::Idle {
                return Err(OrchestratorError::AlreadyRunning);
            }
            *state = RunState::Running;
        }

        let settings = match CrawlerSettings::load(self.config.as_ref()).await {
            Ok(settings) => settings,
            Err(err) => {
                *self.state.write().await = RunState::Idle;
                return Err(err.into());
            }
        };

        self.stop_requested.store(false, Ordering::SeqCst);
        if let Ok(mut last) = self.last_run_error.lock() {
            *last = None;
        }

        let ctx = RunContext {
            jobs: Arc::clone(&self.jobs),
            backend: Arc::clone(&self.backend),
            settings,
            policy: self.policy,
            state: Arc::clone(&self.state),
            stop_requested: Arc::clone(&self.stop_requested),
            last_run_error: Arc::clone(&self.last_run_error),
        };

        let handle = tokio::spawn(run_loop(ctx));
        *self.run_task.lock().await = Some(handle);

        Ok(())
    }

    /// Request a cooperative stop. In-flight attempts finish; no session is
    /// preempted mid-scrape. Idempotent.
    pub async fn stop(&self) {
        if self.stop_requested.swap(true, Ordering::SeqCst) {
            return;
        }
        if self.is_running().await {
            info!("stop requested; letting in-flight attempts finish");
        }
    }

    /// Point-in-time read of the run lifecycle.
    pub async fn is_running(&self) -> bool {
        *self.state.read().await != RunState::Idle
    }

    pub async fn state(&self) -> RunState {
        *self.state.read().await
    }

    /// Await completion of the current run and return its result. `None`
    /// when no run was started since the last join.
    pub async fn join(&self) -> Option<Result<(), RunError>> {
        let handle = self.run_task.lock().await.take()?;
        match handle.await {
            Ok(result) => Some(result),
            Err(err) => Some(Err(RunError::Join(err.to_string()))),
        }
    }

    /// Failure that aborted the most recent run, if any.
    pub fn last_run_error(&self) -> Option<String> {
        self.last_run_error.lock().ok().and_then(|g| g.clone())
    }
}

struct RunContext<B: ScrapeBackend> {
    jobs: Arc<dyn JobRepository>,
    backend: Arc<B>,
    settings: CrawlerSettings,
    policy: OrchestratorConfig,
    state: Arc<RwLock<RunState>>,
    stop_requested: Arc<AtomicBool>,
    last_run_error: Arc<std::sync::Mutex<Option<String>>>,
}

impl<B: ScrapeBackend> Clone for RunContext<B> {
    fn clone(&self) -> Self {
        Self {
            jobs: Arc::clone(&self.jobs),
            backend: Arc::clone(&self.backend),
            settings: self.settings,
            policy: self.policy,
            state: Arc::clone(&self.state),
            stop_requested: Arc::clone(&self.stop_requested),
            last_run_error: Arc::clone(&self.last_run_error),
        }
    }
}

async fn run_loop<B: ScrapeBackend>(ctx: RunContext<B>) -> Result<(), RunError> {
    info!(
        thread_count = ctx.settings.thread_count,
        delay_seconds = ctx.settings.delay_seconds,
        "crawl run started"
    );

    let result = loop {
        // Checked before claiming so a stop never strands claimed jobs.
        if ctx.stop_requested.load(Ordering::SeqCst) {
            *ctx.state.write().await = RunState::Stopping;
            info!("stop flag set, ending run");
            break Ok(());
        }

        let batch = match ctx.jobs.claim_batch(ctx.settings.thread_count).await {
            Ok(batch) => batch,
            Err(err) => {
                error!("failed to claim batch: {err}");
                break Err(RunError::Store(err.to_string()));
            }
        };

        if batch.is_empty() {
            *ctx.state.write().await = RunState::Draining;
            info!("no more pending jobs");
            break Ok(());
        }

        let workers: Vec<_> = batch
            .into_iter()
            .enumerate()
            .map(|(slot, job)| {
                let ctx = ctx.clone();
                tokio::spawn(async move { run_job(&ctx, slot, job.id, &job.url).await })
            })
            .collect();

        let mut fatal = None;
        for outcome in join_all(workers).await {
            match outcome {
                Ok(JobOutcome::Finished) => {}
                Ok(JobOutcome::Fatal(detail)) => fatal = Some(detail),
                Err(err) => error!("worker task failed: {err}"),
            }
        }

        if let Some(detail) = fatal {
            break Err(RunError::BrowserMissing(detail));
        }
    };

    if let Err(ref err) = result {
        error!("crawl run aborted: {err}");
        if let Ok(mut last) = ctx.last_run_error.lock() {
            *last = Some(err.to_string());
        }
    }

    *ctx.state.write().await = RunState::Idle;
    info!("crawl run finished");
    result
}

/// Drive one claimed job to a terminal status. Soft blocks retry with
/// backoff; hard errors and timeouts fail immediately.
async fn run_job<B: ScrapeBackend>(
    ctx: &RunContext<B>,
    slot: usize,
    job_id: i64,
    url: &str,
) -> JobOutcome {
    let attempts = ctx.policy.soft_block_retries + 1;

    for attempt in 1..=attempts {
        if attempt > 1 && ctx.settings.delay_seconds > 0 {
            sleep(Duration::from_secs(ctx.settings.delay_seconds)).await;
        }

        match run_attempt(ctx, slot, url).await {
            Ok(result) if !result.soft_blocked => {
                if let Err(err) = ctx.jobs.complete(job_id, &result.fields).await {
                    error!(job_id, "failed to record completion: {err}");
                }
                return JobOutcome::Finished;
            }
            Ok(_) => {
                warn!(job_id, url, attempt, "attempt soft-blocked");
            }
            Err(AttemptError::Session(SessionError::BrowserNotFound)) => {
                let detail = SessionError::BrowserNotFound.to_string();
                record_failure(ctx, job_id, &detail).await;
                return JobOutcome::Fatal(detail);
            }
            Err(err) => {
                // Environment problem, not a transient site response - no retry.
                record_failure(ctx, job_id, &err.to_string()).await;
                return JobOutcome::Finished;
            }
        }
    }

    // Every attempt came back soft-blocked.
    record_failure(ctx, job_id, "soft-blocked").await;
    JobOutcome::Finished
}

/// One attempt: acquire a session, scrape under the per-job ceiling, and
/// release the session on every path before the slot frees.
async fn run_attempt<B: ScrapeBackend>(
    ctx: &RunContext<B>,
    slot: usize,
    url: &str,
) -> Result<crate::domain::services::PageScrapeResult, AttemptError> {
    let mut session = ctx.backend.acquire(slot).await?;

    let outcome = timeout(ctx.policy.job_timeout, ctx.backend.scrape(&mut session, url)).await;

    // The one guarantee every exit path shares.
    ctx.backend.release(session).await;

    match outcome {
        Err(_) => Err(AttemptError::Timeout(ctx.policy.job_timeout)),
        Ok(Ok(result)) => Ok(result),
        Ok(Err(err)) => Err(err.into()),
    }
}

async fn record_failure<B: ScrapeBackend>(ctx: &RunContext<B>, job_id: i64, detail: &str) {
    if let Err(err) = ctx.jobs.fail(job_id, detail).await {
        error!(job_id, "failed to record job failure: {err}");
    }
}
