//! Standalone entry point: enqueue URLs from the command line, run the
//! crawler to completion, and report the per-status summary. The desktop
//! shell drives the same command surface over IPC instead.

use anyhow::Result;
use tracing::{info, warn};

use prodcrawl::application::state::AppState;
use prodcrawl::commands;
use prodcrawl::domain::repositories::StoreError;
use prodcrawl::infrastructure::database_paths::default_database_url;
use prodcrawl::infrastructure::logging::init_logging;
use prodcrawl::infrastructure::session::SessionConfig;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let urls: Vec<String> = std::env::args().skip(1).collect();

    let database_url = default_database_url()?;
    let state = AppState::initialize(&database_url, SessionConfig::default()).await?;

    for url in &urls {
        match state.jobs.enqueue(url).await {
            Ok(id) => info!(id, url = %url, "job enqueued"),
            Err(StoreError::DuplicateJob(_)) => warn!(url = %url, "already imported, skipping"),
            Err(err) => return Err(err.into()),
        }
    }

    commands::start_crawl(&state).await?;
    if let Some(result) = state.crawler.join().await {
        result?;
    }

    let summary = state.jobs.summary_by_status().await?;
    info!(?summary, "crawl finished");

    Ok(())
}
