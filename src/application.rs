//! Application layer module
//!
//! Orchestration of the domain logic: the crawl scheduler and the shared
//! state the command surface operates on.

pub mod orchestrator;
pub mod state;

pub use orchestrator::{CrawlOrchestrator, OrchestratorConfig, OrchestratorError, RunError, RunState};
pub use state::AppState;
