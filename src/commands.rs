//! Command surface exposed upward to the shell/IPC layer
//!
//! Crawler controls plus pass-through CRUD dispatch by string identifier.

use thiserror::Error;

use crate::application::orchestrator::OrchestratorError;
use crate::domain::repositories::StoreError;

pub mod crawl_commands;
pub mod store_commands;

pub use crawl_commands::{is_crawler_running, start_crawl, stop_crawl};
pub use store_commands::{StoreOperation, dispatch};

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    #[error("invalid parameters: {0}")]
    InvalidParams(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Crawler(#[from] OrchestratorError),
}
