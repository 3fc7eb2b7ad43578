//! ProdCrawl - E-commerce Product Crawling Core
//!
//! Imports product URLs, drives isolated browser sessions to scrape product
//! pages, and persists results in a local SQLite store. The desktop shell
//! and IPC transport sit above the command surface in [`commands`].

// Module declarations
pub mod application;
pub mod commands;
pub mod domain;
pub mod infrastructure;

// Re-export the pieces the shell wires together
pub use application::{AppState, CrawlOrchestrator, OrchestratorConfig, RunError};
pub use commands::{CommandError, dispatch, is_crawler_running, start_crawl, stop_crawl};
pub use domain::{CrawlerSettings, ExtractedFields, Job, JobStatus};
pub use infrastructure::{ChromiumBackend, SessionConfig, default_database_url, init_logging};
