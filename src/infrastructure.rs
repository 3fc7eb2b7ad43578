//! Infrastructure layer for database access, browser sessions and logging
//!
//! Concrete implementations of the domain seams: the SQLite job/config
//! stores, the Chromium session manager and page driver, and logging setup.

pub mod chromium_backend;
pub mod config_store;
pub mod database_connection;
pub mod database_paths;
pub mod job_store;
pub mod logging;
pub mod page_driver;
pub mod product_extractor;
pub mod session;
pub mod user_agents;

// Re-export commonly used items
pub use chromium_backend::ChromiumBackend;
pub use config_store::SqliteConfigStore;
pub use database_connection::DatabaseConnection;
pub use database_paths::{default_database_url, default_profile_root};
pub use job_store::SqliteJobStore;
pub use logging::{init_logging, init_logging_with_file};
pub use page_driver::PageDriver;
pub use product_extractor::{ExtractorConfig, ProductExtractor};
pub use session::{BrowserSession, SessionConfig, SessionManager};
