//! Repository interfaces for the crawl job store and persisted configuration
//!
//! Contains trait definitions for data access. Implementations must make
//! every mutating operation atomic with respect to the others; in particular
//! the claim in `claim_batch` is a single claim-and-mark step, never a
//! read-then-write sequence.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::domain::job::{ExtractedFields, Job, JobStatus};

/// Errors raised by the persistence layer.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("a job for URL '{0}' already exists")]
    DuplicateJob(String),

    #[error("job {0} does not exist or is not currently processing")]
    NotFound(i64),

    #[error("invalid job URL '{0}'")]
    InvalidUrl(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Create a `Pending` job for `url` and return its id.
    /// Fails with [`StoreError::DuplicateJob`] when the URL is already known.
    async fn enqueue(&self, url: &str) -> Result<i64, StoreError>;

    /// Atomically select up to `limit` pending jobs, mark them `Processing`
    /// and return them. No job is ever returned by two concurrent calls.
    async fn claim_batch(&self, limit: u32) -> Result<Vec<Job>, StoreError>;

    /// Transition a `Processing` job to `Done`, storing the extracted fields
    /// and the crawl timestamp. Fails with [`StoreError::NotFound`] when the
    /// job does not exist or is not currently processing.
    async fn complete(&self, id: i64, fields: &ExtractedFields) -> Result<(), StoreError>;

    /// Transition a `Processing` job to `Error` with a human-readable detail.
    /// Same failure condition as [`JobRepository::complete`].
    async fn fail(&self, id: i64, error_detail: &str) -> Result<(), StoreError>;

    async fn get_by_status(
        &self,
        status: JobStatus,
        limit: Option<u32>,
    ) -> Result<Vec<Job>, StoreError>;

    async fn get_all(&self) -> Result<Vec<Job>, StoreError>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Job>, StoreError>;

    async fn delete(&self, id: i64) -> Result<(), StoreError>;

    /// Count of jobs per status; statuses with no jobs are absent.
    async fn summary_by_status(&self) -> Result<HashMap<JobStatus, i64>, StoreError>;
}

/// One persisted configuration row. Keys the core does not recognize are
/// preserved and ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
}

#[async_trait]
pub trait ConfigRepository: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Upsert: inserts the key or replaces its current value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    async fn all(&self) -> Result<Vec<ConfigEntry>, StoreError>;
}
