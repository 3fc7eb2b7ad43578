//! Crawl job entity and status vocabulary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a crawl job.
///
/// `Pending` and `Processing` are the live states; `Done` and `Error` are
/// terminal. A job only enters `Processing` through an atomic claim and only
/// leaves it through the orchestrator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Done,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "done" => Ok(JobStatus::Done),
            "error" => Ok(JobStatus::Error),
            _ => Err(format!("invalid job status: {s}")),
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured fields extracted from a product page.
///
/// Every member is best-effort: a field the page does not expose stays empty,
/// extraction never fails a scrape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub title: String,
    pub price: String,
    pub images: Vec<String>,
    pub description: String,
    pub rating: String,
    pub reviews: Vec<String>,
}

/// One crawl target: a product URL plus its status and result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: i64,
    pub url: String,
    pub status: JobStatus,
    /// Populated only on the transition to `Done`.
    pub extracted_fields: Option<ExtractedFields>,
    /// Populated only on the transition to `Error`.
    pub error_detail: Option<String>,
    /// Set on either terminal transition.
    pub crawled_at: Option<DateTime<Utc>>,
}
