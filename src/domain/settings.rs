//! User-tunable crawler settings backed by the persisted config table

use crate::domain::repositories::{ConfigRepository, StoreError};

/// Config key for the number of concurrent worker slots.
pub const THREAD_COUNT_KEY: &str = "threadCount";
/// Config key for the soft-block retry backoff, in seconds.
pub const DELAY_SECONDS_KEY: &str = "delaySeconds";

pub const DEFAULT_THREAD_COUNT: u32 = 2;
pub const DEFAULT_DELAY_SECONDS: u64 = 1;

/// Snapshot of the recognized config values.
///
/// Loaded fresh at the start of every run; editing the config table never
/// affects a run already in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlerSettings {
    /// Number of concurrent worker slots. Always positive.
    pub thread_count: u32,
    /// Backoff between soft-block retry attempts, in seconds.
    pub delay_seconds: u64,
}

impl Default for CrawlerSettings {
    fn default() -> Self {
        Self {
            thread_count: DEFAULT_THREAD_COUNT,
            delay_seconds: DEFAULT_DELAY_SECONDS,
        }
    }
}

impl CrawlerSettings {
    /// Read the recognized keys from the config store, falling back to the
    /// defaults for missing or unparsable values.
    pub async fn load(config: &dyn ConfigRepository) -> Result<Self, StoreError> {
        let thread_count = config
            .get(THREAD_COUNT_KEY)
            .await?
            .and_then(|v| parse_thread_count(&v))
            .unwrap_or(DEFAULT_THREAD_COUNT);

        let delay_seconds = config
            .get(DELAY_SECONDS_KEY)
            .await?
            .and_then(|v| parse_delay_seconds(&v))
            .unwrap_or(DEFAULT_DELAY_SECONDS);

        Ok(Self {
            thread_count,
            delay_seconds,
        })
    }
}

/// `threadCount` must be a positive integer.
fn parse_thread_count(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok().filter(|n| *n > 0)
}

/// `delaySeconds` must be a non-negative integer.
fn parse_delay_seconds(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}
