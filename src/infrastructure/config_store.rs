//! SQLite-backed key/value configuration store

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::domain::repositories::{ConfigEntry, ConfigRepository, StoreError};

pub struct SqliteConfigStore {
    pool: SqlitePool,
}

impl SqliteConfigStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConfigRepository for SqliteConfigStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT value FROM config WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match row {
            Some(row) => Some(row.try_get("value")?),
            None => None,
        })
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO config (key, value) VALUES ($1, $2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn all(&self) -> Result<Vec<ConfigEntry>, StoreError> {
        let rows = sqlx::query("SELECT key, value FROM config ORDER BY key")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                Ok(ConfigEntry {
                    key: row.try_get("key")?,
                    value: row.try_get("value")?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::settings::CrawlerSettings;
    use crate::infrastructure::database_connection::test_support::open_temp_database;

    async fn open_store() -> (SqliteConfigStore, tempfile::TempDir) {
        let (db, dir) = open_temp_database().await;
        (SqliteConfigStore::new(db.pool().clone()), dir)
    }

    #[tokio::test]
    async fn fresh_store_yields_default_settings() {
        let (store, _dir) = open_store().await;

        let settings = CrawlerSettings::load(&store).await.unwrap();
        assert_eq!(settings.thread_count, 2);
        assert_eq!(settings.delay_seconds, 1);
    }

    #[tokio::test]
    async fn set_upserts_and_settings_pick_it_up() {
        let (store, _dir) = open_store().await;

        store.set("threadCount", "4").await.unwrap();
        store.set("delaySeconds", "0").await.unwrap();
        store.set("threadCount", "3").await.unwrap();

        let settings = CrawlerSettings::load(&store).await.unwrap();
        assert_eq!(settings.thread_count, 3);
        assert_eq!(settings.delay_seconds, 0);
    }

    #[tokio::test]
    async fn unparsable_values_fall_back_to_defaults() {
        let (store, _dir) = open_store().await;

        store.set("threadCount", "lots").await.unwrap();
        store.set("delaySeconds", "-5").await.unwrap();

        let settings = CrawlerSettings::load(&store).await.unwrap();
        assert_eq!(settings.thread_count, 2);
        assert_eq!(settings.delay_seconds, 1);
    }

    #[tokio::test]
    async fn unrecognized_keys_are_preserved() {
        let (store, _dir) = open_store().await;

        store.set("proxyPool", "none").await.unwrap();
        assert_eq!(store.get("proxyPool").await.unwrap().as_deref(), Some("none"));

        // Settings loading ignores them without complaint
        let settings = CrawlerSettings::load(&store).await.unwrap();
        assert_eq!(settings, CrawlerSettings::default());

        let all = store.all().await.unwrap();
        assert!(all.iter().any(|e| e.key == "proxyPool"));
    }

    #[tokio::test]
    async fn missing_key_reads_none() {
        let (store, _dir) = open_store().await;
        assert_eq!(store.get("nope").await.unwrap(), None);
    }
}
