// Database connection and pool management
// This module handles SQLite database connections using sqlx

use anyhow::Result;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::path::Path;

use crate::domain::settings::{
    DEFAULT_DELAY_SECONDS, DEFAULT_THREAD_COUNT, DELAY_SECONDS_KEY, THREAD_COUNT_KEY,
};

pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    pub async fn new(database_url: &str) -> Result<Self> {
        // Create database file directory if it doesn't exist
        let db_path = if database_url.starts_with("sqlite://") {
            database_url.trim_start_matches("sqlite://")
        } else if database_url.starts_with("sqlite:") {
            database_url.trim_start_matches("sqlite:")
        } else {
            database_url
        };

        if let Some(parent) = Path::new(db_path).parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Ensure the database file exists by creating it if necessary
        if !Path::new(db_path).exists() {
            std::fs::File::create(db_path)?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the tables the core reads and writes, plus the default config
    /// rows. `INSERT OR IGNORE` keeps values an operator already changed.
    pub async fn migrate(&self) -> Result<()> {
        let create_jobs_sql = r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL UNIQUE,
                status TEXT NOT NULL DEFAULT 'pending',
                title TEXT,
                price TEXT,
                images TEXT,
                description TEXT,
                rating TEXT,
                reviews TEXT,
                error TEXT,
                crawled_at TEXT
            )
        "#;

        let create_config_sql = r#"
            CREATE TABLE IF NOT EXISTS config (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
        "#;

        let create_indexes_sql = r#"
            CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs (status)
        "#;

        sqlx::query(create_jobs_sql).execute(&self.pool).await?;
        sqlx::query(create_config_sql).execute(&self.pool).await?;
        sqlx::query(create_indexes_sql).execute(&self.pool).await?;

        let defaults = [
            (THREAD_COUNT_KEY, DEFAULT_THREAD_COUNT.to_string()),
            (DELAY_SECONDS_KEY, DEFAULT_DELAY_SECONDS.to_string()),
        ];
        for (key, value) in defaults {
            sqlx::query("INSERT OR IGNORE INTO config (key, value) VALUES ($1, $2)")
                .bind(key)
                .bind(value)
                .execute(&self.pool)
                .await?;
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use tempfile::TempDir;

    /// Open a migrated store on a throwaway SQLite file. The TempDir must be
    /// kept alive for the lifetime of the pool.
    pub(crate) async fn open_temp_database() -> (DatabaseConnection, TempDir) {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let db_path = temp_dir.path().join("prodcrawl-test.db");
        let database_url = format!("sqlite:{}", db_path.display());

        let db = DatabaseConnection::new(&database_url)
            .await
            .expect("open database");
        db.migrate().await.expect("migrate database");

        (db, temp_dir)
    }
}
