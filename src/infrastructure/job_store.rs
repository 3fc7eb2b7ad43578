//! SQLite-backed crawl job store
//!
//! Concrete implementation of [`JobRepository`]. Every mutation is a single
//! SQL statement, so the claim-and-mark in `claim_batch` and the guarded
//! terminal transitions in `complete`/`fail` are atomic under SQLite's
//! writer serialization - two concurrent claimers can never receive the
//! same job.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

use crate::domain::job::{ExtractedFields, Job, JobStatus};
use crate::domain::repositories::{JobRepository, StoreError};

pub struct SqliteJobStore {
    pool: SqlitePool,
}

const JOB_COLUMNS: &str =
    "id, url, status, title, price, images, description, rating, reviews, error, crawled_at";

impl SqliteJobStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Helper method to convert a database row to a Job entity
    fn row_to_job(row: &sqlx::sqlite::SqliteRow) -> Result<Job, StoreError> {
        let status: JobStatus = row.try_get("status")?;

        let crawled_at: Option<String> = row.try_get("crawled_at")?;
        let crawled_at = crawled_at
            .map(|raw| {
                DateTime::parse_from_rfc3339(&raw)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| sqlx::Error::Decode(Box::new(e)))
            })
            .transpose()?;

        // Field columns are written together on the transition to done; a
        // job in any other state reports no extracted fields.
        let extracted_fields = if status == JobStatus::Done {
            let images: Option<String> = row.try_get("images")?;
            let reviews: Option<String> = row.try_get("reviews")?;
            Some(ExtractedFields {
                title: row.try_get::<Option<String>, _>("title")?.unwrap_or_default(),
                price: row.try_get::<Option<String>, _>("price")?.unwrap_or_default(),
                images: images
                    .and_then(|raw| serde_json::from_str(&raw).ok())
                    .unwrap_or_default(),
                description: row
                    .try_get::<Option<String>, _>("description")?
                    .unwrap_or_default(),
                rating: row.try_get::<Option<String>, _>("rating")?.unwrap_or_default(),
                reviews: reviews
                    .and_then(|raw| serde_json::from_str(&raw).ok())
                    .unwrap_or_default(),
            })
        } else {
            None
        };

        Ok(Job {
            id: row.try_get("id")?,
            url: row.try_get("url")?,
            status,
            extracted_fields,
            error_detail: row.try_get("error")?,
            crawled_at,
        })
    }
}

#[async_trait]
impl JobRepository for SqliteJobStore {
    async fn enqueue(&self, url: &str) -> Result<i64, StoreError> {
        url::Url::parse(url).map_err(|_| StoreError::InvalidUrl(url.to_string()))?;

        let result = sqlx::query("INSERT INTO jobs (url, status) VALUES ($1, 'pending')")
            .bind(url)
            .execute(&self.pool)
            .await;

        match result {
            Ok(done) => Ok(done.last_insert_rowid()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::DuplicateJob(url.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn claim_batch(&self, limit: u32) -> Result<Vec<Job>, StoreError> {
        // Claim-and-mark in one statement. The subquery and the UPDATE run
        // under a single write lock, so overlapping claims are impossible.
        let sql = format!(
            r#"
            UPDATE jobs SET status = 'processing'
            WHERE id IN (
                SELECT id FROM jobs WHERE status = 'pending' ORDER BY id LIMIT $1
            )
            RETURNING {JOB_COLUMNS}
            "#
        );

        let rows = sqlx::query(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_job).collect()
    }

    async fn complete(&self, id: i64, fields: &ExtractedFields) -> Result<(), StoreError> {
        let images = serde_json::to_string(&fields.images).unwrap_or_default();
        let reviews = serde_json::to_string(&fields.reviews).unwrap_or_default();

        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'done', title = $2, price = $3, images = $4,
                description = $5, rating = $6, reviews = $7, crawled_at = $8
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(id)
        .bind(&fields.title)
        .bind(&fields.price)
        .bind(images)
        .bind(&fields.description)
        .bind(&fields.rating)
        .bind(reviews)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn fail(&self, id: i64, error_detail: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE jobs SET status = 'error', error = $2, crawled_at = $3
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(id)
        .bind(error_detail)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn get_by_status(
        &self,
        status: JobStatus,
        limit: Option<u32>,
    ) -> Result<Vec<Job>, StoreError> {
        let rows = match limit {
            Some(limit) => {
                let sql = format!(
                    "SELECT {JOB_COLUMNS} FROM jobs WHERE status = $1 ORDER BY id LIMIT $2"
                );
                sqlx::query(&sql)
                    .bind(status)
                    .bind(i64::from(limit))
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE status = $1 ORDER BY id");
                sqlx::query(&sql).bind(status).fetch_all(&self.pool).await?
            }
        };

        rows.iter().map(Self::row_to_job).collect()
    }

    async fn get_all(&self) -> Result<Vec<Job>, StoreError> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs ORDER BY id");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_job).collect()
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Job>, StoreError> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;

        match row {
            Some(row) => Ok(Some(Self::row_to_job(&row)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn summary_by_status(&self) -> Result<HashMap<JobStatus, i64>, StoreError> {
        let rows = sqlx::query("SELECT status, COUNT(*) as count FROM jobs GROUP BY status")
            .fetch_all(&self.pool)
            .await?;

        let mut summary = HashMap::new();
        for row in &rows {
            let status: JobStatus = row.try_get("status")?;
            let count: i64 = row.try_get("count")?;
            summary.insert(status, count);
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database_connection::test_support::open_temp_database;
    use std::collections::HashSet;
    use std::sync::Arc;

    async fn open_store() -> (SqliteJobStore, tempfile::TempDir) {
        let (db, dir) = open_temp_database().await;
        (SqliteJobStore::new(db.pool().clone()), dir)
    }

    fn url_for(n: usize) -> String {
        format!("https://shop.example/item/{n}")
    }

    #[tokio::test]
    async fn enqueue_assigns_distinct_ids() {
        let (store, _dir) = open_store().await;

        let a = store.enqueue(&url_for(1)).await.unwrap();
        let b = store.enqueue(&url_for(2)).await.unwrap();
        assert_ne!(a, b);

        let job = store.get_by_id(a).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.url, url_for(1));
        assert!(job.extracted_fields.is_none());
        assert!(job.crawled_at.is_none());
    }

    #[tokio::test]
    async fn enqueue_duplicate_url_fails_and_keeps_one_row() {
        let (store, _dir) = open_store().await;

        store.enqueue(&url_for(1)).await.unwrap();
        let err = store.enqueue(&url_for(1)).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateJob(_)));

        let jobs = store.get_all().await.unwrap();
        assert_eq!(jobs.len(), 1);
    }

    #[tokio::test]
    async fn enqueue_rejects_malformed_urls() {
        let (store, _dir) = open_store().await;

        let err = store.enqueue("not a url").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidUrl(_)));
        assert!(store.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn claim_batch_marks_jobs_processing() {
        let (store, _dir) = open_store().await;
        for n in 0..5 {
            store.enqueue(&url_for(n)).await.unwrap();
        }

        let claimed = store.claim_batch(3).await.unwrap();
        assert_eq!(claimed.len(), 3);
        for job in &claimed {
            assert_eq!(job.status, JobStatus::Processing);
        }

        let pending = store.get_by_status(JobStatus::Pending, None).await.unwrap();
        assert_eq!(pending.len(), 2);

        // A second claim never re-hands out already claimed jobs
        let second = store.claim_batch(10).await.unwrap();
        assert_eq!(second.len(), 2);
        let first_ids: HashSet<i64> = claimed.iter().map(|j| j.id).collect();
        assert!(second.iter().all(|j| !first_ids.contains(&j.id)));
    }

    #[tokio::test]
    async fn concurrent_claims_never_overlap() {
        let (store, _dir) = open_store().await;
        let store = Arc::new(store);

        for n in 0..40 {
            store.enqueue(&url_for(n)).await.unwrap();
        }

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                let mut mine = Vec::new();
                for _ in 0..3 {
                    let batch = store.claim_batch(5).await.unwrap();
                    mine.extend(batch.into_iter().map(|j| j.id));
                }
                mine
            }));
        }

        let mut seen = HashSet::new();
        let mut total = 0usize;
        for task in tasks {
            for id in task.await.unwrap() {
                total += 1;
                assert!(seen.insert(id), "job {id} claimed by two callers");
            }
        }
        assert_eq!(total, 40);
        assert!(
            store
                .get_by_status(JobStatus::Pending, None)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn complete_stores_fields_and_timestamp() {
        let (store, _dir) = open_store().await;
        let id = store.enqueue(&url_for(1)).await.unwrap();
        store.claim_batch(1).await.unwrap();

        let fields = ExtractedFields {
            title: "Wireless Mouse".to_string(),
            price: "$24.99".to_string(),
            images: vec!["https://img.example/1.jpg".to_string()],
            description: "A mouse.".to_string(),
            rating: "4.5".to_string(),
            reviews: vec!["works great".to_string()],
        };
        store.complete(id, &fields).await.unwrap();

        let job = store.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Done);
        assert_eq!(job.extracted_fields.as_ref(), Some(&fields));
        assert!(job.crawled_at.is_some());
        assert!(job.error_detail.is_none());
    }

    #[tokio::test]
    async fn complete_requires_processing_status() {
        let (store, _dir) = open_store().await;
        let id = store.enqueue(&url_for(1)).await.unwrap();

        // Still pending - never claimed
        let err = store.complete(id, &ExtractedFields::default()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        // Nonexistent id
        let err = store.complete(9999, &ExtractedFields::default()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(9999)));

        // Already terminal
        store.claim_batch(1).await.unwrap();
        store.complete(id, &ExtractedFields::default()).await.unwrap();
        let err = store.complete(id, &ExtractedFields::default()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn fail_stores_detail_and_requires_processing() {
        let (store, _dir) = open_store().await;
        let id = store.enqueue(&url_for(1)).await.unwrap();

        let err = store.fail(id, "boom").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        store.claim_batch(1).await.unwrap();
        store.fail(id, "navigation failed").await.unwrap();

        let job = store.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.error_detail.as_deref(), Some("navigation failed"));
        assert!(job.extracted_fields.is_none());
        assert!(job.crawled_at.is_some());
    }

    #[tokio::test]
    async fn summary_counts_by_status() {
        let (store, _dir) = open_store().await;
        for n in 0..4 {
            store.enqueue(&url_for(n)).await.unwrap();
        }

        let claimed = store.claim_batch(2).await.unwrap();
        store
            .complete(claimed[0].id, &ExtractedFields::default())
            .await
            .unwrap();
        store.fail(claimed[1].id, "blocked").await.unwrap();

        let summary = store.summary_by_status().await.unwrap();
        assert_eq!(summary.get(&JobStatus::Pending), Some(&2));
        assert_eq!(summary.get(&JobStatus::Done), Some(&1));
        assert_eq!(summary.get(&JobStatus::Error), Some(&1));
        assert_eq!(summary.get(&JobStatus::Processing), None);
    }

    #[tokio::test]
    async fn delete_removes_job() {
        let (store, _dir) = open_store().await;
        let id = store.enqueue(&url_for(1)).await.unwrap();

        store.delete(id).await.unwrap();
        assert!(store.get_by_id(id).await.unwrap().is_none());

        // Deleting a missing row is not an error
        store.delete(id).await.unwrap();
    }

    #[tokio::test]
    async fn get_by_status_honors_limit() {
        let (store, _dir) = open_store().await;
        for n in 0..6 {
            store.enqueue(&url_for(n)).await.unwrap();
        }

        let limited = store
            .get_by_status(JobStatus::Pending, Some(4))
            .await
            .unwrap();
        assert_eq!(limited.len(), 4);
    }
}
