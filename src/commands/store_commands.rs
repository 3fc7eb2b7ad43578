//! Pass-through CRUD command dispatch against the job store and config
//!
//! The shell addresses store operations by string identifier. Identifiers
//! parse into a closed enum with typed parameters - an unknown name is a
//! typed `UnknownOperation` failure before anything touches the store,
//! never a silent fall-through.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::commands::CommandError;
use crate::domain::job::JobStatus;
use crate::domain::repositories::{ConfigRepository, JobRepository};

/// Every store operation the command surface supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    InsertJob,
    GetAllJobs,
    GetJobsByStatus,
    GetJobById,
    DeleteJob,
    GetJobSummary,
    GetConfigValue,
    SetConfigValue,
    GetAllConfig,
}

impl StoreOperation {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "insertJob" => Some(Self::InsertJob),
            "getAllJobs" => Some(Self::GetAllJobs),
            "getJobsByStatus" => Some(Self::GetJobsByStatus),
            "getJobById" => Some(Self::GetJobById),
            "deleteJob" => Some(Self::DeleteJob),
            "getJobSummary" => Some(Self::GetJobSummary),
            "getConfigValue" => Some(Self::GetConfigValue),
            "setConfigValue" => Some(Self::SetConfigValue),
            "getAllConfig" => Some(Self::GetAllConfig),
            _ => None,
        }
    }

    pub fn identifier(&self) -> &'static str {
        match self {
            Self::InsertJob => "insertJob",
            Self::GetAllJobs => "getAllJobs",
            Self::GetJobsByStatus => "getJobsByStatus",
            Self::GetJobById => "getJobById",
            Self::DeleteJob => "deleteJob",
            Self::GetJobSummary => "getJobSummary",
            Self::GetConfigValue => "getConfigValue",
            Self::SetConfigValue => "setConfigValue",
            Self::GetAllConfig => "getAllConfig",
        }
    }
}

#[derive(Debug, Deserialize)]
struct InsertJobParams {
    url: String,
}

#[derive(Debug, Deserialize)]
struct GetJobsByStatusParams {
    status: JobStatus,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct JobIdParams {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct ConfigKeyParams {
    key: String,
}

#[derive(Debug, Deserialize)]
struct SetConfigParams {
    key: String,
    value: String,
}

/// Dispatch one named operation. The result is the JSON the shell renders.
pub async fn dispatch(
    jobs: &dyn JobRepository,
    config: &dyn ConfigRepository,
    name: &str,
    params: Value,
) -> Result<Value, CommandError> {
    let operation =
        StoreOperation::parse(name).ok_or_else(|| CommandError::UnknownOperation(name.to_string()))?;

    let result = match operation {
        StoreOperation::InsertJob => {
            let p: InsertJobParams = serde_json::from_value(params)?;
            let id = jobs.enqueue(&p.url).await?;
            json!({ "id": id })
        }
        StoreOperation::GetAllJobs => serde_json::to_value(jobs.get_all().await?)?,
        StoreOperation::GetJobsByStatus => {
            let p: GetJobsByStatusParams = serde_json::from_value(params)?;
            serde_json::to_value(jobs.get_by_status(p.status, p.limit).await?)?
        }
        StoreOperation::GetJobById => {
            let p: JobIdParams = serde_json::from_value(params)?;
            serde_json::to_value(jobs.get_by_id(p.id).await?)?
        }
        StoreOperation::DeleteJob => {
            let p: JobIdParams = serde_json::from_value(params)?;
            jobs.delete(p.id).await?;
            Value::Null
        }
        StoreOperation::GetJobSummary => serde_json::to_value(jobs.summary_by_status().await?)?,
        StoreOperation::GetConfigValue => {
            let p: ConfigKeyParams = serde_json::from_value(params)?;
            serde_json::to_value(config.get(&p.key).await?)?
        }
        StoreOperation::SetConfigValue => {
            let p: SetConfigParams = serde_json::from_value(params)?;
            config.set(&p.key, &p.value).await?;
            Value::Null
        }
        StoreOperation::GetAllConfig => serde_json::to_value(config.all().await?)?,
    };

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::StoreError;
    use crate::infrastructure::config_store::SqliteConfigStore;
    use crate::infrastructure::database_connection::test_support::open_temp_database;
    use crate::infrastructure::job_store::SqliteJobStore;

    async fn stores() -> (SqliteJobStore, SqliteConfigStore, tempfile::TempDir) {
        let (db, dir) = open_temp_database().await;
        (
            SqliteJobStore::new(db.pool().clone()),
            SqliteConfigStore::new(db.pool().clone()),
            dir,
        )
    }

    #[test]
    fn identifiers_round_trip() {
        for op in [
            StoreOperation::InsertJob,
            StoreOperation::GetAllJobs,
            StoreOperation::GetJobsByStatus,
            StoreOperation::GetJobById,
            StoreOperation::DeleteJob,
            StoreOperation::GetJobSummary,
            StoreOperation::GetConfigValue,
            StoreOperation::SetConfigValue,
            StoreOperation::GetAllConfig,
        ] {
            assert_eq!(StoreOperation::parse(op.identifier()), Some(op));
        }
    }

    #[tokio::test]
    async fn unknown_operation_is_rejected_before_dispatch() {
        let (jobs, config, _dir) = stores().await;

        let err = dispatch(&jobs, &config, "dropAllTables", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::UnknownOperation(name) if name == "dropAllTables"));
    }

    #[tokio::test]
    async fn insert_and_query_jobs_through_dispatch() {
        let (jobs, config, _dir) = stores().await;

        let inserted = dispatch(
            &jobs,
            &config,
            "insertJob",
            json!({ "url": "https://shop.example/item/1" }),
        )
        .await
        .unwrap();
        let id = inserted["id"].as_i64().unwrap();

        let fetched = dispatch(&jobs, &config, "getJobById", json!({ "id": id }))
            .await
            .unwrap();
        assert_eq!(fetched["url"], "https://shop.example/item/1");
        assert_eq!(fetched["status"], "pending");

        let all = dispatch(&jobs, &config, "getAllJobs", json!({})).await.unwrap();
        assert_eq!(all.as_array().unwrap().len(), 1);

        let by_status = dispatch(
            &jobs,
            &config,
            "getJobsByStatus",
            json!({ "status": "pending", "limit": 10 }),
        )
        .await
        .unwrap();
        assert_eq!(by_status.as_array().unwrap().len(), 1);

        let summary = dispatch(&jobs, &config, "getJobSummary", json!({}))
            .await
            .unwrap();
        assert_eq!(summary["pending"], 1);

        dispatch(&jobs, &config, "deleteJob", json!({ "id": id }))
            .await
            .unwrap();
        let all = dispatch(&jobs, &config, "getAllJobs", json!({})).await.unwrap();
        assert!(all.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_insert_surfaces_store_error() {
        let (jobs, config, _dir) = stores().await;
        let params = json!({ "url": "https://shop.example/item/1" });

        dispatch(&jobs, &config, "insertJob", params.clone())
            .await
            .unwrap();
        let err = dispatch(&jobs, &config, "insertJob", params).await.unwrap_err();
        assert!(matches!(
            err,
            CommandError::Store(StoreError::DuplicateJob(_))
        ));
    }

    #[tokio::test]
    async fn malformed_params_are_invalid_not_unknown() {
        let (jobs, config, _dir) = stores().await;

        let err = dispatch(&jobs, &config, "getJobById", json!({ "id": "seven" }))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::InvalidParams(_)));
    }

    #[tokio::test]
    async fn config_operations_round_trip() {
        let (jobs, config, _dir) = stores().await;

        dispatch(
            &jobs,
            &config,
            "setConfigValue",
            json!({ "key": "threadCount", "value": "4" }),
        )
        .await
        .unwrap();

        let value = dispatch(
            &jobs,
            &config,
            "getConfigValue",
            json!({ "key": "threadCount" }),
        )
        .await
        .unwrap();
        assert_eq!(value, "4");

        let all = dispatch(&jobs, &config, "getAllConfig", json!({}))
            .await
            .unwrap();
        let entries = all.as_array().unwrap();
        assert!(
            entries
                .iter()
                .any(|e| e["key"] == "threadCount" && e["value"] == "4")
        );
    }
}
