//! SQLite implementation of [`ExecutionStore`]

use std::str::FromStr;

use chrono::{DateTime, Utc};
use retrieval_core::domain::{ClientId, ConfigurationId, ETag, ErrorCategory, Execution, ExecutionId, ExecutionStatus};
use retrieval_core::ports::{ExecutionPage, ExecutionStore, StoreError};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::errors::map_sqlx_error;

pub struct SqliteExecutionStore {
    pool: SqlitePool,
}

impl SqliteExecutionStore {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn status_to_string(status: ExecutionStatus) -> &'static str {
    match status {
        ExecutionStatus::Pending => "Pending",
        ExecutionStatus::Running => "Running",
        ExecutionStatus::Completed => "Completed",
        ExecutionStatus::Failed => "Failed",
    }
}

fn status_from_string(s: &str) -> Result<ExecutionStatus, StoreError> {
    match s {
        "Pending" => Ok(ExecutionStatus::Pending),
        "Running" => Ok(ExecutionStatus::Running),
        "Completed" => Ok(ExecutionStatus::Completed),
        "Failed" => Ok(ExecutionStatus::Failed),
        other => Err(StoreError::Unavailable(anyhow::anyhow!("unknown execution status: {other}"))),
    }
}

fn category_to_string(category: ErrorCategory) -> &'static str {
    match category {
        ErrorCategory::ConfigurationError => "ConfigurationError",
        ErrorCategory::ValidationError => "ValidationError",
        ErrorCategory::AuthenticationFailure => "AuthenticationFailure",
        ErrorCategory::ConnectionTimeout => "ConnectionTimeout",
        ErrorCategory::ProtocolError => "ProtocolError",
        ErrorCategory::Conflict => "Conflict",
        ErrorCategory::PreconditionFailed => "PreconditionFailed",
        ErrorCategory::Cancelled => "Cancelled",
        ErrorCategory::HandlerError => "HandlerError",
    }
}

fn category_from_string(s: &str) -> Result<ErrorCategory, StoreError> {
    match s {
        "ConfigurationError" => Ok(ErrorCategory::ConfigurationError),
        "ValidationError" => Ok(ErrorCategory::ValidationError),
        "AuthenticationFailure" => Ok(ErrorCategory::AuthenticationFailure),
        "ConnectionTimeout" => Ok(ErrorCategory::ConnectionTimeout),
        "ProtocolError" => Ok(ErrorCategory::ProtocolError),
        "Conflict" => Ok(ErrorCategory::Conflict),
        "PreconditionFailed" => Ok(ErrorCategory::PreconditionFailed),
        "Cancelled" => Ok(ErrorCategory::Cancelled),
        "HandlerError" => Ok(ErrorCategory::HandlerError),
        other => Err(StoreError::Unavailable(anyhow::anyhow!("unknown error category: {other}"))),
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Unavailable(anyhow::anyhow!("invalid timestamp '{s}': {e}")))
}

fn row_to_execution(row: &SqliteRow) -> Result<Execution, StoreError> {
    let client_id: String = row.get("client_id");
    let configuration_id: String = row.get("configuration_id");
    let execution_id: String = row.get("execution_id");
    let status: String = row.get("status");
    let started_at: String = row.get("started_at");
    let completed_at: Option<String> = row.get("completed_at");
    let error_category: Option<String> = row.get("error_category");
    let duration_ms: Option<i64> = row.get("duration_ms");

    Ok(Execution {
        client_id: ClientId::new(client_id).map_err(|e| StoreError::Unavailable(anyhow::anyhow!(e)))?,
        configuration_id: ConfigurationId::from_str(&configuration_id)
            .map_err(|e| StoreError::Unavailable(anyhow::anyhow!(e)))?,
        execution_id: ExecutionId::from_str(&execution_id)
            .map_err(|e| StoreError::Unavailable(anyhow::anyhow!(e)))?,
        status: status_from_string(&status)?,
        started_at: parse_datetime(&started_at)?,
        completed_at: completed_at.as_deref().map(parse_datetime).transpose()?,
        files_found: row.get::<i64, _>("files_found") as u32,
        files_processed: row.get::<i64, _>("files_processed") as u32,
        resolved_file_path_pattern: row.get("resolved_file_path_pattern"),
        resolved_filename_pattern: row.get("resolved_filename_pattern"),
        duration_ms: duration_ms.map(|d| d as u64),
        retry_count: row.get::<i64, _>("retry_count") as u32,
        error_message: row.get("error_message"),
        error_category: error_category.as_deref().map(category_from_string).transpose()?,
        etag: ETag::from(row.get::<String, _>("etag")),
    })
}

#[async_trait::async_trait]
impl ExecutionStore for SqliteExecutionStore {
    async fn create(&self, execution: Execution) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO executions \
             (client_id, configuration_id, execution_id, status, started_at, completed_at, \
              files_found, files_processed, resolved_file_path_pattern, resolved_filename_pattern, \
              duration_ms, retry_count, error_message, error_category, etag) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(execution.client_id.as_str())
        .bind(execution.configuration_id.to_string())
        .bind(execution.execution_id.to_string())
        .bind(status_to_string(execution.status))
        .bind(execution.started_at.to_rfc3339())
        .bind(execution.completed_at.map(|dt| dt.to_rfc3339()))
        .bind(i64::from(execution.files_found))
        .bind(i64::from(execution.files_processed))
        .bind(&execution.resolved_file_path_pattern)
        .bind(&execution.resolved_filename_pattern)
        .bind(execution.duration_ms.map(|d| d as i64))
        .bind(i64::from(execution.retry_count))
        .bind(&execution.error_message)
        .bind(execution.error_category.map(category_to_string))
        .bind(execution.etag.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn update(&self, execution: Execution) -> Result<Execution, StoreError> {
        let fresh_etag = ETag::generate();
        let result = sqlx::query(
            "UPDATE executions SET status = ?, completed_at = ?, files_found = ?, \
             files_processed = ?, resolved_file_path_pattern = ?, resolved_filename_pattern = ?, \
             duration_ms = ?, retry_count = ?, error_message = ?, error_category = ?, etag = ? \
             WHERE client_id = ? AND configuration_id = ? AND execution_id = ? AND etag = ?",
        )
        .bind(status_to_string(execution.status))
        .bind(execution.completed_at.map(|dt| dt.to_rfc3339()))
        .bind(i64::from(execution.files_found))
        .bind(i64::from(execution.files_processed))
        .bind(&execution.resolved_file_path_pattern)
        .bind(&execution.resolved_filename_pattern)
        .bind(execution.duration_ms.map(|d| d as i64))
        .bind(i64::from(execution.retry_count))
        .bind(&execution.error_message)
        .bind(execution.error_category.map(category_to_string))
        .bind(fresh_etag.as_str())
        .bind(execution.client_id.as_str())
        .bind(execution.configuration_id.to_string())
        .bind(execution.execution_id.to_string())
        .bind(execution.etag.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::PreconditionFailed);
        }

        let mut updated = execution;
        updated.etag = fresh_etag;
        Ok(updated)
    }

    async fn get_by_id(
        &self,
        client_id: &ClientId,
        configuration_id: &ConfigurationId,
        execution_id: &ExecutionId,
    ) -> Result<Option<Execution>, StoreError> {
        let row = sqlx::query(
            "SELECT * FROM executions WHERE client_id = ? AND configuration_id = ? AND execution_id = ?",
        )
        .bind(client_id.as_str())
        .bind(configuration_id.to_string())
        .bind(execution_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(row_to_execution).transpose()
    }

    async fn list_for_range(
        &self,
        client_id: &ClientId,
        configuration_id: &ConfigurationId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Execution>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM executions WHERE client_id = ? AND configuration_id = ? \
             AND started_at >= ? AND started_at <= ? ORDER BY started_at ASC",
        )
        .bind(client_id.as_str())
        .bind(configuration_id.to_string())
        .bind(from.to_rfc3339())
        .bind(to.to_rfc3339())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(row_to_execution).collect()
    }

    async fn list_paginated(
        &self,
        client_id: &ClientId,
        configuration_id: &ConfigurationId,
        page_size: u32,
        continuation_token: Option<String>,
    ) -> Result<ExecutionPage, StoreError> {
        let offset: i64 = continuation_token.as_deref().and_then(|t| t.parse().ok()).unwrap_or(0);

        let rows = sqlx::query(
            "SELECT * FROM executions WHERE client_id = ? AND configuration_id = ? \
             ORDER BY started_at DESC LIMIT ? OFFSET ?",
        )
        .bind(client_id.as_str())
        .bind(configuration_id.to_string())
        .bind(i64::from(page_size) + 1)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let has_more = rows.len() as u32 > page_size;
        let mut items = Vec::with_capacity(page_size as usize);
        for row in rows.iter().take(page_size as usize) {
            items.push(row_to_execution(row)?);
        }

        let continuation_token = has_more.then(|| (offset + i64::from(page_size)).to_string());
        Ok(ExecutionPage { items, continuation_token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DatabasePool;

    async fn store() -> SqliteExecutionStore {
        let pool = DatabasePool::in_memory().await.unwrap();
        SqliteExecutionStore::new(pool.pool().clone())
    }

    fn ids() -> (ClientId, ConfigurationId, ExecutionId) {
        (ClientId::new("acme").unwrap(), ConfigurationId::new(), ExecutionId::new())
    }

    #[tokio::test]
    async fn test_create_then_get_by_id() {
        let store = store().await;
        let (client_id, configuration_id, execution_id) = ids();
        let execution = Execution::start(client_id.clone(), configuration_id, execution_id, Utc::now());
        store.create(execution).await.unwrap();

        let fetched = store.get_by_id(&client_id, &configuration_id, &execution_id).await.unwrap();
        assert!(fetched.is_some());
        assert_eq!(fetched.unwrap().status, ExecutionStatus::Running);
    }

    #[tokio::test]
    async fn test_update_completes_and_rotates_etag() {
        let store = store().await;
        let (client_id, configuration_id, execution_id) = ids();
        let mut execution = Execution::start(client_id.clone(), configuration_id, execution_id, Utc::now());
        let original_etag = execution.etag.clone();
        store.create(execution.clone()).await.unwrap();

        execution.complete(3, 2, Utc::now());
        let updated = store.update(execution).await.unwrap();
        assert_eq!(updated.status, ExecutionStatus::Completed);
        assert_ne!(updated.etag, original_etag);
    }

    #[tokio::test]
    async fn test_update_stale_etag_fails() {
        let store = store().await;
        let (client_id, configuration_id, execution_id) = ids();
        let mut execution = Execution::start(client_id, configuration_id, execution_id, Utc::now());
        store.create(execution.clone()).await.unwrap();

        execution.complete(1, 1, Utc::now());
        store.update(execution.clone()).await.unwrap();

        let result = store.update(execution).await;
        assert!(matches!(result, Err(StoreError::PreconditionFailed)));
    }
}
