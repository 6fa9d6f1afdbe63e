//! SQLite implementation of [`DiscoveryStore`]
//!
//! `create`'s duplicate-insert-returns-`None` contract is implemented by
//! catching the unique-index violation on `(client_id, configuration_id,
//! file_url, discovery_date)` rather than pre-checking with a SELECT —
//! avoiding a check-then-insert race between concurrent redeliveries.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use retrieval_core::domain::{ClientId, ConfigurationId, DiscoveredFile, DiscoveredFileId, ExecutionId};
use retrieval_core::ports::{DiscoveryStore, StoreError};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::errors::{is_unique_violation, map_sqlx_error};

pub struct SqliteDiscoveryStore {
    pool: SqlitePool,
}

impl SqliteDiscoveryStore {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Unavailable(anyhow::anyhow!("invalid timestamp '{s}': {e}")))
}

fn row_to_discovered_file(row: &SqliteRow) -> Result<DiscoveredFile, StoreError> {
    let client_id: String = row.get("client_id");
    let configuration_id: String = row.get("configuration_id");
    let discovered_file_id: String = row.get("discovered_file_id");
    let execution_id: String = row.get("execution_id");
    let discovery_date: String = row.get("discovery_date");
    let discovered_at: String = row.get("discovered_at");

    Ok(DiscoveredFile {
        client_id: ClientId::new(client_id).map_err(|e| StoreError::Unavailable(anyhow::anyhow!(e)))?,
        configuration_id: ConfigurationId::from_str(&configuration_id)
            .map_err(|e| StoreError::Unavailable(anyhow::anyhow!(e)))?,
        discovered_file_id: DiscoveredFileId::from_str(&discovered_file_id)
            .map_err(|e| StoreError::Unavailable(anyhow::anyhow!(e)))?,
        execution_id: ExecutionId::from_str(&execution_id)
            .map_err(|e| StoreError::Unavailable(anyhow::anyhow!(e)))?,
        file_url: row.get("file_url"),
        filename: row.get("filename"),
        size_bytes: row.get::<i64, _>("size_bytes") as u64,
        discovery_date: NaiveDate::parse_from_str(&discovery_date, "%Y-%m-%d")
            .map_err(|e| StoreError::Unavailable(anyhow::anyhow!("invalid discovery_date: {e}")))?,
        discovered_at: parse_datetime(&discovered_at)?,
    })
}

#[async_trait::async_trait]
impl DiscoveryStore for SqliteDiscoveryStore {
    async fn create(&self, file: DiscoveredFile) -> Result<Option<DiscoveredFile>, StoreError> {
        let result = sqlx::query(
            "INSERT INTO discovered_files \
             (client_id, configuration_id, discovered_file_id, execution_id, file_url, \
              filename, size_bytes, discovery_date, discovered_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(file.client_id.as_str())
        .bind(file.configuration_id.to_string())
        .bind(file.discovered_file_id.to_string())
        .bind(file.execution_id.to_string())
        .bind(&file.file_url)
        .bind(&file.filename)
        .bind(file.size_bytes as i64)
        .bind(file.discovery_date.format("%Y-%m-%d").to_string())
        .bind(file.discovered_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(Some(file)),
            Err(e) if is_unique_violation(&e) => {
                tracing::debug!(file_url = %file.file_url, "discovered file already recorded, skipping");
                Ok(None)
            }
            Err(e) => Err(map_sqlx_error(e)),
        }
    }

    async fn exists(
        &self,
        client_id: &ClientId,
        configuration_id: &ConfigurationId,
        file_url: &str,
        discovery_date: NaiveDate,
    ) -> Result<bool, StoreError> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM discovered_files WHERE client_id = ? AND configuration_id = ? \
             AND file_url = ? AND discovery_date = ?",
        )
        .bind(client_id.as_str())
        .bind(configuration_id.to_string())
        .bind(file_url)
        .bind(discovery_date.format("%Y-%m-%d").to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.is_some())
    }

    async fn list_by_execution(
        &self,
        client_id: &ClientId,
        execution_id: &ExecutionId,
    ) -> Result<Vec<DiscoveredFile>, StoreError> {
        let rows = sqlx::query("SELECT * FROM discovered_files WHERE client_id = ? AND execution_id = ?")
            .bind(client_id.as_str())
            .bind(execution_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.iter().map(row_to_discovered_file).collect()
    }

    async fn list_by_configuration(
        &self,
        client_id: &ClientId,
        configuration_id: &ConfigurationId,
        limit: u32,
    ) -> Result<Vec<DiscoveredFile>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM discovered_files WHERE client_id = ? AND configuration_id = ? \
             ORDER BY discovered_at DESC LIMIT ?",
        )
        .bind(client_id.as_str())
        .bind(configuration_id.to_string())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(row_to_discovered_file).collect()
    }
}
