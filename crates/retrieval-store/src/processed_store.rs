//! SQLite implementation of [`ProcessedFileStore`]

use std::str::FromStr;

use chrono::{DateTime, Utc};
use retrieval_core::domain::{ClientId, ConfigurationId, DiscoveredFileId, ExecutionId, ProcessedFileRecord};
use retrieval_core::ports::{ProcessedFileStore, StoreError};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::errors::{is_unique_violation, map_sqlx_error};

pub struct SqliteProcessedFileStore {
    pool: SqlitePool,
}

impl SqliteProcessedFileStore {
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

fn row_to_record(row: &SqliteRow) -> Result<ProcessedFileRecord, StoreError> {
    let client_id: String = row.get("client_id");
    let configuration_id: String = row.get("configuration_id");
    let discovered_file_id: String = row.get("discovered_file_id");
    let processed_at: String = row.get("processed_at");

    Ok(ProcessedFileRecord {
        client_id: ClientId::new(client_id).map_err(|e| StoreError::Unavailable(anyhow::anyhow!(e)))?,
        configuration_id: ConfigurationId::from_str(&configuration_id)
            .map_err(|e| StoreError::Unavailable(anyhow::anyhow!(e)))?,
        discovered_file_id: DiscoveredFileId::from_str(&discovered_file_id)
            .map_err(|e| StoreError::Unavailable(anyhow::anyhow!(e)))?,
        downloaded_size_bytes: row.get::<i64, _>("downloaded_size_bytes") as u64,
        checksum_algorithm: row.get("checksum_algorithm"),
        checksum_hex: row.get("checksum_hex"),
        processed_at: parse_datetime(&processed_at)?,
        correlation_id: row.get("correlation_id"),
        idempotency_key: row.get("idempotency_key"),
    })
}

#[async_trait::async_trait]
impl ProcessedFileStore for SqliteProcessedFileStore {
    async fn create(&self, record: ProcessedFileRecord) -> Result<Option<ProcessedFileRecord>, StoreError> {
        let result = sqlx::query(
            "INSERT INTO processed_files \
             (client_id, configuration_id, discovered_file_id, downloaded_size_bytes, \
              checksum_algorithm, checksum_hex, processed_at, correlation_id, idempotency_key) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.client_id.as_str())
        .bind(record.configuration_id.to_string())
        .bind(record.discovered_file_id.to_string())
        .bind(record.downloaded_size_bytes as i64)
        .bind(&record.checksum_algorithm)
        .bind(&record.checksum_hex)
        .bind(record.processed_at.to_rfc3339())
        .bind(&record.correlation_id)
        .bind(&record.idempotency_key)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(Some(record)),
            Err(e) if is_unique_violation(&e) => {
                tracing::debug!(
                    discovered_file_id = %record.discovered_file_id,
                    "processed record already exists, skipping"
                );
                Ok(None)
            }
            Err(e) => Err(map_sqlx_error(e)),
        }
    }

    async fn list_by_configuration(
        &self,
        client_id: &ClientId,
        configuration_id: &ConfigurationId,
        limit: u32,
        filename_filter: Option<&str>,
        execution_id: Option<&ExecutionId>,
    ) -> Result<Vec<ProcessedFileRecord>, StoreError> {
        let mut sql = String::from(
            "SELECT p.* FROM processed_files p \
             JOIN discovered_files d ON d.client_id = p.client_id AND d.discovered_file_id = p.discovered_file_id \
             WHERE p.client_id = ? AND p.configuration_id = ?",
        );
        if filename_filter.is_some() {
            sql.push_str(" AND d.filename LIKE ?");
        }
        if execution_id.is_some() {
            sql.push_str(" AND d.execution_id = ?");
        }
        sql.push_str(" ORDER BY p.processed_at DESC LIMIT ?");

        let mut query = sqlx::query(&sql)
            .bind(client_id.as_str())
            .bind(configuration_id.to_string());
        if let Some(filename) = filename_filter {
            query = query.bind(format!("%{filename}%"));
        }
        if let Some(execution_id) = execution_id {
            query = query.bind(execution_id.to_string());
        }
        query = query.bind(i64::from(limit));

        let rows = query.fetch_all(&self.pool).await.map_err(map_sqlx_error)?;
        rows.iter().map(row_to_record).collect()
    }

    async fn get_by_discovered_file_id(
        &self,
        client_id: &ClientId,
        discovered_file_id: &DiscoveredFileId,
    ) -> Result<Option<ProcessedFileRecord>, StoreError> {
        let row = sqlx::query("SELECT * FROM processed_files WHERE client_id = ? AND discovered_file_id = ?")
            .bind(client_id.as_str())
            .bind(discovered_file_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(row_to_record).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery_store::SqliteDiscoveryStore;
    use crate::pool::DatabasePool;
    use retrieval_core::domain::DiscoveredFile;
    use retrieval_core::ports::DiscoveryStore;

    async fn pool() -> sqlx::SqlitePool {
        DatabasePool::in_memory().await.unwrap().pool().clone()
    }

    #[tokio::test]
    async fn test_create_then_get_by_discovered_file_id() {
        let pool = pool().await;
        let discovery_store = SqliteDiscoveryStore::new(pool.clone());
        let processed_store = SqliteProcessedFileStore::new(pool);

        let client_id = ClientId::new("acme").unwrap();
        let configuration_id = ConfigurationId::new();
        let execution_id = ExecutionId::new();
        let now = Utc::now();
        let file = DiscoveredFile::new(
            client_id.clone(),
            configuration_id,
            execution_id,
            "/inbox/seed.txt",
            "seed.txt",
            10,
            now.date_naive(),
            now,
        );
        let discovered_file_id = file.discovered_file_id;
        discovery_store.create(file).await.unwrap();

        let record = ProcessedFileRecord::new(
            client_id.clone(),
            configuration_id,
            discovered_file_id,
            10,
            "deadbeef",
            now,
            "corr-1",
            "idem-1",
        );
        let inserted = processed_store.create(record).await.unwrap();
        assert!(inserted.is_some());

        let fetched = processed_store
            .get_by_discovered_file_id(&client_id, &discovered_file_id)
            .await
            .unwrap();
        assert!(fetched.is_some());
        assert_eq!(fetched.unwrap().checksum_hex, "deadbeef");
    }

    #[tokio::test]
    async fn test_duplicate_create_returns_none() {
        let pool = pool().await;
        let discovery_store = SqliteDiscoveryStore::new(pool.clone());
        let processed_store = SqliteProcessedFileStore::new(pool);

        let client_id = ClientId::new("acme").unwrap();
        let configuration_id = ConfigurationId::new();
        let execution_id = ExecutionId::new();
        let now = Utc::now();
        let file = DiscoveredFile::new(
            client_id.clone(),
            configuration_id,
            execution_id,
            "/inbox/seed.txt",
            "seed.txt",
            10,
            now.date_naive(),
            now,
        );
        let discovered_file_id = file.discovered_file_id;
        discovery_store.create(file).await.unwrap();

        let record = ProcessedFileRecord::new(
            client_id.clone(), configuration_id, discovered_file_id, 10, "deadbeef", now, "corr-1", "idem-1",
        );
        processed_store.create(record.clone()).await.unwrap();
        assert!(processed_store.create(record).await.unwrap().is_none());
    }
}
