//! SQLite implementation of [`ConfigurationStore`]

use std::str::FromStr;

use chrono::{DateTime, Utc};
use retrieval_core::domain::{
    ClientId, ConfigurationId, ETag, PatternString, ProtocolSettings, ProtocolTag,
    RetrievalConfiguration, Schedule,
};
use retrieval_core::ports::{ConfigurationFilter, ConfigurationPage, ConfigurationStore, StoreError};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::errors::{is_unique_violation, map_sqlx_error};

pub struct SqliteConfigurationStore {
    pool: SqlitePool,
}

impl SqliteConfigurationStore {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_configuration(row: &SqliteRow) -> Result<RetrievalConfiguration, StoreError> {
    let client_id: String = row.get("client_id");
    let configuration_id: String = row.get("configuration_id");
    let protocol_settings_json: String = row.get("protocol_settings");
    let file_path_pattern: String = row.get("file_path_pattern");
    let filename_pattern: String = row.get("filename_pattern");
    let cron_expression: String = row.get("cron_expression");
    let timezone: String = row.get("timezone");
    let created_at: String = row.get("created_at");
    let last_modified_at: String = row.get("last_modified_at");
    let last_executed_at: Option<String> = row.get("last_executed_at");
    let next_scheduled_run: Option<String> = row.get("next_scheduled_run");
    let etag: String = row.get("etag");

    let protocol_settings: ProtocolSettings = serde_json::from_str(&protocol_settings_json)
        .map_err(|e| StoreError::Unavailable(anyhow::anyhow!("corrupt protocol_settings json: {e}")))?;

    Ok(RetrievalConfiguration {
        client_id: ClientId::new(client_id)
            .map_err(|e| StoreError::Unavailable(anyhow::anyhow!(e)))?,
        configuration_id: ConfigurationId::from_str(&configuration_id)
            .map_err(|e| StoreError::Unavailable(anyhow::anyhow!(e)))?,
        name: row.get("name"),
        description: row.get("description"),
        protocol_settings,
        file_path_pattern: PatternString::new(file_path_pattern)
            .map_err(|e| StoreError::Unavailable(anyhow::anyhow!(e)))?,
        filename_pattern: PatternString::new(filename_pattern)
            .map_err(|e| StoreError::Unavailable(anyhow::anyhow!(e)))?,
        file_extension: row.get("file_extension"),
        schedule: Schedule::new(cron_expression, timezone, row.get("schedule_description"))
            .map_err(|e| StoreError::Unavailable(anyhow::anyhow!(e)))?,
        is_active: row.get::<i64, _>("is_active") != 0,
        created_at: parse_datetime(&created_at)?,
        created_by: row.get("created_by"),
        last_modified_at: parse_datetime(&last_modified_at)?,
        last_executed_at: last_executed_at.as_deref().map(parse_datetime).transpose()?,
        next_scheduled_run: next_scheduled_run.as_deref().map(parse_datetime).transpose()?,
        etag: ETag::from(etag),
    })
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Unavailable(anyhow::anyhow!("invalid timestamp '{s}': {e}")))
}

fn protocol_tag_name(tag: ProtocolTag) -> &'static str {
    match tag {
        ProtocolTag::Ftp => "Ftp",
        ProtocolTag::Https => "Https",
        ProtocolTag::AzureBlob => "AzureBlob",
    }
}

#[async_trait::async_trait]
impl ConfigurationStore for SqliteConfigurationStore {
    async fn create(&self, config: RetrievalConfiguration) -> Result<(), StoreError> {
        let protocol_settings_json = serde_json::to_string(&config.protocol_settings)
            .map_err(|e| StoreError::Unavailable(anyhow::anyhow!(e)))?;

        let result = sqlx::query(
            "INSERT INTO configurations \
             (client_id, configuration_id, name, description, protocol_settings, \
              file_path_pattern, filename_pattern, file_extension, cron_expression, \
              timezone, schedule_description, is_active, created_at, created_by, \
              last_modified_at, last_executed_at, next_scheduled_run, etag) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(config.client_id.as_str())
        .bind(config.configuration_id.to_string())
        .bind(&config.name)
        .bind(&config.description)
        .bind(&protocol_settings_json)
        .bind(config.file_path_pattern.as_str())
        .bind(config.filename_pattern.as_str())
        .bind(&config.file_extension)
        .bind(&config.schedule.cron_expression)
        .bind(&config.schedule.timezone)
        .bind(&config.schedule.description)
        .bind(config.is_active as i64)
        .bind(config.created_at.to_rfc3339())
        .bind(&config.created_by)
        .bind(config.last_modified_at.to_rfc3339())
        .bind(config.last_executed_at.map(|dt| dt.to_rfc3339()))
        .bind(config.next_scheduled_run.map(|dt| dt.to_rfc3339()))
        .bind(config.etag.as_str())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                tracing::debug!(
                    client_id = %config.client_id,
                    configuration_id = %config.configuration_id,
                    "configuration created"
                );
                Ok(())
            }
            Err(e) if is_unique_violation(&e) => Err(StoreError::Conflict),
            Err(e) => Err(map_sqlx_error(e)),
        }
    }

    async fn get_by_id(
        &self,
        client_id: &ClientId,
        configuration_id: &ConfigurationId,
    ) -> Result<Option<RetrievalConfiguration>, StoreError> {
        let row = sqlx::query("SELECT * FROM configurations WHERE client_id = ? AND configuration_id = ?")
            .bind(client_id.as_str())
            .bind(configuration_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(row_to_configuration).transpose()
    }

    async fn get_by_client_paginated(
        &self,
        client_id: &ClientId,
        page_size: u32,
        continuation_token: Option<String>,
        filter: ConfigurationFilter,
    ) -> Result<ConfigurationPage, StoreError> {
        let offset: i64 = continuation_token
            .as_deref()
            .and_then(|t| t.parse().ok())
            .unwrap_or(0);

        let mut sql = String::from("SELECT * FROM configurations WHERE client_id = ?");
        if filter.protocol.is_some() {
            sql.push_str(" AND protocol_settings LIKE ?");
        }
        if let Some(is_active) = filter.is_active {
            sql.push_str(if is_active {
                " AND is_active = 1"
            } else {
                " AND is_active = 0"
            });
        }
        sql.push_str(" ORDER BY created_at DESC LIMIT ? OFFSET ?");

        let mut query = sqlx::query(&sql).bind(client_id.as_str());
        if let Some(tag) = filter.protocol {
            let pattern = format!("%\"protocol\":\"{}\"%", protocol_tag_name(tag));
            query = query.bind(pattern);
        }
        // fetch one extra row to know whether there's a next page
        query = query.bind(i64::from(page_size) + 1).bind(offset);

        let rows = query.fetch_all(&self.pool).await.map_err(map_sqlx_error)?;

        let has_more = rows.len() as u32 > page_size;
        let mut items = Vec::with_capacity(page_size as usize);
        for row in rows.iter().take(page_size as usize) {
            items.push(row_to_configuration(row)?);
        }

        let continuation_token = has_more.then(|| (offset + i64::from(page_size)).to_string());
        Ok(ConfigurationPage { items, continuation_token })
    }

    async fn get_all_active(&self) -> Result<Vec<RetrievalConfiguration>, StoreError> {
        let rows = sqlx::query("SELECT * FROM configurations WHERE is_active = 1")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.iter().map(row_to_configuration).collect()
    }

    async fn update(&self, config: RetrievalConfiguration) -> Result<RetrievalConfiguration, StoreError> {
        let protocol_settings_json = serde_json::to_string(&config.protocol_settings)
            .map_err(|e| StoreError::Unavailable(anyhow::anyhow!(e)))?;
        let fresh_etag = ETag::generate();

        let result = sqlx::query(
            "UPDATE configurations SET \
             name = ?, description = ?, protocol_settings = ?, file_path_pattern = ?, \
             filename_pattern = ?, file_extension = ?, cron_expression = ?, timezone = ?, \
             schedule_description = ?, is_active = ?, last_modified_at = ?, \
             last_executed_at = ?, next_scheduled_run = ?, etag = ? \
             WHERE client_id = ? AND configuration_id = ? AND etag = ?",
        )
        .bind(&config.name)
        .bind(&config.description)
        .bind(&protocol_settings_json)
        .bind(config.file_path_pattern.as_str())
        .bind(config.filename_pattern.as_str())
        .bind(&config.file_extension)
        .bind(&config.schedule.cron_expression)
        .bind(&config.schedule.timezone)
        .bind(&config.schedule.description)
        .bind(config.is_active as i64)
        .bind(config.last_modified_at.to_rfc3339())
        .bind(config.last_executed_at.map(|dt| dt.to_rfc3339()))
        .bind(config.next_scheduled_run.map(|dt| dt.to_rfc3339()))
        .bind(fresh_etag.as_str())
        .bind(config.client_id.as_str())
        .bind(config.configuration_id.to_string())
        .bind(config.etag.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::PreconditionFailed);
        }

        let mut updated = config;
        updated.etag = fresh_etag;
        Ok(updated)
    }

    async fn soft_delete(
        &self,
        client_id: &ClientId,
        configuration_id: &ConfigurationId,
        etag: &ETag,
    ) -> Result<(), StoreError> {
        let fresh_etag = ETag::generate();
        let result = sqlx::query(
            "UPDATE configurations SET is_active = 0, last_modified_at = ?, etag = ? \
             WHERE client_id = ? AND configuration_id = ? AND etag = ?",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(fresh_etag.as_str())
        .bind(client_id.as_str())
        .bind(configuration_id.to_string())
        .bind(etag.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::PreconditionFailed);
        }
        Ok(())
    }
}
