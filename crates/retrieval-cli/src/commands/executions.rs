//! `retrieval-cli executions list` — recent executions for a configuration

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::Args;
use retrieval_core::domain::{ClientId, ConfigurationId};
use retrieval_core::ports::ExecutionStore;
use retrieval_store::{DatabasePool, SqliteExecutionStore};
use uuid::Uuid;

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct ExecutionsCommand {
    pub client_id: String,
    pub configuration_id: Uuid,

    /// How many hours back to look
    #[arg(long, default_value_t = 24)]
    pub lookback_hours: i64,
}

impl ExecutionsCommand {
    pub async fn execute(&self, db_path: &std::path::Path, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        let pool = DatabasePool::new(db_path).await.context("failed to open database")?;
        let store = SqliteExecutionStore::new(pool.pool().clone());

        let client_id = ClientId::new(&self.client_id).context("invalid client id")?;
        let configuration_id = ConfigurationId::from_uuid(self.configuration_id);
        let to = Utc::now();
        let from = to - Duration::hours(self.lookback_hours);

        let executions = store
            .list_for_range(&client_id, &configuration_id, from, to)
            .await
            .context("failed to list executions")?;

        if matches!(format, OutputFormat::Json) {
            let rows: Vec<_> = executions
                .iter()
                .map(|e| {
                    serde_json::json!({
                        "executionId": e.execution_id.to_string(),
                        "status": format!("{:?}", e.status),
                        "startedAt": e.started_at,
                        "filesFound": e.files_found,
                        "filesProcessed": e.files_processed,
                        "errorMessage": e.error_message,
                    })
                })
                .collect();
            formatter.print_json(&serde_json::json!({ "executions": rows }));
        } else {
            for e in &executions {
                formatter.info(&format!(
                    "{}  {:?}  found={} processed={}",
                    e.execution_id, e.status, e.files_found, e.files_processed
                ));
            }
            formatter.success(&format!("{} execution(s)", executions.len()));
        }

        Ok(())
    }
}
