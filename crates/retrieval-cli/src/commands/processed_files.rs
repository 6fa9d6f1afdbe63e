//! `retrieval-cli processed-files list` — downloaded-and-checksummed files

use anyhow::{Context, Result};
use clap::Args;
use retrieval_core::domain::ClientId;
use retrieval_core::domain::ConfigurationId;
use retrieval_core::ports::ProcessedFileStore;
use retrieval_store::{DatabasePool, SqliteProcessedFileStore};
use uuid::Uuid;

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct ProcessedFilesCommand {
    pub client_id: String,
    pub configuration_id: Uuid,

    #[arg(long, default_value_t = 50)]
    pub limit: u32,

    /// Only show files whose filename contains this substring
    #[arg(long)]
    pub filename_contains: Option<String>,
}

impl ProcessedFilesCommand {
    pub async fn execute(&self, db_path: &std::path::Path, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        let pool = DatabasePool::new(db_path).await.context("failed to open database")?;
        let store = SqliteProcessedFileStore::new(pool.pool().clone());

        let client_id = ClientId::new(&self.client_id).context("invalid client id")?;
        let configuration_id = ConfigurationId::from_uuid(self.configuration_id);

        let records = store
            .list_by_configuration(
                &client_id,
                &configuration_id,
                self.limit,
                self.filename_contains.as_deref(),
                None,
            )
            .await
            .context("failed to list processed files")?;

        if matches!(format, OutputFormat::Json) {
            let rows: Vec<_> = records
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "discoveredFileId": r.discovered_file_id.to_string(),
                        "downloadedSizeBytes": r.downloaded_size_bytes,
                        "checksumAlgorithm": r.checksum_algorithm,
                        "checksumHex": r.checksum_hex,
                        "processedAt": r.processed_at,
                    })
                })
                .collect();
            formatter.print_json(&serde_json::json!({ "processedFiles": rows }));
        } else {
            for r in &records {
                formatter.info(&format!(
                    "{}  {}B  {}:{}",
                    r.discovered_file_id, r.downloaded_size_bytes, r.checksum_algorithm, r.checksum_hex
                ));
            }
            formatter.success(&format!("{} processed file(s)", records.len()));
        }

        Ok(())
    }
}
