//! `retrieval-cli discovered-files list` — files recorded by past executions

use anyhow::{Context, Result};
use clap::Args;
use retrieval_core::domain::ClientId;
use retrieval_core::domain::ConfigurationId;
use retrieval_core::ports::DiscoveryStore;
use retrieval_store::{DatabasePool, SqliteDiscoveryStore};
use uuid::Uuid;

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct DiscoveredFilesCommand {
    pub client_id: String,
    pub configuration_id: Uuid,

    #[arg(long, default_value_t = 50)]
    pub limit: u32,
}

impl DiscoveredFilesCommand {
    pub async fn execute(&self, db_path: &std::path::Path, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        let pool = DatabasePool::new(db_path).await.context("failed to open database")?;
        let store = SqliteDiscoveryStore::new(pool.pool().clone());

        let client_id = ClientId::new(&self.client_id).context("invalid client id")?;
        let configuration_id = ConfigurationId::from_uuid(self.configuration_id);

        let files = store
            .list_by_configuration(&client_id, &configuration_id, self.limit)
            .await
            .context("failed to list discovered files")?;

        if matches!(format, OutputFormat::Json) {
            let rows: Vec<_> = files
                .iter()
                .map(|f| {
                    serde_json::json!({
                        "discoveredFileId": f.discovered_file_id.to_string(),
                        "fileUrl": f.file_url,
                        "filename": f.filename,
                        "sizeBytes": f.size_bytes,
                        "discoveryDate": f.discovery_date,
                        "discoveredAt": f.discovered_at,
                    })
                })
                .collect();
            formatter.print_json(&serde_json::json!({ "discoveredFiles": rows }));
        } else {
            for f in &files {
                formatter.info(&format!(
                    "{}  {}  {}B  {}",
                    f.discovered_file_id, f.filename, f.size_bytes, f.discovery_date
                ));
            }
            formatter.success(&format!("{} discovered file(s)", files.len()));
        }

        Ok(())
    }
}
