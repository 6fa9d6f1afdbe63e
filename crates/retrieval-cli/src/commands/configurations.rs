//! `retrieval-cli configurations list` — read-only inspection

use anyhow::{Context, Result};
use clap::Args;
use retrieval_core::domain::ClientId;
use retrieval_core::ports::{ConfigurationFilter, ConfigurationStore};
use retrieval_store::{DatabasePool, SqliteConfigurationStore};

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct ConfigurationsCommand {
    /// Client whose configurations to list
    pub client_id: String,

    /// Only show active (or, with --inactive, inactive) configurations
    #[arg(long)]
    pub inactive: bool,
}

impl ConfigurationsCommand {
    pub async fn execute(&self, db_path: &std::path::Path, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        let pool = DatabasePool::new(db_path).await.context("failed to open database")?;
        let store = SqliteConfigurationStore::new(pool.pool().clone());

        let client_id = ClientId::new(&self.client_id).context("invalid client id")?;
        let filter = ConfigurationFilter {
            protocol: None,
            is_active: Some(!self.inactive),
        };
        let page = store
            .get_by_client_paginated(&client_id, 100, None, filter)
            .await
            .context("failed to list configurations")?;

        if matches!(format, OutputFormat::Json) {
            let rows: Vec<_> = page
                .items
                .iter()
                .map(|c| {
                    serde_json::json!({
                        "configurationId": c.configuration_id.to_string(),
                        "name": c.name,
                        "protocol": format!("{:?}", c.protocol_settings.tag()),
                        "isActive": c.is_active,
                        "nextScheduledRun": c.next_scheduled_run,
                    })
                })
                .collect();
            formatter.print_json(&serde_json::json!({ "configurations": rows }));
        } else {
            for c in &page.items {
                formatter.info(&format!(
                    "{}  {}  {:?}  next={}",
                    c.configuration_id,
                    c.name,
                    c.protocol_settings.tag(),
                    c.next_scheduled_run.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".into())
                ));
            }
            formatter.success(&format!("{} configuration(s)", page.items.len()));
        }

        Ok(())
    }
}
