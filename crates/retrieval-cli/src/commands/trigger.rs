//! `retrieval-cli trigger` — run one configuration's file-check immediately,
//! without a running worker process or the message bus

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use retrieval_core::domain::{ClientId, ConfigurationId, ProtocolTag};
use retrieval_core::ports::SystemClock;
use retrieval_core::usecases::FileCheckService;
use retrieval_protocols::{AzureBlobAdapter, FtpAdapter, HttpsAdapter};
use retrieval_scheduler::{AdapterRegistry, DispatchTracker, FileCheckExecutor};
use retrieval_store::{DatabasePool, SqliteConfigurationStore, SqliteDiscoveryStore, SqliteExecutionStore};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct TriggerCommand {
    pub client_id: String,
    pub configuration_id: Uuid,
}

struct NullPublisher;

#[async_trait::async_trait]
impl retrieval_core::ports::Publisher for NullPublisher {
    async fn publish(&self, _event: retrieval_core::domain::MessageEnvelope<retrieval_core::domain::DomainEvent>) -> Result<()> {
        Ok(())
    }

    async fn send(
        &self,
        _endpoint: &str,
        _command: retrieval_core::domain::MessageEnvelope<retrieval_core::domain::ProcessDiscoveredFileCommand>,
    ) -> Result<()> {
        Ok(())
    }

    async fn dispatch_file_check(
        &self,
        _endpoint: &str,
        _command: retrieval_core::domain::MessageEnvelope<retrieval_core::domain::ExecuteFileCheckCommand>,
    ) -> Result<()> {
        Ok(())
    }
}

impl TriggerCommand {
    pub async fn execute(&self, db_path: &std::path::Path, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        let pool = DatabasePool::new(db_path).await.context("failed to open database")?;

        let config_store: Arc<dyn retrieval_core::ports::ConfigurationStore> =
            Arc::new(SqliteConfigurationStore::new(pool.pool().clone()));
        let discovery_store: Arc<dyn retrieval_core::ports::DiscoveryStore> =
            Arc::new(SqliteDiscoveryStore::new(pool.pool().clone()));
        let execution_store: Arc<dyn retrieval_core::ports::ExecutionStore> =
            Arc::new(SqliteExecutionStore::new(pool.pool().clone()));

        let secret_store: Arc<dyn retrieval_core::ports::SecretStore> =
            Arc::new(crate::secrets::EnvSecretStore::new());
        let registry = AdapterRegistry::new()
            .with_adapter(ProtocolTag::Ftp, Arc::new(FtpAdapter::new(secret_store.clone())))
            .with_adapter(ProtocolTag::Https, Arc::new(HttpsAdapter::new(secret_store.clone())))
            .with_adapter(ProtocolTag::AzureBlob, Arc::new(AzureBlobAdapter::new(secret_store)));

        let clock = Arc::new(SystemClock);
        let publisher: Arc<dyn retrieval_core::ports::Publisher> = Arc::new(NullPublisher);
        let file_check = Arc::new(FileCheckService::new(
            execution_store,
            discovery_store,
            publisher,
            clock,
        ));
        let tracker = Arc::new(DispatchTracker::new(1));
        let executor = FileCheckExecutor::new(config_store, file_check, registry, tracker);

        let client_id = ClientId::new(&self.client_id).context("invalid client id")?;
        let configuration_id = ConfigurationId::from_uuid(self.configuration_id);
        let correlation_id = format!("manual-trigger:{}", Uuid::new_v4());

        let outcome = executor
            .execute(
                &client_id,
                configuration_id,
                Utc::now(),
                &correlation_id,
                true,
                "cli",
                &CancellationToken::new(),
            )
            .await
            .context("manual trigger failed")?;

        if matches!(format, OutputFormat::Json) {
            formatter.print_json(&serde_json::json!({
                "success": outcome.success,
                "filesFound": outcome.files_found,
                "filesProcessed": outcome.files_processed,
                "errorMessage": outcome.error_message,
            }));
        } else if outcome.success {
            formatter.success(&format!(
                "execution completed: found={} processed={}",
                outcome.files_found, outcome.files_processed
            ));
        } else {
            formatter.error(outcome.error_message.as_deref().unwrap_or("execution failed"));
        }

        Ok(())
    }
}
