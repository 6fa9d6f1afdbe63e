//! Wires a due configuration to a concrete adapter and the File-Check
//! Service; invoked by whatever receives the `ExecuteFileCheck` command
//! (this worker's own bus handler, per the scheduler's pull model).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use retrieval_core::domain::{ClientId, ConfigurationId, ExecutionId};
use retrieval_core::ports::ConfigurationStore;
use retrieval_core::usecases::{FileCheckOutcome, FileCheckService};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::registry::AdapterRegistry;
use crate::tracker::DispatchTracker;

pub struct FileCheckExecutor {
    config_store: Arc<dyn ConfigurationStore>,
    file_check: Arc<FileCheckService>,
    registry: AdapterRegistry,
    tracker: Arc<DispatchTracker>,
}

impl FileCheckExecutor {
    #[must_use]
    pub fn new(
        config_store: Arc<dyn ConfigurationStore>,
        file_check: Arc<FileCheckService>,
        registry: AdapterRegistry,
        tracker: Arc<DispatchTracker>,
    ) -> Self {
        Self {
            config_store,
            file_check,
            registry,
            tracker,
        }
    }

    /// Runs one execution for `configuration_id` and releases the
    /// dispatch tracker's hold on it regardless of outcome.
    #[allow(clippy::too_many_arguments)]
    pub async fn execute(
        &self,
        client_id: &ClientId,
        configuration_id: ConfigurationId,
        scheduled_instant: DateTime<Utc>,
        correlation_id: &str,
        is_manual_trigger: bool,
        triggered_by: &str,
        cancel: &CancellationToken,
    ) -> anyhow::Result<FileCheckOutcome> {
        let result = self
            .execute_inner(
                client_id,
                configuration_id,
                scheduled_instant,
                correlation_id,
                is_manual_trigger,
                triggered_by,
                cancel,
            )
            .await;
        self.tracker.complete(&configuration_id);
        result
    }

    async fn execute_inner(
        &self,
        client_id: &ClientId,
        configuration_id: ConfigurationId,
        scheduled_instant: DateTime<Utc>,
        correlation_id: &str,
        is_manual_trigger: bool,
        triggered_by: &str,
        cancel: &CancellationToken,
    ) -> anyhow::Result<FileCheckOutcome> {
        let config = self
            .config_store
            .get_by_id(client_id, &configuration_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("configuration {configuration_id} no longer exists"))?;

        let adapter = self.registry.resolve(config.protocol_settings.tag())?;
        let execution_id = ExecutionId::new();

        let outcome = self
            .file_check
            .run(
                &config,
                scheduled_instant,
                execution_id,
                adapter.as_ref(),
                correlation_id,
                is_manual_trigger,
                triggered_by,
                cancel,
            )
            .await;

        self.stamp_next_run(config, scheduled_instant).await;

        Ok(outcome)
    }

    /// Best-effort: advances `lastExecutedAt`/`nextScheduledRun` on the
    /// stored configuration. A lost race against a concurrent update
    /// (ETag mismatch) is not fatal — the next tick recomputes
    /// `nextExecution` from `lastExecutedAt` via the Schedule Evaluator
    /// when `nextScheduledRun` is stale or absent.
    async fn stamp_next_run(
        &self,
        mut config: retrieval_core::domain::RetrievalConfiguration,
        scheduled_instant: DateTime<Utc>,
    ) {
        let next = retrieval_protocols::schedule::next_after(
            &config.schedule.cron_expression,
            &config.schedule.timezone,
            scheduled_instant,
        );
        config.last_executed_at = Some(scheduled_instant);
        config.next_scheduled_run = next;
        let configuration_id = config.configuration_id;

        if let Err(err) = self.config_store.update(config).await {
            warn!(%configuration_id, error = %err, "failed to stamp next scheduled run");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use retrieval_core::domain::{
        ClientId as DomainClientId, DomainEvent, FtpSettings, PatternString, ProcessDiscoveredFileCommand,
        ProtocolSettings, ProtocolTag, RetrievalConfiguration, Schedule,
    };
    use retrieval_core::ports::clock::test_support::FixedClock;
    use retrieval_core::ports::{
        AdapterError, ConfigurationFilter, ConfigurationPage, DiscoveryStore, ExecutionStore, Publisher,
        ProtocolAdapter, StoreError,
    };
    use retrieval_core::domain::{DiscoveredFile, ExecutionId as DomainExecutionId, Execution};
    use std::sync::Mutex;

    struct InMemoryConfigurationStore {
        rows: Mutex<Vec<RetrievalConfiguration>>,
    }

    #[async_trait]
    impl ConfigurationStore for InMemoryConfigurationStore {
        async fn create(&self, config: RetrievalConfiguration) -> Result<(), StoreError> {
            self.rows.lock().unwrap().push(config);
            Ok(())
        }

        async fn get_by_id(
            &self,
            client_id: &DomainClientId,
            configuration_id: &ConfigurationId,
        ) -> Result<Option<RetrievalConfiguration>, StoreError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|c| &c.client_id == client_id && &c.configuration_id == configuration_id)
                .cloned())
        }

        async fn get_by_client_paginated(
            &self,
            _client_id: &DomainClientId,
            _page_size: u32,
            _continuation_token: Option<String>,
            _filter: ConfigurationFilter,
        ) -> Result<ConfigurationPage, StoreError> {
            Ok(ConfigurationPage {
                items: self.rows.lock().unwrap().clone(),
                continuation_token: None,
            })
        }

        async fn get_all_active(&self) -> Result<Vec<RetrievalConfiguration>, StoreError> {
            Ok(self.rows.lock().unwrap().clone())
        }

        async fn update(&self, config: RetrievalConfiguration) -> Result<RetrievalConfiguration, StoreError> {
            let mut rows = self.rows.lock().unwrap();
            if let Some(existing) = rows.iter_mut().find(|c| {
                c.client_id == config.client_id && c.configuration_id == config.configuration_id
            }) {
                *existing = config.clone();
            }
            Ok(config)
        }

        async fn soft_delete(
            &self,
            _client_id: &DomainClientId,
            _configuration_id: &ConfigurationId,
            _etag: &retrieval_core::domain::ETag,
        ) -> Result<(), StoreError> {
            Ok(())
        }
    }

    struct NoopExecutionStore;

    #[async_trait]
    impl ExecutionStore for NoopExecutionStore {
        async fn create(&self, _execution: Execution) -> Result<(), StoreError> {
            Ok(())
        }
        async fn update(&self, execution: Execution) -> Result<Execution, StoreError> {
            Ok(execution)
        }
        async fn get_by_id(
            &self,
            _client_id: &DomainClientId,
            _configuration_id: &ConfigurationId,
            _execution_id: &DomainExecutionId,
        ) -> Result<Option<Execution>, StoreError> {
            Ok(None)
        }
        async fn list_for_range(
            &self,
            _client_id: &DomainClientId,
            _configuration_id: &ConfigurationId,
            _from: DateTime<Utc>,
            _to: DateTime<Utc>,
        ) -> Result<Vec<Execution>, StoreError> {
            Ok(vec![])
        }
        async fn list_paginated(
            &self,
            _client_id: &DomainClientId,
            _configuration_id: &ConfigurationId,
            _page_size: u32,
            _continuation_token: Option<String>,
        ) -> Result<retrieval_core::ports::ExecutionPage, StoreError> {
            Ok(retrieval_core::ports::ExecutionPage {
                items: vec![],
                continuation_token: None,
            })
        }
    }

    struct NoopDiscoveryStore;

    #[async_trait]
    impl DiscoveryStore for NoopDiscoveryStore {
        async fn create(&self, file: DiscoveredFile) -> Result<Option<DiscoveredFile>, StoreError> {
            Ok(Some(file))
        }
        async fn exists(
            &self,
            _client_id: &DomainClientId,
            _configuration_id: &ConfigurationId,
            _file_url: &str,
            _discovery_date: chrono::NaiveDate,
        ) -> Result<bool, StoreError> {
            Ok(false)
        }
        async fn list_by_execution(
            &self,
            _client_id: &DomainClientId,
            _execution_id: &DomainExecutionId,
        ) -> Result<Vec<DiscoveredFile>, StoreError> {
            Ok(vec![])
        }
        async fn list_by_configuration(
            &self,
            _client_id: &DomainClientId,
            _configuration_id: &ConfigurationId,
            _limit: u32,
        ) -> Result<Vec<DiscoveredFile>, StoreError> {
            Ok(vec![])
        }
    }

    struct NoopPublisher;

    #[async_trait]
    impl Publisher for NoopPublisher {
        async fn publish(&self, _event: retrieval_core::domain::MessageEnvelope<DomainEvent>) -> anyhow::Result<()> {
            Ok(())
        }
        async fn send(
            &self,
            _endpoint: &str,
            _command: retrieval_core::domain::MessageEnvelope<ProcessDiscoveredFileCommand>,
        ) -> anyhow::Result<()> {
            Ok(())
        }

        async fn dispatch_file_check(
            &self,
            _endpoint: &str,
            _command: retrieval_core::domain::MessageEnvelope<retrieval_core::domain::ExecuteFileCheckCommand>,
        ) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct FakeFtpAdapter;

    #[async_trait]
    impl ProtocolAdapter for FakeFtpAdapter {
        async fn list(
            &self,
            _settings: &ProtocolSettings,
            _expanded_path: &str,
            _expanded_filename: &str,
            _extension: Option<&str>,
            _cancel: &CancellationToken,
        ) -> Result<Vec<retrieval_core::domain::ListedFile>, AdapterError> {
            Ok(vec![])
        }
        async fn download(
            &self,
            _settings: &ProtocolSettings,
            _file_url: &str,
            _cancel: &CancellationToken,
        ) -> Result<Vec<u8>, AdapterError> {
            Ok(vec![])
        }
    }

    fn sample_config(client_id: ClientId, configuration_id: ConfigurationId) -> RetrievalConfiguration {
        RetrievalConfiguration::new(
            client_id,
            configuration_id,
            "nightly feed",
            None,
            ProtocolSettings::Ftp(
                FtpSettings::new("ftp.test", 21, "user", "secret-1", false, true, 30).unwrap(),
            ),
            PatternString::new("/").unwrap(),
            PatternString::new("feed-{yyyymmdd}.txt").unwrap(),
            None,
            Schedule::new("*/5 * * * * *", "UTC", None).unwrap(),
            "tester",
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_execute_releases_tracker_on_success() {
        let client_id = ClientId::new("acme").unwrap();
        let configuration_id = ConfigurationId::new();
        let config_store = Arc::new(InMemoryConfigurationStore {
            rows: Mutex::new(vec![sample_config(client_id.clone(), configuration_id)]),
        });
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let file_check = Arc::new(FileCheckService::new(
            Arc::new(NoopExecutionStore),
            Arc::new(NoopDiscoveryStore),
            Arc::new(NoopPublisher),
            clock,
        ));
        let registry = AdapterRegistry::new().with_adapter(ProtocolTag::Ftp, Arc::new(FakeFtpAdapter));
        let tracker = Arc::new(DispatchTracker::new(1));
        tracker.try_dispatch(configuration_id);

        let executor = FileCheckExecutor::new(config_store, file_check, registry, tracker.clone());

        let outcome = executor
            .execute(
                &client_id,
                configuration_id,
                Utc::now(),
                "corr-1",
                false,
                "scheduler",
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(outcome.success);
        assert!(!tracker.is_in_flight(&configuration_id));
    }

    #[tokio::test]
    async fn test_execute_releases_tracker_even_on_missing_configuration() {
        let client_id = ClientId::new("acme").unwrap();
        let configuration_id = ConfigurationId::new();
        let config_store = Arc::new(InMemoryConfigurationStore {
            rows: Mutex::new(vec![]),
        });
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let file_check = Arc::new(FileCheckService::new(
            Arc::new(NoopExecutionStore),
            Arc::new(NoopDiscoveryStore),
            Arc::new(NoopPublisher),
            clock,
        ));
        let registry = AdapterRegistry::new();
        let tracker = Arc::new(DispatchTracker::new(1));
        tracker.try_dispatch(configuration_id);

        let executor = FileCheckExecutor::new(config_store, file_check, registry, tracker.clone());

        let result = executor
            .execute(
                &client_id,
                configuration_id,
                Utc::now(),
                "corr-1",
                false,
                "scheduler",
                &CancellationToken::new(),
            )
            .await;

        assert!(result.is_err());
        assert!(!tracker.is_in_flight(&configuration_id));
    }
}
