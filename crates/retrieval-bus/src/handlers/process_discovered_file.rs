//! ProcessDiscoveredFileHandler: download, checksum, idempotent
//! persist, `DiscoveredFileProcessed`

use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use retrieval_core::domain::{
    ConfigurationId, DiscoveredFileId, DiscoveredFileProcessedEvent, DomainEvent, MessageEnvelope,
    ProcessDiscoveredFileCommand, ProcessedFileRecord, ProtocolTag,
};
use retrieval_core::ports::{Clock, ConfigurationStore, ProcessedFileStore, Publisher};
use retrieval_scheduler::AdapterRegistry;
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;

pub struct ProcessDiscoveredFileHandler {
    config_store: Arc<dyn ConfigurationStore>,
    registry: AdapterRegistry,
    processed_store: Arc<dyn ProcessedFileStore>,
    publisher: Arc<dyn Publisher>,
    clock: Arc<dyn Clock>,
}

impl ProcessDiscoveredFileHandler {
    #[must_use]
    pub fn new(
        config_store: Arc<dyn ConfigurationStore>,
        registry: AdapterRegistry,
        processed_store: Arc<dyn ProcessedFileStore>,
        publisher: Arc<dyn Publisher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config_store,
            registry,
            processed_store,
            publisher,
            clock,
        }
    }

    pub async fn handle(
        &self,
        envelope: MessageEnvelope<ProcessDiscoveredFileCommand>,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let MessageEnvelope {
            correlation_id,
            client_id,
            payload: command,
            ..
        } = envelope;
        let configuration_id = ConfigurationId::from_uuid(command.configuration_id);
        let discovered_file_id = DiscoveredFileId::from_uuid(command.discovered_file_id);

        let config = self
            .config_store
            .get_by_id(&client_id, &configuration_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("configuration {configuration_id} not found"))?;

        let protocol = ProtocolTag::from_str(&command.protocol)?;
        let adapter = self.registry.resolve(protocol)?;

        let bytes = adapter
            .download(&config.protocol_settings, &command.file_url, cancel)
            .await?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let checksum_hex = format!("{:x}", hasher.finalize());

        let record = ProcessedFileRecord::new(
            client_id.clone(),
            configuration_id,
            discovered_file_id,
            bytes.len() as u64,
            checksum_hex,
            self.clock.now(),
            correlation_id.clone(),
            format!("{client_id}:{discovered_file_id}:processed"),
        );

        let Some(inserted) = self.processed_store.create(record).await? else {
            return Ok(());
        };

        let event = MessageEnvelope::new(
            correlation_id,
            format!("{client_id}:{discovered_file_id}:processed-event"),
            client_id,
            self.clock.now(),
            DomainEvent::DiscoveredFileProcessed(DiscoveredFileProcessedEvent {
                discovered_file_id: *discovered_file_id.as_uuid(),
                downloaded_size_bytes: inserted.downloaded_size_bytes,
                checksum_algorithm: inserted.checksum_algorithm,
                checksum_hex: inserted.checksum_hex,
            }),
        );
        self.publisher
            .publish(event)
            .await
            .context("failed to publish DiscoveredFileProcessed")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use retrieval_core::domain::{
        ClientId, FtpSettings, ListedFile, PatternString, ProtocolSettings, RetrievalConfiguration, Schedule,
    };
    use retrieval_core::ports::clock::test_support::FixedClock;
    use retrieval_core::ports::{ConfigurationFilter, ConfigurationPage, ProtocolAdapter, StoreError};
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
            client_id: &ClientId,
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
            _client_id: &ClientId,
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
            Ok(config)
        }
        async fn soft_delete(
            &self,
            _client_id: &ClientId,
            _configuration_id: &ConfigurationId,
            _etag: &retrieval_core::domain::ETag,
        ) -> Result<(), StoreError> {
            Ok(())
        }
    }

    struct StubAdapter;
    #[async_trait]
    impl ProtocolAdapter for StubAdapter {
        async fn list(
            &self,
            _settings: &ProtocolSettings,
            _expanded_path: &str,
            _expanded_filename: &str,
            _extension: Option<&str>,
            _cancel: &CancellationToken,
        ) -> Result<Vec<ListedFile>, retrieval_core::ports::AdapterError> {
            Ok(vec![])
        }
        async fn download(
            &self,
            _settings: &ProtocolSettings,
            _file_url: &str,
            _cancel: &CancellationToken,
        ) -> Result<Vec<u8>, retrieval_core::ports::AdapterError> {
            Ok(b"hello world".to_vec())
        }
    }

    struct InMemoryProcessedFileStore {
        rows: Mutex<Vec<ProcessedFileRecord>>,
    }

    #[async_trait]
    impl ProcessedFileStore for InMemoryProcessedFileStore {
        async fn create(
            &self,
            record: ProcessedFileRecord,
        ) -> Result<Option<ProcessedFileRecord>, StoreError> {
            let mut rows = self.rows.lock().unwrap();
            if rows.iter().any(|r| r.discovered_file_id == record.discovered_file_id) {
                return Ok(None);
            }
            rows.push(record.clone());
            Ok(Some(record))
        }
        async fn list_by_configuration(
            &self,
            _client_id: &ClientId,
            _configuration_id: &ConfigurationId,
            _limit: u32,
            _filename_filter: Option<&str>,
            _execution_id: Option<&retrieval_core::domain::ExecutionId>,
        ) -> Result<Vec<ProcessedFileRecord>, StoreError> {
            Ok(self.rows.lock().unwrap().clone())
        }
        async fn get_by_discovered_file_id(
            &self,
            _client_id: &ClientId,
            discovered_file_id: &DiscoveredFileId,
        ) -> Result<Option<ProcessedFileRecord>, StoreError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|r| &r.discovered_file_id == discovered_file_id)
                .cloned())
        }
    }

    struct RecordingPublisher {
        events: Mutex<Vec<DomainEvent>>,
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        async fn publish(&self, event: MessageEnvelope<DomainEvent>) -> anyhow::Result<()> {
            self.events.lock().unwrap().push(event.payload);
            Ok(())
        }
        async fn send(
            &self,
            _endpoint: &str,
            _command: MessageEnvelope<ProcessDiscoveredFileCommand>,
        ) -> anyhow::Result<()> {
            Ok(())
        }
        async fn dispatch_file_check(
            &self,
            _endpoint: &str,
            _command: MessageEnvelope<retrieval_core::domain::ExecuteFileCheckCommand>,
        ) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn sample_config() -> RetrievalConfiguration {
        RetrievalConfiguration::new(
            ClientId::new("acme").unwrap(),
            ConfigurationId::new(),
            "nightly feed",
            None,
            ProtocolSettings::Ftp(FtpSettings::new("ftp.test", 21, "user", "secret-1", false, true, 30).unwrap()),
            PatternString::new("/").unwrap(),
            PatternString::new("feed-{yyyymmdd}.txt").unwrap(),
            None,
            Schedule::new("*/5 * * * * *", "UTC", None).unwrap(),
            "tester",
            chrono::Utc::now(),
        )
    }

    fn command(config: &RetrievalConfiguration, discovered_file_id: uuid::Uuid) -> ProcessDiscoveredFileCommand {
        ProcessDiscoveredFileCommand {
            configuration_id: *config.configuration_id.as_uuid(),
            execution_id: uuid::Uuid::new_v4(),
            discovered_file_id,
            file_url: "/inbound/feed-20260727.txt".into(),
            filename: "feed-20260727.txt".into(),
            protocol: "Ftp".into(),
        }
    }

    #[tokio::test]
    async fn test_handle_downloads_checksums_and_emits_event() {
        let config = sample_config();
        let store = Arc::new(InMemoryConfigurationStore {
            rows: Mutex::new(vec![config.clone()]),
        });
        let registry = AdapterRegistry::new().with_adapter(ProtocolTag::Ftp, Arc::new(StubAdapter));
        let processed_store = Arc::new(InMemoryProcessedFileStore {
            rows: Mutex::new(vec![]),
        });
        let publisher = Arc::new(RecordingPublisher {
            events: Mutex::new(vec![]),
        });
        let handler = ProcessDiscoveredFileHandler::new(
            store,
            registry,
            processed_store.clone(),
            publisher.clone(),
            Arc::new(FixedClock::new(chrono::Utc::now())),
        );

        let discovered_file_id = uuid::Uuid::new_v4();
        let envelope = MessageEnvelope::new(
            "corr-1",
            "idem-1",
            ClientId::new("acme").unwrap(),
            chrono::Utc::now(),
            command(&config, discovered_file_id),
        );

        handler.handle(envelope, &CancellationToken::new()).await.unwrap();

        assert_eq!(processed_store.rows.lock().unwrap().len(), 1);
        let events = publisher.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            DomainEvent::DiscoveredFileProcessed(e) => {
                assert_eq!(e.downloaded_size_bytes, 11);
                assert_eq!(e.checksum_algorithm, "SHA-256");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_handle_is_idempotent_on_duplicate_discovered_file() {
        let config = sample_config();
        let store = Arc::new(InMemoryConfigurationStore {
            rows: Mutex::new(vec![config.clone()]),
        });
        let registry = AdapterRegistry::new().with_adapter(ProtocolTag::Ftp, Arc::new(StubAdapter));
        let processed_store = Arc::new(InMemoryProcessedFileStore {
            rows: Mutex::new(vec![]),
        });
        let publisher = Arc::new(RecordingPublisher {
            events: Mutex::new(vec![]),
        });
        let handler = ProcessDiscoveredFileHandler::new(
            store,
            registry,
            processed_store.clone(),
            publisher.clone(),
            Arc::new(FixedClock::new(chrono::Utc::now())),
        );

        let discovered_file_id = uuid::Uuid::new_v4();
        for _ in 0..2 {
            let envelope = MessageEnvelope::new(
                "corr-1",
                "idem-1",
                ClientId::new("acme").unwrap(),
                chrono::Utc::now(),
                command(&config, discovered_file_id),
            );
            handler.handle(envelope, &CancellationToken::new()).await.unwrap();
        }

        assert_eq!(processed_store.rows.lock().unwrap().len(), 1);
        assert_eq!(publisher.events.lock().unwrap().len(), 1);
    }
}
