//! UpdateConfigurationHandler: ETag-checked update + `ConfigurationUpdated`
//!
//! Changes take effect on the next scheduled evaluation; there is no
//! mid-execution re-read of the configuration.

use std::sync::Arc;

use anyhow::Context;
use retrieval_core::domain::{
    ConfigurationId, ConfigurationUpdatedEvent, DomainEvent, MessageEnvelope, PatternString, ProtocolSettings,
    Schedule, UpdateConfigurationCommand,
};
use retrieval_core::ports::{Clock, ConfigurationStore, Publisher};

pub struct UpdateConfigurationHandler {
    config_store: Arc<dyn ConfigurationStore>,
    publisher: Arc<dyn Publisher>,
    clock: Arc<dyn Clock>,
}

impl UpdateConfigurationHandler {
    #[must_use]
    pub fn new(
        config_store: Arc<dyn ConfigurationStore>,
        publisher: Arc<dyn Publisher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config_store,
            publisher,
            clock,
        }
    }

    pub async fn handle(&self, envelope: MessageEnvelope<UpdateConfigurationCommand>) -> anyhow::Result<()> {
        let MessageEnvelope {
            correlation_id,
            client_id,
            payload: command,
            ..
        } = envelope;
        let configuration_id = ConfigurationId::from_uuid(command.configuration_id);

        let mut config = self
            .config_store
            .get_by_id(&client_id, &configuration_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("configuration {configuration_id} not found"))?;

        if config.etag.as_str() != command.etag {
            anyhow::bail!("etag mismatch updating configuration {configuration_id}: precondition failed");
        }

        let protocol_settings: ProtocolSettings =
            serde_json::from_value(command.protocol_settings).context("invalid protocolSettings payload")?;
        if !retrieval_protocols::schedule::is_valid_cron(&command.cron_expression) {
            anyhow::bail!("invalid cron expression: {}", command.cron_expression);
        }
        if !retrieval_protocols::schedule::is_valid_timezone(&command.timezone) {
            anyhow::bail!("invalid timezone: {}", command.timezone);
        }

        config.name = command.name;
        config.description = command.description;
        config.protocol_settings = protocol_settings;
        config.file_path_pattern = PatternString::new(command.file_path_pattern)?;
        config.filename_pattern = PatternString::new(command.filename_pattern)?;
        config.file_extension = command.file_extension;
        config.schedule = Schedule::new(command.cron_expression, command.timezone, command.schedule_description)?;
        config.last_modified_at = self.clock.now();

        self.config_store.update(config).await?;

        let event = MessageEnvelope::new(
            correlation_id,
            format!("{client_id}:{configuration_id}:updated"),
            client_id,
            self.clock.now(),
            DomainEvent::ConfigurationUpdated(ConfigurationUpdatedEvent {
                configuration_id: *configuration_id.as_uuid(),
            }),
        );
        self.publisher.publish(event).await.context("failed to publish ConfigurationUpdated")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use retrieval_core::domain::{
        ClientId, DomainEvent as Event, ETag, FtpSettings, ProtocolSettings as Settings, RetrievalConfiguration,
    };
    use retrieval_core::ports::clock::test_support::FixedClock;
    use retrieval_core::ports::{ConfigurationFilter, ConfigurationPage, StoreError};
    use std::sync::Mutex;
    use uuid::Uuid;

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
            let mut rows = self.rows.lock().unwrap();
            let existing = rows
                .iter_mut()
                .find(|c| c.client_id == config.client_id && c.configuration_id == config.configuration_id)
                .ok_or(StoreError::PreconditionFailed)?;
            if existing.etag != config.etag {
                return Err(StoreError::PreconditionFailed);
            }
            let mut updated = config;
            updated.etag = ETag::generate();
            *existing = updated.clone();
            Ok(updated)
        }
        async fn soft_delete(
            &self,
            _client_id: &ClientId,
            _configuration_id: &ConfigurationId,
            _etag: &ETag,
        ) -> Result<(), StoreError> {
            Ok(())
        }
    }

    struct RecordingPublisher {
        events: Mutex<Vec<Event>>,
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        async fn publish(&self, event: MessageEnvelope<Event>) -> anyhow::Result<()> {
            self.events.lock().unwrap().push(event.payload);
            Ok(())
        }
        async fn send(
            &self,
            _endpoint: &str,
            _command: MessageEnvelope<retrieval_core::domain::ProcessDiscoveredFileCommand>,
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
            Settings::Ftp(FtpSettings::new("ftp.test", 21, "user", "secret-1", false, true, 30).unwrap()),
            PatternString::new("/").unwrap(),
            PatternString::new("feed-{yyyymmdd}.txt").unwrap(),
            None,
            Schedule::new("*/5 * * * * *", "UTC", None).unwrap(),
            "tester",
            chrono::Utc::now(),
        )
    }

    fn update_command(config: &RetrievalConfiguration) -> UpdateConfigurationCommand {
        UpdateConfigurationCommand {
            configuration_id: *config.configuration_id.as_uuid(),
            etag: config.etag.as_str().to_string(),
            name: "renamed feed".into(),
            description: Some("updated".into()),
            protocol_settings: serde_json::json!({
                "protocol": "Ftp",
                "server": "ftp.test",
                "port": 21,
                "username": "user2",
                "password_secret_id": "secret-2",
                "use_tls": true,
                "passive_mode": false,
                "connection_timeout_secs": 45,
            }),
            file_path_pattern: "/archive".into(),
            filename_pattern: "feed-{yyyymmdd}.csv".into(),
            file_extension: Some("csv".into()),
            cron_expression: "*/10 * * * * *".into(),
            timezone: "UTC".into(),
            schedule_description: None,
        }
    }

    #[tokio::test]
    async fn test_update_applies_changes_and_emits_event() {
        let config = sample_config();
        let configuration_id = config.configuration_id;
        let store = Arc::new(InMemoryConfigurationStore {
            rows: Mutex::new(vec![config.clone()]),
        });
        let publisher = Arc::new(RecordingPublisher {
            events: Mutex::new(vec![]),
        });
        let handler = UpdateConfigurationHandler::new(
            store.clone(),
            publisher.clone(),
            Arc::new(FixedClock::new(chrono::Utc::now())),
        );

        let envelope = MessageEnvelope::new(
            "corr-1",
            "idem-1",
            ClientId::new("acme").unwrap(),
            chrono::Utc::now(),
            update_command(&config),
        );
        handler.handle(envelope).await.unwrap();

        let rows = store.rows.lock().unwrap();
        let updated = rows.iter().find(|c| c.configuration_id == configuration_id).unwrap();
        assert_eq!(updated.name, "renamed feed");
        assert_ne!(updated.etag, config.etag);
        assert_eq!(publisher.events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_rejects_stale_etag() {
        let config = sample_config();
        let store = Arc::new(InMemoryConfigurationStore {
            rows: Mutex::new(vec![config.clone()]),
        });
        let publisher = Arc::new(RecordingPublisher {
            events: Mutex::new(vec![]),
        });
        let handler = UpdateConfigurationHandler::new(
            store,
            publisher.clone(),
            Arc::new(FixedClock::new(chrono::Utc::now())),
        );

        let mut command = update_command(&config);
        command.etag = Uuid::new_v4().to_string();
        let envelope = MessageEnvelope::new(
            "corr-1",
            "idem-1",
            ClientId::new("acme").unwrap(),
            chrono::Utc::now(),
            command,
        );

        assert!(handler.handle(envelope).await.is_err());
        assert!(publisher.events.lock().unwrap().is_empty());
    }
}
