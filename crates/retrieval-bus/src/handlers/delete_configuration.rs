//! DeleteConfigurationHandler: idempotent soft-delete + `ConfigurationDeleted`

use std::sync::Arc;

use anyhow::Context;
use retrieval_core::domain::{ConfigurationDeletedEvent, ConfigurationId, DeleteConfigurationCommand, DomainEvent, ETag, MessageEnvelope};
use retrieval_core::ports::{Clock, ConfigurationStore, Publisher};
use tracing::info;

pub struct DeleteConfigurationHandler {
    config_store: Arc<dyn ConfigurationStore>,
    publisher: Arc<dyn Publisher>,
    clock: Arc<dyn Clock>,
}

impl DeleteConfigurationHandler {
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

    pub async fn handle(&self, envelope: MessageEnvelope<DeleteConfigurationCommand>) -> anyhow::Result<()> {
        let MessageEnvelope {
            correlation_id,
            client_id,
            payload: command,
            ..
        } = envelope;
        let configuration_id = ConfigurationId::from_uuid(command.configuration_id);

        let existing = self.config_store.get_by_id(&client_id, &configuration_id).await?;
        let Some(config) = existing else {
            info!(%configuration_id, "configuration already gone, treating DeleteConfiguration as a no-op");
            return Ok(());
        };
        if !config.is_active {
            info!(%configuration_id, "configuration already deleted, treating as a no-op");
            return Ok(());
        }

        self.config_store
            .soft_delete(&client_id, &configuration_id, &ETag::from(command.etag))
            .await?;

        let event = MessageEnvelope::new(
            correlation_id,
            format!("{client_id}:{configuration_id}:deleted"),
            client_id,
            self.clock.now(),
            DomainEvent::ConfigurationDeleted(ConfigurationDeletedEvent {
                configuration_id: *configuration_id.as_uuid(),
            }),
        );
        self.publisher.publish(event).await.context("failed to publish ConfigurationDeleted")?;

        Ok(())
    }
}
