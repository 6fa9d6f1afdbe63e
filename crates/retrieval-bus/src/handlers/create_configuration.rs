//! CreateConfigurationHandler: idempotent create + `ConfigurationCreated`

use std::sync::Arc;

use anyhow::Context;
use retrieval_core::domain::{
    ClientId, ConfigurationCreatedEvent, ConfigurationId, CreateConfigurationCommand, DomainEvent,
    MessageEnvelope, PatternString, ProtocolSettings, RetrievalConfiguration, Schedule,
};
use retrieval_core::ports::{Clock, ConfigurationStore, Publisher, StoreError};
use tracing::info;

pub struct CreateConfigurationHandler {
    config_store: Arc<dyn ConfigurationStore>,
    publisher: Arc<dyn Publisher>,
    clock: Arc<dyn Clock>,
}

impl CreateConfigurationHandler {
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

    pub async fn handle(&self, envelope: MessageEnvelope<CreateConfigurationCommand>) -> anyhow::Result<()> {
        let MessageEnvelope {
            correlation_id,
            client_id,
            payload: command,
            ..
        } = envelope;
        let configuration_id = ConfigurationId::from_uuid(command.configuration_id);

        if self
            .config_store
            .get_by_id(&client_id, &configuration_id)
            .await?
            .is_some()
        {
            info!(%configuration_id, "configuration already exists, treating CreateConfiguration as a no-op");
            return Ok(());
        }

        let config = build_configuration(&client_id, configuration_id, command, self.clock.now())?;

        match self.config_store.create(config).await {
            Ok(()) => {}
            Err(StoreError::Conflict) => {
                info!(%configuration_id, "lost the create race, treating as a no-op");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        }

        let event = MessageEnvelope::new(
            correlation_id,
            format!("{client_id}:{configuration_id}:created"),
            client_id,
            self.clock.now(),
            DomainEvent::ConfigurationCreated(ConfigurationCreatedEvent {
                configuration_id: *configuration_id.as_uuid(),
            }),
        );
        self.publisher.publish(event).await.context("failed to publish ConfigurationCreated")?;

        Ok(())
    }
}

fn build_configuration(
    client_id: &ClientId,
    configuration_id: ConfigurationId,
    command: CreateConfigurationCommand,
    now: chrono::DateTime<chrono::Utc>,
) -> anyhow::Result<RetrievalConfiguration> {
    let protocol_settings: ProtocolSettings =
        serde_json::from_value(command.protocol_settings).context("invalid protocolSettings payload")?;

    if !retrieval_protocols::schedule::is_valid_cron(&command.cron_expression) {
        anyhow::bail!("invalid cron expression: {}", command.cron_expression);
    }
    if !retrieval_protocols::schedule::is_valid_timezone(&command.timezone) {
        anyhow::bail!("invalid timezone: {}", command.timezone);
    }
    let schedule = Schedule::new(command.cron_expression, command.timezone, command.schedule_description)?;
    let file_path_pattern = PatternString::new(command.file_path_pattern)?;
    let filename_pattern = PatternString::new(command.filename_pattern)?;

    Ok(RetrievalConfiguration::new(
        client_id.clone(),
        configuration_id,
        command.name,
        command.description,
        protocol_settings,
        file_path_pattern,
        filename_pattern,
        command.file_extension,
        schedule,
        command.created_by,
        now,
    ))
}
