//! ExecuteFileCheckHandler: resolve, delegate to the scheduler's
//! executor, retry on infrastructure failure
//!
//! A returned `Ok(FileCheckOutcome { success: false, .. })` is already
//! fully handled inside `FileCheckService::run` (an Execution record and
//! `FileCheckFailed` event are persisted/published there) and is not a
//! handler-level error. Only a hard `Err` — the configuration vanishing,
//! no adapter registered for its protocol — is retried.

use std::sync::Arc;

use anyhow::Context;
use retrieval_core::domain::{
    ConfigurationId, DomainEvent, ErrorCategory, ExecuteFileCheckCommand, FileCheckFailedEvent, MessageEnvelope,
};
use retrieval_core::ports::{Clock, ConfigurationStore, Publisher};
use retrieval_scheduler::FileCheckExecutor;
use tokio_util::sync::CancellationToken;

use crate::retry::RetryPolicy;

pub struct ExecuteFileCheckHandler {
    config_store: Arc<dyn ConfigurationStore>,
    executor: Arc<FileCheckExecutor>,
    publisher: Arc<dyn Publisher>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
}

impl ExecuteFileCheckHandler {
    #[must_use]
    pub fn new(
        config_store: Arc<dyn ConfigurationStore>,
        executor: Arc<FileCheckExecutor>,
        publisher: Arc<dyn Publisher>,
        clock: Arc<dyn Clock>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            config_store,
            executor,
            publisher,
            clock,
            retry,
        }
    }

    pub async fn handle(
        &self,
        envelope: MessageEnvelope<ExecuteFileCheckCommand>,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let MessageEnvelope {
            correlation_id,
            client_id,
            payload: command,
            ..
        } = envelope;
        let configuration_id = ConfigurationId::from_uuid(command.configuration_id);

        let config = self.config_store.get_by_id(&client_id, &configuration_id).await?;
        let active = config.map(|c| c.is_active).unwrap_or(false);
        if !active {
            let event = MessageEnvelope::new(
                correlation_id,
                format!("{client_id}:{configuration_id}:execute-failed"),
                client_id,
                self.clock.now(),
                DomainEvent::FileCheckFailed(FileCheckFailedEvent {
                    execution_id: None,
                    error_message: format!("configuration {configuration_id} not found or inactive"),
                    error_category: ErrorCategory::ConfigurationError,
                    duration_ms: 0,
                    retry_count: 0,
                }),
            );
            self.publisher
                .publish(event)
                .await
                .context("failed to publish FileCheckFailed for missing configuration")?;
            return Ok(());
        }

        let triggered_by = if command.is_manual_trigger { "manual-api" } else { "scheduler" };

        self.retry
            .run("execute-file-check", || {
                self.executor.execute(
                    &client_id,
                    configuration_id,
                    command.scheduled_execution_time,
                    &correlation_id,
                    command.is_manual_trigger,
                    triggered_by,
                    cancel,
                )
            })
            .await?;

        Ok(())
    }
}
