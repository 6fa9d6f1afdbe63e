//! File-Check Service: the single-execution orchestration pipeline
//!
//! Token expansion → list (with retry) → per-file idempotent insert →
//! event/command emission → execution record update. This is expressed
//! entirely against ports, so it is testable with in-memory fakes and
//! reused unchanged by whichever transport wires a real adapter/store/bus
//! underneath (`retrieval-scheduler`, in this workspace).

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::domain::{
    ClientId, DiscoveredFile, DomainEvent, ErrorCategory, Execution, ExecutionId,
    FileCheckCompletedEvent, FileCheckFailedEvent, FileCheckTriggeredEvent, FileDiscoveredEvent,
    MessageEnvelope, ProcessDiscoveredFileCommand, RetrievalConfiguration,
};
use crate::ports::{AdapterError, Clock, DiscoveryStore, ExecutionStore, ProtocolAdapter, Publisher};

const MAX_LIST_ATTEMPTS: u32 = 3;
const BASE_BACKOFF: Duration = Duration::from_secs(1);

/// Outcome of a single [`FileCheckService::run`] call
#[derive(Debug, Clone)]
pub struct FileCheckOutcome {
    pub execution_id: ExecutionId,
    pub success: bool,
    pub files_found: u32,
    pub files_processed: u32,
    pub error_category: Option<ErrorCategory>,
    pub error_message: Option<String>,
}

pub struct FileCheckService {
    execution_store: Arc<dyn ExecutionStore>,
    discovery_store: Arc<dyn DiscoveryStore>,
    publisher: Arc<dyn Publisher>,
    clock: Arc<dyn Clock>,
}

impl FileCheckService {
    #[must_use]
    pub fn new(
        execution_store: Arc<dyn ExecutionStore>,
        discovery_store: Arc<dyn DiscoveryStore>,
        publisher: Arc<dyn Publisher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            execution_store,
            discovery_store,
            publisher,
            clock,
        }
    }

    /// Runs one execution of `config` against `adapter`.
    ///
    /// `scheduled_instant` is the nominal scheduled-execution time, used
    /// for both token expansion and discovery-date computation — never
    /// the wall-clock instant the listing actually completes at. When
    /// `is_manual_trigger` is set, a `FileCheckTriggered` event is
    /// additionally emitted before listing.
    #[allow(clippy::too_many_arguments)]
    pub async fn run(
        &self,
        config: &RetrievalConfiguration,
        scheduled_instant: DateTime<Utc>,
        execution_id: ExecutionId,
        adapter: &dyn ProtocolAdapter,
        correlation_id: &str,
        is_manual_trigger: bool,
        triggered_by: &str,
        cancel: &CancellationToken,
    ) -> FileCheckOutcome {
        let client_id = config.client_id.clone();
        let start = self.clock.now();

        // Step 1: persist a fresh Running execution.
        let mut execution = Execution::start(
            client_id.clone(),
            config.configuration_id,
            execution_id,
            start,
        );
        if let Err(err) = self.execution_store.create(execution.clone()).await {
            warn!(%execution_id, error = %err, "failed to persist execution start");
            return FileCheckOutcome {
                execution_id,
                success: false,
                files_found: 0,
                files_processed: 0,
                error_category: Some(ErrorCategory::HandlerError),
                error_message: Some(err.to_string()),
            };
        }

        // Step 2: token expansion.
        let resolved_path = config.file_path_pattern.expand(scheduled_instant);
        let resolved_filename = config.filename_pattern.expand(scheduled_instant);
        execution.with_resolved_patterns(resolved_path.clone(), resolved_filename.clone());

        if is_manual_trigger {
            self.emit_triggered(
                &client_id,
                execution_id,
                config,
                scheduled_instant,
                true,
                triggered_by,
                correlation_id,
                start,
            )
            .await;
        }

        // Step 4: list with retry.
        let listed = match self
            .list_with_retry(
                adapter,
                config,
                &resolved_path,
                &resolved_filename,
                cancel,
            )
            .await
        {
            Ok(files) => files,
            Err(err) => {
                let now = self.clock.now();
                execution.fail(err.category, err.message.clone(), now);
                if let Err(store_err) = self.execution_store.update(execution).await {
                    warn!(%execution_id, error = %store_err, "failed to persist failed execution");
                }
                self.emit_failed(
                    &client_id,
                    Some(execution_id),
                    &err.message,
                    err.category,
                    now - start,
                    correlation_id,
                    now,
                )
                .await;
                return FileCheckOutcome {
                    execution_id,
                    success: false,
                    files_found: 0,
                    files_processed: 0,
                    error_category: Some(err.category),
                    error_message: Some(err.message),
                };
            }
        };

        // A cancellation that lands after listing returns but before the
        // discovery rows and completion record are committed must still
        // stop here: no discovery insert, no FileCheckCompleted.
        if cancel.is_cancelled() {
            let now = self.clock.now();
            execution.fail(ErrorCategory::Cancelled, "execution cancelled", now);
            if let Err(store_err) = self.execution_store.update(execution).await {
                warn!(%execution_id, error = %store_err, "failed to persist cancelled execution");
            }
            self.emit_failed(
                &client_id,
                Some(execution_id),
                "execution cancelled",
                ErrorCategory::Cancelled,
                now - start,
                correlation_id,
                now,
            )
            .await;
            return FileCheckOutcome {
                execution_id,
                success: false,
                files_found: 0,
                files_processed: 0,
                error_category: Some(ErrorCategory::Cancelled),
                error_message: Some("execution cancelled".to_string()),
            };
        }

        // Step 5: idempotent insert per listed file.
        let discovery_date = scheduled_instant.date_naive();
        let mut newly_inserted = Vec::new();
        for file in &listed {
            let candidate = DiscoveredFile::new(
                client_id.clone(),
                config.configuration_id,
                execution_id,
                file.file_url.clone(),
                file.filename.clone(),
                file.size_bytes,
                discovery_date,
                self.clock.now(),
            );
            match self.discovery_store.create(candidate).await {
                Ok(Some(inserted)) => newly_inserted.push(inserted),
                Ok(None) => {
                    // Duplicate key: silent success, not counted as newly processed.
                }
                Err(err) => {
                    warn!(%execution_id, file_url = %file.file_url, error = %err, "discovery insert failed");
                }
            }
        }

        // Step 6: emit FileDiscovered + ProcessDiscoveredFile for each new discovery.
        for discovered in &newly_inserted {
            self.emit_discovery_messages(config, discovered, correlation_id)
                .await;
        }

        if cancel.is_cancelled() {
            let now = self.clock.now();
            execution.fail(ErrorCategory::Cancelled, "execution cancelled", now);
            if let Err(store_err) = self.execution_store.update(execution).await {
                warn!(%execution_id, error = %store_err, "failed to persist cancelled execution");
            }
            self.emit_failed(
                &client_id,
                Some(execution_id),
                "execution cancelled",
                ErrorCategory::Cancelled,
                now - start,
                correlation_id,
                now,
            )
            .await;
            return FileCheckOutcome {
                execution_id,
                success: false,
                files_found: listed.len() as u32,
                files_processed: newly_inserted.len() as u32,
                error_category: Some(ErrorCategory::Cancelled),
                error_message: Some("execution cancelled".to_string()),
            };
        }

        // Step 7: mark Completed.
        let completed_at = self.clock.now();
        execution.complete(listed.len() as u32, newly_inserted.len() as u32, completed_at);
        if let Err(err) = self.execution_store.update(execution.clone()).await {
            warn!(%execution_id, error = %err, "failed to persist completed execution");
        }

        let envelope = MessageEnvelope::new(
            correlation_id,
            format!("{client_id}:{execution_id}:completed"),
            client_id,
            completed_at,
            DomainEvent::FileCheckCompleted(FileCheckCompletedEvent {
                execution_id: *execution_id.as_uuid(),
                files_found: listed.len() as u32,
                files_processed: newly_inserted.len() as u32,
                duration_ms: execution.duration_ms.unwrap_or_default(),
                resolved_file_path_pattern: resolved_path,
                resolved_filename_pattern: resolved_filename,
            }),
        );
        if let Err(err) = self.publisher.publish(envelope).await {
            warn!(%execution_id, error = %err, "failed to publish FileCheckCompleted");
        }

        info!(
            %execution_id,
            files_found = listed.len(),
            files_processed = newly_inserted.len(),
            "file check completed"
        );

        FileCheckOutcome {
            execution_id,
            success: true,
            files_found: listed.len() as u32,
            files_processed: newly_inserted.len() as u32,
            error_category: None,
            error_message: None,
        }
    }

    async fn list_with_retry(
        &self,
        adapter: &dyn ProtocolAdapter,
        config: &RetrievalConfiguration,
        resolved_path: &str,
        resolved_filename: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<crate::domain::ListedFile>, AdapterError> {
        let mut attempt = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(AdapterError::new(ErrorCategory::Cancelled, "list cancelled before attempt"));
            }
            attempt += 1;
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => Err(AdapterError::new(ErrorCategory::Cancelled, "list cancelled")),
                result = adapter.list(
                    &config.protocol_settings,
                    resolved_path,
                    resolved_filename,
                    config.file_extension.as_deref(),
                    cancel,
                ) => result,
            };

            match result {
                Ok(files) => return Ok(files),
                Err(err) if err.category == ErrorCategory::Cancelled => return Err(err),
                Err(err) if attempt < MAX_LIST_ATTEMPTS && err.is_retryable() => {
                    let backoff = BASE_BACKOFF * 2u32.pow(attempt - 1);
                    let jitter_ms: u64 = rand::thread_rng().gen_range(0..250);
                    warn!(
                        attempt,
                        category = ?err.category,
                        "list attempt failed, retrying"
                    );
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => return Err(AdapterError::new(ErrorCategory::Cancelled, "cancelled during retry backoff")),
                        () = tokio::time::sleep(backoff + Duration::from_millis(jitter_ms)) => {}
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn emit_triggered(
        &self,
        client_id: &ClientId,
        execution_id: ExecutionId,
        config: &RetrievalConfiguration,
        scheduled_instant: DateTime<Utc>,
        is_manual_trigger: bool,
        triggered_by: &str,
        correlation_id: &str,
        now: DateTime<Utc>,
    ) {
        let envelope = MessageEnvelope::new(
            correlation_id,
            format!("{client_id}:{execution_id}:triggered"),
            client_id.clone(),
            now,
            DomainEvent::FileCheckTriggered(FileCheckTriggeredEvent {
                execution_id: *execution_id.as_uuid(),
                configuration_name: config.name.clone(),
                protocol: format!("{:?}", config.protocol_settings.tag()),
                scheduled_execution_time: scheduled_instant,
                is_manual_trigger,
                triggered_by: triggered_by.to_string(),
            }),
        );
        if let Err(err) = self.publisher.publish(envelope).await {
            warn!(%execution_id, error = %err, "failed to publish FileCheckTriggered");
        }
    }

    async fn emit_failed(
        &self,
        client_id: &ClientId,
        execution_id: Option<ExecutionId>,
        message: &str,
        category: ErrorCategory,
        elapsed: chrono::Duration,
        correlation_id: &str,
        now: DateTime<Utc>,
    ) {
        let idempotency_key = match execution_id {
            Some(id) => format!("{client_id}:{id}:failed"),
            None => format!("{client_id}:{correlation_id}:failed"),
        };
        let envelope = MessageEnvelope::new(
            correlation_id,
            idempotency_key,
            client_id.clone(),
            now,
            DomainEvent::FileCheckFailed(FileCheckFailedEvent {
                execution_id: execution_id.map(|id| *id.as_uuid()),
                error_message: message.to_string(),
                error_category: category,
                duration_ms: elapsed.num_milliseconds().max(0) as u64,
                retry_count: 0,
            }),
        );
        if let Err(err) = self.publisher.publish(envelope).await {
            warn!(error = %err, "failed to publish FileCheckFailed");
        }
    }

    async fn emit_discovery_messages(
        &self,
        config: &RetrievalConfiguration,
        discovered: &DiscoveredFile,
        correlation_id: &str,
    ) {
        let client_id = config.client_id.clone();
        let idempotency_key = format!(
            "{}:{}:{}:{}",
            client_id, config.configuration_id, discovered.execution_id, discovered.discovered_file_id
        );

        let discovered_event = MessageEnvelope::new(
            correlation_id,
            idempotency_key.clone(),
            client_id.clone(),
            discovered.discovered_at,
            DomainEvent::FileDiscovered(FileDiscoveredEvent {
                discovered_file_id: *discovered.discovered_file_id.as_uuid(),
                file_url: discovered.file_url.clone(),
                filename: discovered.filename.clone(),
                size_bytes: discovered.size_bytes,
                protocol: format!("{:?}", config.protocol_settings.tag()),
                discovered_at: discovered.discovered_at,
            }),
        );
        if let Err(err) = self.publisher.publish(discovered_event).await {
            warn!(error = %err, "failed to publish FileDiscovered");
        }

        let process_command = MessageEnvelope::new(
            correlation_id,
            idempotency_key,
            client_id,
            discovered.discovered_at,
            ProcessDiscoveredFileCommand {
                configuration_id: *config.configuration_id.as_uuid(),
                execution_id: *discovered.execution_id.as_uuid(),
                discovered_file_id: *discovered.discovered_file_id.as_uuid(),
                file_url: discovered.file_url.clone(),
                filename: discovered.filename.clone(),
                protocol: format!("{:?}", config.protocol_settings.tag()),
            },
        );
        if let Err(err) = self
            .publisher
            .send("process-discovered-file", process_command)
            .await
        {
            warn!(error = %err, "failed to send ProcessDiscoveredFile");
        }
    }
}
