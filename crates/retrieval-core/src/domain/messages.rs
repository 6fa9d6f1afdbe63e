//! Message envelope and the concrete event/command payloads this system
//! exchanges over the bus
//!
//! Every message carries `messageId`, `correlationId`, `occurredUtc`,
//! `idempotencyKey`, and `clientId`. Commands are named verb+noun,
//! imperative; events are named noun+verb-past.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::execution::ErrorCategory;
use super::ids::ClientId;

/// Envelope shared by every command and event on the bus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope<T> {
    pub message_id: Uuid,
    pub correlation_id: String,
    pub occurred_utc: DateTime<Utc>,
    pub idempotency_key: String,
    pub client_id: ClientId,
    pub payload: T,
}

impl<T> MessageEnvelope<T> {
    pub fn new(
        correlation_id: impl Into<String>,
        idempotency_key: impl Into<String>,
        client_id: ClientId,
        occurred_utc: DateTime<Utc>,
        payload: T,
    ) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            correlation_id: correlation_id.into(),
            occurred_utc,
            idempotency_key: idempotency_key.into(),
            client_id,
            payload,
        }
    }
}

// --- Commands received ------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateConfigurationCommand {
    pub configuration_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub protocol_settings: serde_json::Value,
    pub file_path_pattern: String,
    pub filename_pattern: String,
    pub file_extension: Option<String>,
    pub cron_expression: String,
    pub timezone: String,
    pub schedule_description: Option<String>,
    pub created_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateConfigurationCommand {
    pub configuration_id: Uuid,
    pub etag: String,
    pub name: String,
    pub description: Option<String>,
    pub protocol_settings: serde_json::Value,
    pub file_path_pattern: String,
    pub filename_pattern: String,
    pub file_extension: Option<String>,
    pub cron_expression: String,
    pub timezone: String,
    pub schedule_description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteConfigurationCommand {
    pub configuration_id: Uuid,
    pub etag: String,
    pub deleted_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteFileCheckCommand {
    pub configuration_id: Uuid,
    pub scheduled_execution_time: DateTime<Utc>,
    pub is_manual_trigger: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessDiscoveredFileCommand {
    pub configuration_id: Uuid,
    pub execution_id: Uuid,
    pub discovered_file_id: Uuid,
    pub file_url: String,
    pub filename: String,
    pub protocol: String,
}

// --- Events published ---------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationCreatedEvent {
    pub configuration_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationUpdatedEvent {
    pub configuration_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationDeletedEvent {
    pub configuration_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileCheckTriggeredEvent {
    pub execution_id: Uuid,
    pub configuration_name: String,
    pub protocol: String,
    pub scheduled_execution_time: DateTime<Utc>,
    pub is_manual_trigger: bool,
    pub triggered_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileCheckCompletedEvent {
    pub execution_id: Uuid,
    pub files_found: u32,
    pub files_processed: u32,
    pub duration_ms: u64,
    pub resolved_file_path_pattern: String,
    pub resolved_filename_pattern: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileCheckFailedEvent {
    pub execution_id: Option<Uuid>,
    pub error_message: String,
    pub error_category: ErrorCategory,
    pub duration_ms: u64,
    pub retry_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDiscoveredEvent {
    pub discovered_file_id: Uuid,
    pub file_url: String,
    pub filename: String,
    pub size_bytes: u64,
    pub protocol: String,
    pub discovered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredFileProcessedEvent {
    pub discovered_file_id: Uuid,
    pub downloaded_size_bytes: u64,
    pub checksum_algorithm: String,
    pub checksum_hex: String,
}

/// Any event this system publishes, for code that needs a single
/// publish-one-of-these entry point (the outbound publisher port).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "eventType")]
pub enum DomainEvent {
    ConfigurationCreated(ConfigurationCreatedEvent),
    ConfigurationUpdated(ConfigurationUpdatedEvent),
    ConfigurationDeleted(ConfigurationDeletedEvent),
    FileCheckTriggered(FileCheckTriggeredEvent),
    FileCheckCompleted(FileCheckCompletedEvent),
    FileCheckFailed(FileCheckFailedEvent),
    FileDiscovered(FileDiscoveredEvent),
    DiscoveredFileProcessed(DiscoveredFileProcessedEvent),
}
