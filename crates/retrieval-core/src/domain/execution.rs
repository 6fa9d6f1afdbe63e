//! Execution records: one per file-check attempt

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ClientId, ConfigurationId, ETag, ExecutionId};

/// Lifecycle state of an [`Execution`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    /// Terminal statuses make the record immutable except for `retryCount`
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Exhaustive error classification surfaced on events and execution records
///
/// Distinct from [`super::errors::DomainError`], which is a construction-time
/// validation failure rather than a runtime outcome classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ErrorCategory {
    /// Configuration not found, inactive, or malformed when looked up.
    ConfigurationError,
    /// Command body failed domain validation.
    ValidationError,
    /// Adapter rejected credentials. Never retried.
    AuthenticationFailure,
    /// Adapter exceeded the configured timeout. Retried.
    ConnectionTimeout,
    /// Adapter returned unexpected data. Retried.
    ProtocolError,
    /// Store uniqueness violation.
    Conflict,
    /// ETag mismatch on update/delete.
    PreconditionFailed,
    /// Deadline or caller cancellation.
    Cancelled,
    /// Catch-all for unexpected exceptions in a handler.
    HandlerError,
}

impl ErrorCategory {
    /// Whether the File-Check Service's list-retry loop should retry an
    /// adapter error of this category.
    #[must_use]
    pub fn is_retryable_adapter_error(self) -> bool {
        matches!(self, Self::ConnectionTimeout | Self::ProtocolError)
    }
}

/// One attempt to run a configuration's file-check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub client_id: ClientId,
    pub configuration_id: ConfigurationId,
    pub execution_id: ExecutionId,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub files_found: u32,
    pub files_processed: u32,
    pub resolved_file_path_pattern: Option<String>,
    pub resolved_filename_pattern: Option<String>,
    pub duration_ms: Option<u64>,
    pub retry_count: u32,
    pub error_message: Option<String>,
    pub error_category: Option<ErrorCategory>,
    pub etag: ETag,
}

impl Execution {
    /// Starts a new execution in `Running` state, as File-Check Service
    /// step 1 requires.
    #[must_use]
    pub fn start(
        client_id: ClientId,
        configuration_id: ConfigurationId,
        execution_id: ExecutionId,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            client_id,
            configuration_id,
            execution_id,
            status: ExecutionStatus::Running,
            started_at,
            completed_at: None,
            files_found: 0,
            files_processed: 0,
            resolved_file_path_pattern: None,
            resolved_filename_pattern: None,
            duration_ms: None,
            retry_count: 0,
            error_message: None,
            error_category: None,
            etag: ETag::generate(),
        }
    }

    /// Records the token-expanded patterns (step 2)
    pub fn with_resolved_patterns(&mut self, file_path: String, filename: String) {
        self.resolved_file_path_pattern = Some(file_path);
        self.resolved_filename_pattern = Some(filename);
    }

    /// Marks the execution complete (step 7): `filesFound` is the listed
    /// count, `filesProcessed` the newly-inserted count.
    pub fn complete(&mut self, files_found: u32, files_processed: u32, completed_at: DateTime<Utc>) {
        debug_assert!(files_processed <= files_found);
        self.status = ExecutionStatus::Completed;
        self.files_found = files_found;
        self.files_processed = files_processed;
        self.completed_at = Some(completed_at);
        self.duration_ms = Some(
            (completed_at - self.started_at)
                .num_milliseconds()
                .max(0) as u64,
        );
        self.etag = ETag::generate();
    }

    /// Marks the execution failed (step-4 exhaustion or handler fault):
    /// no partial discoveries are recorded.
    pub fn fail(&mut self, category: ErrorCategory, message: impl Into<String>, completed_at: DateTime<Utc>) {
        self.status = ExecutionStatus::Failed;
        self.error_category = Some(category);
        self.error_message = Some(message.into());
        self.completed_at = Some(completed_at);
        self.duration_ms = Some(
            (completed_at - self.started_at)
                .num_milliseconds()
                .max(0) as u64,
        );
        self.etag = ETag::generate();
    }
}
