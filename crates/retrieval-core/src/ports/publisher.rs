//! Outbound event/command publisher port
//!
//! Thin, at-least-once wrapper over the bus. Errors encountered while
//! publishing are rethrown by callers (see
//! `retrieval-bus`'s handlers) rather than swallowed — duplicate
//! suppression elsewhere (discovery uniqueness, processed-record
//! idempotency keys) prevents downstream effects from multiplying on
//! redelivery.

use crate::domain::{DomainEvent, ExecuteFileCheckCommand, MessageEnvelope, ProcessDiscoveredFileCommand};

#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    /// Broadcasts a domain event to every subscriber
    async fn publish(&self, event: MessageEnvelope<DomainEvent>) -> anyhow::Result<()>;

    /// Sends a command to a specific named endpoint (used for
    /// `ProcessDiscoveredFile`, routed to an external workflow endpoint)
    async fn send(
        &self,
        endpoint: &str,
        command: MessageEnvelope<ProcessDiscoveredFileCommand>,
    ) -> anyhow::Result<()>;

    /// Dispatches an `ExecuteFileCheck` command to the worker queue
    /// (the scheduler's own bus endpoint, per worker pull model — see
    /// `retrieval-scheduler`).
    async fn dispatch_file_check(
        &self,
        endpoint: &str,
        command: MessageEnvelope<ExecuteFileCheckCommand>,
    ) -> anyhow::Result<()>;
}
