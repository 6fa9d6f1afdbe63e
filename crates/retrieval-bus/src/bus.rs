//! `tokio::sync`-channel-backed [`Publisher`] implementation
//!
//! Two named command queues (`execute-file-check`, the scheduler's own
//! worker queue, and `process-discovered-file`, routed to by the
//! File-Check Service once a listing comes back) plus a broadcast fan-out
//! for published events. A real broker adapter would implement the same
//! `Publisher` trait against Service Bus/Kafka/whatever; this is the one
//! concrete adapter needed to run the service in a single process.

use async_trait::async_trait;
use retrieval_core::domain::{DomainEvent, ExecuteFileCheckCommand, MessageEnvelope, ProcessDiscoveredFileCommand};
use retrieval_core::ports::Publisher;
use tokio::sync::{broadcast, mpsc};

pub const EXECUTE_FILE_CHECK_ENDPOINT: &str = "execute-file-check";
pub const PROCESS_DISCOVERED_FILE_ENDPOINT: &str = "process-discovered-file";

/// The receiving ends handed to whatever drains each queue (a worker's
/// handler loop). Not `Clone`: each queue has exactly one consumer.
pub struct BusReceivers {
    pub execute_file_check: mpsc::Receiver<MessageEnvelope<ExecuteFileCheckCommand>>,
    pub process_discovered_file: mpsc::Receiver<MessageEnvelope<ProcessDiscoveredFileCommand>>,
}

pub struct InProcessBus {
    events: broadcast::Sender<MessageEnvelope<DomainEvent>>,
    execute_file_check: mpsc::Sender<MessageEnvelope<ExecuteFileCheckCommand>>,
    process_discovered_file: mpsc::Sender<MessageEnvelope<ProcessDiscoveredFileCommand>>,
}

impl InProcessBus {
    /// Builds a bus with `queue_capacity`-deep command queues and a
    /// same-size event broadcast buffer, plus the receiving ends a
    /// worker's handler loop drains.
    #[must_use]
    pub fn new(queue_capacity: usize) -> (Self, BusReceivers) {
        let (events_tx, _) = broadcast::channel(queue_capacity);
        let (execute_tx, execute_rx) = mpsc::channel(queue_capacity);
        let (process_tx, process_rx) = mpsc::channel(queue_capacity);

        (
            Self {
                events: events_tx,
                execute_file_check: execute_tx,
                process_discovered_file: process_tx,
            },
            BusReceivers {
                execute_file_check: execute_rx,
                process_discovered_file: process_rx,
            },
        )
    }

    /// Subscribes a new receiver to the event fan-out. Each subscriber
    /// only sees events published after it subscribes.
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<MessageEnvelope<DomainEvent>> {
        self.events.subscribe()
    }
}

#[async_trait]
impl Publisher for InProcessBus {
    async fn publish(&self, event: MessageEnvelope<DomainEvent>) -> anyhow::Result<()> {
        // No subscribers is not an error: operator tooling/tests may not
        // always be listening, and events are fire-and-forget fan-out.
        let _ = self.events.send(event);
        Ok(())
    }

    async fn send(
        &self,
        endpoint: &str,
        command: MessageEnvelope<ProcessDiscoveredFileCommand>,
    ) -> anyhow::Result<()> {
        if endpoint != PROCESS_DISCOVERED_FILE_ENDPOINT {
            anyhow::bail!("unknown send endpoint: {endpoint}");
        }
        self.process_discovered_file
            .send(command)
            .await
            .map_err(|_| anyhow::anyhow!("process-discovered-file queue closed"))
    }

    async fn dispatch_file_check(
        &self,
        endpoint: &str,
        command: MessageEnvelope<ExecuteFileCheckCommand>,
    ) -> anyhow::Result<()> {
        if endpoint != EXECUTE_FILE_CHECK_ENDPOINT {
            anyhow::bail!("unknown dispatch endpoint: {endpoint}");
        }
        self.execute_file_check
            .send(command)
            .await
            .map_err(|_| anyhow::anyhow!("execute-file-check queue closed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retrieval_core::domain::{ClientId, ConfigurationCreatedEvent};
    use uuid::Uuid;

    fn envelope(client_id: &str) -> MessageEnvelope<DomainEvent> {
        MessageEnvelope::new(
            "corr-1",
            "idem-1",
            ClientId::new(client_id).unwrap(),
            chrono::Utc::now(),
            DomainEvent::ConfigurationCreated(ConfigurationCreatedEvent {
                configuration_id: Uuid::new_v4(),
            }),
        )
    }

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let (bus, _receivers) = InProcessBus::new(8);
        let mut rx = bus.subscribe_events();

        bus.publish(envelope("acme")).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert!(matches!(received.payload, DomainEvent::ConfigurationCreated(_)));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_not_an_error() {
        let (bus, _receivers) = InProcessBus::new(8);
        assert!(bus.publish(envelope("acme")).await.is_ok());
    }

    #[tokio::test]
    async fn test_dispatch_file_check_rejects_unknown_endpoint() {
        let (bus, _receivers) = InProcessBus::new(8);
        let command = MessageEnvelope::new(
            "corr-1",
            "idem-1",
            ClientId::new("acme").unwrap(),
            chrono::Utc::now(),
            ExecuteFileCheckCommand {
                configuration_id: Uuid::new_v4(),
                scheduled_execution_time: chrono::Utc::now(),
                is_manual_trigger: false,
            },
        );
        assert!(bus.dispatch_file_check("not-a-real-endpoint", command).await.is_err());
    }

    #[tokio::test]
    async fn test_dispatch_file_check_delivers_to_receiver() {
        let (bus, mut receivers) = InProcessBus::new(8);
        let configuration_id = Uuid::new_v4();
        let command = MessageEnvelope::new(
            "corr-1",
            "idem-1",
            ClientId::new("acme").unwrap(),
            chrono::Utc::now(),
            ExecuteFileCheckCommand {
                configuration_id,
                scheduled_execution_time: chrono::Utc::now(),
                is_manual_trigger: false,
            },
        );
        bus.dispatch_file_check(EXECUTE_FILE_CHECK_ENDPOINT, command).await.unwrap();

        let received = receivers.execute_file_check.recv().await.unwrap();
        assert_eq!(received.payload.configuration_id, configuration_id);
    }
}
