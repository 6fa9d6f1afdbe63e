//! Scheduler Loop: tick, due-set selection, dispatch
//!
//! One background task per worker instance. Each tick loads every active
//! configuration (the scheduler's one sanctioned cross-partition read),
//! skips anything already in flight, computes whether it is due, and —
//! if a concurrency permit is available — dispatches an
//! `ExecuteFileCheck` command to the bus. Multi-worker coordination is
//! deliberately not attempted here: two replicas may both dispatch the
//! same due configuration, and Discovery-store uniqueness is what
//! prevents that from producing duplicate downstream effects.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use retrieval_core::domain::{ClientId, ExecuteFileCheckCommand, MessageEnvelope};
use retrieval_core::ports::{Clock, ConfigurationStore, Publisher};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::tracker::DispatchTracker;

const STARTUP_GRACE: Duration = Duration::from_secs(5);
const EXECUTE_FILE_CHECK_ENDPOINT: &str = "execute-file-check";

/// Per-tick counters, exposed for tests and operator metrics
#[derive(Debug, Default, Clone, Copy)]
pub struct TickSummary {
    pub dispatched: u32,
    pub skipped_in_flight: u32,
    pub deferred_no_permits: u32,
    pub not_due: u32,
}

pub struct Scheduler {
    config_store: Arc<dyn ConfigurationStore>,
    publisher: Arc<dyn Publisher>,
    clock: Arc<dyn Clock>,
    tracker: Arc<DispatchTracker>,
    config: SchedulerConfig,
    dispatch_sequence: AtomicU64,
}

impl Scheduler {
    #[must_use]
    pub fn new(
        config_store: Arc<dyn ConfigurationStore>,
        publisher: Arc<dyn Publisher>,
        clock: Arc<dyn Clock>,
        tracker: Arc<DispatchTracker>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            config_store,
            publisher,
            clock,
            tracker,
            config,
            dispatch_sequence: AtomicU64::new(0),
        }
    }

    /// Runs the tick loop until `shutdown` is cancelled. Waits an
    /// initial startup grace before the first tick.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            polling_interval_seconds = self.config.polling_interval_seconds,
            max_concurrent_checks = self.config.max_concurrent_checks,
            execution_window_minutes = self.config.execution_window_minutes,
            "scheduler starting"
        );

        tokio::select! {
            () = shutdown.cancelled() => return,
            () = tokio::time::sleep(STARTUP_GRACE) => {}
        }

        let mut ticker = tokio::time::interval(Duration::from_secs(
            u64::from(self.config.polling_interval_seconds),
        ));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let summary = self.tick().await;
                    info!(
                        dispatched = summary.dispatched,
                        skipped_in_flight = summary.skipped_in_flight,
                        deferred_no_permits = summary.deferred_no_permits,
                        not_due = summary.not_due,
                        "scheduler tick complete"
                    );
                }
            }
        }

        info!("scheduler stopped");
    }

    /// Runs a single tick. Public so tests and a manual "tick now" CLI
    /// command can invoke it directly without waiting on the interval.
    pub async fn tick(&self) -> TickSummary {
        let now = self.clock.now();
        let mut summary = TickSummary::default();

        let configurations = match self.config_store.get_all_active().await {
            Ok(configs) => configs,
            Err(err) => {
                warn!(error = %err, "failed to load active configurations for tick");
                return summary;
            }
        };

        for config in configurations {
            let configuration_id = config.configuration_id;

            if self.tracker.is_in_flight(&configuration_id) {
                summary.skipped_in_flight += 1;
                continue;
            }

            let next_execution = config.next_scheduled_run.unwrap_or_else(|| {
                retrieval_protocols::schedule::next_after(
                    &config.schedule.cron_expression,
                    &config.schedule.timezone,
                    config.last_executed_at.unwrap_or(now),
                )
                .unwrap_or(now)
            });

            let window = chrono::Duration::minutes(i64::from(self.config.execution_window_minutes));
            let overdue = next_execution < now - window;
            if overdue {
                warn!(
                    %configuration_id,
                    next_execution = %next_execution,
                    "configuration is overdue by more than one execution window, dispatching anyway"
                );
            }
            let due = overdue || next_execution <= now + window;

            if !due {
                summary.not_due += 1;
                continue;
            }

            if !self.tracker.try_dispatch(configuration_id) {
                summary.deferred_no_permits += 1;
                info!(%configuration_id, "deferred: no concurrency permits available");
                continue;
            }

            if let Err(err) = self
                .dispatch(&config.client_id, configuration_id, next_execution)
                .await
            {
                warn!(%configuration_id, error = %err, "failed to dispatch ExecuteFileCheck, releasing permit");
                self.tracker.complete(&configuration_id);
                continue;
            }

            summary.dispatched += 1;
        }

        summary
    }

    async fn dispatch(
        &self,
        client_id: &ClientId,
        configuration_id: retrieval_core::domain::ConfigurationId,
        scheduled_execution_time: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let sequence = self.dispatch_sequence.fetch_add(1, Ordering::Relaxed);
        let idempotency_key = format!("{client_id}:{configuration_id}:{scheduled_execution_time}:{sequence}");
        let correlation_id = Uuid::new_v4().to_string();

        let command = ExecuteFileCheckCommand {
            configuration_id: *configuration_id.as_uuid(),
            scheduled_execution_time,
            is_manual_trigger: false,
        };
        let envelope = MessageEnvelope::new(
            correlation_id,
            idempotency_key,
            client_id.clone(),
            self.clock.now(),
            command,
        );

        self.publisher
            .dispatch_file_check(EXECUTE_FILE_CHECK_ENDPOINT, envelope)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use retrieval_core::domain::{
        DomainEvent, FtpSettings, PatternString, ProcessDiscoveredFileCommand, ProtocolSettings,
        RetrievalConfiguration, Schedule,
    };
    use retrieval_core::ports::clock::test_support::FixedClock;
    use retrieval_core::ports::{ConfigurationFilter, ConfigurationPage, StoreError};
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
            _client_id: &ClientId,
            _configuration_id: &retrieval_core::domain::ConfigurationId,
        ) -> Result<Option<RetrievalConfiguration>, StoreError> {
            Ok(None)
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
            _configuration_id: &retrieval_core::domain::ConfigurationId,
            _etag: &retrieval_core::domain::ETag,
        ) -> Result<(), StoreError> {
            Ok(())
        }
    }

    struct RecordingPublisher {
        dispatched: Mutex<Vec<ExecuteFileCheckCommand>>,
    }

    impl RecordingPublisher {
        fn new() -> Self {
            Self {
                dispatched: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        async fn publish(&self, _event: MessageEnvelope<DomainEvent>) -> anyhow::Result<()> {
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
            command: MessageEnvelope<ExecuteFileCheckCommand>,
        ) -> anyhow::Result<()> {
            self.dispatched.lock().unwrap().push(command.payload);
            Ok(())
        }
    }

    fn sample_config(due_in: chrono::Duration, now: DateTime<Utc>) -> RetrievalConfiguration {
        let mut config = RetrievalConfiguration::new(
            ClientId::new("acme").unwrap(),
            retrieval_core::domain::ConfigurationId::new(),
            "nightly feed",
            None,
            ProtocolSettings::Ftp(
                FtpSettings::new("ftp.test", 21, "user", "secret-1", false, true, 30).unwrap(),
            ),
            PatternString::new("/").unwrap(),
            PatternString::new("feed-{yyyymmdd}.txt").unwrap(),
            None,
            Schedule::new("*/5 * * * * *", "UTC", None).unwrap(),
            "tester",
            now,
        );
        config.next_scheduled_run = Some(now + due_in);
        config
    }

    #[tokio::test]
    async fn test_due_configuration_is_dispatched() {
        let now = Utc::now();
        let config = sample_config(chrono::Duration::seconds(30), now);
        let store = Arc::new(InMemoryConfigurationStore {
            rows: Mutex::new(vec![config]),
        });
        let publisher = Arc::new(RecordingPublisher::new());
        let scheduler = Scheduler::new(
            store,
            publisher.clone(),
            Arc::new(FixedClock::new(now)),
            Arc::new(DispatchTracker::new(10)),
            SchedulerConfig::default(),
        );

        let summary = scheduler.tick().await;

        assert_eq!(summary.dispatched, 1);
        assert_eq!(publisher.dispatched.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_not_yet_due_configuration_is_skipped() {
        let now = Utc::now();
        let config = sample_config(chrono::Duration::hours(1), now);
        let store = Arc::new(InMemoryConfigurationStore {
            rows: Mutex::new(vec![config]),
        });
        let publisher = Arc::new(RecordingPublisher::new());
        let scheduler = Scheduler::new(
            store,
            publisher.clone(),
            Arc::new(FixedClock::new(now)),
            Arc::new(DispatchTracker::new(10)),
            SchedulerConfig::default(),
        );

        let summary = scheduler.tick().await;

        assert_eq!(summary.dispatched, 0);
        assert_eq!(summary.not_due, 1);
        assert!(publisher.dispatched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_in_flight_configuration_is_skipped_not_redispatched() {
        let now = Utc::now();
        let config = sample_config(chrono::Duration::seconds(1), now);
        let configuration_id = config.configuration_id;
        let store = Arc::new(InMemoryConfigurationStore {
            rows: Mutex::new(vec![config]),
        });
        let tracker = Arc::new(DispatchTracker::new(10));
        tracker.try_dispatch(configuration_id);
        let publisher = Arc::new(RecordingPublisher::new());
        let scheduler = Scheduler::new(
            store,
            publisher.clone(),
            Arc::new(FixedClock::new(now)),
            tracker,
            SchedulerConfig::default(),
        );

        let summary = scheduler.tick().await;

        assert_eq!(summary.dispatched, 0);
        assert_eq!(summary.skipped_in_flight, 1);
    }

    #[tokio::test]
    async fn test_due_configuration_deferred_when_no_permits() {
        let now = Utc::now();
        let config = sample_config(chrono::Duration::seconds(1), now);
        let store = Arc::new(InMemoryConfigurationStore {
            rows: Mutex::new(vec![config]),
        });
        let tracker = Arc::new(DispatchTracker::new(1));
        // consume the single permit with some other configuration
        tracker.try_dispatch(retrieval_core::domain::ConfigurationId::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let scheduler = Scheduler::new(
            store,
            publisher.clone(),
            Arc::new(FixedClock::new(now)),
            tracker,
            SchedulerConfig::default(),
        );

        let summary = scheduler.tick().await;

        assert_eq!(summary.dispatched, 0);
        assert_eq!(summary.deferred_no_permits, 1);
    }

    #[tokio::test]
    async fn test_overdue_configuration_dispatches_with_warning() {
        let now = Utc::now();
        let config = sample_config(chrono::Duration::hours(-5), now);
        let store = Arc::new(InMemoryConfigurationStore {
            rows: Mutex::new(vec![config]),
        });
        let publisher = Arc::new(RecordingPublisher::new());
        let scheduler = Scheduler::new(
            store,
            publisher.clone(),
            Arc::new(FixedClock::new(now)),
            Arc::new(DispatchTracker::new(10)),
            SchedulerConfig::default(),
        );

        let summary = scheduler.tick().await;

        assert_eq!(summary.dispatched, 1);
    }
}
