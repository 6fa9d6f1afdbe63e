//! The retrieval service daemon: loads config, wires the store, bus,
//! adapters, and scheduler together, and runs them under `tokio::main`
//! with graceful shutdown on SIGINT/SIGTERM.

mod config;
mod secrets;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use retrieval_bus::{
    CreateConfigurationHandler, DeleteConfigurationHandler, ExecuteFileCheckHandler, InProcessBus,
    ProcessDiscoveredFileHandler, RetryPolicy, UpdateConfigurationHandler,
};
use retrieval_core::domain::ProtocolTag;
use retrieval_core::ports::SystemClock;
use retrieval_core::usecases::FileCheckService;
use retrieval_protocols::{AzureBlobAdapter, FtpAdapter, HttpsAdapter};
use retrieval_scheduler::{AdapterRegistry, DispatchTracker, FileCheckExecutor, Scheduler};
use retrieval_store::{DatabasePool, SqliteConfigurationStore, SqliteDiscoveryStore, SqliteExecutionStore, SqliteProcessedFileStore};
use retrieval_telemetry::{init_tracing, LogFormat};
use secrets::EnvSecretStore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use config::WorkerConfig;

#[derive(Debug, Parser)]
#[command(name = "retrieval-worker", version, about = "Scheduled file-discovery service")]
struct Cli {
    /// Path to the worker's YAML config file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(WorkerConfig::default_path);
    let config = WorkerConfig::load_or_default(&config_path);

    init_tracing(
        config.logging.verbosity,
        if config.logging.json { LogFormat::Json } else { LogFormat::Pretty },
    );

    let scheduler_config = config.to_scheduler_config()?;

    let pool = DatabasePool::new(&config.database.path).await?;
    let config_store: Arc<dyn retrieval_core::ports::ConfigurationStore> =
        Arc::new(SqliteConfigurationStore::new(pool.pool().clone()));
    let discovery_store: Arc<dyn retrieval_core::ports::DiscoveryStore> =
        Arc::new(SqliteDiscoveryStore::new(pool.pool().clone()));
    let execution_store: Arc<dyn retrieval_core::ports::ExecutionStore> =
        Arc::new(SqliteExecutionStore::new(pool.pool().clone()));
    let processed_store: Arc<dyn retrieval_core::ports::ProcessedFileStore> =
        Arc::new(SqliteProcessedFileStore::new(pool.pool().clone()));

    let secret_store: Arc<dyn retrieval_core::ports::SecretStore> = Arc::new(EnvSecretStore::new());
    let registry = AdapterRegistry::new()
        .with_adapter(ProtocolTag::Ftp, Arc::new(FtpAdapter::new(secret_store.clone())))
        .with_adapter(ProtocolTag::Https, Arc::new(HttpsAdapter::new(secret_store.clone())))
        .with_adapter(ProtocolTag::AzureBlob, Arc::new(AzureBlobAdapter::new(secret_store.clone())));

    let clock = Arc::new(SystemClock);
    let (bus, mut receivers) = InProcessBus::new(config.bus.queue_capacity);
    let publisher: Arc<dyn retrieval_core::ports::Publisher> = Arc::new(bus);

    let tracker = Arc::new(DispatchTracker::new(scheduler_config.max_concurrent_checks));
    let file_check = Arc::new(FileCheckService::new(
        execution_store,
        discovery_store,
        publisher.clone(),
        clock.clone(),
    ));
    let executor = Arc::new(FileCheckExecutor::new(
        config_store.clone(),
        file_check,
        registry.clone(),
        tracker.clone(),
    ));
    let scheduler = Arc::new(Scheduler::new(
        config_store.clone(),
        publisher.clone(),
        clock.clone(),
        tracker,
        scheduler_config,
    ));

    // Wired for completeness even though this binary has no admin API to
    // route Create/Update/Delete commands from yet.
    let _create_handler = CreateConfigurationHandler::new(config_store.clone(), publisher.clone(), clock.clone());
    let _update_handler = UpdateConfigurationHandler::new(config_store.clone(), publisher.clone(), clock.clone());
    let _delete_handler = DeleteConfigurationHandler::new(config_store.clone(), publisher.clone(), clock.clone());

    let execute_handler = Arc::new(ExecuteFileCheckHandler::new(
        config_store.clone(),
        executor,
        publisher.clone(),
        clock.clone(),
        RetryPolicy::default(),
    ));
    let process_handler = Arc::new(ProcessDiscoveredFileHandler::new(
        config_store,
        registry,
        processed_store,
        publisher,
        clock,
    ));

    let shutdown = CancellationToken::new();

    let scheduler_task = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { scheduler.run(shutdown).await }
    });

    let execute_task = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    received = receivers.execute_file_check.recv() => {
                        let Some(envelope) = received else { break };
                        if let Err(err) = execute_handler.handle(envelope, &shutdown).await {
                            warn!(error = %err, "execute-file-check handler failed permanently");
                        }
                    }
                }
            }
        }
    });

    let process_task = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    received = receivers.process_discovered_file.recv() => {
                        let Some(envelope) = received else { break };
                        if let Err(err) = process_handler.handle(envelope, &shutdown).await {
                            warn!(error = %err, "process-discovered-file handler failed");
                        }
                    }
                }
            }
        }
    });

    wait_for_shutdown_signal().await;
    info!("shutdown signal received, stopping worker");
    shutdown.cancel();

    let _ = tokio::join!(scheduler_task, execute_task, process_task);
    info!("worker stopped");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
