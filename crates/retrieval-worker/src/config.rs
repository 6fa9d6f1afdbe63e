//! Worker configuration: YAML file covering scheduler tuning, store
//! location, bus sizing, and logging.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default)]
    pub scheduler: SchedulerSection,
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub bus: BusSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSection {
    pub polling_interval_seconds: u32,
    pub max_concurrent_checks: u32,
    pub execution_window_minutes: u32,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        let defaults = retrieval_scheduler::SchedulerConfig::default();
        Self {
            polling_interval_seconds: defaults.polling_interval_seconds,
            max_concurrent_checks: defaults.max_concurrent_checks,
            execution_window_minutes: defaults.execution_window_minutes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub path: PathBuf,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("retrieval-worker.sqlite3"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusSection {
    pub queue_capacity: usize,
}

impl Default for BusSection {
    fn default() -> Self {
        Self { queue_capacity: 256 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    pub verbosity: u8,
    pub json: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            verbosity: 0,
            json: false,
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerSection::default(),
            database: DatabaseSection::default(),
            bus: BusSection::default(),
            logging: LoggingSection::default(),
        }
    }
}

impl WorkerConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: WorkerConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    #[must_use]
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Default config file location: `./retrieval-worker.yaml` in the
    /// working directory the process was launched from. This service has
    /// no desktop session to resolve an XDG config directory against, so
    /// a cwd-relative default plus `--config` for anything else is simpler.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathBuf::from("retrieval-worker.yaml")
    }

    #[must_use]
    pub fn to_scheduler_config(&self) -> Result<retrieval_scheduler::SchedulerConfig, retrieval_scheduler::SchedulerConfigError> {
        retrieval_scheduler::SchedulerConfig::new(
            self.scheduler.polling_interval_seconds,
            self.scheduler.max_concurrent_checks,
            self.scheduler.execution_window_minutes,
        )
    }
}
