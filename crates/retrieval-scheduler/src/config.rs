//! Scheduler tuning, validated eagerly at construction

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerConfigError {
    #[error("pollingIntervalSeconds must be in [1, 3600], got {0}")]
    InvalidPollingInterval(u32),
    #[error("maxConcurrentChecks must be in [1, 1000], got {0}")]
    InvalidMaxConcurrentChecks(u32),
    #[error("executionWindowMinutes must be in [1, 60], got {0}")]
    InvalidExecutionWindow(u32),
}

/// Scheduler loop tuning knobs
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub polling_interval_seconds: u32,
    pub max_concurrent_checks: u32,
    pub execution_window_minutes: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            polling_interval_seconds: 60,
            max_concurrent_checks: 100,
            execution_window_minutes: 2,
        }
    }
}

impl SchedulerConfig {
    pub fn new(
        polling_interval_seconds: u32,
        max_concurrent_checks: u32,
        execution_window_minutes: u32,
    ) -> Result<Self, SchedulerConfigError> {
        if !(1..=3600).contains(&polling_interval_seconds) {
            return Err(SchedulerConfigError::InvalidPollingInterval(polling_interval_seconds));
        }
        if !(1..=1000).contains(&max_concurrent_checks) {
            return Err(SchedulerConfigError::InvalidMaxConcurrentChecks(max_concurrent_checks));
        }
        if !(1..=60).contains(&execution_window_minutes) {
            return Err(SchedulerConfigError::InvalidExecutionWindow(execution_window_minutes));
        }
        Ok(Self {
            polling_interval_seconds,
            max_concurrent_checks,
            execution_window_minutes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_spec_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.polling_interval_seconds, 60);
        assert_eq!(config.max_concurrent_checks, 100);
        assert_eq!(config.execution_window_minutes, 2);
    }

    #[test]
    fn test_rejects_zero_polling_interval() {
        assert_eq!(
            SchedulerConfig::new(0, 10, 2).unwrap_err(),
            SchedulerConfigError::InvalidPollingInterval(0)
        );
    }

    #[test]
    fn test_rejects_out_of_range_max_concurrent() {
        assert_eq!(
            SchedulerConfig::new(60, 1001, 2).unwrap_err(),
            SchedulerConfigError::InvalidMaxConcurrentChecks(1001)
        );
    }

    #[test]
    fn test_rejects_out_of_range_window() {
        assert_eq!(
            SchedulerConfig::new(60, 10, 61).unwrap_err(),
            SchedulerConfigError::InvalidExecutionWindow(61)
        );
    }

    #[test]
    fn test_accepts_boundary_values() {
        assert!(SchedulerConfig::new(1, 1, 1).is_ok());
        assert!(SchedulerConfig::new(3600, 1000, 60).is_ok());
    }
}
