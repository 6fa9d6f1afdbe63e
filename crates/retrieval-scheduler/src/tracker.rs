//! Per-configuration in-flight guard + global concurrency cap
//!
//! One structure covers both: a configuration is "in flight" exactly
//! while it holds a semaphore permit, so tracking the permit in the
//! in-flight map gets both guarantees from a single entry. Replica-local:
//! there is no cross-worker coordination, so two replicas can race to
//! dispatch the same configuration. The discovery store's unique-key
//! constraint is what keeps that from producing duplicate work.

use std::sync::Arc;

use dashmap::DashMap;
use retrieval_core::domain::ConfigurationId;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub struct DispatchTracker {
    semaphore: Arc<Semaphore>,
    in_flight: DashMap<ConfigurationId, OwnedSemaphorePermit>,
}

impl DispatchTracker {
    #[must_use]
    pub fn new(max_concurrent: u32) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent as usize)),
            in_flight: DashMap::new(),
        }
    }

    #[must_use]
    pub fn is_in_flight(&self, configuration_id: &ConfigurationId) -> bool {
        self.in_flight.contains_key(configuration_id)
    }

    /// Attempts to mark `configuration_id` in flight and acquire a
    /// concurrency permit. Returns `false` if already in flight or no
    /// permits remain; the caller should count this as "skipped" or
    /// "deferred" respectively.
    pub fn try_dispatch(&self, configuration_id: ConfigurationId) -> bool {
        if self.in_flight.contains_key(&configuration_id) {
            return false;
        }
        match self.semaphore.clone().try_acquire_owned() {
            Ok(permit) => {
                self.in_flight.insert(configuration_id, permit);
                true
            }
            Err(_) => false,
        }
    }

    /// Clears the in-flight mark and releases the permit. Idempotent:
    /// calling this for a configuration that isn't tracked is a no-op,
    /// since message redelivery may call it more than once.
    pub fn complete(&self, configuration_id: &ConfigurationId) {
        self.in_flight.remove(configuration_id);
    }

    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_marks_in_flight_and_consumes_permit() {
        let tracker = DispatchTracker::new(2);
        let id = ConfigurationId::new();

        assert!(tracker.try_dispatch(id));
        assert!(tracker.is_in_flight(&id));
        assert_eq!(tracker.available_permits(), 1);
    }

    #[test]
    fn test_second_dispatch_of_same_configuration_is_rejected() {
        let tracker = DispatchTracker::new(5);
        let id = ConfigurationId::new();

        assert!(tracker.try_dispatch(id));
        assert!(!tracker.try_dispatch(id));
    }

    #[test]
    fn test_dispatch_fails_when_permits_exhausted() {
        let tracker = DispatchTracker::new(1);
        let first = ConfigurationId::new();
        let second = ConfigurationId::new();

        assert!(tracker.try_dispatch(first));
        assert!(!tracker.try_dispatch(second));
    }

    #[test]
    fn test_complete_releases_permit_and_in_flight_mark() {
        let tracker = DispatchTracker::new(1);
        let first = ConfigurationId::new();
        let second = ConfigurationId::new();

        assert!(tracker.try_dispatch(first));
        tracker.complete(&first);

        assert!(!tracker.is_in_flight(&first));
        assert!(tracker.try_dispatch(second));
    }

    #[test]
    fn test_complete_on_untracked_configuration_is_a_no_op() {
        let tracker = DispatchTracker::new(1);
        tracker.complete(&ConfigurationId::new());
        assert_eq!(tracker.in_flight_count(), 0);
    }
}
