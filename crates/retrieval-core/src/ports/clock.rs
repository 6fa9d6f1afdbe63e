//! Clock port
//!
//! Every "now" read in the core goes through this trait rather than
//! calling `Utc::now()` directly, so usecases are deterministically
//! testable against a fixed instant.

use chrono::{DateTime, Utc};

/// Supplies the current UTC instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real system clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
pub mod test_support {
    use super::Clock;
    use chrono::{DateTime, Utc};
    use std::sync::Mutex;

    /// A clock fixed at construction, optionally advanced between reads
    pub struct FixedClock(Mutex<DateTime<Utc>>);

    impl FixedClock {
        #[must_use]
        pub fn new(instant: DateTime<Utc>) -> Self {
            Self(Mutex::new(instant))
        }

        pub fn advance(&self, delta: chrono::Duration) {
            let mut guard = self.0.lock().unwrap();
            *guard += delta;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }
}
