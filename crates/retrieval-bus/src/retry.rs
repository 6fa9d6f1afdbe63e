//! Handler-level retry + dead-letter policy
//!
//! Mirrors the shape of `retrieval-core`'s list-retry loop
//! (exponential-ish backoff around a fallible operation) but with the
//! wider envelope the bus's handler contract calls for: a few immediate
//! retries, then a couple of delayed ones, then give up.

use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

/// Up to `immediate_retries` retries with no delay, then up to
/// `delayed_retries` at `delay_base * attempt_number`, then the last
/// error is returned to the caller as a dead-letter.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub immediate_retries: u32,
    pub delayed_retries: u32,
    pub delay_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            immediate_retries: 3,
            delayed_retries: 2,
            delay_base: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Runs `op`, retrying on error per this policy. `handler` is a label
    /// used only for logging.
    pub async fn run<F, Fut, T>(&self, handler: &str, mut op: F) -> anyhow::Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let total_attempts = 1 + self.immediate_retries + self.delayed_retries;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempt >= total_attempts {
                        error!(handler, attempt, error = %err, "dead-lettering after exhausting retries");
                        return Err(err);
                    }
                    if attempt <= self.immediate_retries {
                        warn!(handler, attempt, error = %err, "handler failed, retrying immediately");
                    } else {
                        let delayed_attempt = attempt - self.immediate_retries;
                        let delay = self.delay_base * delayed_attempt;
                        warn!(
                            handler,
                            attempt,
                            error = %err,
                            delay_secs = delay.as_secs(),
                            "handler failed, retrying after delay"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_succeeds_on_first_attempt_without_retrying() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::default();

        let result = policy
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>(42)
            })
            .await
            .unwrap();

        assert_eq!(result, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_succeeds_after_immediate_retries() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::default();

        let result = policy
            .run("test", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    anyhow::bail!("transient failure {n}");
                }
                Ok::<_, anyhow::Error>(n)
            })
            .await
            .unwrap();

        assert_eq!(result, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_retries_and_dead_letters() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            immediate_retries: 1,
            delayed_retries: 1,
            delay_base: Duration::from_millis(1),
        };

        let result = policy
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                anyhow::bail!("permanent failure")
            })
            .await;

        assert!(result.is_err());
        // initial attempt + 1 immediate + 1 delayed = 3
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
