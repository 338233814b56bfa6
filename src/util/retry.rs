//! Retry with exponential backoff and jitter.

use std::future::Future;
use std::time::Duration;

use crate::error::SpectraError;

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
    /// Randomize each sleep to 75%–125% of the nominal backoff.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Policy for creating the agent session after a browser session starts:
    /// five attempts, 2 s apart and doubling.
    pub fn agent_session() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(16),
            multiplier: 2.0,
            jitter: false,
        }
    }

    /// Execute an async operation, retrying errors for which `should_retry` holds.
    ///
    /// Pass [`SpectraError::is_retryable`] to retry only transient failures.
    pub async fn execute_when<F, Fut, T, P>(
        &self,
        mut operation: F,
        should_retry: P,
    ) -> Result<T, SpectraError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SpectraError>>,
        P: Fn(&SpectraError) -> bool,
    {
        let mut backoff = self.initial_backoff;
        let mut last_error = None;

        for attempt in 0..self.max_attempts {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if !should_retry(&e) || attempt + 1 >= self.max_attempts {
                        return Err(e);
                    }

                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Retrying after error"
                    );

                    let sleep_duration = if self.jitter {
                        let jitter_factor = 0.75 + (rand_factor() * 0.5);
                        Duration::from_secs_f64(backoff.as_secs_f64() * jitter_factor)
                    } else {
                        backoff
                    };
                    tokio::time::sleep(sleep_duration).await;

                    let next = backoff.as_secs_f64() * self.multiplier;
                    backoff = Duration::from_secs_f64(next.min(self.max_backoff.as_secs_f64()));

                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| SpectraError::Timeout(0)))
    }
}

/// Simple pseudo-random factor [0, 1) without pulling in rand crate.
fn rand_factor() -> f64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
        .hash(&mut hasher);
    std::thread::current().id().hash(&mut hasher);

    let hash = hasher.finish();
    (hash % 10000) as f64 / 10000.0
}
