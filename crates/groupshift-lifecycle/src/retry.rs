//! Fixed-backoff retry of a fallible async step.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use groupshift_core::LifecycleConfig;
use tracing::warn;

/// How often a step is attempted and how long to wait between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Values below 1 behave as 1.
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Never retry.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    /// Retry exactly once after `backoff`.
    pub fn once_after(backoff: Duration) -> Self {
        Self {
            max_attempts: 2,
            backoff,
        }
    }

    pub fn from_config(config: &LifecycleConfig) -> Self {
        Self {
            max_attempts: config.retry.max_attempts,
            backoff: config.retry_backoff(),
        }
    }

    /// Run `step` until it succeeds or attempts are exhausted, returning the
    /// last error. `step` receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut>(&self, what: &str, mut step: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            match step(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts => {
                    warn!(
                        step = what,
                        attempt,
                        backoff_ms = self.backoff.as_millis() as u64,
                        error = %e,
                        "step failed, retrying"
                    );
                    tokio::time::sleep(self.backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn retries_once_then_succeeds() {
        let policy = RetryPolicy::once_after(Duration::from_secs(15));
        let started = tokio::time::Instant::now();
        let result: Result<u32, String> = policy
            .run("probe", |attempt| async move {
                if attempt == 1 { Err("flaky".to_string()) } else { Ok(attempt) }
            })
            .await;

        assert_eq!(result, Ok(2));
        assert_eq!(started.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_attempts_return_last_error() {
        let policy = RetryPolicy {
            max_attempts: 3,
            backoff: Duration::from_secs(1),
        };
        let mut seen = Vec::new();
        let result: Result<(), String> = policy
            .run("probe", |attempt| {
                seen.push(attempt);
                async move { Err(format!("failure {attempt}")) }
            })
            .await;

        assert_eq!(result, Err("failure 3".to_string()));
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn none_never_sleeps() {
        let result: Result<(), &str> = RetryPolicy::none().run("probe", |_| async { Err("no") }).await;
        assert_eq!(result, Err("no"));
    }
}
