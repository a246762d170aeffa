//! Retry execution with exponential backoff and jitter.
//!
//! Wraps a single remote lookup operation: transient failures (throttling,
//! server faults) are retried with growing delays; permanent failures
//! surface immediately. Jitter spreads concurrent retries so clients
//! sharing a throttled tenant do not stampede in lockstep.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::error::{MembershipError, MembershipResult};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, counting the first (default: 3).
    pub max_attempts: u32,
    /// Base delay for exponential backoff (default: 1s).
    pub base_delay: Duration,
    /// Cap on any single backoff delay (default: 5 minutes).
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(300),
        }
    }
}

impl RetryConfig {
    /// Configuration with short delays, for tests.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(50),
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> MembershipResult<()> {
        if self.max_attempts == 0 {
            return Err(MembershipError::Config(
                "max_attempts must be > 0".to_string(),
            ));
        }
        if self.max_delay < self.base_delay {
            return Err(MembershipError::Config(
                "max_delay must be >= base_delay".to_string(),
            ));
        }
        Ok(())
    }
}

/// Executes remote operations with bounded retries.
///
/// Every attempt, success or failure, increments the shared attempt
/// counter exactly once; the orchestrator reads it into the final run
/// statistics.
#[derive(Debug)]
pub struct RetryExecutor {
    config: RetryConfig,
    attempts: AtomicU64,
}

impl RetryExecutor {
    /// Creates an executor with the given configuration.
    pub fn new(config: RetryConfig) -> MembershipResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            attempts: AtomicU64::new(0),
        })
    }

    /// Creates an executor with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            config: RetryConfig::default(),
            attempts: AtomicU64::new(0),
        }
    }

    /// Total attempts made so far, counting retries separately.
    #[must_use]
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Delay before the retry following attempt `attempt` (1-indexed):
    /// `base * 2^(attempt - 1)` plus up to one second of uniform jitter,
    /// capped at `max_delay`.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponential =
            self.config.base_delay.as_secs_f64() * 2_f64.powi(attempt.saturating_sub(1) as i32);
        let jitter = rand::thread_rng().gen_range(0.0..1.0);
        Duration::from_secs_f64((exponential + jitter).min(self.config.max_delay.as_secs_f64()))
    }

    /// Combines the computed backoff with a server-requested wait: a
    /// `Retry-After` hint acts as a floor on the delay, itself still
    /// bounded by `max_delay`.
    fn retry_delay(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        let backoff = self.backoff_delay(attempt);
        match hint {
            Some(wait) => backoff.max(wait.min(self.config.max_delay)),
            None => backoff,
        }
    }

    /// Executes `operation`, retrying transient failures with backoff.
    ///
    /// Non-retryable failures, and the last failure once attempts are
    /// exhausted, are returned to the caller unchanged.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> MembershipResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = MembershipResult<T>>,
    {
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            self.attempts.fetch_add(1, Ordering::Relaxed);

            match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        debug!(attempt, "remote call succeeded after retry");
                    }
                    return Ok(result);
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_attempts => {
                    let delay = self.retry_delay(attempt, e.retry_after_hint());
                    warn!(
                        attempt,
                        max_attempts = self.config.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
