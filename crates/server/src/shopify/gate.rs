//! Shared request gate: concurrency cap, global dispatch spacing, and
//! retry with backoff.
//!
//! The Admin REST API enforces a store-wide request budget, so every
//! outbound call - reads and tag writes alike - passes through one
//! `RequestGate`. The gate queues excess callers instead of rejecting
//! them: a full semaphore or an occupied dispatch slot means waiting, not
//! an error.
//!
//! Retry is an explicit loop with an attempt counter. Only transient
//! failures (see [`AdminApiError::is_transient`]) are retried; delays grow
//! exponentially from a configured base, a `Retry-After` hint from a 429
//! response takes precedence when it is longer, and a small random jitter
//! keeps concurrent retries from re-colliding.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::{Instant, sleep};

use super::AdminApiError;

/// Upper bound on the backoff exponent so delays stay sane even with a
/// generous attempt budget.
const MAX_BACKOFF_EXPONENT: u32 = 6;

/// Maximum jitter added to each retry delay.
const JITTER_MS: u64 = 100;

/// Tunables for the request gate.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum number of requests in flight at once.
    pub max_concurrent: usize,
    /// Minimum spacing between consecutive request dispatches, across all
    /// callers.
    pub min_interval: Duration,
    /// Total attempts per request (first try + retries).
    pub max_attempts: u32,
    /// Backoff delay for the first retry; doubles per attempt.
    pub retry_base_delay: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 2,
            min_interval: Duration::from_millis(500),
            max_attempts: 5,
            retry_base_delay: Duration::from_secs(1),
        }
    }
}

/// The shared outbound request gate.
///
/// Internal state is limited to the semaphore and the dispatch slot
/// clock; both are safe under concurrent access from all fan-out workers.
#[derive(Debug)]
pub struct RequestGate {
    semaphore: Semaphore,
    /// Earliest instant the next request may be dispatched.
    next_slot: Mutex<Option<Instant>>,
    config: RateLimitConfig,
}

impl RequestGate {
    /// Create a gate with the given tunables.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            semaphore: Semaphore::new(config.max_concurrent.max(1)),
            next_slot: Mutex::new(None),
            config,
        }
    }

    /// Run `op` through the gate.
    ///
    /// Each attempt acquires an in-flight permit (FIFO, so queued callers
    /// dispatch in submission order) and claims the next dispatch slot
    /// before invoking `op`. Transient failures are retried until the
    /// attempt budget is exhausted; the final error is returned as-is.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt once retries are exhausted,
    /// or immediately for non-transient failures.
    pub async fn run<T, F, Fut>(&self, request: &str, op: F) -> Result<T, AdminApiError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, AdminApiError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome = {
                let _permit = self
                    .semaphore
                    .acquire()
                    .await
                    .expect("gate semaphore is never closed");
                self.pace().await;
                op().await
            };

            match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(request, attempt, "request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if attempt < self.config.max_attempts && err.is_transient() => {
                    let delay = self.backoff(attempt, &err);
                    tracing::warn!(
                        request,
                        attempt,
                        error = %err,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "transient request failure, backing off"
                    );
                    sleep(delay).await;
                }
                Err(err) => {
                    tracing::error!(request, attempt, error = %err, "request failed");
                    return Err(err);
                }
            }
        }
    }

    /// Claim the next dispatch slot and wait until it arrives.
    async fn pace(&self) {
        let wait = {
            let mut next_slot = self
                .next_slot
                .lock()
                .expect("dispatch slot lock is never poisoned");
            let now = Instant::now();
            let slot = next_slot.map_or(now, |at| at.max(now));
            *next_slot = Some(slot + self.config.min_interval);
            slot.saturating_duration_since(now)
        };
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }

    /// Delay before the retry following `attempt`.
    fn backoff(&self, attempt: u32, err: &AdminApiError) -> Duration {
        let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
        let mut delay = self.config.retry_base_delay.saturating_mul(1 << exponent);
        if let AdminApiError::RateLimited(retry_after) = err {
            delay = delay.max(Duration::from_secs(*retry_after));
        }
        delay + Duration::from_millis(rand::random_range(0..=JITTER_MS))
    }
}
