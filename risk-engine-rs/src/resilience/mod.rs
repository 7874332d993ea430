//! Resilience for calls to unreliable dependencies
//!
//! `ResilienceWrapper::call` composes three guards around any async call:
//! - a per-attempt timeout, optionally tightened by a caller deadline
//! - bounded retries with exponential backoff
//! - a per-dependency circuit breaker shared across calls
//!
//! Failures come back as a typed `DependencyError`; nothing panics or
//! propagates past the wrapper untyped.

mod circuit_breaker;
mod retry;

pub use circuit_breaker::{
    BreakerHealth, BreakerSettings, BreakerStatistics, CircuitBreakerRegistry, OpenBreakerStats,
};
pub use retry::BackoffSchedule;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, warn};

use crate::error::{DependencyError, DependencyResult};
use crate::source::SourceError;
use crate::telemetry::metric_names;

/// Timeout and retry settings for one dependency call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CallPolicy {
    /// Budget for a single attempt
    pub timeout: Duration,
    /// Total attempts, including the first; zero behaves as one
    pub max_attempts: u32,
    /// Growth factor between consecutive backoff delays
    pub backoff_factor: f64,
    /// First backoff delay
    pub backoff_unit: Duration,
    /// Upper bound for any single backoff delay
    pub max_backoff: Duration,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_attempts: 2,
            backoff_factor: 1.5,
            backoff_unit: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl CallPolicy {
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    pub fn backoff_schedule(&self) -> BackoffSchedule {
        BackoffSchedule::new(self.backoff_unit, self.backoff_factor, self.max_backoff)
    }
}

/// Wraps dependency calls with timeout, retry and circuit breaking
#[derive(Debug, Clone)]
pub struct ResilienceWrapper {
    breakers: Arc<CircuitBreakerRegistry>,
}

impl Default for ResilienceWrapper {
    fn default() -> Self {
        Self::new(Arc::new(CircuitBreakerRegistry::default()))
    }
}

impl ResilienceWrapper {
    pub fn new(breakers: Arc<CircuitBreakerRegistry>) -> Self {
        Self { breakers }
    }

    pub fn breakers(&self) -> &Arc<CircuitBreakerRegistry> {
        &self.breakers
    }

    /// Run `operation` against the dependency `key` under `policy`
    ///
    /// Returns `CircuitOpen` without invoking `operation` while the breaker
    /// for `key` is open. Otherwise attempts up to `policy.attempts()` times,
    /// sleeping between attempts, and returns the first success or the last
    /// failure. Every failed attempt counts against the breaker.
    ///
    /// With a `deadline`, each attempt is bounded by the time remaining and
    /// no retry starts once the deadline would be passed. An attempt cut
    /// short by the deadline is a timeout failure.
    pub async fn call<F, Fut, T>(
        &self,
        key: &str,
        policy: &CallPolicy,
        deadline: Option<Instant>,
        mut operation: F,
    ) -> DependencyResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        self.breakers.check(key)?;

        let attempts = policy.attempts();
        let mut schedule = policy.backoff_schedule();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let budget = attempt_budget(policy.timeout, deadline);

            let err = match timeout(budget, operation()).await {
                Ok(Ok(value)) => {
                    self.breakers.record_success(key);
                    if attempt > 1 {
                        debug!(dependency = key, attempt, "dependency call succeeded after retry");
                    }
                    return Ok(value);
                }
                Ok(Err(source_err)) => DependencyError::from_source(key, budget, source_err),
                Err(_) => DependencyError::timeout(key, budget),
            };

            self.breakers.record_failure(key);
            counter!(metric_names::DEPENDENCY_ATTEMPT_FAILURES, 1, "kind" => err.kind().to_string());

            if attempt >= attempts {
                return Err(err);
            }

            let delay = schedule.next_delay();
            if let Some(deadline) = deadline {
                if Instant::now() + delay >= deadline {
                    warn!(
                        dependency = key,
                        attempt,
                        error = %err,
                        "deadline leaves no room for another attempt"
                    );
                    return Err(err);
                }
            }

            warn!(
                dependency = key,
                attempt,
                max_attempts = attempts,
                ?delay,
                error = %err,
                "dependency call failed, retrying"
            );
            sleep(delay).await;
        }
    }
}

fn attempt_budget(timeout: Duration, deadline: Option<Instant>) -> Duration {
    match deadline {
        Some(deadline) => timeout.min(deadline.saturating_duration_since(Instant::now())),
        None => timeout,
    }
}
