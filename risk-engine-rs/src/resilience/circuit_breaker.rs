//! Per-dependency circuit breakers
//!
//! Breakers are keyed by dependency name and live in one registry that is
//! constructed at startup and shared by reference. An entry in the open map
//! exists only while that breaker is open; absence means closed.
//!
//! Failure counts are consecutive: a success resets them. They are kept when
//! an open breaker is cleared after its cooldown, so a failed half-open call
//! reopens the breaker straight away.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{DependencyError, DependencyResult};
use crate::telemetry::metric_names;

/// Thresholds shared by every breaker in a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerSettings {
    /// Consecutive failures that open a breaker
    pub failure_threshold: u32,
    /// How long a breaker stays open before a call may try again
    pub cooldown: Duration,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenBreaker {
    opened_at: Instant,
    opened_at_utc: DateTime<Utc>,
    failure_count: u32,
}

#[derive(Debug, Default)]
struct BreakerTable {
    failures: HashMap<String, u32>,
    open: HashMap<String, OpenBreaker>,
}

/// Health of one dependency, for operational dashboards
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BreakerHealth {
    Closed,
    Open {
        opened_at: DateTime<Utc>,
        failure_count: u32,
        retry_in: Duration,
    },
}

impl BreakerHealth {
    pub fn is_open(&self) -> bool {
        matches!(self, BreakerHealth::Open { .. })
    }
}

/// One open breaker as reported by `CircuitBreakerRegistry::statistics`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenBreakerStats {
    pub opened_at: DateTime<Utc>,
    pub failure_count: u32,
    pub open_for_secs: f64,
    pub retry_in_secs: f64,
}

/// Snapshot of every tracked dependency
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BreakerStatistics {
    pub failure_counts: BTreeMap<String, u32>,
    pub open_breakers: BTreeMap<String, OpenBreakerStats>,
}

/// Registry of circuit breakers keyed by dependency
pub struct CircuitBreakerRegistry {
    settings: BreakerSettings,
    clock: Arc<dyn Clock>,
    table: Mutex<BreakerTable>,
}

impl std::fmt::Debug for CircuitBreakerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreakerRegistry")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Default for CircuitBreakerRegistry {
    fn default() -> Self {
        Self::new(BreakerSettings::default())
    }
}

impl CircuitBreakerRegistry {
    /// Create a registry timed by the system clock
    pub fn new(settings: BreakerSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    /// Create a registry timed by `clock`
    pub fn with_clock(settings: BreakerSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            settings,
            clock,
            table: Mutex::new(BreakerTable::default()),
        }
    }

    pub fn settings(&self) -> BreakerSettings {
        self.settings
    }

    fn table(&self) -> MutexGuard<'_, BreakerTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admit or reject a call to `key`
    ///
    /// Rejects with `CircuitOpen` while the breaker is inside its cooldown.
    /// Once the cooldown has elapsed the entry is cleared and the call may
    /// proceed.
    pub fn check(&self, key: &str) -> DependencyResult<()> {
        let now = self.clock.now();
        let mut table = self.table();

        let Some(open) = table.open.get(key).copied() else {
            return Ok(());
        };

        let elapsed = now.saturating_duration_since(open.opened_at);
        if elapsed < self.settings.cooldown {
            return Err(DependencyError::CircuitOpen {
                key: key.to_string(),
                retry_in: self.settings.cooldown - elapsed,
            });
        }

        table.open.remove(key);
        info!(
            dependency = key,
            failure_count = open.failure_count,
            "circuit breaker cooldown elapsed, allowing calls"
        );
        Ok(())
    }

    /// Reset the consecutive failure count for `key`
    pub fn record_success(&self, key: &str) {
        self.table().failures.remove(key);
    }

    /// Count a failure against `key`, opening its breaker at the threshold
    ///
    /// Returns true when this failure opened the breaker.
    pub fn record_failure(&self, key: &str) -> bool {
        let now = self.clock.now();
        let mut table = self.table();

        let count = {
            let count = table.failures.entry(key.to_string()).or_insert(0);
            *count = count.saturating_add(1);
            *count
        };

        counter!(metric_names::DEPENDENCY_FAILURES, 1, "key" => key.to_string());

        if let Some(open) = table.open.get_mut(key) {
            open.failure_count = count;
            return false;
        }

        if count < self.settings.failure_threshold {
            return false;
        }

        table.open.insert(
            key.to_string(),
            OpenBreaker {
                opened_at: now,
                opened_at_utc: Utc::now(),
                failure_count: count,
            },
        );
        drop(table);

        counter!(metric_names::BREAKER_OPENED, 1, "key" => key.to_string());
        warn!(
            dependency = key,
            failure_count = count,
            cooldown_secs = self.settings.cooldown.as_secs(),
            "circuit breaker opened"
        );
        true
    }

    /// Current consecutive failure count for `key`
    pub fn failure_count(&self, key: &str) -> u32 {
        self.table().failures.get(key).copied().unwrap_or(0)
    }

    /// Health of `key`
    ///
    /// A breaker whose cooldown has elapsed reports closed even if the next
    /// call has not cleared it yet.
    pub fn health(&self, key: &str) -> BreakerHealth {
        let now = self.clock.now();
        let table = self.table();

        match table.open.get(key) {
            Some(open) => {
                let elapsed = now.saturating_duration_since(open.opened_at);
                if elapsed < self.settings.cooldown {
                    BreakerHealth::Open {
                        opened_at: open.opened_at_utc,
                        failure_count: open.failure_count,
                        retry_in: self.settings.cooldown - elapsed,
                    }
                } else {
                    BreakerHealth::Closed
                }
            }
            None => BreakerHealth::Closed,
        }
    }

    /// Failure counts and open breakers for every tracked key
    pub fn statistics(&self) -> BreakerStatistics {
        let now = self.clock.now();
        let table = self.table();

        let failure_counts = table
            .failures
            .iter()
            .map(|(key, count)| (key.clone(), *count))
            .collect();

        let open_breakers = table
            .open
            .iter()
            .map(|(key, open)| {
                let elapsed = now.saturating_duration_since(open.opened_at);
                let remaining = self.settings.cooldown.saturating_sub(elapsed);
                (
                    key.clone(),
                    OpenBreakerStats {
                        opened_at: open.opened_at_utc,
                        failure_count: open.failure_count,
                        open_for_secs: elapsed.as_secs_f64(),
                        retry_in_secs: remaining.as_secs_f64(),
                    },
                )
            })
            .collect();

        BreakerStatistics {
            failure_counts,
            open_breakers,
        }
    }

    /// Forget all state for `key`
    pub fn reset(&self, key: &str) {
        let mut table = self.table();
        table.failures.remove(key);
        table.open.remove(key);
    }
}
