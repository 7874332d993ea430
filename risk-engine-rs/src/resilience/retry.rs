//! Backoff schedule between retry attempts
//!
//! Delays grow geometrically: the n-th retry waits `unit * factor^n`, capped
//! at `max`. No jitter is applied so schedules are reproducible.

use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;

/// Sequence of delays to sleep between attempts
#[derive(Debug)]
pub struct BackoffSchedule {
    inner: ExponentialBackoff,
}

impl BackoffSchedule {
    pub fn new(unit: Duration, factor: f64, max: Duration) -> Self {
        let mut inner: ExponentialBackoff = ExponentialBackoff {
            current_interval: unit,
            initial_interval: unit,
            randomization_factor: 0.0,
            multiplier: factor,
            max_interval: max,
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        };
        inner.reset();
        Self { inner }
    }

    /// Delay before the next attempt
    pub fn next_delay(&mut self) -> Duration {
        self.inner
            .next_backoff()
            .unwrap_or(self.inner.max_interval)
    }
}
