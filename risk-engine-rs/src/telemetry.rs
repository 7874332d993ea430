//! Structured logging and metric names
//!
//! Logging goes through `tracing`. Metrics go through the `metrics` facade and
//! are dropped unless the host installs a recorder; neither ever blocks the
//! scoring path.

use std::sync::atomic::{AtomicBool, Ordering};

use metrics::{describe_counter, describe_histogram, Unit};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

use crate::config::{ConfigProvider, ConfigProviderExt};

static LOGGING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Names of every metric the engine emits
pub mod metric_names {
    /// Counter labelled by `source`
    pub const ASSESSMENTS: &str = "risk_engine.assessments_total";
    /// Counter of assessments produced by the fallback scorer
    pub const FALLBACKS: &str = "risk_engine.fallbacks_total";
    /// Counter labelled by dependency `key`
    pub const DEPENDENCY_FAILURES: &str = "risk_engine.dependency_failures_total";
    /// Counter labelled by error `kind`
    pub const DEPENDENCY_ATTEMPT_FAILURES: &str = "risk_engine.dependency_errors_total";
    /// Counter labelled by dependency `key`
    pub const BREAKER_OPENED: &str = "risk_engine.breaker_opened_total";
    /// Histogram labelled by `source`
    pub const ASSESSMENT_LATENCY: &str = "risk_engine.assessment_latency_ms";
}

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("failed to install log subscriber: {0}")]
    Subscriber(String),
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is not set
    pub level: String,
    /// Emit JSON lines instead of human-readable text
    pub json_format: bool,
    pub service_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            service_name: "risk-engine".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Read `log_level`, `log_json` and `service_name` from a provider
    pub fn from_provider(provider: &dyn ConfigProvider) -> Self {
        let defaults = Self::default();
        Self {
            level: provider.get_string_or("log_level", &defaults.level),
            json_format: provider.get_bool_or("log_json", defaults.json_format),
            service_name: provider.get_string_or("service_name", &defaults.service_name),
        }
    }
}

/// Install the global `tracing` subscriber
///
/// Logs go to stderr. Calling this more than once is a no-op.
pub fn init_logging(config: &LoggingConfig) -> Result<(), TelemetryError> {
    if LOGGING_INITIALIZED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},warn", config.level)));

    let json_layer = config.json_format.then(|| {
        fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_target(true)
            .with_writer(std::io::stderr)
    });
    let text_layer = (!config.json_format).then(|| {
        fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
    });

    let subscriber = Registry::default()
        .with(filter)
        .with(json_layer)
        .with(text_layer);

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        LOGGING_INITIALIZED.store(false, Ordering::SeqCst);
        return Err(TelemetryError::Subscriber(e.to_string()));
    }

    tracing::info!(service = %config.service_name, level = %config.level, "logging initialized");
    Ok(())
}

/// Register descriptions for every metric with the installed recorder
pub fn describe_metrics() {
    describe_counter!(metric_names::ASSESSMENTS, "Assessments produced, by scoring path");
    describe_counter!(metric_names::FALLBACKS, "Assessments produced by the fallback scorer");
    describe_counter!(
        metric_names::DEPENDENCY_FAILURES,
        "Failed dependency attempts, by dependency key"
    );
    describe_counter!(
        metric_names::DEPENDENCY_ATTEMPT_FAILURES,
        "Failed dependency attempts, by error kind"
    );
    describe_counter!(metric_names::BREAKER_OPENED, "Circuit breaker open transitions");
    describe_histogram!(
        metric_names::ASSESSMENT_LATENCY,
        Unit::Milliseconds,
        "End-to-end assessment latency"
    );
}
