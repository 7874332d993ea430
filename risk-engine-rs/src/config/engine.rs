use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use super::ConfigProvider;
use crate::error::ConfigError;
use crate::resilience::{BreakerSettings, CallPolicy};

/// Engine settings
///
/// Every field has a default, so a partial TOML file or an environment with
/// only a few overrides is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Name the probability source is tracked under by the circuit breaker
    pub dependency_key: String,
    /// Per-attempt timeout in seconds
    pub timeout_secs: f64,
    pub max_attempts: u32,
    pub backoff_factor: f64,
    /// Length of the first backoff delay
    pub backoff_unit_ms: u64,
    pub max_backoff_secs: u64,
    /// Consecutive failures that open the breaker
    pub failure_threshold: u32,
    pub cooldown_secs: u64,
    /// Assessments slower than this are logged as a performance warning
    pub latency_warning_secs: f64,
    /// Remote model URL; the local heuristic model is used when unset
    pub model_endpoint: Option<String>,
    pub model_version: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dependency_key: "patient_risk_model".to_string(),
            timeout_secs: 5.0,
            max_attempts: 2,
            backoff_factor: 1.5,
            backoff_unit_ms: 1000,
            max_backoff_secs: 60,
            failure_threshold: 5,
            cooldown_secs: 300,
            latency_warning_secs: 5.0,
            model_endpoint: None,
            model_version: "v1.0.0".to_string(),
        }
    }
}

fn override_from<T>(provider: &dyn ConfigProvider, key: &str, field: &mut T) -> Result<(), ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match provider.get_string(key) {
        Ok(raw) => {
            *field = raw
                .trim()
                .parse()
                .map_err(|e| ConfigError::invalid(format!("{} = '{}': {}", key, raw, e)))?;
            Ok(())
        }
        Err(ConfigError::Missing(_)) => Ok(()),
        Err(e) => Err(e),
    }
}

fn seconds(key: &str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value)
        .map_err(|e| ConfigError::invalid(format!("{} = {}: {}", key, value, e)))
}

impl EngineConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Apply overrides from a provider on top of the defaults
    pub fn from_provider(provider: &dyn ConfigProvider) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(provider)?;
        config.validate()?;
        Ok(config)
    }

    /// Replace any field the provider has a value for
    ///
    /// Missing keys keep their current value. Present but unparseable keys
    /// are an error.
    pub fn apply_overrides(&mut self, provider: &dyn ConfigProvider) -> Result<(), ConfigError> {
        override_from(provider, "dependency_key", &mut self.dependency_key)?;
        override_from(provider, "timeout_secs", &mut self.timeout_secs)?;
        override_from(provider, "max_attempts", &mut self.max_attempts)?;
        override_from(provider, "backoff_factor", &mut self.backoff_factor)?;
        override_from(provider, "backoff_unit_ms", &mut self.backoff_unit_ms)?;
        override_from(provider, "max_backoff_secs", &mut self.max_backoff_secs)?;
        override_from(provider, "failure_threshold", &mut self.failure_threshold)?;
        override_from(provider, "cooldown_secs", &mut self.cooldown_secs)?;
        override_from(provider, "latency_warning_secs", &mut self.latency_warning_secs)?;
        override_from(provider, "model_version", &mut self.model_version)?;

        match provider.get_string("model_endpoint") {
            Ok(endpoint) if endpoint.trim().is_empty() => self.model_endpoint = None,
            Ok(endpoint) => self.model_endpoint = Some(endpoint.trim().to_string()),
            Err(ConfigError::Missing(_)) => {}
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dependency_key.trim().is_empty() {
            return Err(ConfigError::invalid("dependency_key must not be empty"));
        }
        if !self.timeout_secs.is_finite() || self.timeout_secs <= 0.0 {
            return Err(ConfigError::invalid(format!(
                "timeout_secs must be positive, got {}",
                self.timeout_secs
            )));
        }
        seconds("timeout_secs", self.timeout_secs)?;
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid("max_attempts must be at least 1"));
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            return Err(ConfigError::invalid(format!(
                "backoff_factor must be at least 1.0, got {}",
                self.backoff_factor
            )));
        }
        if self.failure_threshold == 0 {
            return Err(ConfigError::invalid("failure_threshold must be at least 1"));
        }
        if !self.latency_warning_secs.is_finite() || self.latency_warning_secs < 0.0 {
            return Err(ConfigError::invalid(format!(
                "latency_warning_secs must not be negative, got {}",
                self.latency_warning_secs
            )));
        }
        seconds("latency_warning_secs", self.latency_warning_secs)?;
        if let Some(endpoint) = &self.model_endpoint {
            let url = Url::parse(endpoint)
                .map_err(|e| ConfigError::invalid(format!("model_endpoint '{}': {}", endpoint, e)))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::invalid(format!(
                    "model_endpoint must use http or https, got '{}'",
                    url.scheme()
                )));
            }
        }
        Ok(())
    }

    /// Per-attempt timeout; `validate` guarantees the value is representable
    pub fn timeout(&self) -> Duration {
        seconds("timeout_secs", self.timeout_secs).unwrap_or(Duration::MAX)
    }

    pub fn latency_warning(&self) -> Duration {
        seconds("latency_warning_secs", self.latency_warning_secs).unwrap_or(Duration::MAX)
    }

    /// Timeout and retry settings for model calls
    pub fn call_policy(&self) -> CallPolicy {
        CallPolicy {
            timeout: self.timeout(),
            max_attempts: self.max_attempts,
            backoff_factor: self.backoff_factor,
            backoff_unit: Duration::from_millis(self.backoff_unit_ms),
            max_backoff: Duration::from_secs(self.max_backoff_secs),
        }
    }

    pub fn breaker_settings(&self) -> BreakerSettings {
        BreakerSettings {
            failure_threshold: self.failure_threshold,
            cooldown: Duration::from_secs(self.cooldown_secs),
        }
    }
}
