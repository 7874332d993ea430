//! Configuration management
//!
//! Values come from one of three places: built-in defaults, a TOML file, or
//! key/value providers such as the process environment. `EngineConfig` is the
//! typed result; providers are the raw lookup layer underneath it.

mod engine;

pub use engine::EngineConfig;

use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::error::ConfigError;

/// Prefix for every environment variable the engine reads
pub const ENV_PREFIX: &str = "RISK_ENGINE";

/// Base trait for configuration providers
pub trait ConfigProvider: Send + Sync {
    /// Get a raw string value
    fn get_string(&self, key: &str) -> Result<String, ConfigError>;
}

/// Lookups with defaults on top of `ConfigProvider`
///
/// Numeric engine settings are parsed by `EngineConfig::apply_overrides`.
pub trait ConfigProviderExt: ConfigProvider {
    fn get_bool(&self, key: &str) -> Result<bool, ConfigError> {
        let value = self.get_string(key)?;
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Ok(true),
            "false" | "no" | "0" | "off" => Ok(false),
            _ => Err(ConfigError::invalid(format!(
                "invalid boolean for key {}: {}",
                key, value
            ))),
        }
    }

    fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or_else(|_| default.to_string())
    }

    fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }
}

impl<T: ConfigProvider + ?Sized> ConfigProviderExt for T {}

/// Reads configuration from environment variables
///
/// Keys are upper-cased and prefixed: with prefix `RISK_ENGINE`, the key
/// `timeout_secs` is read from `RISK_ENGINE_TIMEOUT_SECS`.
#[derive(Debug, Clone, Default)]
pub struct EnvConfigProvider {
    prefix: Option<String>,
}

impl EnvConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Environment variable name for `key`
    pub fn format_key(&self, key: &str) -> String {
        let key = key
            .to_uppercase()
            .replace(|c: char| !c.is_ascii_alphanumeric(), "_");
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, key),
            None => key,
        }
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn get_string(&self, key: &str) -> Result<String, ConfigError> {
        let env_key = self.format_key(key);
        env::var(&env_key).map_err(|e| match e {
            env::VarError::NotPresent => ConfigError::Missing(env_key),
            env::VarError::NotUnicode(_) => {
                ConfigError::invalid(format!("environment variable is not valid unicode: {}", env_key))
            }
        })
    }
}

/// In-memory provider for tests and static configuration
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigProvider {
    values: HashMap<String, String>,
}

impl MemoryConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: ToString,
    {
        self.values.insert(key.into(), value.to_string());
    }
}

impl ConfigProvider for MemoryConfigProvider {
    fn get_string(&self, key: &str) -> Result<String, ConfigError> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| ConfigError::Missing(key.to_string()))
    }
}

/// Process-wide environment provider using `ENV_PREFIX`
pub static DEFAULT_PROVIDER: Lazy<Arc<EnvConfigProvider>> =
    Lazy::new(|| Arc::new(EnvConfigProvider::new().with_prefix(ENV_PREFIX)));
