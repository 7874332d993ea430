//! Error types for the risk engine
//!
//! Three families of errors exist:
//! - `ValidationError`: caller input is malformed or outside medical range.
//!   This is the only failure a caller of `RiskEngine::assess` ever sees.
//! - `DependencyError`: the probability model misbehaved. These are absorbed
//!   by the engine and recorded on the fallback assessment.
//! - `ConfigError`: the engine could not be configured.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::source::SourceError;

/// Result type for input validation
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// Result type for calls routed through the resilience wrapper
pub type DependencyResult<T> = std::result::Result<T, DependencyError>;

/// Caller input rejected before any scoring was attempted
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A vital sign or context value is outside its accepted range
    #[error("{field} value {value} is outside allowed range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// A vital sign is NaN or infinite
    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },

    /// Diastolic pressure is not below systolic pressure
    #[error("diastolic BP ({diastolic}) must be less than systolic BP ({systolic})")]
    BpRelationship { systolic: f64, diastolic: f64 },

    /// Arrival mode string did not name a known mode
    #[error("arrival mode must be 'Ambulance' or 'Walk-in', got '{0}'")]
    UnknownArrivalMode(String),
}

impl ValidationError {
    /// Create an out-of-range error for a field
    pub fn out_of_range(field: &'static str, value: f64, min: f64, max: f64) -> Self {
        ValidationError::OutOfRange { field, value, min, max }
    }

    /// Name of the violated field
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::OutOfRange { field, .. } => field,
            ValidationError::NotFinite { field } => field,
            ValidationError::BpRelationship { .. } => "bp_relationship",
            ValidationError::UnknownArrivalMode(_) => "arrival_mode",
        }
    }
}

/// Failure of a dependency call, after resilience handling
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DependencyError {
    /// The call did not complete within its time budget
    #[error("dependency '{key}' timed out after {after:?}")]
    Timeout { key: String, after: Duration },

    /// The dependency answered with something unusable
    #[error("invalid response from dependency: {0}")]
    InvalidResponse(String),

    /// The breaker for this dependency is open; the call was not attempted
    #[error("circuit breaker open for '{key}', retry in {retry_in:?}")]
    CircuitOpen { key: String, retry_in: Duration },

    /// Any other dependency failure
    #[error("unexpected dependency error: {0}")]
    Unexpected(String),
}

impl DependencyError {
    /// Create a timeout error
    pub fn timeout(key: impl Into<String>, after: Duration) -> Self {
        DependencyError::Timeout { key: key.into(), after }
    }

    /// Create an invalid response error
    pub fn invalid_response(message: impl Into<String>) -> Self {
        DependencyError::InvalidResponse(message.into())
    }

    /// Create an unexpected error
    pub fn unexpected(message: impl Into<String>) -> Self {
        DependencyError::Unexpected(message.into())
    }

    /// Short machine-readable kind, used as a metric label
    pub fn kind(&self) -> DependencyErrorKind {
        match self {
            DependencyError::Timeout { .. } => DependencyErrorKind::Timeout,
            DependencyError::InvalidResponse(_) => DependencyErrorKind::InvalidResponse,
            DependencyError::CircuitOpen { .. } => DependencyErrorKind::CircuitOpen,
            DependencyError::Unexpected(_) => DependencyErrorKind::Unexpected,
        }
    }

    /// Whether the call was rejected without reaching the dependency
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, DependencyError::CircuitOpen { .. })
    }

    /// Convert a source failure, attaching the dependency key and attempt budget
    pub fn from_source(key: &str, budget: Duration, err: SourceError) -> Self {
        match err {
            SourceError::Timeout(_) => DependencyError::timeout(key, budget),
            SourceError::InvalidResponse(message) => DependencyError::InvalidResponse(message),
            SourceError::Unavailable(message) => DependencyError::Unexpected(message),
        }
    }
}

/// Classification of dependency failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyErrorKind {
    Timeout,
    InvalidResponse,
    CircuitOpen,
    Unexpected,
}

impl fmt::Display for DependencyErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::InvalidResponse => write!(f, "invalid_response"),
            Self::CircuitOpen => write!(f, "circuit_open"),
            Self::Unexpected => write!(f, "unexpected"),
        }
    }
}

/// Errors raised while loading or checking configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration value not set: {0}")]
    Missing(String),

    #[error("invalid configuration value: {0}")]
    Invalid(String),

    #[error("failed to parse configuration: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Create an invalid value error
    pub fn invalid(message: impl Into<String>) -> Self {
        ConfigError::Invalid(message.into())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}
