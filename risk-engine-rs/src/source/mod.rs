//! Probability sources
//!
//! A probability source turns a `FeatureVector` into a deterioration
//! probability. It is treated as an unreliable dependency: every call goes
//! through the resilience wrapper, and its answer is checked before use.
//!
//! Two implementations ship with the crate:
//! - `HttpProbabilitySource`: a remote model served over HTTP
//! - `HeuristicProbabilitySource`: a local deterministic logistic model

mod heuristic;
mod http;

pub use heuristic::{abnormal_vitals_count, HeuristicProbabilitySource, LogisticWeights};
pub use http::HttpProbabilitySource;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::FeatureVector;

/// Answer from a probability source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Deterioration probability, expected in [0, 1]
    pub probability: f64,
    /// Time the source spent producing the answer
    pub latency: Duration,
}

impl Prediction {
    pub fn new(probability: f64, latency: Duration) -> Self {
        Self { probability, latency }
    }

    /// Reject probabilities that are not finite or fall outside [0, 1]
    pub fn checked(self) -> Result<Self, SourceError> {
        if self.probability.is_finite() && (0.0..=1.0).contains(&self.probability) {
            Ok(self)
        } else {
            Err(SourceError::InvalidResponse(format!(
                "probability {} is outside [0, 1]",
                self.probability
            )))
        }
    }
}

/// Failures a probability source may raise
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// Computes a deterioration probability from a feature vector
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProbabilitySource: Send + Sync {
    async fn predict(&self, features: &FeatureVector) -> Result<Prediction, SourceError>;
}
