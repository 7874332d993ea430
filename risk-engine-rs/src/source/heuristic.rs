//! Local deterministic probability model
//!
//! A small logistic model over the feature vector. Used when no remote model
//! endpoint is configured, and handy as a stand-in for tests and demos.

use std::time::Instant;

use async_trait::async_trait;

use super::{Prediction, ProbabilitySource, SourceError};
use crate::model::{ArrivalMode, FeatureVector};

/// Coefficients of the logistic model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogisticWeights {
    pub intercept: f64,
    /// Per abnormal vital sign
    pub abnormal_vital: f64,
    /// Per acuity level above 1
    pub acuity_step: f64,
    pub ambulance: f64,
}

impl Default for LogisticWeights {
    fn default() -> Self {
        Self {
            intercept: -3.0,
            abnormal_vital: 0.55,
            acuity_step: 0.45,
            ambulance: 0.4,
        }
    }
}

/// Number of vital signs outside their normal band
pub fn abnormal_vitals_count(features: &FeatureVector) -> u32 {
    let checks = [
        features.heart_rate < 50.0 || features.heart_rate > 110.0,
        features.systolic_bp < 90.0 || features.systolic_bp > 160.0,
        features.respiratory_rate < 12.0 || features.respiratory_rate > 20.0,
        features.oxygen_saturation < 95.0,
        features.temperature < 36.0 || features.temperature > 38.0,
    ];
    checks.iter().filter(|abnormal| **abnormal).count() as u32
}

/// Probability source that never leaves the process
#[derive(Debug, Clone, Default)]
pub struct HeuristicProbabilitySource {
    weights: LogisticWeights,
}

impl HeuristicProbabilitySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: LogisticWeights) -> Self {
        Self { weights }
    }

    /// Evaluate the model synchronously
    pub fn probability(&self, features: &FeatureVector) -> f64 {
        let w = &self.weights;
        let acuity_steps = f64::from(features.acuity_level.saturating_sub(1));
        let ambulance = if features.arrival_mode == ArrivalMode::Ambulance { 1.0 } else { 0.0 };

        let z = w.intercept
            + w.abnormal_vital * f64::from(abnormal_vitals_count(features))
            + w.acuity_step * acuity_steps
            + w.ambulance * ambulance;

        1.0 / (1.0 + (-z).exp())
    }
}

#[async_trait]
impl ProbabilitySource for HeuristicProbabilitySource {
    async fn predict(&self, features: &FeatureVector) -> Result<Prediction, SourceError> {
        let started = Instant::now();
        let probability = self.probability(features);
        Ok(Prediction::new(probability, started.elapsed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(acuity_level: u8, arrival_mode: ArrivalMode) -> FeatureVector {
        FeatureVector {
            heart_rate: 72.0,
            systolic_bp: 120.0,
            diastolic_bp: 80.0,
            respiratory_rate: 16.0,
            oxygen_saturation: 98.0,
            temperature: 36.5,
            arrival_mode,
            acuity_level,
        }
    }

    #[test]
    fn test_abnormal_vitals_count() {
        let normal = features(2, ArrivalMode::WalkIn);
        assert_eq!(abnormal_vitals_count(&normal), 0);

        let sick = FeatureVector {
            heart_rate: 130.0,
            systolic_bp: 85.0,
            respiratory_rate: 26.0,
            oxygen_saturation: 86.0,
            ..normal
        };
        assert_eq!(abnormal_vitals_count(&sick), 4);
    }

    #[test]
    fn test_probability_rises_with_severity() {
        let source = HeuristicProbabilitySource::new();
        let calm = source.probability(&features(1, ArrivalMode::WalkIn));
        let urgent = source.probability(&features(5, ArrivalMode::Ambulance));

        assert!(calm > 0.0 && calm < 0.1);
        assert!(urgent > calm);
        assert!(urgent < 1.0);
    }

    #[test]
    fn test_predict_is_deterministic() {
        let source = HeuristicProbabilitySource::new();
        let input = features(3, ArrivalMode::Ambulance);
        let first = tokio_test::block_on(source.predict(&input)).unwrap();
        let second = tokio_test::block_on(source.predict(&input)).unwrap();
        assert_eq!(first.probability, second.probability);
    }
}
