//! Assessment assembly
//!
//! `AssessmentRecorder` is the single place where the model path and the
//! fallback path are normalised into one `RiskAssessment`. It cannot fail.
//! It also reports latency, but never acts on it.

use std::time::{Duration, Instant};

use chrono::Utc;
use metrics::{counter, histogram};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::DependencyError;
use crate::model::{AssessmentSource, RiskAssessment, ScoreComponents, TriageCategory};
use crate::scoring::FallbackScore;
use crate::telemetry::metric_names;

/// How the scoring stage ended
#[derive(Debug, Clone, PartialEq)]
pub enum ScoringOutcome {
    /// The model answered and the clinical rules were applied
    ModelSucceeded {
        components: ScoreComponents,
        model_latency: Duration,
    },
    /// The model path was abandoned and the fallback scorer was used
    ModelDegraded {
        fallback: FallbackScore,
        cause: DependencyError,
    },
}

impl ScoringOutcome {
    pub fn source(&self) -> AssessmentSource {
        match self {
            ScoringOutcome::ModelSucceeded { .. } => AssessmentSource::ModelBased,
            ScoringOutcome::ModelDegraded { .. } => AssessmentSource::Fallback,
        }
    }
}

/// Builds `RiskAssessment` values and reports their latency
#[derive(Debug, Clone)]
pub struct AssessmentRecorder {
    model_version: String,
    latency_warning: Duration,
}

impl AssessmentRecorder {
    pub fn new(model_version: impl Into<String>, latency_warning: Duration) -> Self {
        Self {
            model_version: model_version.into(),
            latency_warning,
        }
    }

    pub fn latency_warning(&self) -> Duration {
        self.latency_warning
    }

    /// Assemble the final assessment
    ///
    /// `started` marks the beginning of the whole assessment call, not just
    /// the scoring stage.
    pub fn record(
        &self,
        assessment_id: Uuid,
        outcome: ScoringOutcome,
        warnings: Vec<String>,
        started: Instant,
    ) -> RiskAssessment {
        let source = outcome.source();
        let assessed_at = Utc::now();
        let elapsed = started.elapsed();
        let processing_time_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

        let assessment = match outcome {
            ScoringOutcome::ModelSucceeded {
                components,
                model_latency,
            } => {
                debug!(%assessment_id, ?model_latency, "model path completed");
                let final_triage_category = components.triage_category();
                RiskAssessment {
                    assessment_id,
                    assessed_at,
                    risk_score: components.final_score,
                    risk_category: components.risk_category,
                    final_triage_category,
                    risk_flag: final_triage_category == TriageCategory::High,
                    ml_probability: components.ml_probability,
                    ml_score: Some(components.ml_score),
                    clinical_adjustment: Some(components.clinical_adjustment),
                    source,
                    error_message: None,
                    contributing_factors: components
                        .contributing_factors
                        .iter()
                        .map(|factor| factor.label().to_string())
                        .collect(),
                    warnings,
                    model_version: Some(self.model_version.clone()),
                    processing_time_ms,
                }
            }
            ScoringOutcome::ModelDegraded { fallback, cause } => {
                counter!(metric_names::FALLBACKS, 1);
                let risk_category = fallback.category();
                RiskAssessment {
                    assessment_id,
                    assessed_at,
                    risk_score: fallback.score,
                    risk_category,
                    final_triage_category: risk_category.collapse(),
                    risk_flag: fallback.flag,
                    ml_probability: None,
                    ml_score: None,
                    clinical_adjustment: None,
                    source,
                    error_message: Some(cause.to_string()),
                    contributing_factors: fallback
                        .factors
                        .iter()
                        .map(|factor| factor.label().to_string())
                        .collect(),
                    warnings,
                    model_version: None,
                    processing_time_ms,
                }
            }
        };

        counter!(metric_names::ASSESSMENTS, 1, "source" => source.as_str());
        histogram!(
            metric_names::ASSESSMENT_LATENCY,
            elapsed.as_secs_f64() * 1000.0,
            "source" => source.as_str()
        );

        if elapsed > self.latency_warning {
            warn!(
                %assessment_id,
                processing_time_ms,
                threshold_ms = self.latency_warning.as_millis() as u64,
                "assessment exceeded latency threshold"
            );
        }

        assessment
    }
}
