//! Assessment orchestration
//!
//! Each call moves through `Validating → ModelAttempt → Succeeded | Degraded
//! → Recorded`. Only a validation failure ends the call without an
//! assessment; every dependency failure degrades to the fallback scorer.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::assessment::{AssessmentRecorder, ScoringOutcome};
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::{ConfigError, ValidationError};
use crate::model::{ArrivalMode, FeatureVector, PatientContext, RiskAssessment, VitalsSnapshot};
use crate::resilience::{
    BreakerHealth, BreakerStatistics, CallPolicy, CircuitBreakerRegistry, ResilienceWrapper,
};
use crate::scoring::{fallback_score, rules};
use crate::source::{
    HeuristicProbabilitySource, HttpProbabilitySource, Prediction, ProbabilitySource,
};
use crate::validation;

/// Vitals of a stable reference patient, used to probe the model
pub const REFERENCE_VITALS: VitalsSnapshot = VitalsSnapshot {
    heart_rate: 72.0,
    systolic_bp: 120.0,
    diastolic_bp: 80.0,
    respiratory_rate: 16.0,
    oxygen_saturation: 98.0,
    temperature: 36.5,
};

pub const REFERENCE_CONTEXT: PatientContext = PatientContext {
    acuity_level: 2,
    arrival_mode: ArrivalMode::WalkIn,
};

/// Stage of a single assessment call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssessmentPhase {
    Validating,
    ModelAttempt,
    Succeeded,
    Degraded,
    Recorded,
}

impl fmt::Display for AssessmentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssessmentPhase::Validating => "validating",
            AssessmentPhase::ModelAttempt => "model_attempt",
            AssessmentPhase::Succeeded => "succeeded",
            AssessmentPhase::Degraded => "degraded",
            AssessmentPhase::Recorded => "recorded",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    Healthy,
    Unhealthy,
}

/// Result of probing the probability source with a reference patient
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelHealth {
    pub status: ModelStatus,
    pub dependency_key: String,
    pub response_time_ms: u64,
    pub probability: Option<f64>,
    pub error: Option<String>,
    pub breaker: BreakerHealth,
    pub checked_at: DateTime<Utc>,
}

impl ModelHealth {
    pub fn is_healthy(&self) -> bool {
        self.status == ModelStatus::Healthy
    }
}

/// Clinical risk-scoring engine
///
/// Cheap to share behind an `Arc`; the only mutable state is the circuit
/// breaker registry, which is internally synchronised.
pub struct RiskEngine {
    source: Arc<dyn ProbabilitySource>,
    resilience: ResilienceWrapper,
    policy: CallPolicy,
    dependency_key: String,
    recorder: AssessmentRecorder,
}

impl fmt::Debug for RiskEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RiskEngine")
            .field("dependency_key", &self.dependency_key)
            .field("policy", &self.policy)
            .field("recorder", &self.recorder)
            .finish_non_exhaustive()
    }
}

impl RiskEngine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn dependency_key(&self) -> &str {
        &self.dependency_key
    }

    pub fn call_policy(&self) -> &CallPolicy {
        &self.policy
    }

    pub fn breakers(&self) -> &Arc<CircuitBreakerRegistry> {
        self.resilience.breakers()
    }

    /// Score one patient
    ///
    /// Fails only on invalid input. Any problem with the probability source
    /// yields a fallback assessment carrying the cause in `error_message`.
    pub async fn assess(
        &self,
        vitals: &VitalsSnapshot,
        context: &PatientContext,
    ) -> Result<RiskAssessment, ValidationError> {
        self.run(vitals, context, None).await
    }

    /// Score one patient, giving up on the model once `deadline` passes
    pub async fn assess_with_deadline(
        &self,
        vitals: &VitalsSnapshot,
        context: &PatientContext,
        deadline: tokio::time::Instant,
    ) -> Result<RiskAssessment, ValidationError> {
        self.run(vitals, context, Some(deadline)).await
    }

    async fn run(
        &self,
        vitals: &VitalsSnapshot,
        context: &PatientContext,
        deadline: Option<tokio::time::Instant>,
    ) -> Result<RiskAssessment, ValidationError> {
        let started = Instant::now();
        let assessment_id = Uuid::new_v4();
        let span = info_span!(
            "assessment",
            %assessment_id,
            dependency = %self.dependency_key
        );

        async move {
            debug!(phase = %AssessmentPhase::Validating);
            if let Err(e) = validation::validate(vitals, context) {
                info!(field = e.field(), error = %e, "input rejected");
                return Err(e);
            }

            let warnings = validation::review(vitals, context);
            for warning in &warnings {
                warn!(%warning, "critical vital sign");
            }

            debug!(phase = %AssessmentPhase::ModelAttempt);
            let features = FeatureVector::new(vitals, context);
            let result = self
                .resilience
                .call(&self.dependency_key, &self.policy, deadline, || {
                    let source = Arc::clone(&self.source);
                    async move { source.predict(&features).await.and_then(Prediction::checked) }
                })
                .await;

            let outcome = match result {
                Ok(prediction) => {
                    debug!(
                        phase = %AssessmentPhase::Succeeded,
                        probability = prediction.probability
                    );
                    ScoringOutcome::ModelSucceeded {
                        components: rules::score(prediction.probability, vitals, context),
                        model_latency: prediction.latency,
                    }
                }
                Err(cause) => {
                    warn!(
                        phase = %AssessmentPhase::Degraded,
                        kind = %cause.kind(),
                        error = %cause,
                        "model unavailable, using fallback scorer"
                    );
                    ScoringOutcome::ModelDegraded {
                        fallback: fallback_score(vitals, context),
                        cause,
                    }
                }
            };

            let assessment = self.recorder.record(assessment_id, outcome, warnings, started);
            debug!(
                phase = %AssessmentPhase::Recorded,
                risk_score = assessment.risk_score,
                risk_category = %assessment.risk_category,
                source = %assessment.source
            );
            Ok(assessment)
        }
        .instrument(span)
        .await
    }

    /// Breaker health of this engine's dependency
    pub fn health(&self) -> BreakerHealth {
        self.health_of(&self.dependency_key)
    }

    /// Breaker health of any dependency tracked by the shared registry
    pub fn health_of(&self, dependency_key: &str) -> BreakerHealth {
        self.breakers().health(dependency_key)
    }

    pub fn breaker_statistics(&self) -> BreakerStatistics {
        self.breakers().statistics()
    }

    /// Probe the probability source with a reference patient
    ///
    /// Bypasses retries and does not count against the breaker.
    pub async fn check_model_health(&self) -> ModelHealth {
        let features = FeatureVector::new(&REFERENCE_VITALS, &REFERENCE_CONTEXT);
        let started = Instant::now();

        let result = match tokio::time::timeout(self.policy.timeout, self.source.predict(&features)).await {
            Ok(answer) => answer.and_then(Prediction::checked).map_err(|e| e.to_string()),
            Err(_) => Err(format!("no answer within {:?}", self.policy.timeout)),
        };
        let response_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let (status, probability, error) = match result {
            Ok(prediction) => (ModelStatus::Healthy, Some(prediction.probability), None),
            Err(e) => {
                warn!(dependency = %self.dependency_key, error = %e, "model health check failed");
                (ModelStatus::Unhealthy, None, Some(e))
            }
        };

        ModelHealth {
            status,
            dependency_key: self.dependency_key.clone(),
            response_time_ms,
            probability,
            error,
            breaker: self.health(),
            checked_at: Utc::now(),
        }
    }
}

/// Builder for `RiskEngine`
///
/// Without an explicit source, the builder connects to `model_endpoint` when
/// one is configured and falls back to the local heuristic model otherwise.
#[derive(Default)]
pub struct EngineBuilder {
    config: EngineConfig,
    source: Option<Arc<dyn ProbabilitySource>>,
    breakers: Option<Arc<CircuitBreakerRegistry>>,
    clock: Option<Arc<dyn Clock>>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `source` for probabilities
    pub fn source<S: ProbabilitySource + 'static>(mut self, source: S) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    pub fn shared_source(mut self, source: Arc<dyn ProbabilitySource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Share a breaker registry with other engines
    ///
    /// The registry's own settings and clock win over the config's.
    pub fn breakers(mut self, breakers: Arc<CircuitBreakerRegistry>) -> Self {
        self.breakers = Some(breakers);
        self
    }

    /// Time breaker cooldowns with `clock`
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<RiskEngine, ConfigError> {
        let config = self.config;
        config.validate()?;

        let source: Arc<dyn ProbabilitySource> = match (self.source, &config.model_endpoint) {
            (Some(source), _) => source,
            (None, Some(endpoint)) => Arc::new(HttpProbabilitySource::new(endpoint, config.timeout())?),
            (None, None) => Arc::new(HeuristicProbabilitySource::new()),
        };

        let breakers = match self.breakers {
            Some(breakers) => breakers,
            None => {
                let clock: Arc<dyn Clock> = match self.clock {
                    Some(clock) => clock,
                    None => Arc::new(SystemClock),
                };
                Arc::new(CircuitBreakerRegistry::with_clock(config.breaker_settings(), clock))
            }
        };

        info!(
            dependency = %config.dependency_key,
            endpoint = config.model_endpoint.as_deref().unwrap_or("local"),
            max_attempts = config.max_attempts,
            timeout_secs = config.timeout_secs,
            "risk engine configured"
        );

        Ok(RiskEngine {
            source,
            resilience: ResilienceWrapper::new(breakers),
            policy: config.call_policy(),
            dependency_key: config.dependency_key.clone(),
            recorder: AssessmentRecorder::new(config.model_version.clone(), config.latency_warning()),
        })
    }
}
