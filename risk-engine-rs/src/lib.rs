//! # Risk Engine
//!
//! A resilient clinical risk-scoring engine. Given a patient's vital signs
//! and context it produces a risk score, a risk band and a boolean flag by
//! combining a probability model with deterministic clinical escalation
//! rules. When the model is slow, broken or unreachable, a rule-only fallback
//! scorer takes over so that an assessment is always produced.
//!
//! ## Architecture
//!
//! - `validation`: range and cross-field checks, run before any scoring
//! - `source`: the `ProbabilitySource` trait and its HTTP and local models
//! - `resilience`: timeout, retry with backoff, and per-dependency circuit breakers
//! - `scoring`: clinical escalation rules and the fallback scorer
//! - `assessment`: normalises both scoring paths into one `RiskAssessment`
//! - `engine`: the `RiskEngine` entry point tying the above together
//!
//! ## Example
//!
//! ```no_run
//! use risk_engine::{ArrivalMode, PatientContext, RiskEngine, VitalsSnapshot};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = RiskEngine::builder().build()?;
//! let vitals = VitalsSnapshot {
//!     heart_rate: 130.0,
//!     systolic_bp: 85.0,
//!     diastolic_bp: 60.0,
//!     respiratory_rate: 26.0,
//!     oxygen_saturation: 86.0,
//!     temperature: 37.0,
//! };
//! let context = PatientContext { acuity_level: 4, arrival_mode: ArrivalMode::Ambulance };
//!
//! let assessment = engine.assess(&vitals, &context).await?;
//! println!("{} ({})", assessment.risk_score, assessment.final_triage_category);
//! # Ok(())
//! # }
//! ```

pub mod assessment;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod resilience;
pub mod scoring;
pub mod source;
pub mod telemetry;
pub mod validation;

pub use assessment::{AssessmentRecorder, ScoringOutcome};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigProvider, EngineConfig, EnvConfigProvider, MemoryConfigProvider};
pub use engine::{AssessmentPhase, EngineBuilder, ModelHealth, ModelStatus, RiskEngine};
pub use error::{ConfigError, DependencyError, ValidationError};
pub use model::{
    ArrivalMode, AssessmentRequest, AssessmentSource, ClinicalFactor, FeatureVector,
    PatientContext, RiskAssessment, RiskCategory, ScoreComponents, TriageCategory,
    VitalsSnapshot,
};
pub use resilience::{
    BreakerHealth, BreakerSettings, BreakerStatistics, CallPolicy, CircuitBreakerRegistry,
    ResilienceWrapper,
};
pub use source::{
    HeuristicProbabilitySource, HttpProbabilitySource, Prediction, ProbabilitySource, SourceError,
};

#[cfg(test)]
mod tests;
