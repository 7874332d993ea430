//! Data model shared by every stage of an assessment
//!
//! Inputs (`VitalsSnapshot`, `PatientContext`) are created by the caller and
//! only read here. Outputs (`RiskAssessment`) are created once per call and
//! handed back to the caller for persistence.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Vital signs captured for one patient at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VitalsSnapshot {
    /// Beats per minute
    pub heart_rate: f64,
    /// mmHg
    pub systolic_bp: f64,
    /// mmHg
    pub diastolic_bp: f64,
    /// Breaths per minute
    pub respiratory_rate: f64,
    /// SpO2 percentage
    pub oxygen_saturation: f64,
    /// Degrees Celsius
    pub temperature: f64,
}

/// How the patient arrived at the department
///
/// Deserialised through `FromStr`, so an unknown mode surfaces as
/// `ValidationError::UnknownArrivalMode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum ArrivalMode {
    #[serde(rename = "Ambulance")]
    Ambulance,
    #[serde(rename = "Walk-in")]
    WalkIn,
}

impl ArrivalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArrivalMode::Ambulance => "Ambulance",
            ArrivalMode::WalkIn => "Walk-in",
        }
    }
}

impl fmt::Display for ArrivalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArrivalMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Ambulance" => Ok(ArrivalMode::Ambulance),
            "Walk-in" | "WalkIn" => Ok(ArrivalMode::WalkIn),
            other => Err(ValidationError::UnknownArrivalMode(other.to_string())),
        }
    }
}

impl TryFrom<String> for ArrivalMode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Per-call patient context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientContext {
    /// Clinical severity rating, 1 (least) to 5 (most)
    pub acuity_level: u8,
    pub arrival_mode: ArrivalMode,
}

/// Internal four-level risk band
///
/// Ordered: `Low < Moderate < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskCategory {
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskCategory {
    /// All bands in ascending order of severity
    pub const ALL: [RiskCategory; 4] = [
        RiskCategory::Low,
        RiskCategory::Moderate,
        RiskCategory::High,
        RiskCategory::Critical,
    ];

    /// Position in the severity order
    pub fn index(self) -> usize {
        self as usize
    }

    /// Band at `index`, clamped to `Critical`
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index.min(Self::ALL.len() - 1)]
    }

    /// Raise severity by `levels`, never past `Critical` and never downward
    pub fn escalate_by(self, levels: usize) -> Self {
        Self::from_index(self.index().saturating_add(levels))
    }

    /// Collapse to the externally reported three-level category
    pub fn collapse(self) -> TriageCategory {
        match self {
            RiskCategory::Low => TriageCategory::Low,
            RiskCategory::Moderate => TriageCategory::Moderate,
            RiskCategory::High | RiskCategory::Critical => TriageCategory::High,
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskCategory::Low => write!(f, "LOW"),
            RiskCategory::Moderate => write!(f, "MODERATE"),
            RiskCategory::High => write!(f, "HIGH"),
            RiskCategory::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// External three-level triage category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TriageCategory {
    Low,
    Moderate,
    High,
}

impl fmt::Display for TriageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriageCategory::Low => write!(f, "LOW"),
            TriageCategory::Moderate => write!(f, "MODERATE"),
            TriageCategory::High => write!(f, "HIGH"),
        }
    }
}

/// A clinical escalation rule that fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClinicalFactor {
    CriticalHypoxemia,
    LowOxygenSaturation,
    Hypotension,
    Tachypnea,
    Tachycardia,
    Bradycardia,
    CriticalAcuity,
    HighAcuity,
    ModerateAcuity,
    AmbulanceArrival,
}

impl ClinicalFactor {
    /// Points this rule adds to the clinical adjustment
    pub fn weight(self) -> f64 {
        match self {
            ClinicalFactor::CriticalHypoxemia => 20.0,
            ClinicalFactor::LowOxygenSaturation => 10.0,
            ClinicalFactor::Hypotension => 15.0,
            ClinicalFactor::Tachypnea => 10.0,
            ClinicalFactor::Tachycardia => 10.0,
            ClinicalFactor::Bradycardia => 10.0,
            ClinicalFactor::CriticalAcuity => 15.0,
            ClinicalFactor::HighAcuity => 10.0,
            ClinicalFactor::ModerateAcuity => 5.0,
            ClinicalFactor::AmbulanceArrival => 5.0,
        }
    }

    /// Human-readable rule name
    pub fn label(self) -> &'static str {
        match self {
            ClinicalFactor::CriticalHypoxemia => "Critical hypoxemia (SpO2 < 88%)",
            ClinicalFactor::LowOxygenSaturation => "Low oxygen saturation (SpO2 < 92%)",
            ClinicalFactor::Hypotension => "Hypotension (SBP < 90)",
            ClinicalFactor::Tachypnea => "Tachypnea (RR > 24)",
            ClinicalFactor::Tachycardia => "Tachycardia (HR > 120)",
            ClinicalFactor::Bradycardia => "Bradycardia (HR < 40)",
            ClinicalFactor::CriticalAcuity => "Critical acuity (level 4+)",
            ClinicalFactor::HighAcuity => "High acuity (level 3)",
            ClinicalFactor::ModerateAcuity => "Moderate acuity (level 2)",
            ClinicalFactor::AmbulanceArrival => "Arrived by ambulance",
        }
    }
}

impl fmt::Display for ClinicalFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Breakdown of a model-path score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponents {
    /// Model probability in [0, 1]; absent when no model was consulted
    pub ml_probability: Option<f64>,
    /// `ml_probability * 100`
    pub ml_score: f64,
    /// Sum of the weights of every rule that fired
    pub clinical_adjustment: f64,
    /// Rules that fired, in evaluation order
    pub contributing_factors: Vec<ClinicalFactor>,
    /// Band implied by the probability alone
    pub base_category: RiskCategory,
    /// Band after clinical escalation
    pub risk_category: RiskCategory,
    /// `min(ml_score + clinical_adjustment, 100)`
    pub final_score: f64,
}

impl ScoreComponents {
    pub fn triage_category(&self) -> TriageCategory {
        self.risk_category.collapse()
    }
}

/// Exactly the inputs a probability source receives
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub heart_rate: f64,
    pub systolic_bp: f64,
    pub diastolic_bp: f64,
    pub respiratory_rate: f64,
    pub oxygen_saturation: f64,
    pub temperature: f64,
    pub arrival_mode: ArrivalMode,
    pub acuity_level: u8,
}

impl FeatureVector {
    pub fn new(vitals: &VitalsSnapshot, context: &PatientContext) -> Self {
        Self {
            heart_rate: vitals.heart_rate,
            systolic_bp: vitals.systolic_bp,
            diastolic_bp: vitals.diastolic_bp,
            respiratory_rate: vitals.respiratory_rate,
            oxygen_saturation: vitals.oxygen_saturation,
            temperature: vitals.temperature,
            arrival_mode: context.arrival_mode,
            acuity_level: context.acuity_level,
        }
    }
}

/// Which scoring path produced an assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentSource {
    ModelBased,
    Fallback,
}

impl AssessmentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssessmentSource::ModelBased => "model_based",
            AssessmentSource::Fallback => "fallback",
        }
    }
}

impl fmt::Display for AssessmentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final output of one scoring call
///
/// Never mutated after creation; the caller owns persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub assessment_id: Uuid,
    pub assessed_at: DateTime<Utc>,
    /// Clamped to [0, 100]
    pub risk_score: f64,
    /// Internal four-level band
    pub risk_category: RiskCategory,
    /// External three-level band
    pub final_triage_category: TriageCategory,
    pub risk_flag: bool,
    pub ml_probability: Option<f64>,
    pub ml_score: Option<f64>,
    pub clinical_adjustment: Option<f64>,
    pub source: AssessmentSource,
    /// Why the model path was abandoned; set only on fallback
    pub error_message: Option<String>,
    pub contributing_factors: Vec<String>,
    /// Critical-but-valid readings noticed during validation
    #[serde(default)]
    pub warnings: Vec<String>,
    pub model_version: Option<String>,
    pub processing_time_ms: u64,
}

impl RiskAssessment {
    /// True when produced by the rule-only fallback
    pub fn is_degraded(&self) -> bool {
        self.source == AssessmentSource::Fallback
    }
}

/// Request envelope accepted by the `risk-assess` binary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentRequest {
    pub vitals: VitalsSnapshot,
    pub context: PatientContext,
}
