//! Rule-only fallback scoring
//!
//! Used whenever the probability source cannot be reached. Pure and
//! deterministic: the same input always yields the same score.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{ArrivalMode, PatientContext, RiskCategory, VitalsSnapshot};

use super::rules::MAX_SCORE;

/// Score above which a fallback result is flagged
pub const FLAG_SCORE: f64 = 50.0;

/// Acuity at or above which a fallback result is always flagged
pub const FLAG_ACUITY: u8 = 4;

/// A fallback rule that added to the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackFactor {
    HeartRateOutOfRange,
    SystolicBpOutOfRange,
    TemperatureOutOfRange,
    RespiratoryRateOutOfRange,
    LowOxygenSaturation,
    AmbulanceArrival,
}

impl FallbackFactor {
    pub fn weight(self) -> f64 {
        match self {
            FallbackFactor::LowOxygenSaturation => 20.0,
            _ => 10.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FallbackFactor::HeartRateOutOfRange => "Heart rate outside 60-100 bpm",
            FallbackFactor::SystolicBpOutOfRange => "Systolic BP outside 90-140 mmHg",
            FallbackFactor::TemperatureOutOfRange => "Temperature outside 36.0-38.0 °C",
            FallbackFactor::RespiratoryRateOutOfRange => "Respiratory rate outside 12-20 breaths/min",
            FallbackFactor::LowOxygenSaturation => "Oxygen saturation below 95%",
            FallbackFactor::AmbulanceArrival => "Arrived by ambulance",
        }
    }
}

impl fmt::Display for FallbackFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of the fallback scorer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackScore {
    /// In [0, 100]
    pub score: f64,
    pub flag: bool,
    /// Points contributed by acuity alone
    pub acuity_base: f64,
    /// Vital-sign and arrival rules that fired, in evaluation order
    pub factors: Vec<FallbackFactor>,
}

impl FallbackScore {
    /// Band for this result
    ///
    /// Any score above `FLAG_SCORE` is flagged, so the fallback path only
    /// ever reports HIGH or LOW.
    pub fn category(&self) -> RiskCategory {
        if self.flag {
            RiskCategory::High
        } else {
            RiskCategory::Low
        }
    }
}

/// Points contributed by acuity alone
pub fn acuity_base(acuity_level: u8) -> f64 {
    match acuity_level {
        0 | 1 => 10.0,
        2 => 20.0,
        3 => 40.0,
        4 => 60.0,
        _ => 80.0,
    }
}

fn outside(value: f64, low: f64, high: f64) -> bool {
    value < low || value > high
}

/// Score an input without consulting any model
pub fn fallback_score(vitals: &VitalsSnapshot, context: &PatientContext) -> FallbackScore {
    let mut factors = Vec::new();

    if outside(vitals.heart_rate, 60.0, 100.0) {
        factors.push(FallbackFactor::HeartRateOutOfRange);
    }
    if outside(vitals.systolic_bp, 90.0, 140.0) {
        factors.push(FallbackFactor::SystolicBpOutOfRange);
    }
    if outside(vitals.temperature, 36.0, 38.0) {
        factors.push(FallbackFactor::TemperatureOutOfRange);
    }
    if outside(vitals.respiratory_rate, 12.0, 20.0) {
        factors.push(FallbackFactor::RespiratoryRateOutOfRange);
    }
    if vitals.oxygen_saturation < 95.0 {
        factors.push(FallbackFactor::LowOxygenSaturation);
    }
    if context.arrival_mode == ArrivalMode::Ambulance {
        factors.push(FallbackFactor::AmbulanceArrival);
    }

    let base = acuity_base(context.acuity_level);
    let raw: f64 = base + factors.iter().map(|factor| factor.weight()).sum::<f64>();
    let score = raw.clamp(0.0, MAX_SCORE);

    FallbackScore {
        score,
        flag: score > FLAG_SCORE || context.acuity_level >= FLAG_ACUITY,
        acuity_base: base,
        factors,
    }
}
