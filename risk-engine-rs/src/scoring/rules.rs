//! Clinical escalation rules
//!
//! Turns a model probability into a risk band, then raises the band using
//! additive rule weights derived from the same vitals and context. Rules can
//! only raise severity, never lower it.

use crate::model::{
    ArrivalMode, ClinicalFactor, PatientContext, RiskCategory, ScoreComponents, TriageCategory,
    VitalsSnapshot,
};

/// Lower probability bounds of the MODERATE, HIGH and CRITICAL bands
pub const BAND_THRESHOLDS: [f64; 3] = [0.45, 0.65, 0.85];

/// Adjustment needed to raise the band by one level
pub const ONE_LEVEL_ADJUSTMENT: f64 = 20.0;

/// Adjustment needed to raise the band by two levels
pub const TWO_LEVEL_ADJUSTMENT: f64 = 40.0;

/// Maximum reported score
pub const MAX_SCORE: f64 = 100.0;

/// Band implied by the probability alone
///
/// Non-decreasing in `probability`.
pub fn base_category(probability: f64) -> RiskCategory {
    let index = BAND_THRESHOLDS
        .iter()
        .take_while(|threshold| probability >= **threshold)
        .count();
    RiskCategory::from_index(index)
}

/// Evaluate the clinical rules in their fixed order
///
/// Returns the summed weight and the rules that fired, in evaluation order.
pub fn clinical_adjustment(
    vitals: &VitalsSnapshot,
    context: &PatientContext,
) -> (f64, Vec<ClinicalFactor>) {
    let mut factors = Vec::new();

    if vitals.oxygen_saturation < 88.0 {
        factors.push(ClinicalFactor::CriticalHypoxemia);
    } else if vitals.oxygen_saturation < 92.0 {
        factors.push(ClinicalFactor::LowOxygenSaturation);
    }

    if vitals.systolic_bp < 90.0 {
        factors.push(ClinicalFactor::Hypotension);
    }

    if vitals.respiratory_rate > 24.0 {
        factors.push(ClinicalFactor::Tachypnea);
    }

    if vitals.heart_rate > 120.0 {
        factors.push(ClinicalFactor::Tachycardia);
    } else if vitals.heart_rate < 40.0 {
        factors.push(ClinicalFactor::Bradycardia);
    }

    match context.acuity_level {
        level if level >= 4 => factors.push(ClinicalFactor::CriticalAcuity),
        3 => factors.push(ClinicalFactor::HighAcuity),
        2 => factors.push(ClinicalFactor::ModerateAcuity),
        _ => {}
    }

    if context.arrival_mode == ArrivalMode::Ambulance {
        factors.push(ClinicalFactor::AmbulanceArrival);
    }

    let adjustment = factors.iter().map(|factor| factor.weight()).sum();
    (adjustment, factors)
}

/// Raise `base` by the number of levels `adjustment` earns
pub fn escalate(base: RiskCategory, adjustment: f64) -> RiskCategory {
    let levels = if adjustment >= TWO_LEVEL_ADJUSTMENT {
        2
    } else if adjustment >= ONE_LEVEL_ADJUSTMENT {
        1
    } else {
        0
    };
    base.escalate_by(levels)
}

/// Collapse an internal band to the external three-level category
pub fn collapse(category: RiskCategory) -> TriageCategory {
    category.collapse()
}

/// Combine a model probability with the clinical rules
///
/// `probability` must already be checked to lie in [0, 1].
pub fn score(probability: f64, vitals: &VitalsSnapshot, context: &PatientContext) -> ScoreComponents {
    let ml_score = probability * 100.0;
    let (adjustment, contributing_factors) = clinical_adjustment(vitals, context);
    let base = base_category(probability);

    ScoreComponents {
        ml_probability: Some(probability),
        ml_score,
        clinical_adjustment: adjustment,
        contributing_factors,
        base_category: base,
        risk_category: escalate(base, adjustment),
        final_score: (ml_score + adjustment).clamp(0.0, MAX_SCORE),
    }
}
