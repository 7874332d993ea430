//! Tests for the clinical escalation rules
//!
//! These check the band thresholds, the escalation invariant and the score
//! composition against worked clinical examples.

#[cfg(test)]
mod tests {
    use crate::model::{
        ArrivalMode, ClinicalFactor, PatientContext, RiskCategory, TriageCategory, VitalsSnapshot,
    };
    use crate::scoring::rules::{base_category, clinical_adjustment, escalate, score};

    fn stable_vitals() -> VitalsSnapshot {
        VitalsSnapshot {
            heart_rate: 72.0,
            systolic_bp: 120.0,
            diastolic_bp: 80.0,
            respiratory_rate: 16.0,
            oxygen_saturation: 98.0,
            temperature: 36.5,
        }
    }

    fn context(acuity_level: u8, arrival_mode: ArrivalMode) -> PatientContext {
        PatientContext {
            acuity_level,
            arrival_mode,
        }
    }

    #[test]
    fn test_base_category_is_non_decreasing() {
        let mut previous = RiskCategory::Low;
        for step in 0..=1000 {
            let probability = f64::from(step) / 1000.0;
            let band = base_category(probability);
            assert!(band >= previous, "band dropped at p={}", probability);
            previous = band;
        }
        assert_eq!(previous, RiskCategory::Critical);
    }

    #[test]
    fn test_escalation_never_lowers_severity() {
        for base in RiskCategory::ALL {
            for adjustment in [0.0, 5.0, 19.99, 20.0, 35.0, 39.99, 40.0, 75.0, 200.0] {
                assert!(escalate(base, adjustment) >= base);
            }
        }
    }

    #[test]
    fn test_moderate_base_with_large_adjustment_reaches_critical() {
        let vitals = VitalsSnapshot {
            oxygen_saturation: 86.0,
            systolic_bp: 85.0,
            diastolic_bp: 60.0,
            respiratory_rate: 26.0,
            ..stable_vitals()
        };
        let components = score(0.5, &vitals, &context(1, ArrivalMode::WalkIn));

        assert_eq!(components.base_category, RiskCategory::Moderate);
        assert_eq!(components.clinical_adjustment, 45.0);
        assert_eq!(components.risk_category, RiskCategory::Critical);
        assert_eq!(components.triage_category(), TriageCategory::High);
    }

    #[test]
    fn test_final_score_is_clamped() {
        let vitals = VitalsSnapshot {
            oxygen_saturation: 86.0,
            heart_rate: 130.0,
            ..stable_vitals()
        };
        let components = score(0.9, &vitals, &context(1, ArrivalMode::WalkIn));

        assert!((components.ml_score - 90.0).abs() < 1e-9);
        assert_eq!(components.clinical_adjustment, 30.0);
        assert_eq!(components.final_score, 100.0);
        assert_eq!(components.risk_category, RiskCategory::Critical);
    }

    #[test]
    fn test_factor_order_follows_rule_order() {
        let vitals = VitalsSnapshot {
            heart_rate: 130.0,
            systolic_bp: 85.0,
            diastolic_bp: 60.0,
            respiratory_rate: 26.0,
            oxygen_saturation: 86.0,
            temperature: 37.0,
        };
        let (adjustment, factors) = clinical_adjustment(&vitals, &context(4, ArrivalMode::Ambulance));

        assert_eq!(adjustment, 75.0);
        assert_eq!(
            factors,
            vec![
                ClinicalFactor::CriticalHypoxemia,
                ClinicalFactor::Hypotension,
                ClinicalFactor::Tachypnea,
                ClinicalFactor::Tachycardia,
                ClinicalFactor::CriticalAcuity,
                ClinicalFactor::AmbulanceArrival,
            ]
        );
    }

    #[test]
    fn test_exclusive_tiers() {
        let low_sat = VitalsSnapshot {
            oxygen_saturation: 90.0,
            heart_rate: 35.0,
            ..stable_vitals()
        };
        let (adjustment, factors) = clinical_adjustment(&low_sat, &context(3, ArrivalMode::WalkIn));
        assert_eq!(
            factors,
            vec![
                ClinicalFactor::LowOxygenSaturation,
                ClinicalFactor::Bradycardia,
                ClinicalFactor::HighAcuity,
            ]
        );
        assert_eq!(adjustment, 30.0);

        let (adjustment, factors) = clinical_adjustment(&stable_vitals(), &context(1, ArrivalMode::WalkIn));
        assert!(factors.is_empty());
        assert_eq!(adjustment, 0.0);
    }

    #[test]
    fn test_stable_patient_stays_low() {
        let components = score(0.1, &stable_vitals(), &context(2, ArrivalMode::WalkIn));
        assert_eq!(components.clinical_adjustment, 5.0);
        assert_eq!(components.risk_category, RiskCategory::Low);
        assert_eq!(components.triage_category(), TriageCategory::Low);
        assert_eq!(components.ml_probability, Some(0.1));
    }
}
