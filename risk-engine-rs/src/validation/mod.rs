//! Input validation for vital signs and patient context
//!
//! Validation runs before any scoring. It fails fast on the first violated
//! field and has no side effects. Once input is accepted, `review` reports
//! readings that are valid but clinically critical.

pub mod numeric;

use std::collections::BTreeMap;

use crate::error::{ValidationError, ValidationResult};
use crate::model::{PatientContext, VitalsSnapshot};

/// Accepted range for one input field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldRange {
    pub field: &'static str,
    pub unit: &'static str,
    pub min: f64,
    pub max: f64,
}

/// Medically acceptable ranges, in the order they are checked
pub const VITAL_RANGES: [FieldRange; 7] = [
    FieldRange { field: "heart_rate", unit: "bpm", min: 30.0, max: 200.0 },
    FieldRange { field: "systolic_bp", unit: "mmHg", min: 50.0, max: 300.0 },
    FieldRange { field: "diastolic_bp", unit: "mmHg", min: 20.0, max: 200.0 },
    FieldRange { field: "respiratory_rate", unit: "breaths/min", min: 5.0, max: 60.0 },
    FieldRange { field: "oxygen_saturation", unit: "%", min: 50.0, max: 100.0 },
    FieldRange { field: "temperature", unit: "°C", min: 30.0, max: 45.0 },
    FieldRange { field: "acuity_level", unit: "level", min: 1.0, max: 5.0 },
];

fn field_values(vitals: &VitalsSnapshot, context: &PatientContext) -> [f64; 7] {
    [
        vitals.heart_rate,
        vitals.systolic_bp,
        vitals.diastolic_bp,
        vitals.respiratory_rate,
        vitals.oxygen_saturation,
        vitals.temperature,
        f64::from(context.acuity_level),
    ]
}

/// Check vitals and context against accepted ranges and cross-field rules
///
/// Returns the first violation. Arrival mode is a closed enum and needs no
/// range check; unknown modes are rejected when parsing.
pub fn validate(vitals: &VitalsSnapshot, context: &PatientContext) -> ValidationResult<()> {
    for (range, value) in VITAL_RANGES.iter().zip(field_values(vitals, context)) {
        numeric::between(range.field, value, range.min, range.max)?;
    }

    if !numeric::strictly_below(vitals.diastolic_bp, vitals.systolic_bp) {
        return Err(ValidationError::BpRelationship {
            systolic: vitals.systolic_bp,
            diastolic: vitals.diastolic_bp,
        });
    }

    Ok(())
}

/// List valid-but-critical readings for an accepted input
pub fn review(vitals: &VitalsSnapshot, context: &PatientContext) -> Vec<String> {
    let mut warnings = Vec::new();

    if vitals.heart_rate > 150.0 || vitals.heart_rate < 50.0 {
        warnings.push(format!("Heart rate {} bpm is in critical range", vitals.heart_rate));
    }
    if vitals.systolic_bp > 180.0 || vitals.systolic_bp < 80.0 {
        warnings.push(format!("Systolic BP {} mmHg is in critical range", vitals.systolic_bp));
    }
    if vitals.diastolic_bp > 120.0 || vitals.diastolic_bp < 50.0 {
        warnings.push(format!("Diastolic BP {} mmHg is in critical range", vitals.diastolic_bp));
    }
    if vitals.respiratory_rate > 30.0 || vitals.respiratory_rate < 10.0 {
        warnings.push(format!(
            "Respiratory rate {} breaths/min is in critical range",
            vitals.respiratory_rate
        ));
    }
    if vitals.oxygen_saturation < 90.0 {
        warnings.push(format!("Oxygen saturation {}% is critically low", vitals.oxygen_saturation));
    }
    if vitals.temperature > 39.0 || vitals.temperature < 35.0 {
        warnings.push(format!("Temperature {}°C is in critical range", vitals.temperature));
    }
    if context.acuity_level >= 4 {
        warnings.push(format!(
            "High acuity level {} indicates critical patient",
            context.acuity_level
        ));
    }

    warnings
}

/// Expected input format for a probability source, keyed by feature name
pub fn feature_schema() -> BTreeMap<&'static str, String> {
    let mut schema: BTreeMap<&'static str, String> = VITAL_RANGES
        .iter()
        .map(|range| {
            let kind = if range.field == "acuity_level" { "int" } else { "float" };
            (
                range.field,
                format!("{} ({}-{} {})", kind, range.min, range.max, range.unit),
            )
        })
        .collect();
    schema.insert("arrival_mode", "string ('Ambulance' or 'Walk-in')".to_string());
    schema
}
