//! Numeric validators
//!
//! Small building blocks used by the vital-sign validator.

use crate::error::{ValidationError, ValidationResult};

/// Validate that a value is a finite number
pub fn finite(field: &'static str, value: f64) -> ValidationResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::NotFinite { field })
    }
}

/// Validate that a value lies within `[min, max]`
pub fn between(field: &'static str, value: f64, min: f64, max: f64) -> ValidationResult<()> {
    finite(field, value)?;
    if value < min || value > max {
        Err(ValidationError::out_of_range(field, value, min, max))
    } else {
        Ok(())
    }
}

/// Validate that `lower` is strictly below `upper`
pub fn strictly_below(lower: f64, upper: f64) -> bool {
    lower < upper
}
