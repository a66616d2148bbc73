//! Validation helper functions for configuration types.

use crate::core::errors::{HardGatesError, Result};

/// Validate that a usize value is greater than zero.
pub fn validate_positive_usize(value: usize, field: &str) -> Result<()> {
    if value == 0 {
        return Err(HardGatesError::internal(format!(
            "{field} must be greater than 0"
        )));
    }
    Ok(())
}

/// Validate that an i64 value is greater than zero.
pub fn validate_positive_i64(value: i64, field: &str) -> Result<()> {
    if value <= 0 {
        return Err(HardGatesError::internal(format!(
            "{field} must be greater than 0"
        )));
    }
    Ok(())
}

/// Validate that an f64 value is non-negative.
pub fn validate_non_negative(value: f64, field: &str) -> Result<()> {
    if value < 0.0 {
        return Err(HardGatesError::internal(format!(
            "{field} must be non-negative"
        )));
    }
    Ok(())
}

/// Validate that an f64 value is in the unit range [0.0, 1.0].
pub fn validate_unit_range(value: f64, field: &str) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(HardGatesError::internal(format!(
            "{field} must be between 0.0 and 1.0"
        )));
    }
    Ok(())
}
