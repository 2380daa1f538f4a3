//! Simulated time.

use crate::InputError;

/// A point on the simulated time axis.
///
/// Simulated time is a non-negative real number. Durations share the same
/// representation; the kernel rejects negative durations where they make no
/// sense.
pub type SimTime = f64;

/// Reject NaN and infinities.
pub fn check_finite(name: &'static str, value: f64) -> Result<f64, InputError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(InputError::NotFinite { name, value })
    }
}

/// Reject NaN, infinities and negative values.
pub fn check_non_negative(name: &'static str, value: f64) -> Result<f64, InputError> {
    let value = check_finite(name, value)?;
    if value < 0.0 {
        return Err(InputError::Negative { name, value });
    }
    Ok(value)
}
