//! Dataset operations.
//!
//! Each operation is implemented as a struct that implements the
//! [Operation](crate::operation::Operation) trait.

pub mod snapshot;
pub mod timeseries;

/// Round to 2 decimal places, half to even. NaN becomes `None`.
pub fn round_value(value: f64) -> Option<f64> {
    if value.is_nan() {
        None
    } else {
        Some((value * 100.0).round_ties_even() / 100.0)
    }
}
