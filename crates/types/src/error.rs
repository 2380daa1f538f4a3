//! Input errors raised by collaborators.

use thiserror::Error;

/// Malformed parameters passed to a distribution or collector.
///
/// These are always fatal at the call site: the model handed in a value
/// that can never produce a meaningful result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    /// Lower bound is not below the upper bound.
    #[error("invalid range: lower bound {lo} is not below upper bound {hi}")]
    InvalidRange { lo: f64, hi: f64 },

    /// A parameter that must be strictly positive was not.
    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    /// A parameter that must not be negative was.
    #[error("{name} must not be negative, got {value}")]
    Negative { name: &'static str, value: f64 },

    /// A probability vector contains a negative entry.
    #[error("probability at index {index} is negative: {value}")]
    NegativeProbability { index: usize, value: f64 },

    /// A probability vector does not sum to one.
    #[error("probabilities sum to {sum}, expected 1")]
    ProbabilitiesDoNotSumToOne { sum: f64 },

    /// A collection that must contain at least one element was empty.
    #[error("{name} must not be empty")]
    Empty { name: &'static str },

    /// A parameter was NaN or infinite.
    #[error("{name} must be finite, got {value}")]
    NotFinite { name: &'static str, value: f64 },
}
