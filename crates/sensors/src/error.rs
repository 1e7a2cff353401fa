//! Sensor Error Types

use thiserror::Error;

/// Errors raised when a raw reading is turned into a [`Sample`](crate::Sample)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SampleError {
    /// Reading is NaN or infinite
    #[error("{field} reading is not a finite number")]
    NonFinite { field: &'static str },

    /// Heart rate below zero
    #[error("heart rate {0} is negative")]
    NegativeHeartRate(f64),

    /// Speed below zero
    #[error("speed {0} is negative")]
    NegativeSpeed(f64),
}

/// Errors reported by a sample source
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    /// Sensor could not be read this tick
    #[error("sensor unavailable: {0}")]
    Unavailable(String),

    /// Sensor delivered a reading that failed validation
    #[error("invalid reading: {0}")]
    Invalid(#[from] SampleError),
}
