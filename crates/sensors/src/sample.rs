//! Vital-sign sample

use crate::error::SampleError;
use serde::{Deserialize, Serialize};

/// One heart-rate and speed reading at a point in time
///
/// Samples are validated when they are built, so every `Sample` that reaches
/// the controller carries a finite, non-negative speed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Heart rate (bpm)
    pub heart_rate: u32,
    /// Vehicle speed (mph)
    pub speed: f64,
    /// Capture time (ms since Unix epoch)
    pub timestamp_ms: u64,
}

impl Sample {
    /// Build a sample stamped with the current time
    pub fn new(heart_rate: u32, speed: f64) -> Result<Self, SampleError> {
        Self::at(heart_rate, speed, crate::now_ms())
    }

    /// Build a sample with an explicit timestamp
    pub fn at(heart_rate: u32, speed: f64, timestamp_ms: u64) -> Result<Self, SampleError> {
        if !speed.is_finite() {
            return Err(SampleError::NonFinite { field: "speed" });
        }
        if speed < 0.0 {
            return Err(SampleError::NegativeSpeed(speed));
        }

        Ok(Self {
            heart_rate,
            speed,
            timestamp_ms,
        })
    }

    /// Build a sample from raw floating-point sensor values
    ///
    /// Heart rate is rounded to the nearest whole bpm.
    pub fn from_raw(heart_rate: f64, speed: f64) -> Result<Self, SampleError> {
        if !heart_rate.is_finite() {
            return Err(SampleError::NonFinite { field: "heart_rate" });
        }
        if heart_rate < 0.0 {
            return Err(SampleError::NegativeHeartRate(heart_rate));
        }

        Self::new(heart_rate.round() as u32, speed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_sample() {
        let sample = Sample::new(72, 30.0).unwrap();
        assert_eq!(sample.heart_rate, 72);
        assert_eq!(sample.speed, 30.0);
        assert!(sample.timestamp_ms > 0);
    }

    #[test]
    fn test_rejects_bad_speed() {
        assert_eq!(
            Sample::new(72, f64::NAN),
            Err(SampleError::NonFinite { field: "speed" })
        );
        assert_eq!(Sample::new(72, -1.0), Err(SampleError::NegativeSpeed(-1.0)));
        assert!(Sample::new(72, f64::INFINITY).is_err());
    }

    #[test]
    fn test_from_raw() {
        let sample = Sample::from_raw(59.6, 0.0).unwrap();
        assert_eq!(sample.heart_rate, 60);

        assert!(Sample::from_raw(f64::NAN, 10.0).is_err());
        assert_eq!(
            Sample::from_raw(-5.0, 10.0),
            Err(SampleError::NegativeHeartRate(-5.0))
        );
    }
}
