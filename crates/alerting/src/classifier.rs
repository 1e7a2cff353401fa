//! Heart-rate classifier

use sensors::Sample;
use serde::{Deserialize, Serialize};

/// Classification of a single sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Normal,
    Low,
    High,
}

impl Status {
    /// Whether this status should raise an alert
    pub fn is_abnormal(self) -> bool {
        self != Status::Normal
    }

    /// Message shown to the driver for this status
    pub fn warning_text(self) -> &'static str {
        match self {
            Status::Normal => "✅ Normal",
            Status::Low => "⚠️ Low Heart Rate! Are you okay?",
            Status::High => "⚠️ High Heart Rate! Slow down and take deep breaths.",
        }
    }
}

/// Heart-rate thresholds (bpm), both bounds inclusive for Normal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Below this is Low (default: 60)
    pub low_bpm: u32,
    /// Above this is High (default: 100)
    pub high_bpm: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            low_bpm: 60,
            high_bpm: 100,
        }
    }
}

/// Classify a sample against the thresholds
pub fn classify(sample: &Sample, thresholds: &Thresholds) -> Status {
    if sample.heart_rate < thresholds.low_bpm {
        Status::Low
    } else if sample.heart_rate > thresholds.high_bpm {
        Status::High
    } else {
        Status::Normal
    }
}
