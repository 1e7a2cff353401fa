//! Driver Vital Sensors
//!
//! Provides the vital-sign sample type and everything that produces samples:
//! - Source-boundary validation of raw readings
//! - Pluggable sample sources (simulated or real)
//! - Periodic sampler task
//! - Last-known location tracking

mod error;
pub mod location;
mod sample;
pub mod sampler;
pub mod simulated;
pub mod source;

pub use error::{SampleError, SourceError};
pub use location::{LocationError, LocationTracker, Position};
pub use sample::Sample;
pub use sampler::{spawn_sampler, SamplerConfig, SourceReading};
pub use simulated::{RandomWalkSource, ScenarioSource, SourceKind};
pub use source::{SampleSource, ScriptedSource};

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
