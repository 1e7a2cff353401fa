//! Sample Source Capability

use crate::error::SourceError;
use crate::sample::Sample;
use std::collections::VecDeque;
use tracing::debug;

/// Anything that can produce vital-sign samples on demand
///
/// The sampler polls a source once per tick. A real sensor feed replaces the
/// simulated sources by implementing this trait.
pub trait SampleSource: Send {
    /// Human-readable source name for logs
    fn name(&self) -> &str;

    /// Produce the next reading
    fn next_sample(&mut self) -> Result<Sample, SourceError>;
}

impl SampleSource for Box<dyn SampleSource> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn next_sample(&mut self) -> Result<Sample, SourceError> {
        (**self).next_sample()
    }
}

/// Replays a fixed sequence of readings
///
/// Once the script is exhausted every call reports the sensor as unavailable.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    script: VecDeque<Result<Sample, SourceError>>,
}

impl ScriptedSource {
    /// Create a source from readings (or errors) in replay order
    pub fn new(script: impl IntoIterator<Item = Result<Sample, SourceError>>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }

    /// Create a source from heart rates at a constant speed
    pub fn from_heart_rates(rates: &[u32], speed: f64) -> Self {
        Self::new(
            rates
                .iter()
                .map(|&hr| Sample::new(hr, speed).map_err(SourceError::from)),
        )
    }

    /// Readings not yet replayed
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl SampleSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    fn next_sample(&mut self) -> Result<Sample, SourceError> {
        match self.script.pop_front() {
            Some(reading) => reading,
            None => {
                debug!("Scripted source exhausted");
                Err(SourceError::Unavailable("script exhausted".to_string()))
            }
        }
    }
}
