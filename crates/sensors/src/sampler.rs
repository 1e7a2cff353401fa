//! Periodic Sampler
//!
//! Polls a [`SampleSource`] on a fixed interval and forwards every reading
//! downstream over an mpsc channel.

use crate::error::SourceError;
use crate::sample::Sample;
use crate::simulated::SourceKind;
use crate::source::SampleSource;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Sampler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Time between readings (milliseconds)
    pub interval_ms: u64,
    /// Simulated source to run when no real sensor is attached
    pub source: SourceKind,
    /// RNG seed for reproducible simulation
    pub seed: Option<u64>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 5000,
            source: SourceKind::default(),
            seed: None,
        }
    }
}

impl SamplerConfig {
    /// Sampling interval as a duration
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

/// What the sampler forwards each tick
#[derive(Debug, Clone, PartialEq)]
pub enum SourceReading {
    /// A validated sample
    Sample(Sample),
    /// The source could not deliver; carries a user-visible notice
    Unavailable(String),
}

impl From<Result<Sample, SourceError>> for SourceReading {
    fn from(result: Result<Sample, SourceError>) -> Self {
        match result {
            Ok(sample) => SourceReading::Sample(sample),
            Err(e) => SourceReading::Unavailable(format!("Heart rate sensor unavailable ({e})")),
        }
    }
}

/// Spawn a task that polls `source` every `interval` and sends readings to `tx`
///
/// The task ends when the receiving side is dropped.
pub fn spawn_sampler<S, E>(mut source: S, interval: Duration, tx: mpsc::Sender<E>) -> JoinHandle<()>
where
    S: SampleSource + 'static,
    E: From<SourceReading> + Send + 'static,
{
    tokio::spawn(async move {
        info!(
            "Starting {} sampler every {}ms",
            source.name(),
            interval.as_millis()
        );

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let result = source.next_sample();
            match &result {
                Ok(sample) => debug!(
                    "Sample: {} bpm, {} mph",
                    sample.heart_rate, sample.speed
                ),
                Err(e) => warn!("{} source failed: {}", source.name(), e),
            }

            if tx.send(E::from(SourceReading::from(result))).await.is_err() {
                break;
            }
        }

        info!("{} sampler stopped", source.name());
    })
}
