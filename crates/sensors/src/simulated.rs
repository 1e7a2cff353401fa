//! Simulated vital-sign sources
//!
//! Two simulation styles are available:
//! - Random walk: small bounded drift around a resting heart rate
//! - Scenario: each tick jumps to a low, elevated, or high reading

use crate::error::SourceError;
use crate::sample::Sample;
use crate::source::SampleSource;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Heart rate clamp for the random walk (bpm)
const WALK_MIN_BPM: i32 = 40;
const WALK_MAX_BPM: i32 = 120;

/// Resting heart rate the random walk starts from (bpm)
const WALK_START_BPM: i32 = 75;

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Which simulated source to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Bounded random walk
    RandomWalk,
    /// Random pick among low / elevated / high cases
    #[default]
    Scenario,
}

impl SourceKind {
    /// Build the source, optionally seeded for reproducible runs
    pub fn build(self, seed: Option<u64>) -> Box<dyn SampleSource> {
        info!("Building {:?} sample source (seed: {:?})", self, seed);
        match self {
            SourceKind::RandomWalk => Box::new(RandomWalkSource::new(seed)),
            SourceKind::Scenario => Box::new(ScenarioSource::new(seed)),
        }
    }
}

/// Heart rate drifts by at most 2 bpm per tick, speed by at most 1 mph
pub struct RandomWalkSource {
    rng: StdRng,
    heart_rate: i32,
    speed: i32,
}

impl RandomWalkSource {
    /// Start a walk at 75 bpm, standing still
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: make_rng(seed),
            heart_rate: WALK_START_BPM,
            speed: 0,
        }
    }

    /// Start a walk from a specific reading
    pub fn starting_at(heart_rate: u32, speed: u32, seed: Option<u64>) -> Self {
        Self {
            rng: make_rng(seed),
            heart_rate: (heart_rate as i32).clamp(WALK_MIN_BPM, WALK_MAX_BPM),
            speed: speed as i32,
        }
    }
}

impl SampleSource for RandomWalkSource {
    fn name(&self) -> &str {
        "random-walk"
    }

    fn next_sample(&mut self) -> Result<Sample, SourceError> {
        let hr_change: i32 = self.rng.random_range(-2..=2);
        let speed_change: i32 = self.rng.random_range(-1..=1);

        self.heart_rate = (self.heart_rate + hr_change).clamp(WALK_MIN_BPM, WALK_MAX_BPM);
        self.speed = (self.speed + speed_change).max(0);

        Ok(Sample::new(self.heart_rate as u32, self.speed as f64)?)
    }
}

/// Each tick picks one of three driving situations at random
pub struct ScenarioSource {
    rng: StdRng,
}

impl ScenarioSource {
    /// Create a scenario source
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: make_rng(seed),
        }
    }
}

impl SampleSource for ScenarioSource {
    fn name(&self) -> &str {
        "scenario"
    }

    fn next_sample(&mut self) -> Result<Sample, SourceError> {
        let (heart_rate, speed) = match self.rng.random_range(0..3) {
            // Low heart rate, slow traffic
            0 => (self.rng.random_range(40..60), self.rng.random_range(20..30)),
            // Elevated but mostly normal
            1 => (self.rng.random_range(80..110), self.rng.random_range(40..55)),
            // High heart rate, highway speed
            _ => (self.rng.random_range(110..130), self.rng.random_range(60..80)),
        };

        Ok(Sample::new(heart_rate, speed as f64)?)
    }
}
