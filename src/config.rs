//! Rack configuration
//!
//! A single immutable [`Config`] is handed to the [`Rack`](crate::rack::Rack)
//! when it is built. Every node that needs the sample clock reads it from
//! there, so several racks at different rates can coexist in one process.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default audio sample rate in Hz
pub const DEFAULT_SAMPLE_RATE: f64 = 44100.0;

/// Default buffer size of every stream, in values
pub const DEFAULT_STREAM_CAPACITY: usize = 10_000;

/// Sample clock and scheduling settings shared by every node of a rack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Ticks per second.
    pub sample_rate: f64,
    /// Buffer size of each stream. This only absorbs scheduling jitter
    /// between threads; correctness never depends on it.
    pub stream_capacity: usize,
    /// Seed for random nodes. `None` seeds each node from entropy.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            stream_capacity: DEFAULT_STREAM_CAPACITY,
            seed: None,
        }
    }
}

impl Config {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_stream_capacity(mut self, capacity: usize) -> Self {
        self.stream_capacity = capacity;
        self
    }

    /// Parse a JSON document. Missing fields take their default value.
    pub fn from_json(text: &str) -> Result<Self, Error> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the sample rate can drive a clock and a WAV header.
    pub fn validate(&self) -> Result<(), Error> {
        let rate = self.sample_rate;
        if !rate.is_finite() || rate < 1.0 || rate.fract() != 0.0 || rate > u32::MAX as f64 {
            return Err(Error::InvalidSampleRate(rate));
        }
        Ok(())
    }

    /// Load a JSON configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Duration of one tick, truncated to whole nanoseconds.
    pub fn tick(&self) -> Duration {
        Duration::from_nanos((1e9 / self.sample_rate) as u64)
    }

    /// Duration of one tick in seconds.
    pub fn tick_seconds(&self) -> f64 {
        self.tick().as_secs_f64()
    }

    /// Phase increment per tick for a 1 Hz oscillator, in radians.
    pub fn phase_step(&self) -> f64 {
        std::f64::consts::TAU / self.sample_rate
    }

    /// Number of whole ticks in `duration`.
    pub fn ticks_in(&self, duration: Duration) -> usize {
        let tick = self.tick().as_nanos();
        if tick == 0 {
            return 0;
        }
        (duration.as_nanos() / tick) as usize
    }
}
