//! Oscillator
//!
//! A phase-accumulating oscillator driven by a frequency stream. The phase
//! lives in `[0, 2π)`; each tick the sample is computed from the current
//! phase and the phase is then advanced by `f · 2π / sample_rate`, so a
//! frequency change is heard one tick later.

use crate::rack::{Node, Rack};
use crate::stream::{Param, Stream};
use rand::rngs::StdRng;
use rand::Rng;
use std::f64::consts::{PI, TAU};

/// Waveform produced by an [`Oscillator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Waveshape {
    Sine,
    /// +1 for the first half of the cycle, −1 for the second
    Square,
    Triangle,
    /// Rises linearly from −1 to 1 over the cycle
    Sawtooth,
    /// White noise; ignores phase and frequency
    Noise,
}

impl Waveshape {
    /// Sample the waveform at `phase` radians, `phase` in `[0, 2π)`.
    pub fn sample(self, phase: f64, rng: &mut impl Rng) -> f64 {
        match self {
            Waveshape::Sine => phase.sin(),
            Waveshape::Square => {
                if phase > PI {
                    -1.0
                } else {
                    1.0
                }
            }
            Waveshape::Triangle => {
                let ramp = 2.0 * phase / PI - 1.0;
                if ramp > 1.0 {
                    2.0 - ramp
                } else {
                    ramp
                }
            }
            Waveshape::Sawtooth => phase / PI - 1.0,
            Waveshape::Noise => rng.gen_range(-1.0..=1.0),
        }
    }
}

pub struct Oscillator {
    frequency: Stream<f64>,
    shape: Param<Waveshape>,
    phase: f64,
    phase_step: f64,
    rng: StdRng,
}

impl Oscillator {
    pub fn new(frequency: Stream<f64>, shape: Param<Waveshape>, sample_rate: f64, rng: StdRng) -> Self {
        Self {
            frequency,
            shape,
            phase: 0.0,
            phase_step: TAU / sample_rate,
            rng,
        }
    }

    /// Current phase in radians.
    pub fn phase(&self) -> f64 {
        self.phase
    }

    fn advance(&mut self, frequency: f64) {
        self.phase += frequency * self.phase_step;
        if self.phase >= TAU {
            self.phase -= TAU;
        } else if self.phase < 0.0 {
            self.phase += TAU;
        }
        // Frequencies beyond the sample rate wrap more than once per tick.
        if !(0.0..TAU).contains(&self.phase) {
            self.phase = self.phase.rem_euclid(TAU);
        }
    }
}

impl Node for Oscillator {
    type Out = f64;

    fn tick(&mut self) -> Option<f64> {
        let frequency = self.frequency.recv()?;
        let shape = self.shape.read()?;
        let value = shape.sample(self.phase, &mut self.rng);
        self.advance(frequency);
        Some(value)
    }
}

impl Rack {
    /// An oscillator following `frequency` (Hz), one sample per frequency
    /// value.
    pub fn oscillator(&self, frequency: Stream<f64>, shape: impl Into<Param<Waveshape>>) -> Stream<f64> {
        let node = Oscillator::new(frequency, shape.into(), self.config().sample_rate, self.rng());
        self.spawn("oscillator", node)
    }
}
