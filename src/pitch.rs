//! Pitch utilities
//!
//! Note-domain helpers: glide between notes, map notes to frequencies on an
//! equal-tempered scale, and map scale degrees to semitones.

use crate::rack::{Node, Rack};
use crate::stream::{Param, Stream};
use std::time::Duration;

/// Slew Limiter
///
/// Moves toward each new target by at most `tick / glide` per tick, which
/// makes a unit step take `glide` to complete. The first value is passed
/// through without a ramp.
pub struct Slide {
    notes: Stream<f64>,
    glide: Param<Duration>,
    tick: f64,
    current: Option<f64>,
}

impl Node for Slide {
    type Out = f64;

    fn tick(&mut self) -> Option<f64> {
        let target = self.notes.recv()?;
        let glide = self.glide.read()?;
        let next = match self.current {
            None => target,
            Some(current) => {
                let rate = self.tick / glide.as_secs_f64();
                current + (target - current).clamp(-rate, rate)
            }
        };
        self.current = Some(next);
        Some(next)
    }
}

/// `base · 2^((note + offset) / divisions)`
pub struct TemperedScale {
    notes: Stream<f64>,
    base: Param<f64>,
    offset: Param<f64>,
    divisions: Param<f64>,
}

impl Node for TemperedScale {
    type Out = f64;

    fn tick(&mut self) -> Option<f64> {
        let note = self.notes.recv()?;
        let base = self.base.read()?;
        let offset = self.offset.read()?;
        let divisions = self.divisions.read()?;
        Some(base * 2.0_f64.powf((note + offset) / divisions))
    }
}

/// Musical scales for degree quantization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scale {
    Chromatic,
    Major,
    Minor,
    PentatonicMajor,
    PentatonicMinor,
    /// Major pentatonic started from its relative minor, a minor third
    /// below the root
    PentatonicRelativeMinor,
    Dorian,
    Mixolydian,
    Blues,
}

impl Scale {
    /// Returns the semitone offsets for this scale (relative to root)
    pub fn semitones(&self) -> &'static [i64] {
        match self {
            Scale::Chromatic => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
            Scale::Major => &[0, 2, 4, 5, 7, 9, 11],
            Scale::Minor => &[0, 2, 3, 5, 7, 8, 10],
            Scale::PentatonicMajor => &[0, 2, 4, 7, 9],
            Scale::PentatonicMinor => &[0, 3, 5, 7, 10],
            Scale::PentatonicRelativeMinor => &[-3, 0, 2, 4, 7],
            Scale::Dorian => &[0, 2, 3, 5, 7, 9, 10],
            Scale::Mixolydian => &[0, 2, 4, 5, 7, 9, 10],
            Scale::Blues => &[0, 3, 5, 6, 7, 10],
        }
    }

    /// Semitone offset of scale degree `degree`.
    ///
    /// Each full pass through the scale adds an octave. Negative degrees
    /// count down from the root using floored division. Degrees too far
    /// out to express saturate at the `i64` range.
    pub fn degree(&self, degree: i64) -> i64 {
        let semitones = self.semitones();
        let len = semitones.len() as i64;
        let octave = degree.div_euclid(len);
        let step = degree.rem_euclid(len) as usize;
        octave.saturating_mul(12).saturating_add(semitones[step])
    }
}

/// Maps each (rounded up) input degree to semitones.
pub struct Quantize {
    degrees: Stream<f64>,
    scale: Scale,
}

impl Node for Quantize {
    type Out = f64;

    fn tick(&mut self) -> Option<f64> {
        let degree = self.degrees.recv()?.ceil() as i64;
        Some(self.scale.degree(degree) as f64)
    }
}

impl Rack {
    /// Glide toward each note at one unit per `glide`.
    pub fn slide(&self, notes: Stream<f64>, glide: impl Into<Param<Duration>>) -> Stream<f64> {
        self.spawn(
            "slide",
            Slide {
                notes,
                glide: glide.into(),
                tick: self.config().tick_seconds(),
                current: None,
            },
        )
    }

    /// Convert notes to frequencies with `divisions` notes per octave,
    /// note `-offset` sounding at `base`.
    pub fn tempered_scale(
        &self,
        notes: Stream<f64>,
        base: impl Into<Param<f64>>,
        offset: impl Into<Param<f64>>,
        divisions: impl Into<Param<f64>>,
    ) -> Stream<f64> {
        self.spawn(
            "tempered_scale",
            TemperedScale {
                notes,
                base: base.into(),
                offset: offset.into(),
                divisions: divisions.into(),
            },
        )
    }

    /// Map scale degrees to semitones of `scale`.
    pub fn quantize(&self, degrees: Stream<f64>, scale: Scale) -> Stream<f64> {
        self.spawn("quantize", Quantize { degrees, scale })
    }
}
