//! Envelopes and dynamics
//!
//! Control-rate shapers (ADSR, fades) and the two audio-rate effects of the
//! rack (soft saturation and a feedback comb used as reverb). Time constants
//! are durations; per-tick increments are `tick / time`, so an attack of
//! 10 ms rises from 0 to 1 in 10 ms regardless of the sample rate.

use crate::rack::{Node, Rack};
use crate::stream::{Param, Stream};
use std::time::Duration;

/// ADSR envelope stages
///
/// There is no release stage: a low gate always sends the envelope back to
/// `Idle` and the level falls at the release rate from wherever it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Idle,
    Attack,
    Decay,
    Sustain,
}

/// ADSR Envelope Generator
///
/// While the gate is high the envelope goes Idle → Attack → Decay →
/// Sustain; the first high tick only arms the attack. While the gate is low
/// the level falls toward zero. Retriggering during release resumes the
/// attack from the current level. All four parameters are read every tick.
pub struct Adsr {
    gate: Stream<bool>,
    attack: Param<Duration>,
    decay: Param<Duration>,
    sustain: Param<f64>,
    release: Param<Duration>,
    tick: f64,
    stage: EnvelopeStage,
    level: f64,
}

impl Adsr {
    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    fn step(&self, time: Duration) -> f64 {
        self.tick / time.as_secs_f64()
    }
}

impl Node for Adsr {
    type Out = f64;

    fn tick(&mut self) -> Option<f64> {
        let gate = self.gate.recv()?;
        let attack = self.attack.read()?;
        let decay = self.decay.read()?;
        let sustain = self.sustain.read()?;
        let release = self.release.read()?;

        if gate {
            match self.stage {
                EnvelopeStage::Idle => {
                    self.stage = EnvelopeStage::Attack;
                }
                EnvelopeStage::Attack => {
                    self.level += self.step(attack);
                    if self.level >= 1.0 {
                        self.level = 1.0;
                        self.stage = EnvelopeStage::Decay;
                    }
                }
                EnvelopeStage::Decay => {
                    self.level -= self.step(decay);
                    if self.level <= sustain {
                        self.level = sustain;
                        self.stage = EnvelopeStage::Sustain;
                    }
                }
                EnvelopeStage::Sustain => {}
            }
        } else {
            self.stage = EnvelopeStage::Idle;
            self.level = (self.level - self.step(release)).max(0.0);
        }

        Some(self.level)
    }
}

/// Soft clipper: `sin(x / ceiling) · ceiling`
pub struct Saturate {
    input: Stream<f64>,
    ceiling: Param<f64>,
}

impl Node for Saturate {
    type Out = f64;

    fn tick(&mut self) -> Option<f64> {
        let x = self.input.recv()?;
        let ceiling = self.ceiling.read()?;
        Some((x / ceiling).sin() * ceiling)
    }
}

/// Single-tap feedback comb filter.
///
/// The feedback gain must stay below 1 in magnitude or the output grows
/// without bound.
pub struct Reverb {
    input: Stream<f64>,
    feedback: Param<f64>,
    window: Vec<f64>,
    position: usize,
}

impl Reverb {
    /// Comb over `length` samples (at least one).
    pub fn new(input: Stream<f64>, length: usize, feedback: Param<f64>) -> Self {
        Self {
            input,
            feedback,
            window: vec![0.0; length.max(1)],
            position: 0,
        }
    }
}

impl Node for Reverb {
    type Out = f64;

    fn tick(&mut self) -> Option<f64> {
        let x = self.input.recv()?;
        let feedback = self.feedback.read()?;
        let slot = &mut self.window[self.position];
        *slot = x + *slot * feedback;
        let out = *slot;
        self.position = (self.position + 1) % self.window.len();
        Some(out)
    }
}

/// A 0 → 1 ramp over `[start, start + length]`.
///
/// The driver's values are ignored: it only provides the tick cadence.
pub struct FadeIn<U> {
    driver: Stream<U>,
    start: Duration,
    length: Duration,
    tick: Duration,
    elapsed: Duration,
}

impl<U> FadeIn<U> {
    fn level(&self) -> f64 {
        let t = self.elapsed;
        if t < self.start {
            0.0
        } else if t > self.start + self.length || self.length.is_zero() {
            1.0
        } else {
            (t - self.start).as_secs_f64() / self.length.as_secs_f64()
        }
    }
}

impl<U: Send + 'static> Node for FadeIn<U> {
    type Out = f64;

    fn tick(&mut self) -> Option<f64> {
        self.driver.recv()?;
        let level = self.level();
        self.elapsed += self.tick;
        Some(level)
    }
}

impl Rack {
    /// Attack-decay-sustain-release envelope following `gate`.
    pub fn adsr(
        &self,
        gate: Stream<bool>,
        attack: impl Into<Param<Duration>>,
        decay: impl Into<Param<Duration>>,
        sustain: impl Into<Param<f64>>,
        release: impl Into<Param<Duration>>,
    ) -> Stream<f64> {
        let node = Adsr {
            gate,
            attack: attack.into(),
            decay: decay.into(),
            sustain: sustain.into(),
            release: release.into(),
            tick: self.config().tick_seconds(),
            stage: EnvelopeStage::Idle,
            level: 0.0,
        };
        self.spawn("adsr", node)
    }

    /// Soft-clip `input` below `ceiling`.
    pub fn saturate(&self, input: Stream<f64>, ceiling: impl Into<Param<f64>>) -> Stream<f64> {
        self.spawn(
            "saturate",
            Saturate {
                input,
                ceiling: ceiling.into(),
            },
        )
    }

    /// Feed `input` through a comb filter `delay` long.
    pub fn reverb(
        &self,
        input: Stream<f64>,
        delay: Duration,
        feedback: impl Into<Param<f64>>,
    ) -> Stream<f64> {
        let length = self.config().ticks_in(delay);
        self.spawn("reverb", Reverb::new(input, length, feedback.into()))
    }

    /// Ramp from 0 to 1 between `start` and `start + length`, timed by
    /// `driver`.
    pub fn fade_in<U: Send + 'static>(
        &self,
        driver: Stream<U>,
        start: Duration,
        length: Duration,
    ) -> Stream<f64> {
        let node = FadeIn {
            driver,
            start,
            length,
            tick: self.config().tick(),
            elapsed: Duration::ZERO,
        };
        self.spawn("fade_in", node)
    }

    /// Ramp from 1 to 0, reaching 0 at `end`.
    ///
    /// Built as `1 − fade_in(driver, end − length, length)`.
    pub fn fade_out<U: Send + 'static>(
        &self,
        driver: Stream<U>,
        end: Duration,
        length: Duration,
    ) -> Stream<f64> {
        let ramp = self.fade_in(driver, end.saturating_sub(length), length);
        let inverted = self.vca(ramp, [Param::from(-1.0)]);
        self.mix(inverted, [Param::from(1.0)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use approx::assert_abs_diff_eq;

    const T: bool = true;
    const F: bool = false;

    // One tick is 250 ms, so every step below is exact in binary.
    fn rack() -> Rack {
        Rack::new(Config::new(4.0))
    }

    fn gate(values: &[bool]) -> Stream<bool> {
        values.iter().copied().collect()
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn test_adsr_stages() {
        let rack = rack();
        // Attack and release take two ticks, decay four.
        let env = rack.adsr(gate(&[T, T, T, T, T, T, F, F]), ms(500), ms(1000), 0.5, ms(500));
        assert_eq!(
            env.collect::<Vec<_>>(),
            vec![0.0, 0.5, 1.0, 0.75, 0.5, 0.5, 0.0, 0.0]
        );
        rack.join().unwrap();
    }

    #[test]
    fn test_adsr_retrigger_resumes_from_current_level() {
        let rack = rack();
        let env = rack.adsr(gate(&[T, T, T, F, T, T]), ms(1000), ms(500), 0.5, ms(1000));
        assert_eq!(
            env.collect::<Vec<_>>(),
            vec![0.0, 0.25, 0.5, 0.25, 0.25, 0.5]
        );
        rack.join().unwrap();
    }

    #[test]
    fn test_adsr_stage_transitions() {
        let mut adsr = Adsr {
            gate: gate(&[T, T, T, T, F]),
            attack: Param::from(ms(250)),
            decay: Param::from(ms(250)),
            sustain: Param::from(0.25),
            release: Param::from(ms(250)),
            tick: 0.25,
            stage: EnvelopeStage::Idle,
            level: 0.0,
        };
        let mut stages = Vec::new();
        while adsr.tick().is_some() {
            stages.push(adsr.stage());
        }
        assert_eq!(
            stages,
            vec![
                EnvelopeStage::Attack,
                EnvelopeStage::Decay,
                EnvelopeStage::Sustain,
                EnvelopeStage::Sustain,
                EnvelopeStage::Idle,
            ]
        );
    }

    #[test]
    fn test_adsr_modulated_sustain() {
        let rack = rack();
        let sustain: Stream<f64> = vec![0.5, 0.5, 0.8, 0.1, 0.9].into_iter().collect();
        let env = rack.adsr(gate(&[T, T, T, T, T]), ms(250), ms(250), sustain, ms(250));
        // The level is clamped to the sustain in force when decay crosses
        // it and then held; later sustain changes do not move it.
        assert_eq!(env.collect::<Vec<_>>(), vec![0.0, 1.0, 0.8, 0.8, 0.8]);
        rack.join().unwrap();
    }

    #[test]
    fn test_saturate() {
        let rack = rack();
        let out: Vec<f64> = rack.saturate(vec![0.0, 0.25, 10.0].into_iter().collect(), 0.5).collect();
        assert_abs_diff_eq!(out[0], 0.0);
        assert_abs_diff_eq!(out[1], (0.5f64).sin() * 0.5);
        assert!(out[2].abs() <= 0.5);
        rack.join().unwrap();
    }

    #[test]
    fn test_fixed_and_constant_stream_sustain_agree() {
        let rack = rack();
        let pattern = [T, T, T, T, T, T, F, F, T, T];
        let fixed = rack.adsr(gate(&pattern), ms(500), ms(1000), 0.5, ms(500));
        let sustain = rack.constant(gate(&pattern), 0.5_f64);
        let streamed = rack.adsr(gate(&pattern), ms(500), ms(1000), sustain, ms(500));
        assert_eq!(fixed.collect::<Vec<_>>(), streamed.collect::<Vec<_>>());
        rack.join().unwrap();
    }

    #[test]
    fn test_fixed_and_constant_stream_ceiling_agree() {
        let rack = rack();
        let input = vec![0.0, 0.3, -0.7, 2.0, -5.0];
        let fixed = rack.saturate(input.iter().copied().collect(), 0.8);
        let ceiling = rack.constant(gate(&[T; 5]), 0.8_f64);
        let streamed = rack.saturate(input.into_iter().collect(), ceiling);
        assert_eq!(fixed.collect::<Vec<_>>(), streamed.collect::<Vec<_>>());
        rack.join().unwrap();
    }

    #[test]
    fn test_saturate_modulated_ceiling() {
        let rack = rack();
        let ceiling: Stream<f64> = vec![1.0, 0.25, 2.0].into_iter().collect();
        let out: Vec<f64> = rack
            .saturate(vec![0.5, 0.5, 0.5, 0.5].into_iter().collect(), ceiling)
            .collect();
        // Ends with the ceiling stream.
        assert_eq!(out.len(), 3);
        assert_abs_diff_eq!(out[0], 0.5f64.sin());
        assert_abs_diff_eq!(out[1], 2.0f64.sin() * 0.25);
        assert_abs_diff_eq!(out[2], 0.25f64.sin() * 2.0);
        rack.join().unwrap();
    }

    #[test]
    fn test_reverb_feedback() {
        let rack = rack();
        // 500 ms is two ticks of delay.
        let input: Stream<f64> = vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0].into_iter().collect();
        let out = rack.reverb(input, ms(500), 0.5);
        assert_eq!(out.collect::<Vec<_>>(), vec![1.0, 0.0, 0.5, 0.0, 0.25, 0.0]);
        rack.join().unwrap();
    }

    #[test]
    fn test_reverb_shorter_than_a_tick() {
        let rack = rack();
        let input: Stream<f64> = vec![1.0, 0.0, 0.0].into_iter().collect();
        let out = rack.reverb(input, ms(1), 0.5);
        assert_eq!(out.collect::<Vec<_>>(), vec![1.0, 0.5, 0.25]);
        rack.join().unwrap();
    }

    #[test]
    fn test_fade_in() {
        let rack = rack();
        let out = rack.fade_in(gate(&[F; 8]), ms(500), ms(1000));
        assert_eq!(
            out.collect::<Vec<_>>(),
            vec![0.0, 0.0, 0.0, 0.25, 0.5, 0.75, 1.0, 1.0]
        );
        rack.join().unwrap();
    }

    #[test]
    fn test_fade_in_zero_length_is_a_step() {
        let rack = rack();
        let out = rack.fade_in(gate(&[T; 4]), ms(500), Duration::ZERO);
        assert_eq!(out.collect::<Vec<_>>(), vec![0.0, 0.0, 1.0, 1.0]);
        rack.join().unwrap();
    }

    #[test]
    fn test_fade_out_mirrors_fade_in() {
        let rack = Rack::new(Config::new(1000.0));
        let ticks = 3000;
        let [a, b] = rack.split_array(gate(&vec![T; ticks]));
        let end = ms(2500);
        let length = ms(800);

        let fade_out: Vec<f64> = rack.fade_out(a, end, length).collect();
        let fade_in: Vec<f64> = rack.fade_in(b, end - length, length).collect();

        assert_eq!(fade_out.len(), ticks);
        for (i, (out, inp)) in fade_out.iter().zip(&fade_in).enumerate() {
            assert_eq!(*out, 1.0 - inp, "tick {}", i);
        }
        assert_eq!(fade_out[0], 1.0);
        assert_eq!(fade_out[ticks - 1], 0.0);
        rack.join().unwrap();
    }
}
