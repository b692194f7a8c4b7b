//! The reference piece: a drum line and a melodic solo at 90 BPM.

use procrastinate::prelude::*;
use std::time::Duration;

pub const BPM: u32 = 90;

/// Gate width given to every drum trigger
const TRIGGER_WIDTH: Duration = Duration::from_millis(50);

/// bass drum, snare, hi-hat
const DRUM_PATTERN: [[f64; 3]; 8] = [
    [1.0, 0.0, 1.0],
    [0.0, 0.0, 0.9],
    [0.0, 1.0, 0.8],
    [0.0, 0.0, 0.6],
    [0.8, 0.0, 0.7],
    [0.0, 0.0, 0.8],
    [0.0, 1.0, 0.9],
    [0.0, 0.0, 0.8],
];

const NOTES: [f64; 32] = [
    0.0, 0.0, 7.0, 7.0, 7.0, 7.0, 7.0, 7.0, //
    0.0, -1.0, 8.0, 8.0, 8.0, 8.0, 8.0, -1.0, //
    -1.0, -1.0, 8.0, 8.0, 8.0, 8.0, 8.0, 8.0, //
    0.0, -1.0, 7.0, 7.0, 7.0, 7.0, 7.0, 0.0,
];

const VOLUME: [f64; 32] = [
    0.6, 0.6, 3.0, 3.0, 3.0, 3.0, 3.0, 3.0, //
    0.6, 0.6, 0.8, 0.8, 0.8, 0.8, 0.0, 0.0, //
    0.6, 0.6, 5.0, 5.0, 5.0, 5.0, 5.0, 5.0, //
    0.6, 0.6, 0.8, 0.8, 0.8, 0.8, 0.0, 0.0,
];

const VIBRATION: [f64; 16] = [
    0.0, 0.0, 0.0, 0.0, //
    0.0, 0.1, 2.0, 0.0, //
    0.0, 0.0, 0.0, 0.0, //
    0.0, 0.1, 0.5, 0.5,
];

const SHAPES: [Waveshape; 16] = {
    use Waveshape::{Sine, Triangle};
    [
        Sine, Triangle, Triangle, Triangle, //
        Sine, Triangle, Triangle, Triangle, //
        Sine, Sine, Sine, Sine, //
        Sine, Sine, Sine, Sine,
    ]
};

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// Length of one beat.
pub fn beat() -> Duration {
    Duration::from_secs(60) / BPM
}

/// Period of the root clock: a 32nd note.
pub fn clock_period() -> Duration {
    beat() / 8
}

/// Fifteen beats and a short tail.
pub fn length() -> Duration {
    beat() * 15 + Duration::from_secs(1) / 3
}

fn drum_columns<T>(streams: Vec<Stream<T>>) -> Result<[Stream<T>; 3], Error> {
    let found = streams.len();
    streams
        .try_into()
        .map_err(|_| Error::ColumnCount { expected: 3, found })
}

/// The "pum-ka-tcha-ka" drum line, one pattern step per trigger.
pub fn pum_ka_tcha_ka(rack: &Rack, tempo: Stream<bool>) -> Result<Stream<f64>, Error> {
    let [pattern_clock, velocity_clock, hihat_clock, snare_clock] = rack.split_array(tempo);
    let pattern: Vec<Vec<f64>> = DRUM_PATTERN.iter().map(|row| row.to_vec()).collect();

    let [bass, snare, hihat] = drum_columns(rack.filter_dirac(pattern_clock, pattern.clone())?)?;
    let [bass_velocity, snare_velocity, hihat_velocity] =
        drum_columns(rack.stepwise_multiples(velocity_clock, pattern)?)?;

    // Bass drum: a sine dropping a few hertz on every hit
    let (bass_gate, bass_step) = rack.split(bass);
    let bass_trigger = rack.dirac_to_impulsion(bass_gate, TRIGGER_WIDTH);
    let bass_envelope = rack.adsr(bass_trigger, ms(10), ms(40), 0.1, ms(300));
    let bass_pitch = rack.stepwise(bass_step, vec![150.0, 145.0])?;
    let bass_tone = rack.oscillator(bass_pitch, Waveshape::Sine);
    let bassdrum = rack.saturate(
        rack.vca(
            bass_tone,
            [Param::from(bass_envelope), Param::from(bass_velocity), Param::from(1.7)],
        ),
        0.5,
    );

    // Hi-hat
    let hihat_trigger = rack.dirac_to_impulsion(hihat, TRIGGER_WIDTH);
    let hihat_envelope = rack.adsr(hihat_trigger, ms(10), ms(60), 0.1, ms(100));
    let hihat_noise = rack.oscillator(rack.constant(hihat_clock, 1.0), Waveshape::Noise);
    let hihat = rack.vca(
        hihat_noise,
        [Param::from(hihat_envelope), Param::from(hihat_velocity), Param::from(0.3)],
    );

    // Snare
    let snare_trigger = rack.dirac_to_impulsion(snare, TRIGGER_WIDTH);
    let snare_envelope = rack.adsr(snare_trigger, ms(10), ms(40), 0.1, ms(40));
    let snare_tone = rack.oscillator(rack.constant(snare_clock, 700.0), Waveshape::Square);
    let snare = rack.vca(
        snare_tone,
        [Param::from(snare_envelope), Param::from(snare_velocity), Param::from(0.2)],
    );

    Ok(rack.mix(bassdrum, [Param::from(snare), Param::from(hihat)]))
}

/// A gliding melodic line with vibrato, through reverb.
pub fn synth_solo(
    rack: &Rack,
    tempo: Stream<bool>,
    vibrato_period: Duration,
) -> Result<Stream<f64>, Error> {
    let [note_clock, volume_clock, shape_clock, vibrato_clock, vibration_clock] =
        rack.split_array(tempo);
    let shape_clock = rack.dirac_once_in(shape_clock, 2usize);
    let vibration_clock = rack.dirac_once_in(vibration_clock, 2usize);

    // Vibrato
    let vibrato_frequency = 1.0 / vibrato_period.as_secs_f64() / 2.0;
    let vibration = rack.stepwise(vibration_clock, VIBRATION.to_vec())?;
    let vibrato_amount = rack.slide(vibration, vibrato_period * 2);
    let vibrato_tone = rack.oscillator(rack.constant(vibrato_clock, vibrato_frequency), Waveshape::Sine);
    let vibrato = rack.vca(vibrato_tone, [Param::from(vibrato_amount)]);

    // Frequency
    let notes = rack.stepwise(note_clock, NOTES.to_vec())?;
    let notes = rack.mix(rack.slide(notes, Duration::from_secs(1) / 2 / 12), [Param::from(vibrato)]);
    let frequency = rack.tempered_scale(notes, 220.0, 6.0, 12.0);

    // Volume
    let volume = rack.stepwise(volume_clock, VOLUME.to_vec())?;
    let volume = rack.slide(volume, Duration::from_secs(1) / 2 / 6);

    let shapes = rack.stepwise(shape_clock, SHAPES.to_vec())?;
    let voice = rack.vca(rack.oscillator(frequency, shapes), [Param::from(volume)]);
    let voice = rack.saturate(voice, 1.0);

    Ok(rack.reverb(voice, beat() / 4, 0.45))
}

/// Wire the whole piece onto `rack`.
///
/// Returns the root clock's stop handle and the master output.
pub fn build(rack: &Rack) -> Result<(StopHandle, Stream<f64>), Error> {
    let (stop, signal) = stop_signal();
    let period = clock_period();
    let clock = rack.dirac_every(period, signal);

    let [drum_clock, main_clock, fade_in_clock, fade_out_clock] = rack.split_array(clock);
    let drumline = pum_ka_tcha_ka(rack, rack.dirac_once_in(drum_clock, 4usize))?;
    let mainline = synth_solo(rack, rack.dirac_once_in(main_clock, 4usize), period)?;

    let fade_in = rack.fade_in(fade_in_clock, Duration::ZERO, ms(200));
    let fade_out = rack.fade_out(fade_out_clock, length(), ms(400));

    let mixed = rack.mix(
        rack.vca(mainline, [Param::from(0.5)]),
        [Param::from(rack.vca(drumline, [Param::from(1.0)]))],
    );
    let master = rack.vca(mixed, [Param::from(0.1), Param::from(fade_in), Param::from(fade_out)]);
    Ok((stop, master))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing() {
        assert_eq!(beat(), Duration::from_nanos(666_666_666));
        assert_eq!(clock_period(), Duration::from_nanos(83_333_333));
        assert!(length() > Duration::from_secs(10));
        assert!(length() < Duration::from_millis(10_334));
    }

    #[test]
    fn test_drum_columns_count() {
        let line = || -> Stream<bool> { std::iter::empty().collect() };
        assert!(drum_columns(vec![line(), line(), line()]).is_ok());
        assert!(matches!(
            drum_columns(vec![line(), line()]),
            Err(Error::ColumnCount {
                expected: 3,
                found: 2
            })
        ));
    }

    #[test]
    fn test_piece_renders_and_shuts_down() {
        let rack = Rack::new(Config::new(2000.0).with_seed(7).with_stream_capacity(64));
        let (stop, master) = build(&rack).unwrap();
        let samples: Vec<f64> = master.take(4000).collect();
        assert_eq!(samples.len(), 4000);
        assert!(samples.iter().all(|s| s.is_finite()));
        // The fade in starts from silence.
        assert_eq!(samples[0], 0.0);
        assert!(samples.iter().any(|s| s.abs() > 1e-4));
        stop.stop();
        rack.join().unwrap();
    }
}
