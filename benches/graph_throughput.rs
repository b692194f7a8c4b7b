//! Graph Throughput Benchmarks
//!
//! Every node of a rack runs on its own thread, so the cost of one sample is
//! dominated by channel hand-offs rather than arithmetic. These benchmarks
//! measure both sides:
//!
//! - per-sample waveform and scale lookups, with no threads involved
//! - end-to-end samples per second through small voice graphs, at several
//!   stream capacities
//!
//! Real-time output at 44.1 kHz needs a voice graph to sustain at least
//! 44 100 samples per second.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use procrastinate::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;

const SAMPLE_RATE: f64 = 44100.0;
const CAPACITIES: [usize; 3] = [64, 1024, 10_000];
const RENDER_SAMPLES: usize = 44_100;

// ============================================================================
// Helper Functions
// ============================================================================

/// Clock → step sequencer → oscillator × envelope
fn build_voice(rack: &Rack) -> (StopHandle, Stream<f64>) {
    let (stop, signal) = stop_signal();
    let clock = rack.dirac_every(Duration::from_millis(125), signal);
    let (note_clock, gate) = rack.split(clock);

    let notes = rack.stepwise(note_clock, vec![0.0, 4.0, 7.0, 12.0]).unwrap();
    let frequency = rack.tempered_scale(notes, 220.0, 0.0, 12.0);
    let tone = rack.oscillator(frequency, Waveshape::Sawtooth);

    let gate = rack.dirac_to_impulsion(gate, Duration::from_millis(60));
    let envelope = rack.adsr(
        gate,
        Duration::from_millis(5),
        Duration::from_millis(40),
        0.5,
        Duration::from_millis(80),
    );
    (stop, rack.vca(tone, [Param::from(envelope)]))
}

/// Several voices mixed into one output
fn build_chord(rack: &Rack, voices: usize) -> (Vec<StopHandle>, Stream<f64>) {
    let (stops, mut outputs): (Vec<_>, Vec<_>) = (0..voices).map(|_| build_voice(rack)).unzip();
    let base = outputs.remove(0);
    let terms: Vec<Param<f64>> = outputs.into_iter().map(Param::from).collect();
    (stops, rack.mix(base, terms))
}

fn drain(rack: Rack, stops: Vec<StopHandle>, output: Stream<f64>, samples: usize) -> f64 {
    let sum = output.take(samples).sum();
    for stop in stops {
        stop.stop();
    }
    rack.join().unwrap();
    sum
}

// ============================================================================
// Per-Sample Benchmarks
// ============================================================================

fn bench_waveshapes(c: &mut Criterion) {
    let mut group = c.benchmark_group("waveshape/sample");
    let shapes = [
        Waveshape::Sine,
        Waveshape::Square,
        Waveshape::Triangle,
        Waveshape::Sawtooth,
        Waveshape::Noise,
    ];

    for shape in shapes {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{:?}", shape)),
            &shape,
            |b, &shape| {
                let mut rng = StdRng::seed_from_u64(0);
                let mut phase = 0.0;
                b.iter(|| {
                    phase = (phase + 0.01) % std::f64::consts::TAU;
                    shape.sample(black_box(phase), &mut rng)
                });
            },
        );
    }

    group.finish();
}

fn bench_quantize(c: &mut Criterion) {
    c.bench_function("scale/degree", |b| {
        let mut degree = -20_i64;
        b.iter(|| {
            degree = if degree > 20 { -20 } else { degree + 1 };
            Scale::PentatonicMajor.degree(black_box(degree))
        });
    });
}

// ============================================================================
// Graph Benchmarks
// ============================================================================

fn bench_voice_capacity(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph/voice");
    group.sample_size(10);

    for capacity in CAPACITIES {
        group.throughput(Throughput::Elements(RENDER_SAMPLES as u64));
        group.bench_with_input(
            BenchmarkId::new("capacity", capacity),
            &capacity,
            |b, &capacity| {
                b.iter(|| {
                    let rack = Rack::new(Config::new(SAMPLE_RATE).with_stream_capacity(capacity));
                    let (stop, output) = build_voice(&rack);
                    drain(rack, vec![stop], output, RENDER_SAMPLES)
                });
            },
        );
    }

    group.finish();
}

fn bench_chord_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph/chord");
    group.sample_size(10);

    for voices in [1, 2, 4, 8] {
        group.throughput(Throughput::Elements(RENDER_SAMPLES as u64));
        group.bench_with_input(BenchmarkId::new("voices", voices), &voices, |b, &voices| {
            b.iter(|| {
                let rack = Rack::new(Config::new(SAMPLE_RATE).with_seed(1));
                let (stops, output) = build_chord(&rack, voices);
                drain(rack, stops, output, RENDER_SAMPLES)
            });
        });
    }

    group.finish();
}

criterion_group!(sample_benches, bench_waveshapes, bench_quantize);
criterion_group!(graph_benches, bench_voice_capacity, bench_chord_scaling);
criterion_main!(sample_benches, graph_benches);
