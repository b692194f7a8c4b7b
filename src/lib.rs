//! # Procrastinate: Stream-Dataflow Music Synthesis
//!
//! `procrastinate` builds music out of a graph of small concurrent nodes.
//! Each node runs on its own thread and exchanges one value per sample tick
//! with its neighbours over bounded channels, so the whole graph advances in
//! lockstep with a single root clock.
//!
//! ## Architecture
//!
//! - **Streams** ([`stream`]): single-producer, single-consumer channels and
//!   the [`Param`] scalar-or-stream argument type
//! - **Rack** ([`rack`]): the [`Node`] trait, thread spawning, the root clock's
//!   stop signal and shutdown
//! - **Combinators**: structural ([`combinator`]), trigger and sequencing
//!   ([`trigger`]), synthesis ([`oscillator`], [`envelope`]) and pitch
//!   ([`pitch`])
//! - **Render** ([`render`]): WAV output of the terminal stream
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use procrastinate::prelude::*;
//! use std::time::Duration;
//!
//! let rack = Rack::new(Config::default());
//! let (stop, signal) = stop_signal();
//!
//! // Four notes a second, each held for 100 ms
//! let clock = rack.dirac_every(Duration::from_millis(250), signal);
//! let (gate, pitch_clock) = rack.split(clock);
//! let gate = rack.dirac_to_impulsion(gate, Duration::from_millis(100));
//! let (gate, env_gate) = rack.split(gate);
//!
//! let notes = rack.stepwise(pitch_clock, vec![0.0, 3.0, 7.0, 12.0]).unwrap();
//! let frequency = rack.tempered_scale(notes, 220.0, 0.0, 12.0);
//! let tone = rack.oscillator(frequency, Waveshape::Triangle);
//! let envelope = rack.adsr(env_gate, Duration::from_millis(5), Duration::from_millis(50), 0.6, Duration::from_millis(80));
//! rack.sink(gate);
//! let mut voice = rack.vca(tone, [Param::from(envelope)]);
//!
//! let samples = rack.config().ticks_in(Duration::from_secs(2));
//! render_to_file("arpeggio.wav", &mut voice, samples, rack.config()).unwrap();
//!
//! stop.stop();
//! drop(voice);
//! rack.join().unwrap();
//! ```

pub mod combinator;
pub mod config;
pub mod envelope;
pub mod error;
pub mod oscillator;
pub mod pitch;
pub mod rack;
pub mod render;
pub mod stream;
pub mod trigger;

/// Prelude module for convenient imports
pub mod prelude {
    // Runtime
    pub use crate::config::Config;
    pub use crate::error::Error;
    pub use crate::rack::{stop_signal, Node, Rack, StopHandle, StopSignal};
    pub use crate::stream::{make_stream, Param, Stream};

    // Combinators
    pub use crate::combinator::{Choose, Constant, Map, Mix, Split, Vca};
    pub use crate::trigger::{
        DiracEvery, DiracOnceIn, DiracToImpulsion, EdgeDetect, FilterDirac, Stepwise,
        StreamRandom, StreamRandomInt, PATTERN_THRESHOLD,
    };

    // Synthesis
    pub use crate::envelope::{Adsr, EnvelopeStage, FadeIn, Reverb, Saturate};
    pub use crate::oscillator::{Oscillator, Waveshape};
    pub use crate::pitch::{Quantize, Scale, Slide, TemperedScale};

    // Output
    pub use crate::render::{render, render_to_file};
}

// Re-export key types at crate root for convenience
pub use prelude::*;
