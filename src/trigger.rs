//! Trigger and sequencing primitives
//!
//! Everything here operates on boolean gate streams: one value per tick,
//! `true` when an event fires on that tick. The root clock
//! ([`Rack::dirac_every`]) produces the first gate line; dividers, step
//! sequencers and pattern filters turn it into per-voice trigger lines.

use crate::error::{table_width, Error};
use crate::rack::{Node, Rack, StopSignal};
use crate::stream::{Param, Stream};
use crossbeam::select;
use rand::rngs::StdRng;
use rand::Rng;
use std::time::Duration;
use tracing::{debug, info};

/// Threshold above which a pattern weight lets a trigger through.
pub const PATTERN_THRESHOLD: f64 = 1e-3;

/// Emits `true` on false→true transitions only.
pub struct EdgeDetect {
    gate: Stream<bool>,
    previous: bool,
}

impl Node for EdgeDetect {
    type Out = bool;

    fn tick(&mut self) -> Option<bool> {
        let state = self.gate.recv()?;
        let rising = state && !self.previous;
        self.previous = state;
        Some(rising)
    }
}

/// Lets one trigger in every `n` through, starting with the first.
pub struct DiracOnceIn {
    gate: Stream<bool>,
    n: Param<usize>,
    count: usize,
}

impl Node for DiracOnceIn {
    type Out = bool;

    fn tick(&mut self) -> Option<bool> {
        let state = self.gate.recv()?;
        let n = self.n.read()?.max(1);
        let pass = state && self.count == 0;
        if state {
            self.count = (self.count + 1) % n;
        }
        Some(pass)
    }
}

/// Free-running clock.
///
/// Elapsed time grows by one tick per value; whenever it exceeds the
/// period the clock fires and the period is subtracted, keeping the
/// remainder so the long-run rate stays exact.
pub struct DiracEvery {
    period: Param<Duration>,
    tick: Duration,
    elapsed: Duration,
}

impl DiracEvery {
    pub fn new(period: Param<Duration>, tick: Duration) -> Self {
        Self {
            period,
            tick,
            elapsed: Duration::ZERO,
        }
    }
}

impl Node for DiracEvery {
    type Out = bool;

    fn tick(&mut self) -> Option<bool> {
        let period = self.period.read()?;
        self.elapsed += self.tick;
        if self.elapsed > period {
            self.elapsed -= period;
            Some(true)
        } else {
            Some(false)
        }
    }
}

/// Widens instantaneous triggers into gates of a minimum length.
///
/// A rising edge restarts the pulse. The output stays high while the pulse
/// is younger than `min_duration`, drops on any falling edge of the input,
/// and also drops once `min_duration` has elapsed even if the input is
/// still high.
pub struct DiracToImpulsion {
    gate: Stream<bool>,
    min_duration: Param<Duration>,
    tick: Duration,
    // Age of the current pulse; `None` until the first rising edge.
    age: Option<Duration>,
    previous: bool,
}

impl Node for DiracToImpulsion {
    type Out = bool;

    fn tick(&mut self) -> Option<bool> {
        let state = self.gate.recv()?;
        let min_duration = self.min_duration.read()?;
        if state && !self.previous {
            self.age = Some(Duration::ZERO);
        }
        if let Some(age) = self.age.as_mut() {
            *age = age.saturating_add(self.tick);
        }
        let falling = !state && self.previous;
        self.previous = state;
        Some(!falling && self.age.is_some_and(|age| age < min_duration))
    }
}

/// Step sequencer: each trigger advances to the next value, wrapping.
///
/// The index starts one before the first step so the first trigger lands
/// on `values[0]`; until then the last step is held.
pub struct Stepwise<T> {
    gate: Stream<bool>,
    values: Vec<T>,
    index: usize,
}

impl<T> Stepwise<T> {
    fn new(gate: Stream<bool>, values: Vec<T>) -> Self {
        let index = values.len().saturating_sub(1);
        Self {
            gate,
            values,
            index,
        }
    }

    /// Read the gate, advancing on a trigger. Returns the gate value.
    fn advance(&mut self) -> Option<bool> {
        let state = self.gate.recv()?;
        if state {
            self.index = (self.index + 1) % self.values.len();
        }
        Some(state)
    }
}

impl<T: Clone + Send + 'static> Node for Stepwise<T> {
    type Out = T;

    fn tick(&mut self) -> Option<T> {
        self.advance()?;
        Some(self.values[self.index].clone())
    }
}

/// Routes each trigger to the voices whose weight is set for the current
/// pattern step.
pub struct FilterDirac {
    steps: Stepwise<Vec<f64>>,
}

impl Node for FilterDirac {
    type Out = Vec<bool>;

    fn tick(&mut self) -> Option<Vec<bool>> {
        let state = self.steps.advance()?;
        let row = &self.steps.values[self.steps.index];
        Some(row.iter().map(|&w| w > PATTERN_THRESHOLD && state).collect())
    }
}

/// Holds a random choice, re-rolled on every trigger.
pub struct StreamRandom<T> {
    gate: Stream<bool>,
    choices: Vec<T>,
    index: usize,
    rng: StdRng,
}

impl<T: Clone + Send + 'static> Node for StreamRandom<T> {
    type Out = T;

    fn tick(&mut self) -> Option<T> {
        if self.gate.recv()? {
            self.index = self.rng.gen_range(0..self.choices.len());
        }
        Some(self.choices[self.index].clone())
    }
}

/// Holds a random integer in `[min, max]`, rolled on the first tick and
/// re-rolled on every trigger.
pub struct StreamRandomInt {
    gate: Stream<bool>,
    min: Param<i64>,
    max: Param<i64>,
    value: Option<i64>,
    rng: StdRng,
}

impl Node for StreamRandomInt {
    type Out = f64;

    fn tick(&mut self) -> Option<f64> {
        let state = self.gate.recv()?;
        let a = self.min.read()?;
        let b = self.max.read()?;
        if state || self.value.is_none() {
            self.value = Some(self.rng.gen_range(a.min(b)..=a.max(b)));
        }
        self.value.map(|v| v as f64)
    }
}

impl Rack {
    /// Emit `true` only on rising edges of `gate`.
    pub fn edge_detect(&self, gate: Stream<bool>) -> Stream<bool> {
        self.spawn(
            "edge_detect",
            EdgeDetect {
                gate,
                previous: false,
            },
        )
    }

    /// Pass every `n`-th trigger through.
    pub fn dirac_once_in(&self, gate: Stream<bool>, n: impl Into<Param<usize>>) -> Stream<bool> {
        self.spawn(
            "dirac_once_in",
            DiracOnceIn {
                gate,
                n: n.into(),
                count: 0,
            },
        )
    }

    /// The root clock: fires once per `period` until `stop` fires or its
    /// handle is dropped.
    ///
    /// Stopping is checked while waiting to deliver each value, so a clock
    /// blocked on a full buffer still stops promptly.
    pub fn dirac_every(&self, period: impl Into<Param<Duration>>, stop: StopSignal) -> Stream<bool> {
        let mut clock = DiracEvery::new(period.into(), self.config().tick());
        let (tx, stream) = self.make_stream();
        self.launch("dirac_every", move || {
            let mut ticks: u64 = 0;
            while let Some(value) = clock.tick() {
                select! {
                    recv(stop.0) -> _ => {
                        info!(ticks, "clock stopped");
                        return;
                    }
                    send(tx, value) -> res => {
                        if res.is_err() {
                            break;
                        }
                    }
                }
                ticks += 1;
            }
            debug!(node = "dirac_every", ticks, "node stopped");
        });
        stream
    }

    /// Give each trigger a gate width of at least `min_duration`.
    pub fn dirac_to_impulsion(
        &self,
        gate: Stream<bool>,
        min_duration: impl Into<Param<Duration>>,
    ) -> Stream<bool> {
        self.spawn(
            "dirac_to_impulsion",
            DiracToImpulsion {
                gate,
                min_duration: min_duration.into(),
                tick: self.config().tick(),
                age: None,
                previous: false,
            },
        )
    }

    /// Step through `values`, advancing on each trigger.
    pub fn stepwise<T>(&self, gate: Stream<bool>, values: Vec<T>) -> Result<Stream<T>, Error>
    where
        T: Clone + Send + 'static,
    {
        if values.is_empty() {
            return Err(Error::EmptyTable("stepwise"));
        }
        Ok(self.spawn("stepwise", Stepwise::new(gate, values)))
    }

    /// Step through the rows of `table`, sending column `j` to output `j`.
    pub fn stepwise_multiples<T>(
        &self,
        gate: Stream<bool>,
        table: Vec<Vec<T>>,
    ) -> Result<Vec<Stream<T>>, Error>
    where
        T: Clone + Send + 'static,
    {
        let width = table_width(&table, "stepwise_multiples")?;
        Ok(self.spawn_fanout("stepwise_multiples", Stepwise::new(gate, table), width))
    }

    /// Split one trigger line into one line per column of `table`.
    ///
    /// Each trigger advances to the next row; output `j` fires when the
    /// input fires and `table[row][j]` is above [`PATTERN_THRESHOLD`].
    pub fn filter_dirac(
        &self,
        gate: Stream<bool>,
        table: Vec<Vec<f64>>,
    ) -> Result<Vec<Stream<bool>>, Error> {
        let width = table_width(&table, "filter_dirac")?;
        let node = FilterDirac {
            steps: Stepwise::new(gate, table),
        };
        Ok(self.spawn_fanout("filter_dirac", node, width))
    }

    /// Hold a uniformly chosen element of `choices`, re-rolled per trigger.
    pub fn stream_random<T>(&self, gate: Stream<bool>, choices: Vec<T>) -> Result<Stream<T>, Error>
    where
        T: Clone + Send + 'static,
    {
        if choices.is_empty() {
            return Err(Error::EmptyTable("stream_random"));
        }
        let mut rng = self.rng();
        let index = rng.gen_range(0..choices.len());
        Ok(self.spawn(
            "stream_random",
            StreamRandom {
                gate,
                choices,
                index,
                rng,
            },
        ))
    }

    /// Hold a uniform integer of `[min, max]`, re-rolled per trigger.
    pub fn stream_random_int(
        &self,
        gate: Stream<bool>,
        min: impl Into<Param<i64>>,
        max: impl Into<Param<i64>>,
    ) -> Stream<f64> {
        let rng = self.rng();
        self.spawn(
            "stream_random_int",
            StreamRandomInt {
                gate,
                min: min.into(),
                max: max.into(),
                value: None,
                rng,
            },
        )
    }
}
