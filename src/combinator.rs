//! Structural combinators
//!
//! Operators that reshape the graph rather than the signal: fanning one
//! stream out to several consumers, summing or multiplying several inputs
//! into one, picking one of several candidates per tick.
//!
//! ```text
//!            ┌──▶ a
//!   in ──split
//!            └──▶ b
//!
//!   base ──▶ mix(base, x, y) = base + x + y
//!   base ──▶ vca(base, x, y)  = base × x × y
//!   sel  ──▶ choose(sel, c0, c1, c2) = c[round(sel) mod 3]
//! ```
//!
//! Every argument after the driving stream is a [`Param`], so offsets,
//! gains and candidates can be constants or live streams.

use crate::error::Error;
use crate::rack::{Node, Rack};
use crate::stream::{read_all, Param, Stream};

/// Broadcasts each input value to `width` outputs, in order.
pub struct Split<T> {
    input: Stream<T>,
    width: usize,
}

impl<T: Clone + Send + 'static> Node for Split<T> {
    type Out = Vec<T>;

    fn tick(&mut self) -> Option<Vec<T>> {
        self.input.recv().map(|value| vec![value; self.width])
    }
}

/// Adds every param to the base signal.
pub struct Mix {
    base: Stream<f64>,
    terms: Vec<Param<f64>>,
}

impl Node for Mix {
    type Out = f64;

    fn tick(&mut self) -> Option<f64> {
        let base = self.base.recv()?;
        let terms = read_all(&mut self.terms)?;
        Some(terms.into_iter().fold(base, |acc, x| acc + x))
    }
}

/// Multiplies the base signal by every param.
pub struct Vca {
    base: Stream<f64>,
    gains: Vec<Param<f64>>,
}

impl Node for Vca {
    type Out = f64;

    fn tick(&mut self) -> Option<f64> {
        let base = self.base.recv()?;
        let gains = read_all(&mut self.gains)?;
        Some(gains.into_iter().fold(base, |acc, g| acc * g))
    }
}

/// Emits the candidate picked by the selector on each tick.
///
/// Every candidate is read on every tick, selected or not, so all candidate
/// producers stay in step with the selector.
pub struct Choose<T> {
    selector: Stream<f64>,
    candidates: Vec<Param<T>>,
}

impl<T: Clone + Send + 'static> Node for Choose<T> {
    type Out = T;

    fn tick(&mut self) -> Option<T> {
        let selection = self.selector.recv()?;
        let mut values = read_all(&mut self.candidates)?;
        let index = (selection.round() as i64).rem_euclid(values.len() as i64) as usize;
        Some(values.swap_remove(index))
    }
}

/// Repeats a value once per value of a clocking stream.
pub struct Constant<U, T> {
    clock: Stream<U>,
    value: T,
}

impl<U: Send + 'static, T: Clone + Send + 'static> Node for Constant<U, T> {
    type Out = T;

    fn tick(&mut self) -> Option<T> {
        self.clock.recv().map(|_| self.value.clone())
    }
}

/// A pure per-tick transformation.
pub struct Map<T, F> {
    input: Stream<T>,
    f: F,
}

impl<T, U, F> Node for Map<T, F>
where
    T: Send + 'static,
    U: Send + 'static,
    F: FnMut(T) -> U + Send + 'static,
{
    type Out = U;

    fn tick(&mut self) -> Option<U> {
        self.input.recv().map(&mut self.f)
    }
}

impl Rack {
    /// Duplicate a stream for two consumers.
    ///
    /// A slow consumer on either side stalls both.
    pub fn split<T: Clone + Send + 'static>(&self, input: Stream<T>) -> (Stream<T>, Stream<T>) {
        let [a, b] = self.split_array(input);
        (a, b)
    }

    /// Duplicate a stream for `n` consumers.
    pub fn split_n<T: Clone + Send + 'static>(&self, input: Stream<T>, n: usize) -> Vec<Stream<T>> {
        self.spawn_fanout("split", Split { input, width: n }, n)
    }

    /// Duplicate a stream for a fixed number of consumers.
    pub fn split_array<T: Clone + Send + 'static, const N: usize>(
        &self,
        input: Stream<T>,
    ) -> [Stream<T>; N] {
        self.spawn_fanout_array("split", Split { input, width: N })
    }

    /// Sum the base stream with every term.
    pub fn mix<I>(&self, base: Stream<f64>, terms: I) -> Stream<f64>
    where
        I: IntoIterator<Item = Param<f64>>,
    {
        let terms = terms.into_iter().collect();
        self.spawn("mix", Mix { base, terms })
    }

    /// Multiply the base stream by every gain.
    pub fn vca<I>(&self, base: Stream<f64>, gains: I) -> Stream<f64>
    where
        I: IntoIterator<Item = Param<f64>>,
    {
        let gains = gains.into_iter().collect();
        self.spawn("vca", Vca { base, gains })
    }

    /// Select one candidate per tick with a rounded selector.
    pub fn choose<T, I>(&self, selector: Stream<f64>, candidates: I) -> Result<Stream<T>, Error>
    where
        T: Clone + Send + 'static,
        I: IntoIterator<Item = Param<T>>,
    {
        let candidates: Vec<_> = candidates.into_iter().collect();
        if candidates.is_empty() {
            return Err(Error::EmptyTable("choose"));
        }
        Ok(self.spawn("choose", Choose { selector, candidates }))
    }

    /// A stream repeating `value` once per value of `clock`.
    pub fn constant<U, T>(&self, clock: Stream<U>, value: T) -> Stream<T>
    where
        U: Send + 'static,
        T: Clone + Send + 'static,
    {
        self.spawn("constant", Constant { clock, value })
    }

    /// Apply `f` to every value of `input`.
    pub fn map<T, U, F>(&self, input: Stream<T>, f: F) -> Stream<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnMut(T) -> U + Send + 'static,
    {
        self.spawn("map", Map { input, f })
    }

    /// Drain a stream until its producer stops.
    pub fn sink<T: Send + 'static>(&self, input: Stream<T>) {
        self.launch("sink", move || input.for_each(drop));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn rack() -> Rack {
        Rack::new(Config::new(8.0))
    }

    fn stream<T>(values: impl IntoIterator<Item = T>) -> Stream<T> {
        values.into_iter().collect()
    }

    #[test]
    fn test_split_reproduces_input() {
        let rack = rack();
        let (a, b) = rack.split(stream(vec![1.0, 2.0, 3.0]));
        assert_eq!(a.collect::<Vec<_>>(), vec![1.0, 2.0, 3.0]);
        assert_eq!(b.collect::<Vec<_>>(), vec![1.0, 2.0, 3.0]);
        rack.join().unwrap();
    }

    #[test]
    fn test_split_n_outputs_stay_in_lockstep() {
        let rack = Rack::new(Config::new(8.0).with_stream_capacity(1));
        let input: Vec<i64> = (0..50).collect();
        let mut outs = rack.split_n(stream(input.clone()), 4);
        assert_eq!(outs.len(), 4);

        // Read round-robin: with a one-value buffer no output can run ahead.
        let mut seen = vec![Vec::new(); 4];
        for _ in 0..input.len() {
            for (i, out) in outs.iter_mut().enumerate() {
                seen[i].push(out.next().unwrap());
            }
        }
        for out in outs.iter_mut() {
            assert_eq!(out.next(), None);
        }
        for values in seen {
            assert_eq!(values, input);
        }
        rack.join().unwrap();
    }

    #[test]
    fn test_mix_sums_constants_and_streams() {
        let rack = rack();
        let out = rack.mix(
            stream(vec![1.0, 2.0, 3.0]),
            [Param::from(10.0), Param::from(stream(vec![0.5, 0.25, 0.0]))],
        );
        assert_eq!(out.collect::<Vec<_>>(), vec![11.5, 12.25, 13.0]);
        rack.join().unwrap();
    }

    #[test]
    fn test_vca_multiplies() {
        let rack = rack();
        let out = rack.vca(
            stream(vec![1.0, -2.0, 4.0]),
            [Param::from(0.5), Param::from(stream(vec![2.0, 2.0, 0.0]))],
        );
        assert_eq!(out.collect::<Vec<_>>(), vec![1.0, -2.0, 0.0]);
        rack.join().unwrap();
    }

    #[test]
    fn test_vca_inverts_ramp() {
        let rack = rack();
        let inverted = rack.vca(stream(vec![0.0, 0.25, 1.0]), [Param::from(-1.0)]);
        let out = rack.mix(inverted, [Param::from(1.0)]);
        assert_eq!(out.collect::<Vec<_>>(), vec![1.0, 0.75, 0.0]);
        rack.join().unwrap();
    }

    #[test]
    fn test_fixed_and_constant_stream_params_agree() {
        let rack = rack();
        let base = vec![0.5, 1.0, 1.5, 2.0];

        let fixed = rack.vca(stream(base.clone()), [Param::from(3.0)]);
        let clock = stream(vec![(); base.len()]);
        let constant = rack.constant(clock, 3.0);
        let streamed = rack.vca(stream(base), [Param::from(constant)]);

        assert_eq!(fixed.collect::<Vec<_>>(), streamed.collect::<Vec<_>>());
        rack.join().unwrap();
    }

    #[test]
    fn test_fixed_and_constant_stream_terms_agree_for_mix() {
        let rack = rack();
        let base = vec![0.5, -1.0, 1.5, 2.0];

        let fixed = rack.mix(stream(base.clone()), [Param::from(0.25), Param::from(-2.0)]);
        let first = rack.constant(stream(vec![(); base.len()]), 0.25_f64);
        let second = rack.constant(stream(vec![(); base.len()]), -2.0_f64);
        let streamed = rack.mix(stream(base), [Param::from(first), Param::from(second)]);

        assert_eq!(fixed.collect::<Vec<_>>(), streamed.collect::<Vec<_>>());
        rack.join().unwrap();
    }

    #[test]
    fn test_fixed_and_constant_stream_candidates_agree_for_choose() {
        let rack = rack();
        let selector = vec![0.0, 1.0, 2.0, 1.4, -1.0];
        let ticks = selector.len();

        let fixed = rack
            .choose(
                stream(selector.clone()),
                [Param::from(1.0), Param::from(2.0), Param::from(3.0)],
            )
            .unwrap();
        let candidates: Vec<Param<f64>> = [1.0, 2.0, 3.0]
            .into_iter()
            .map(|v| Param::from(rack.constant(stream(vec![(); ticks]), v)))
            .collect();
        let streamed = rack.choose(stream(selector), candidates).unwrap();

        let fixed: Vec<f64> = fixed.collect();
        assert_eq!(fixed, vec![1.0, 2.0, 3.0, 2.0, 3.0]);
        assert_eq!(fixed, streamed.collect::<Vec<_>>());
        rack.join().unwrap();
    }

    #[test]
    fn test_choose_drains_every_candidate() {
        let rack = rack();
        let out = rack
            .choose(
                stream(vec![0.0, 1.2, 1.6, 3.0, -1.0]),
                [
                    Param::from(stream(vec![10.0, 11.0, 12.0, 13.0, 14.0])),
                    Param::from(stream(vec![20.0, 21.0, 22.0, 23.0, 24.0])),
                    Param::from(30.0),
                ],
            )
            .unwrap();
        // 3 wraps to 0, -1 wraps to the last candidate.
        assert_eq!(out.collect::<Vec<_>>(), vec![10.0, 21.0, 30.0, 13.0, 30.0]);
        rack.join().unwrap();
    }

    #[test]
    fn test_choose_rejects_empty_candidates() {
        let rack = rack();
        let result = rack.choose::<f64, _>(stream(vec![0.0]), Vec::new());
        assert!(matches!(result, Err(Error::EmptyTable("choose"))));
        drop(result);
        rack.join().unwrap();
    }

    #[test]
    fn test_map() {
        let rack = rack();
        let out = rack.map(stream(vec![1_i64, 2, 3]), |x| x as f64 * 0.5);
        assert_eq!(out.collect::<Vec<_>>(), vec![0.5, 1.0, 1.5]);
        rack.join().unwrap();
    }

    #[test]
    fn test_sink_drains() {
        let rack = Rack::new(Config::new(8.0).with_stream_capacity(1));
        let out = rack.map(stream(0..1000), |x: i32| x + 1);
        rack.sink(out);
        rack.join().unwrap();
    }
}
