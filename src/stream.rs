//! Streams and parameters
//!
//! A [`Stream`] is the receiving end of a bounded FIFO channel between two
//! nodes. It has exactly one producer and exactly one consumer: the type is
//! deliberately not `Clone`, and duplicating a signal requires an explicit
//! split node (see [`Rack::split`](crate::rack::Rack::split)).
//!
//! A [`Param`] is what most combinators accept in their argument slots:
//! either a fixed value or a live stream. Resolving a param once per tick
//! lets the same node take a constant cutoff or a modulated one.
//!
//! ```rust
//! use procrastinate::stream::{Param, Stream};
//!
//! let mut fixed = Param::from(0.5);
//! let mut live = Param::from([0.1, 0.2].into_iter().collect::<Stream<f64>>());
//!
//! assert_eq!(fixed.read(), Some(0.5));
//! assert_eq!(live.read(), Some(0.1));
//! assert_eq!(live.read(), Some(0.2));
//! assert_eq!(live.read(), None);
//! ```

use crate::oscillator::Waveshape;
use crossbeam::channel::{bounded, unbounded, Receiver, Sender};
use std::time::Duration;

/// Create a bounded stream and its sending half.
pub fn make_stream<T>(capacity: usize) -> (Sender<T>, Stream<T>) {
    let (tx, rx) = bounded(capacity);
    (tx, Stream { rx })
}

/// The consuming end of a single-producer, single-consumer channel.
///
/// Reading blocks until the producer has sent a value. Once the producer
/// has stopped and the buffer is drained, reads return `None`.
pub struct Stream<T> {
    rx: Receiver<T>,
}

impl<T> Stream<T> {
    /// Block for the next value, or `None` once the producer has stopped.
    #[inline]
    pub fn recv(&self) -> Option<T> {
        self.rx.recv().ok()
    }

    /// Number of values currently buffered.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl<T> Iterator for Stream<T> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        self.recv()
    }
}

/// A pre-filled stream that ends after the last collected value.
impl<T> FromIterator<T> for Stream<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let (tx, rx) = unbounded();
        for value in iter {
            // The receiver is held right here, so the send cannot fail.
            let _ = tx.send(value);
        }
        Stream { rx }
    }
}

impl<T> std::fmt::Debug for Stream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("buffered", &self.rx.len())
            .finish()
    }
}

/// A fixed value or a stream, resolved once per tick.
#[derive(Debug)]
pub enum Param<T> {
    Fixed(T),
    Stream(Stream<T>),
}

impl<T: Clone> Param<T> {
    /// Resolve the value for the current tick.
    ///
    /// A fixed value yields itself forever. A stream yields its next value,
    /// blocking until it arrives, and `None` once it has ended.
    #[inline]
    pub fn read(&mut self) -> Option<T> {
        match self {
            Param::Fixed(value) => Some(value.clone()),
            Param::Stream(stream) => stream.recv(),
        }
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, Param::Fixed(_))
    }
}

impl<T> From<Stream<T>> for Param<T> {
    fn from(stream: Stream<T>) -> Self {
        Param::Stream(stream)
    }
}

macro_rules! fixed_param {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Param<$ty> {
                fn from(value: $ty) -> Self {
                    Param::Fixed(value)
                }
            }
        )*
    };
}

fixed_param!(f64, bool, i64, usize, Duration, Waveshape);

/// Resolve every param for the current tick, in order.
///
/// All params are read even after one has ended so that every producer
/// advances by exactly one value.
pub(crate) fn read_all<T: Clone>(params: &mut [Param<T>]) -> Option<Vec<T>> {
    let mut values = Vec::with_capacity(params.len());
    let mut ended = false;
    for param in params.iter_mut() {
        match param.read() {
            Some(value) => values.push(value),
            None => ended = true,
        }
    }
    if ended {
        None
    } else {
        Some(values)
    }
}
