//! Rack: node runtime and graph builder
//!
//! Every combinator instance is a [`Node`] running on its own thread. Nodes
//! talk only through bounded [`Stream`]s, so the whole graph is a Kahn
//! process network: a node blocks on receive until each input has produced
//! the value for the current tick, and blocks on send while its consumer's
//! buffer is full. Because each node consumes exactly one value per input
//! per tick, tick N at the root clock is tick N everywhere downstream.
//!
//! ## Shutdown
//!
//! Only the root clock ([`Rack::dirac_every`]) has an explicit stop signal.
//! When it stops, its sender is dropped; every downstream node sees the end
//! of its input, stops, and drops its own output in turn. A node whose
//! consumer has gone away stops as well, so dropping the terminal stream
//! unwinds the graph from the other side. After both, [`Rack::join`]
//! returns.
//!
//! ```rust
//! use procrastinate::prelude::*;
//!
//! let rack = Rack::new(Config::new(8.0));
//! let gate: Stream<bool> = [true, false, false, true].into_iter().collect();
//! let steps = rack.stepwise(gate, vec![1.0, 2.0]).unwrap();
//! assert_eq!(steps.collect::<Vec<_>>(), vec![1.0, 1.0, 1.0, 2.0]);
//! rack.join().unwrap();
//! ```

use crate::config::Config;
use crate::error::Error;
use crate::stream::{make_stream, Stream};
use crossbeam::channel::{bounded, Receiver, Sender};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread::JoinHandle;
use tracing::{debug, error, warn};

/// A stateful processor that produces one value per tick.
///
/// Implementations read exactly one value from each of their inputs per
/// call. Returning `None` means an input has ended and the node is done.
pub trait Node: Send + 'static {
    type Out: Send + 'static;

    /// Compute the value for the next tick.
    fn tick(&mut self) -> Option<Self::Out>;
}

/// Sending half of the root clock's stop signal.
///
/// Dropping the handle stops the clock too.
#[derive(Debug)]
pub struct StopHandle(Sender<()>);

impl StopHandle {
    pub fn stop(self) {
        // A full or disconnected channel means the clock is already stopping.
        let _ = self.0.try_send(());
    }
}

/// Receiving half of the root clock's stop signal.
#[derive(Debug)]
pub struct StopSignal(pub(crate) Receiver<()>);

/// Create a linked stop handle and signal.
pub fn stop_signal() -> (StopHandle, StopSignal) {
    let (tx, rx) = bounded(1);
    (StopHandle(tx), StopSignal(rx))
}

/// Owns the configuration and the threads of one processing graph.
pub struct Rack {
    config: Config,
    spawned: AtomicU64,
    handles: Mutex<Vec<JoinHandle<()>>>,
    // Names of node threads the OS refused to start.
    failed: Mutex<Vec<String>>,
}

impl Rack {
    pub fn new(config: Config) -> Self {
        if config.stream_capacity == 0 {
            warn!("stream capacity of zero makes every send a rendezvous");
        }
        Self {
            config,
            spawned: AtomicU64::new(0),
            handles: Mutex::new(Vec::new()),
            failed: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of nodes spawned so far.
    pub fn node_count(&self) -> u64 {
        self.spawned.load(Ordering::Relaxed)
    }

    /// Create a stream with this rack's buffer capacity.
    pub fn make_stream<T>(&self) -> (Sender<T>, Stream<T>) {
        make_stream(self.config.stream_capacity)
    }

    /// Run `node` on its own thread and return its output stream.
    pub fn spawn<N: Node>(&self, name: &'static str, mut node: N) -> Stream<N::Out> {
        let (tx, stream) = self.make_stream();
        self.launch(name, move || {
            let mut ticks: u64 = 0;
            while let Some(value) = node.tick() {
                if tx.send(value).is_err() {
                    break;
                }
                ticks += 1;
            }
            debug!(node = name, ticks, "node stopped");
        });
        stream
    }

    /// Run a node producing one value per output and fan each value out to
    /// its own stream. All outputs advance together.
    pub fn spawn_fanout<N, T>(&self, name: &'static str, node: N, width: usize) -> Vec<Stream<T>>
    where
        N: Node<Out = Vec<T>>,
        T: Send + 'static,
    {
        let (senders, streams): (Vec<_>, Vec<_>) = (0..width).map(|_| self.make_stream()).unzip();
        self.run_fanout(name, node, senders);
        streams
    }

    /// Like [`Rack::spawn_fanout`] with a width known at compile time.
    pub fn spawn_fanout_array<N, T, const W: usize>(&self, name: &'static str, node: N) -> [Stream<T>; W]
    where
        N: Node<Out = Vec<T>>,
        T: Send + 'static,
    {
        let mut senders = Vec::with_capacity(W);
        let streams = std::array::from_fn(|_| {
            let (tx, stream) = self.make_stream();
            senders.push(tx);
            stream
        });
        self.run_fanout(name, node, senders);
        streams
    }

    fn run_fanout<N, T>(&self, name: &'static str, mut node: N, senders: Vec<Sender<T>>)
    where
        N: Node<Out = Vec<T>>,
        T: Send + 'static,
    {
        self.launch(name, move || {
            let mut ticks: u64 = 0;
            while let Some(values) = node.tick() {
                // Outputs whose consumer has gone are skipped; the node
                // stops once nobody is listening.
                let mut delivered = false;
                for (tx, value) in senders.iter().zip(values) {
                    delivered |= tx.send(value).is_ok();
                }
                if !delivered {
                    break;
                }
                ticks += 1;
            }
            debug!(node = name, ticks, outputs = senders.len(), "node stopped");
        });
    }

    /// Start a node thread.
    pub(crate) fn launch<F>(&self, name: &'static str, body: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let index = self.spawned.fetch_add(1, Ordering::Relaxed);
        let thread_name = format!("{}-{}", name, index);
        debug!(node = name, index, "node started");
        let spawned = std::thread::Builder::new()
            .name(thread_name.clone())
            .spawn(body);
        self.record_launch(thread_name, spawned);
    }

    /// Keep the handle of a started thread, or remember that it failed so
    /// that [`Rack::join`] reports it.
    fn record_launch(&self, thread_name: String, spawned: std::io::Result<JoinHandle<()>>) {
        match spawned {
            Ok(handle) => self
                .handles
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(handle),
            Err(e) => {
                error!(node = %thread_name, error = %e, "failed to spawn node thread");
                self.failed
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(thread_name);
            }
        }
    }

    /// A fresh random generator for a node.
    ///
    /// With a configured seed, generators are derived from the seed and the
    /// number of nodes spawned so far, so a graph built in the same order
    /// produces the same output.
    pub(crate) fn rng(&self) -> StdRng {
        match self.config.seed {
            Some(seed) => {
                let index = self.spawned.load(Ordering::Relaxed);
                StdRng::seed_from_u64(seed ^ index.wrapping_mul(0x9e37_79b9_7f4a_7c15))
            }
            None => StdRng::from_entropy(),
        }
    }

    /// Wait for every node thread to finish.
    ///
    /// Only returns once the root clock has stopped (or every source has
    /// run dry) and every terminal stream has been drained or dropped. A
    /// node that could not be started is reported first, then the first
    /// node that panicked.
    pub fn join(self) -> Result<(), Error> {
        let handles = self
            .handles
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        let mut failure = self
            .failed
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .into_iter()
            .next()
            .map(Error::SpawnFailed);
        for handle in handles {
            let name = handle.thread().name().unwrap_or("node").to_string();
            if handle.join().is_err() && failure.is_none() {
                failure = Some(Error::NodePanicked(name));
            }
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Default for Rack {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
