//! Scheduler contract consumed by the actor core, and the default
//! worker-pool implementation
//!
//! The pending-reaction count tracks captured continuations waiting for a
//! matching message, which is what tells an idle pool that work is still
//! outstanding.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::message::ActorId;
use crate::reaction::Reaction;

/// Submission interface between the actor core and the worker pool.
pub trait Scheduler: Send + Sync {
    /// Run a bootstrap reaction (an actor's main body).
    fn start(&self, reaction: Reaction);

    /// Run a continuation reaction (a resumed handler).
    fn execute(&self, reaction: Reaction);

    /// The actor is no longer live.
    fn terminated(&self, actor: ActorId);

    /// Advisory per-reaction heartbeat; bookkeeping only.
    fn tick(&self, actor: ActorId);

    /// A continuation was captured and now waits for a matching message.
    fn pend_reaction(&self);

    /// A previously captured continuation was resumed or discarded.
    fn unpend_reaction(&self);

    /// Counters for observability.
    fn metrics(&self) -> &SchedulerMetrics;

    /// Stop accepting reactions. Workers finish their current reaction and
    /// exit; queued reactions are dropped.
    fn shutdown(&self);
}

/// Scheduler counters for monitoring and observability.
#[derive(Debug, Default)]
pub struct SchedulerMetrics {
    /// Reactions executed to completion (including suspensions).
    reactions_run: AtomicU64,

    /// Advisory ticks received from the reaction runner.
    ticks: AtomicU64,

    /// Captured continuations currently waiting for a message.
    pending_reactions: AtomicUsize,

    /// Actors started and not yet terminated.
    live_actors: AtomicUsize,
}

impl SchedulerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_reaction(&self) {
        self.reactions_run.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_pend(&self) {
        self.pending_reactions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unpend(&self) {
        self.pending_reactions.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn record_spawn(&self) {
        self.live_actors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_terminated(&self) {
        self.live_actors.fetch_sub(1, Ordering::Relaxed);
    }

    /// Total reactions executed.
    pub fn reactions_run(&self) -> u64 {
        self.reactions_run.load(Ordering::Relaxed)
    }

    /// Total advisory ticks.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Continuations currently pending on a message.
    pub fn pending_reactions(&self) -> usize {
        self.pending_reactions.load(Ordering::Relaxed)
    }

    /// Actors currently live.
    pub fn live_actors(&self) -> usize {
        self.live_actors.load(Ordering::Relaxed)
    }
}

/// Default scheduler: a fixed pool of named OS worker threads draining a
/// shared reaction queue.
///
/// Thread-based receives pin their worker while parked; size the pool for
/// the number of concurrently blocking actors.
pub struct ThreadPoolScheduler {
    tx: Mutex<Option<Sender<Reaction>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    metrics: SchedulerMetrics,
}

impl ThreadPoolScheduler {
    /// Create a pool with `workers` threads.
    pub fn new(workers: usize) -> Self {
        let (tx, rx) = unbounded::<Reaction>();

        let handles = (0..workers.max(1))
            .map(|i| {
                let rx = rx.clone();
                thread::Builder::new()
                    .name(format!("hypha-worker-{}", i))
                    .spawn(move || worker_loop(rx))
                    .expect("failed to spawn worker thread")
            })
            .collect();

        Self {
            tx: Mutex::new(Some(tx)),
            workers: Mutex::new(handles),
            metrics: SchedulerMetrics::new(),
        }
    }

    fn submit(&self, reaction: Reaction) {
        let guard = self.tx.lock();
        match guard.as_ref() {
            Some(tx) => {
                self.metrics.record_reaction();
                if tx.send(reaction).is_err() {
                    tracing::warn!("worker pool gone; reaction dropped");
                }
            }
            None => {
                tracing::warn!("scheduler shut down; reaction dropped");
            }
        }
    }
}

fn worker_loop(rx: Receiver<Reaction>) {
    tracing::debug!(worker = ?thread::current().name(), "worker starting");
    while let Ok(reaction) = rx.recv() {
        reaction.run();
    }
    tracing::debug!(worker = ?thread::current().name(), "worker stopped");
}

impl Scheduler for ThreadPoolScheduler {
    fn start(&self, reaction: Reaction) {
        self.metrics.record_spawn();
        self.submit(reaction);
    }

    fn execute(&self, reaction: Reaction) {
        self.submit(reaction);
    }

    fn terminated(&self, actor: ActorId) {
        tracing::trace!(actor = %actor, "scheduler notified of termination");
        self.metrics.record_terminated();
    }

    fn tick(&self, _actor: ActorId) {
        self.metrics.record_tick();
    }

    fn pend_reaction(&self) {
        self.metrics.record_pend();
    }

    fn unpend_reaction(&self) {
        self.metrics.record_unpend();
    }

    fn metrics(&self) -> &SchedulerMetrics {
        &self.metrics
    }

    fn shutdown(&self) {
        // Dropping the sender disconnects the channel; workers exit once
        // their current reaction finishes. Workers pinned by a parked
        // thread-based actor stay parked until the process exits.
        self.tx.lock().take();
        self.workers.lock().clear();
    }
}

impl Drop for ThreadPoolScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
