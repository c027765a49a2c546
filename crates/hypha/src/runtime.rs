//! Runtime for spawning actors and tracking liveness
//!
//! Owns the pieces shared by every actor: the scheduler, the id-to-ref
//! registry, and the link graph.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};

use crate::actor::ActorCore;
use crate::config::RuntimeConfig;
use crate::context::{ActorContext, ActorRef};
use crate::links::LinkRegistry;
use crate::message::ActorId;
use crate::reaction::{Reaction, Step};
use crate::scheduler::{Scheduler, SchedulerMetrics, ThreadPoolScheduler};

pub(crate) struct RuntimeShared {
    pub(crate) scheduler: Arc<dyn Scheduler>,
    pub(crate) registry: DashMap<ActorId, ActorRef>,
    pub(crate) links: LinkRegistry,
    live: Mutex<usize>,
    quiesce: Condvar,
}

impl RuntimeShared {
    /// Remove a terminated actor from the registry, update the live count,
    /// and notify the scheduler.
    pub(crate) fn actor_terminated(&self, id: ActorId) {
        self.registry.remove(&id);
        {
            let mut live = self.live.lock();
            *live = live.saturating_sub(1);
            if *live == 0 {
                self.quiesce.notify_all();
            }
        }
        self.scheduler.terminated(id);
    }
}

/// Runtime for spawning and supervising actors.
///
/// # Example
///
/// ```ignore
/// use hypha::{ActorRuntime, Receive, Step};
///
/// let runtime = ActorRuntime::new();
/// let echo = runtime.spawn(|ctx| {
///     ctx.event_loop(|ctx, msg| {
///         let from = ctx.sender();
///         ctx.forward(&from, msg);
///     })
/// });
/// echo.send("hello");
/// ```
#[derive(Clone)]
pub struct ActorRuntime {
    shared: Arc<RuntimeShared>,
}

impl ActorRuntime {
    /// Create a runtime with the default worker pool.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a runtime with a custom configuration.
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self::with_scheduler(Arc::new(ThreadPoolScheduler::new(config.workers)))
    }

    /// Create a runtime on a caller-provided scheduler.
    pub fn with_scheduler(scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            shared: Arc::new(RuntimeShared {
                scheduler,
                registry: DashMap::new(),
                links: LinkRegistry::new(),
                live: Mutex::new(0),
                quiesce: Condvar::new(),
            }),
        }
    }

    /// Create and start an actor whose behavior is `body`, returning its
    /// handle. The bootstrap reaction is submitted exactly once.
    pub fn spawn<F>(&self, body: F) -> ActorRef
    where
        F: FnOnce(&mut ActorContext) -> Step + Send + 'static,
    {
        let id = ActorId::new();
        let core = Arc::new(ActorCore::new(id, self.shared.clone(), Box::new(body)));
        let actor_ref = ActorRef::from_core(core.clone());

        self.shared.registry.insert(id, actor_ref.clone());
        *self.shared.live.lock() += 1;

        tracing::debug!(actor = %id, "spawning actor");
        self.shared.scheduler.start(Reaction::bootstrap(core));

        actor_ref
    }

    /// Number of actors started and not yet terminated.
    pub fn live_actors(&self) -> usize {
        *self.shared.live.lock()
    }

    /// Block until no live actors remain. An actor suspended on a captured
    /// continuation is still live.
    pub fn join(&self) {
        let mut live = self.shared.live.lock();
        while *live > 0 {
            self.shared.quiesce.wait(&mut live);
        }
    }

    /// [`join`](Self::join) with a deadline; returns whether the system
    /// became quiescent in time.
    pub fn join_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut live = self.shared.live.lock();
        while *live > 0 {
            if self.shared.quiesce.wait_until(&mut live, deadline).timed_out() {
                return *live == 0;
            }
        }
        true
    }

    /// Current link peers of `actor`, for diagnostics.
    pub fn linked(&self, actor: &ActorRef) -> Vec<ActorId> {
        self.shared.links.linked(actor.id())
    }

    /// Scheduler counters.
    pub fn metrics(&self) -> &SchedulerMetrics {
        self.shared.scheduler.metrics()
    }

    /// Stop the scheduler. Queued reactions are dropped; workers exit after
    /// finishing their current reaction.
    pub fn shutdown(&self) {
        tracing::debug!("runtime shutting down");
        self.shared.scheduler.shutdown();
    }
}

impl Default for ActorRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ActorStatus;
    use std::time::Duration;

    #[test]
    fn test_spawn_runs_body_to_completion() {
        let runtime = ActorRuntime::with_config(RuntimeConfig::default().with_workers(2));
        let (tx, rx) = std::sync::mpsc::channel();

        let actor = runtime.spawn(move |_ctx| {
            tx.send(42).ok();
            Step::Done
        });

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).ok(), Some(42));
        assert!(runtime.join_timeout(Duration::from_secs(5)));
        assert_eq!(actor.status(), Some(ActorStatus::Terminated));
        assert_eq!(runtime.live_actors(), 0);
    }

    #[test]
    fn test_metrics_track_spawn_and_termination() {
        let runtime = ActorRuntime::with_config(RuntimeConfig::default().with_workers(2));

        runtime.spawn(|_ctx| Step::Done);
        runtime.spawn(|_ctx| Step::Done);

        assert!(runtime.join_timeout(Duration::from_secs(5)));
        assert_eq!(runtime.metrics().live_actors(), 0);
        assert!(runtime.metrics().reactions_run() >= 2);
    }
}
