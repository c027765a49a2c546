//! Actor core: lifecycle state, per-actor monitor, delivery, kill handling
//!
//! Every actor's mailbox-and-waiting state is serialized under one
//! `parking_lot::Mutex`. Senders take the receiver's monitor to append (so
//! per-sender FIFO holds by construction); the owner takes it to scan.
//! Monitors are never held across cross-actor calls.

use std::collections::HashSet;
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::context::{ActorContext, ActorRef};
use crate::error::{ActorError, Result};
use crate::mailbox::{Entry, Mailbox};
use crate::message::{ActorId, ExitReason, ExitSignal, Msg, Timeout};
use crate::reaction::{Reaction, Step};
use crate::receive::Receive;
use crate::runtime::RuntimeShared;
use crate::scheduler::Scheduler;
use crate::timer::{self, TimerHandle};

/// Lifecycle state of an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorStatus {
    /// Created, bootstrap reaction not yet run.
    New,
    /// A reaction is executing (or queued to execute).
    Running,
    /// Parked on the monitor inside a blocking receive.
    WaitingThread,
    /// Suspended with a captured continuation, owning no thread.
    WaitingEvent,
    /// Terminated; incoming messages are dropped.
    Terminated,
}

/// An actor's main body.
pub(crate) type Body = Box<dyn FnOnce(&mut ActorContext) -> Step + Send>;

type LoopBody = Arc<Mutex<Box<dyn FnMut(&mut ActorContext) -> Step + Send>>>;

/// One deferred block on the continuation chain, pushed by combinators and
/// popped by the reaction runner on `Done`.
pub(crate) enum Cont {
    /// Run once, then continue down the chain.
    Then(Body),
    /// Re-armed every time it runs; the chain form of `loop_with`.
    Loop(LoopBody),
}

type WaitPred = Box<dyn Fn(&Entry) -> bool + Send>;

struct Inner {
    mailbox: Mailbox,
    status: ActorStatus,
    /// Predicate of the wait in progress, thread- or event-based.
    waiting_for: Option<WaitPred>,
    /// Stored handler while event-suspended.
    continuation: Option<Receive<Step>>,
    /// Armed `react_within` timeout, if any.
    timer: Option<TimerHandle>,
    /// One frame per in-flight handler; `sender()` reads the top.
    sender_stack: Vec<ActorRef>,
    /// Combinator continuation chain.
    conts: Vec<Cont>,
    /// Exit requested by a linked peer, not yet honored.
    kill: Option<ExitReason>,
    /// Bootstrap body, taken exactly once.
    body: Option<Body>,
    exit_reason: Option<ExitReason>,
}

pub(crate) struct ActorCore {
    id: ActorId,
    shared: Arc<RuntimeShared>,
    monitor: Mutex<Inner>,
    resume_cv: Condvar,
    trap_exit: AtomicBool,
}

impl ActorCore {
    pub(crate) fn new(id: ActorId, shared: Arc<RuntimeShared>, body: Body) -> Self {
        Self {
            id,
            shared,
            monitor: Mutex::new(Inner {
                mailbox: Mailbox::new(),
                status: ActorStatus::New,
                waiting_for: None,
                continuation: None,
                timer: None,
                sender_stack: Vec::new(),
                conts: Vec::new(),
                kill: None,
                body: Some(body),
                exit_reason: None,
            }),
            resume_cv: Condvar::new(),
            trap_exit: AtomicBool::new(false),
        }
    }

    pub(crate) fn id(&self) -> ActorId {
        self.id
    }

    pub(crate) fn shared(&self) -> &Arc<RuntimeShared> {
        &self.shared
    }

    pub(crate) fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.shared.scheduler
    }

    pub(crate) fn status(&self) -> ActorStatus {
        self.monitor.lock().status
    }

    pub(crate) fn exit_reason(&self) -> Option<ExitReason> {
        self.monitor.lock().exit_reason.clone()
    }

    pub(crate) fn mailbox_len(&self) -> usize {
        self.monitor.lock().mailbox.len()
    }

    pub(crate) fn set_trap_exit(&self, on: bool) {
        self.trap_exit.store(on, Ordering::SeqCst);
    }

    pub(crate) fn traps_exits(&self) -> bool {
        self.trap_exit.load(Ordering::SeqCst)
    }

    // ---- reaction-runner support -------------------------------------

    /// Transition to `Running` at the start of a reaction. Returns false if
    /// the actor was terminated while the reaction sat in the queue.
    pub(crate) fn mark_running(&self) -> bool {
        let mut guard = self.monitor.lock();
        if matches!(guard.status, ActorStatus::Terminated) {
            false
        } else {
            guard.status = ActorStatus::Running;
            true
        }
    }

    pub(crate) fn take_body(&self) -> Option<Body> {
        self.monitor.lock().body.take()
    }

    pub(crate) fn push_sender(&self, sender: ActorRef) {
        self.monitor.lock().sender_stack.push(sender);
    }

    pub(crate) fn pop_sender(&self) {
        self.monitor.lock().sender_stack.pop();
    }

    pub(crate) fn sender_top(&self) -> ActorRef {
        self.monitor
            .lock()
            .sender_stack
            .last()
            .cloned()
            .unwrap_or_else(ActorRef::null)
    }

    pub(crate) fn push_cont(&self, cont: Cont) {
        self.monitor.lock().conts.push(cont);
    }

    pub(crate) fn pop_cont(&self) -> Option<Cont> {
        self.monitor.lock().conts.pop()
    }

    pub(crate) fn take_kill(&self) -> Option<ExitReason> {
        self.monitor.lock().kill.take()
    }

    // ---- send --------------------------------------------------------

    /// Append `(msg, sender)` and wake or resume the owner if its current
    /// predicate accepts the new entry.
    pub(crate) fn deliver(this: &Arc<Self>, msg: Msg, sender: ActorRef) {
        let mut guard = this.monitor.lock();

        if matches!(guard.status, ActorStatus::Terminated) {
            tracing::trace!(actor = %this.id, "message to terminated actor dropped");
            return;
        }

        guard.mailbox.push(msg, sender);

        match guard.status {
            ActorStatus::WaitingEvent => {
                let inner = &mut *guard;
                let matched = match (inner.waiting_for.as_ref(), inner.continuation.is_some()) {
                    (Some(pred), true) => inner.mailbox.extract_first_entry(|e| pred(e)),
                    _ => None,
                };
                if let Some(entry) = matched {
                    let handler = match guard.continuation.take() {
                        Some(h) => h,
                        None => unreachable!("event wait without a continuation"),
                    };
                    guard.waiting_for = None;
                    guard.status = ActorStatus::Running;
                    if let Some(t) = guard.timer.take() {
                        t.cancel();
                    }
                    this.shared.scheduler.unpend_reaction();
                    drop(guard);
                    this.shared
                        .scheduler
                        .execute(Reaction::resume(this.clone(), handler, entry));
                }
            }
            ActorStatus::WaitingThread => {
                let inner = &*guard;
                let wake = match (inner.waiting_for.as_ref(), inner.mailbox.back()) {
                    (Some(pred), Some(entry)) => pred(entry),
                    _ => false,
                };
                if wake {
                    guard.waiting_for = None;
                    this.resume_cv.notify_all();
                }
            }
            _ => {}
        }
    }

    // ---- thread-based wait -------------------------------------------

    /// Blocking receive shared by `recv`, `recv_from` and `recv_within`.
    /// Only the timed variant can fail.
    pub(crate) fn receive_inner<R: 'static>(
        &self,
        ctx: &mut ActorContext,
        f: Receive<R>,
        from: Option<ActorId>,
        timeout: Option<Duration>,
    ) -> Result<R> {
        let matcher = f.matcher();
        let deadline = timeout.map(|d| Instant::now() + d);

        loop {
            let mut guard = self.monitor.lock();

            if let Some(reason) = guard.kill.take() {
                drop(guard);
                panic::resume_unwind(Box::new(ExitSignal(reason)));
            }

            let hit = guard.mailbox.extract_first_entry(|e| {
                from.map_or(true, |id| e.sender.id() == id) && matcher.accepts(&e.msg)
            });

            if let Some(entry) = hit {
                guard.waiting_for = None;
                guard.status = ActorStatus::Running;
                guard.sender_stack.push(entry.sender);
                drop(guard);
                let result = f.dispatch(ctx, entry.msg);
                self.pop_sender();
                return Ok(result);
            }

            if let Some(at) = deadline {
                if Instant::now() >= at {
                    guard.waiting_for = None;
                    guard.status = ActorStatus::Running;
                    let sentinel: Msg = Box::new(Timeout);
                    if matcher.accepts(&sentinel) {
                        guard.sender_stack.push(ActorRef::null());
                        drop(guard);
                        let result = f.dispatch(ctx, sentinel);
                        self.pop_sender();
                        return Ok(result);
                    }
                    drop(guard);
                    return Err(ActorError::Timeout(timeout.unwrap_or_default()));
                }
            }

            let m = matcher.clone();
            guard.waiting_for = Some(Box::new(move |e: &Entry| {
                from.map_or(true, |id| e.sender.id() == id) && m.accepts(&e.msg)
            }));
            guard.status = ActorStatus::WaitingThread;

            match deadline {
                None => self.resume_cv.wait(&mut guard),
                Some(at) => {
                    // Spurious wakeups re-enter the loop with the remaining
                    // budget; wait_until does the arithmetic.
                    let _ = self.resume_cv.wait_until(&mut guard, at);
                }
            }

            guard.status = ActorStatus::Running;
        }
    }

    // ---- event-based wait --------------------------------------------

    /// Continuation-capturing receive shared by `react` and `react_within`.
    ///
    /// On hit the follow-up reaction is submitted, never run inline. Either
    /// way the current handler's sender frame is popped here, at the
    /// control-flow transfer point.
    pub(crate) fn react_inner(
        this: &Arc<Self>,
        ctx: &mut ActorContext,
        f: Receive<Step>,
        timeout: Option<Duration>,
    ) -> Step {
        let matcher = f.matcher();
        let mut guard = this.monitor.lock();

        if let Some(reason) = guard.kill.take() {
            return Step::Stop(reason);
        }

        if ctx.sender_frame {
            guard.sender_stack.pop();
            ctx.sender_frame = false;
        }

        let hit = guard.mailbox.extract_first(|m| matcher.accepts(m));

        match hit {
            Some(entry) => {
                guard.waiting_for = None;
                if let Some(t) = guard.timer.take() {
                    t.cancel();
                }
                drop(guard);
                this.shared
                    .scheduler
                    .execute(Reaction::resume(this.clone(), f, entry));
                Step::Suspended
            }
            None => {
                let m = matcher.clone();
                guard.waiting_for = Some(Box::new(move |e: &Entry| m.accepts(&e.msg)));
                guard.continuation = Some(f);
                guard.status = ActorStatus::WaitingEvent;
                if let Some(d) = timeout {
                    let handle = timer::schedule_timeout(this.clone(), d);
                    if let Some(old) = guard.timer.replace(handle) {
                        old.cancel();
                    }
                }
                this.shared.scheduler.pend_reaction();
                Step::Suspended
            }
        }
    }

    // ---- kill & termination ------------------------------------------

    /// Exit request from a linked peer. Running actors are not interrupted
    /// mid-handler; the kill is honored at the next suspension point.
    pub(crate) fn kill(this: &Arc<Self>, reason: ExitReason, visited: &mut HashSet<ActorId>) {
        if visited.contains(&this.id) {
            return;
        }

        let mut guard = this.monitor.lock();
        match guard.status {
            ActorStatus::Terminated => {}
            ActorStatus::WaitingEvent => {
                // The captured continuation is discarded, so the pool must
                // forget the pending reaction.
                if guard.continuation.take().is_some() {
                    this.shared.scheduler.unpend_reaction();
                }
                guard.waiting_for = None;
                if let Some(t) = guard.timer.take() {
                    t.cancel();
                }
                drop(guard);
                ActorCore::terminate_with(this, reason, visited);
            }
            ActorStatus::WaitingThread => {
                guard.kill = Some(reason);
                this.resume_cv.notify_all();
            }
            ActorStatus::Running => {
                guard.kill = Some(reason);
            }
            ActorStatus::New => {
                drop(guard);
                ActorCore::terminate_with(this, reason, visited);
            }
        }
    }

    /// Honors a kill that landed while the handler was still running, so it
    /// does not strand a parked continuation.
    pub(crate) fn honor_parked_kill(this: &Arc<Self>) {
        let reason = {
            let mut guard = this.monitor.lock();
            if guard.kill.is_some() && matches!(guard.status, ActorStatus::WaitingEvent) {
                if guard.continuation.take().is_some() {
                    this.shared.scheduler.unpend_reaction();
                }
                guard.waiting_for = None;
                if let Some(t) = guard.timer.take() {
                    t.cancel();
                }
                guard.kill.take()
            } else {
                None
            }
        };
        if let Some(reason) = reason {
            ActorCore::terminate(this, reason);
        }
    }

    pub(crate) fn terminate(this: &Arc<Self>, reason: ExitReason) {
        let mut visited = HashSet::new();
        ActorCore::terminate_with(this, reason, &mut visited);
    }

    /// Mark terminated, drop retained state, then propagate over links and
    /// notify the runtime and scheduler. `visited` caps propagation over
    /// cyclic link graphs.
    pub(crate) fn terminate_with(
        this: &Arc<Self>,
        reason: ExitReason,
        visited: &mut HashSet<ActorId>,
    ) {
        {
            let mut guard = this.monitor.lock();
            if matches!(guard.status, ActorStatus::Terminated) {
                return;
            }
            guard.status = ActorStatus::Terminated;
            guard.exit_reason = Some(reason.clone());
            if guard.continuation.take().is_some() {
                this.shared.scheduler.unpend_reaction();
            }
            guard.waiting_for = None;
            if let Some(t) = guard.timer.take() {
                t.cancel();
            }
            guard.conts.clear();
            guard.sender_stack.clear();
            guard.body = None;
            guard.kill = None;
            guard.mailbox.clear();
        }

        visited.insert(this.id);
        tracing::debug!(actor = %this.id, reason = %reason, "actor terminated");

        this.shared.links.exit_linked(this, &reason, visited);
        this.shared.actor_terminated(this.id);
    }
}
