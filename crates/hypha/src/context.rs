//! Actor reference and execution context types
//!
//! Provides [`ActorRef`] for sending messages from anywhere and
//! [`ActorContext`] for use within actors (receive/react, sender and reply,
//! links, combinators).

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::actor::{ActorCore, ActorStatus, Cont};
use crate::error::{ActorError, Result};
use crate::message::{ActorId, ExitReason, Msg};
use crate::reaction::Step;
use crate::receive::Receive;

thread_local! {
    static CURRENT: RefCell<Option<ActorRef>> = RefCell::new(None);
}

/// Bind (or clear) the actor executing on this worker thread. Maintained
/// by the reaction runner.
pub(crate) fn set_current(actor: Option<ActorRef>) {
    CURRENT.with(|c| *c.borrow_mut() = actor);
}

/// The actor bound to the calling thread, or the null ref on non-actor
/// threads.
pub(crate) fn current() -> ActorRef {
    CURRENT.with(|c| c.borrow().clone().unwrap_or_else(ActorRef::null))
}

#[derive(Clone)]
enum RefTarget {
    Actor(Arc<ActorCore>),
    Reply(Arc<ReplySender>),
    Null,
}

/// Handle for sending messages to an actor.
///
/// Clonable and sendable across threads. A ref can also be a single-use
/// reply proxy (the sender seen by an [`ask`](ActorRef::ask) callee) or the
/// null sentinel.
#[derive(Clone)]
pub struct ActorRef {
    target: RefTarget,
}

impl ActorRef {
    pub(crate) fn from_core(core: Arc<ActorCore>) -> Self {
        Self {
            target: RefTarget::Actor(core),
        }
    }

    /// The no-sender sentinel.
    pub fn null() -> Self {
        Self {
            target: RefTarget::Null,
        }
    }

    pub(crate) fn core(&self) -> Option<&Arc<ActorCore>> {
        match &self.target {
            RefTarget::Actor(core) => Some(core),
            _ => None,
        }
    }

    pub fn id(&self) -> ActorId {
        match &self.target {
            RefTarget::Actor(core) => core.id(),
            RefTarget::Reply(sender) => sender.id,
            RefTarget::Null => ActorId::NULL,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.target, RefTarget::Null)
    }

    /// Lifecycle state; `None` for refs that are not real actors.
    pub fn status(&self) -> Option<ActorStatus> {
        self.core().map(|c| c.status())
    }

    /// Termination reason, once terminated.
    pub fn exit_reason(&self) -> Option<ExitReason> {
        self.core().and_then(|c| c.exit_reason())
    }

    /// Messages currently queued; 0 for non-actor refs.
    pub fn mailbox_len(&self) -> usize {
        self.core().map_or(0, |c| c.mailbox_len())
    }

    /// Asynchronous fire-and-forget send. The recorded sender is the actor
    /// bound to the calling thread; sends to a terminated actor are dropped.
    pub fn send<M: Any + Send>(&self, msg: M) {
        self.deliver(Box::new(msg), current());
    }

    pub(crate) fn deliver(&self, msg: Msg, sender: ActorRef) {
        match &self.target {
            RefTarget::Actor(core) => ActorCore::deliver(core, msg, sender),
            RefTarget::Reply(reply) => reply.cell.fulfill(msg),
            RefTarget::Null => {
                tracing::trace!("message to null ref dropped");
            }
        }
    }

    /// Synchronous request: send `msg` with a fresh single-use reply channel
    /// and block until the receiver replies. Fails with
    /// [`ActorError::NoReply`] if the receiver terminates without replying.
    pub fn ask<M: Any + Send>(&self, msg: M) -> Result<Msg> {
        self.ask_impl(Box::new(msg), None)
    }

    /// [`ask`](Self::ask) with a deadline.
    pub fn ask_within<M: Any + Send>(&self, msg: M, timeout: Duration) -> Result<Msg> {
        self.ask_impl(Box::new(msg), Some(timeout))
    }

    fn ask_impl(&self, msg: Msg, timeout: Option<Duration>) -> Result<Msg> {
        let cell = Arc::new(ReplyCell::new());
        let proxy = ActorRef {
            target: RefTarget::Reply(Arc::new(ReplySender {
                cell: cell.clone(),
                id: ActorId::new(),
            })),
        };
        self.deliver(msg, proxy);
        cell.wait(timeout)
    }
}

impl fmt::Debug for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorRef").field("id", &self.id()).finish()
    }
}

impl PartialEq for ActorRef {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for ActorRef {}

// ---- one-shot reply channel ------------------------------------------

struct ReplySlot {
    value: Option<Msg>,
    closed: bool,
}

struct ReplyCell {
    slot: Mutex<ReplySlot>,
    cv: Condvar,
}

impl ReplyCell {
    fn new() -> Self {
        Self {
            slot: Mutex::new(ReplySlot {
                value: None,
                closed: false,
            }),
            cv: Condvar::new(),
        }
    }

    fn fulfill(&self, msg: Msg) {
        let mut slot = self.slot.lock();
        if slot.closed || slot.value.is_some() {
            tracing::warn!("late or duplicate reply dropped");
            return;
        }
        slot.value = Some(msg);
        self.cv.notify_one();
    }

    fn close(&self) {
        let mut slot = self.slot.lock();
        slot.closed = true;
        self.cv.notify_one();
    }

    fn wait(&self, timeout: Option<Duration>) -> Result<Msg> {
        let deadline = timeout.map(|d| Instant::now() + d);
        let mut slot = self.slot.lock();
        loop {
            if let Some(msg) = slot.value.take() {
                slot.closed = true;
                return Ok(msg);
            }
            if slot.closed {
                return Err(ActorError::NoReply);
            }
            match deadline {
                None => self.cv.wait(&mut slot),
                Some(at) => {
                    if self.cv.wait_until(&mut slot, at).timed_out() && slot.value.is_none() {
                        slot.closed = true;
                        return Err(ActorError::Timeout(timeout.unwrap_or_default()));
                    }
                }
            }
        }
    }
}

/// Sender half of a reply channel. Dropping it unfulfilled closes the cell
/// so the asker fails fast instead of blocking forever.
struct ReplySender {
    cell: Arc<ReplyCell>,
    id: ActorId,
}

impl Drop for ReplySender {
    fn drop(&mut self) {
        self.cell.close();
    }
}

// ---- execution context ------------------------------------------------

/// Execution context available to an actor's own code.
///
/// Handed to the actor's body and to every handler arm. `recv*` parks the
/// current worker thread, `react*` captures a continuation and releases it.
pub struct ActorContext {
    pub(crate) core: Arc<ActorCore>,
    /// Whether the current reaction still holds a pushed sender frame;
    /// cleared at the `react` control-flow transfer.
    pub(crate) sender_frame: bool,
}

impl ActorContext {
    pub(crate) fn new(core: Arc<ActorCore>) -> Self {
        Self {
            core,
            sender_frame: false,
        }
    }

    /// This actor's id.
    pub fn id(&self) -> ActorId {
        self.core.id()
    }

    /// A ref to this actor, to hand to peers.
    pub fn self_ref(&self) -> ActorRef {
        ActorRef::from_core(self.core.clone())
    }

    // ---- receiving ----------------------------------------------------

    /// Thread-based receive: consume the oldest matching message, blocking
    /// the worker until one arrives.
    pub fn recv<R: 'static>(&mut self, f: Receive<R>) -> R {
        let core = self.core.clone();
        match core.receive_inner(self, f, None, None) {
            Ok(r) => r,
            Err(_) => unreachable!("receive without a deadline cannot time out"),
        }
    }

    /// [`recv`](Self::recv) restricted to messages sent by `source`.
    pub fn recv_from<R: 'static>(&mut self, source: &ActorRef, f: Receive<R>) -> R {
        let core = self.core.clone();
        match core.receive_inner(self, f, Some(source.id()), None) {
            Ok(r) => r,
            Err(_) => unreachable!("receive without a deadline cannot time out"),
        }
    }

    /// [`recv`](Self::recv) with a deadline. When it elapses, a
    /// [`Timeout`](crate::message::Timeout) sentinel is dispatched if `f`
    /// has an arm for it; otherwise [`ActorError::Timeout`] is returned.
    pub fn recv_within<R: 'static>(&mut self, timeout: Duration, f: Receive<R>) -> Result<R> {
        let core = self.core.clone();
        core.receive_inner(self, f, None, Some(timeout))
    }

    /// Event-based receive: submit a follow-up reaction if a queued message
    /// matches, otherwise detach `f` as this actor's continuation and
    /// release the worker. Only meaningful in tail position.
    pub fn react(&mut self, f: Receive<Step>) -> Step {
        let core = self.core.clone();
        ActorCore::react_inner(&core, self, f, None)
    }

    /// [`react`](Self::react) with a deadline: a timer feeds the
    /// [`Timeout`](crate::message::Timeout) sentinel through the normal
    /// send path.
    pub fn react_within(&mut self, timeout: Duration, f: Receive<Step>) -> Step {
        let core = self.core.clone();
        ActorCore::react_inner(&core, self, f, Some(timeout))
    }

    // ---- sender & reply -----------------------------------------------

    /// The sender of the message currently being handled, or the null ref.
    pub fn sender(&self) -> ActorRef {
        self.core.sender_top()
    }

    /// Send `msg` back to the current message's sender.
    pub fn reply<M: Any + Send>(&mut self, msg: M) {
        let target = self.sender();
        if target.is_null() {
            tracing::warn!(actor = %self.id(), "reply with no sender dropped");
            return;
        }
        target.deliver(Box::new(msg), self.self_ref());
    }

    /// Relay a message to `to`, preserving the original sender instead of
    /// substituting this actor.
    pub fn forward(&mut self, to: &ActorRef, msg: Msg) {
        to.deliver(msg, self.sender());
    }

    // ---- lifecycle ----------------------------------------------------

    /// Terminate this actor with `reason`.
    pub fn exit(&mut self, reason: impl Into<ExitReason>) -> Step {
        Step::Stop(reason.into())
    }

    /// Terminate this actor normally.
    pub fn stop(&mut self) -> Step {
        Step::Stop(ExitReason::Normal)
    }

    // ---- linking ------------------------------------------------------

    /// Link this actor and `peer` for exit propagation. Symmetric and
    /// idempotent; self-links are ignored.
    pub fn link(&mut self, peer: &ActorRef) {
        match peer.core() {
            Some(core) => self.core.shared().links.link(self.id(), core.id()),
            None => tracing::warn!(actor = %self.id(), "link to non-actor ref ignored"),
        }
    }

    /// Remove the link between this actor and `peer`, if any.
    pub fn unlink(&mut self, peer: &ActorRef) {
        if let Some(core) = peer.core() {
            self.core.shared().links.unlink(self.id(), core.id());
        }
    }

    /// When set, exit signals from linked peers arrive as ordinary
    /// [`Exit`](crate::message::Exit) messages instead of killing this
    /// actor.
    pub fn trap_exit(&mut self, on: bool) {
        self.core.set_trap_exit(on);
    }

    // ---- combinators --------------------------------------------------

    /// Queue `next` to run after the current block's chain completes.
    pub fn and_then<F>(&mut self, next: F)
    where
        F: FnOnce(&mut ActorContext) -> Step + Send + 'static,
    {
        self.core.push_cont(Cont::Then(Box::new(next)));
    }

    /// Re-run `body` every time its chain of reactions completes. Terminate
    /// from inside with [`exit`](Self::exit) or [`stop`](Self::stop).
    pub fn loop_with<F>(&mut self, body: F) -> Step
    where
        F: FnMut(&mut ActorContext) -> Step + Send + 'static,
    {
        let shared = Arc::new(Mutex::new(
            Box::new(body) as Box<dyn FnMut(&mut ActorContext) -> Step + Send>
        ));
        self.core.push_cont(Cont::Loop(shared.clone()));
        let mut b = shared.lock();
        (*b)(self)
    }

    /// [`loop_with`](Self::loop_with) that re-checks `cond` before every
    /// iteration and completes once it returns false.
    pub fn loop_while<C, F>(&mut self, cond: C, body: F) -> Step
    where
        C: FnMut() -> bool + Send + 'static,
        F: FnMut(&mut ActorContext) -> Step + Send + 'static,
    {
        let state = Arc::new(Mutex::new((cond, body)));
        loop_while_step(self, state)
    }

    /// Process every incoming message with `f`: a `react` whose handler
    /// re-arms itself after each invocation.
    pub fn event_loop<F>(&mut self, f: F) -> Step
    where
        F: FnMut(&mut ActorContext, Msg) + Send + 'static,
    {
        let f = Arc::new(Mutex::new(f));
        self.loop_with(move |ctx| {
            let f = f.clone();
            ctx.react(Receive::new().any(move |ctx, msg| {
                let mut handler = f.lock();
                (*handler)(ctx, msg);
                Step::Done
            }))
        })
    }
}

fn loop_while_step<C, F>(ctx: &mut ActorContext, state: Arc<Mutex<(C, F)>>) -> Step
where
    C: FnMut() -> bool + Send + 'static,
    F: FnMut(&mut ActorContext) -> Step + Send + 'static,
{
    let mut guard = state.lock();
    if !(guard.0)() {
        return Step::Done;
    }
    let next = state.clone();
    ctx.and_then(move |ctx| loop_while_step(ctx, next));
    (guard.1)(ctx)
}

/// Sequence two blocks: `then` runs after `first`'s chain of reactions
/// completes. Both may end in `react`.
pub fn seq<A, B>(first: A, then: B) -> impl FnOnce(&mut ActorContext) -> Step + Send
where
    A: FnOnce(&mut ActorContext) -> Step + Send + 'static,
    B: FnOnce(&mut ActorContext) -> Step + Send + 'static,
{
    move |ctx| {
        ctx.and_then(then);
        first(ctx)
    }
}
