//! Reactions: one scheduled execution of one handler (or of an actor's
//! bootstrap body) on a pool worker
//!
//! The runner binds the current-actor handle, contains panics, and
//! interprets the [`Step`] the block returns. `Done` advances the
//! continuation chain inline (loops stay iterative); `Suspended` ends the
//! reaction, which is what gives `react` its tail-call semantics.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::actor::{ActorCore, Body, Cont};
use crate::context::{self, ActorContext};
use crate::mailbox::Entry;
use crate::message::{ExitReason, ExitSignal};
use crate::receive::Receive;

/// What an actor block wants after running.
#[derive(Debug)]
pub enum Step {
    /// The block finished; run the next continuation-chain entry, or
    /// terminate normally if the chain is empty.
    Done,

    /// A continuation was captured (or a follow-up reaction submitted);
    /// the current reaction ends and the worker is released.
    Suspended,

    /// Terminate the actor with the given reason.
    Stop(ExitReason),
}

enum Task {
    Bootstrap,
    Resume { handler: Receive<Step>, entry: Entry },
}

/// One unit of scheduled work: an actor plus its bootstrap body or a
/// resumed handler with the matched message.
pub struct Reaction {
    core: Arc<ActorCore>,
    task: Task,
}

enum Outcome {
    Step(Step),
    Panicked(ExitReason),
}

impl Reaction {
    pub(crate) fn bootstrap(core: Arc<ActorCore>) -> Self {
        Self {
            core,
            task: Task::Bootstrap,
        }
    }

    pub(crate) fn resume(core: Arc<ActorCore>, handler: Receive<Step>, entry: Entry) -> Self {
        Self {
            core,
            task: Task::Resume { handler, entry },
        }
    }

    /// The actor this reaction belongs to.
    pub fn actor_id(&self) -> crate::message::ActorId {
        self.core.id()
    }

    /// Execute on the calling thread. Invoked by scheduler workers.
    pub fn run(self) {
        let Reaction { core, task } = self;
        let id = core.id();

        // Killed while still queued: nothing to run.
        if !core.mark_running() {
            return;
        }

        let mut ctx = ActorContext::new(core.clone());
        context::set_current(Some(ctx.self_ref()));

        let mut outcome = match task {
            Task::Bootstrap => match core.take_body() {
                Some(body) => run_block(&mut ctx, body),
                None => Outcome::Step(Step::Done),
            },
            Task::Resume { handler, entry } => {
                core.push_sender(entry.sender);
                ctx.sender_frame = true;
                let msg = entry.msg;
                let out = run_block(&mut ctx, Box::new(move |ctx| handler.dispatch(ctx, msg)));
                // The frame is popped at the react transfer point; only pop
                // here if the handler finished without suspending again.
                if ctx.sender_frame {
                    core.pop_sender();
                    ctx.sender_frame = false;
                }
                out
            }
        };

        loop {
            match outcome {
                Outcome::Step(Step::Suspended) => {
                    // A kill that landed mid-handler must not strand a
                    // parked continuation.
                    ActorCore::honor_parked_kill(&core);
                    break;
                }
                Outcome::Step(Step::Done) => {
                    if let Some(reason) = core.take_kill() {
                        ActorCore::terminate(&core, reason);
                        break;
                    }
                    match core.pop_cont() {
                        Some(Cont::Then(body)) => outcome = run_block(&mut ctx, body),
                        Some(Cont::Loop(shared)) => {
                            // The loop entry goes back on the chain first so
                            // the body's own continuations run before the
                            // next iteration.
                            core.push_cont(Cont::Loop(shared.clone()));
                            outcome = run_block(
                                &mut ctx,
                                Box::new(move |ctx| {
                                    let mut body = shared.lock();
                                    (*body)(ctx)
                                }),
                            );
                        }
                        None => {
                            ActorCore::terminate(&core, ExitReason::Normal);
                            break;
                        }
                    }
                }
                Outcome::Step(Step::Stop(reason)) => {
                    ActorCore::terminate(&core, reason);
                    break;
                }
                Outcome::Panicked(reason) => {
                    ActorCore::terminate(&core, reason);
                    break;
                }
            }
        }

        context::set_current(None);
        core.scheduler().tick(id);
    }
}

fn run_block(ctx: &mut ActorContext, body: Body) -> Outcome {
    match panic::catch_unwind(AssertUnwindSafe(|| body(ctx))) {
        Ok(step) => Outcome::Step(step),
        Err(payload) => match payload.downcast::<ExitSignal>() {
            // Internal control signal: a kill ejected a blocking wait.
            Ok(signal) => Outcome::Step(Step::Stop(signal.0)),
            Err(payload) => Outcome::Panicked(panic_reason(payload)),
        },
    }
}

fn panic_reason(payload: Box<dyn Any + Send>) -> ExitReason {
    let text = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    };
    ExitReason::from(text)
}
