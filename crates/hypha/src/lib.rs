//! Lightweight actors on a shared worker-thread pool
//!
//! Each actor is an isolated unit of computation with a private mailbox;
//! actors communicate only by message passing and may link to one another
//! for failure propagation. Two waiting disciplines share one mailbox and
//! one matching predicate:
//!
//! - **Thread-based** ([`ActorContext::recv`]): block the current worker
//!   until a matching message arrives.
//! - **Event-based** ([`ActorContext::react`]): detach the handler as the
//!   actor's continuation and release the worker back to the pool; a later
//!   matching send resumes the actor as a fresh reaction.
//!
//! # Example
//!
//! ```ignore
//! use hypha::{ActorRuntime, Receive, Step};
//!
//! struct Ping;
//! struct Pong;
//!
//! let runtime = ActorRuntime::new();
//!
//! let ponger = runtime.spawn(|ctx| {
//!     ctx.event_loop(|ctx, msg| {
//!         if msg.is::<Ping>() {
//!             ctx.reply(Pong);
//!         }
//!     })
//! });
//!
//! let reply = ponger.ask(Ping).unwrap();
//! assert!(reply.is::<Pong>());
//! ```
//!
//! # Linking and exits
//!
//! [`ActorContext::link`] ties two actors together: when one terminates,
//! the other is killed with the same reason, unless the reason is normal
//! or the survivor set [`ActorContext::trap_exit`], in which case it
//! receives the [`Exit`] signal as an ordinary message instead.

mod actor;
mod links;
mod mailbox;
mod timer;

pub mod config;
pub mod context;
pub mod error;
pub mod message;
pub mod reaction;
pub mod receive;
pub mod runtime;
pub mod scheduler;

pub use actor::ActorStatus;
pub use config::RuntimeConfig;
pub use context::{seq, ActorContext, ActorRef};
pub use error::{ActorError, Result};
pub use message::{ActorId, Exit, ExitReason, Msg, Timeout};
pub use reaction::{Reaction, Step};
pub use receive::{choose, Receive};
pub use runtime::ActorRuntime;
pub use scheduler::{Scheduler, SchedulerMetrics, ThreadPoolScheduler};
