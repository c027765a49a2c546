//! One-shot timeout delivery for timed event waits
//!
//! A sleeper thread drops the [`Timeout`] sentinel into the actor's mailbox
//! through the normal send path unless cancelled first. Cancellation is
//! best-effort; a stale sentinel simply never matches later predicates.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::actor::ActorCore;
use crate::context::ActorRef;
use crate::message::Timeout;

/// Handle to a scheduled timeout; cancel it before it fires.
#[derive(Clone)]
pub(crate) struct TimerHandle {
    cancelled: Arc<AtomicBool>,
}

impl TimerHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

/// Deliver [`Timeout`] to `target` after `delay` unless cancelled.
pub(crate) fn schedule_timeout(target: Arc<ActorCore>, delay: Duration) -> TimerHandle {
    let cancelled = Arc::new(AtomicBool::new(false));
    let handle = TimerHandle {
        cancelled: cancelled.clone(),
    };

    thread::Builder::new()
        .name("hypha-timer".into())
        .spawn(move || {
            thread::sleep(delay);
            if !cancelled.load(Ordering::SeqCst) {
                ActorCore::deliver(&target, Box::new(Timeout), ActorRef::null());
            }
        })
        .expect("failed to spawn timer thread");

    handle
}
