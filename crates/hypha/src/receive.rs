//! Partial message handlers
//!
//! A [`Receive`] is an ordered list of arms, each pairing a predicate over
//! the type-erased message with a body to run on the match. The predicate
//! side doubles as the actor's waiting predicate while it is parked.
//!
//! ```ignore
//! let handler = Receive::new()
//!     .on::<Ping>(|ctx, _ping| {
//!         ctx.reply(Pong);
//!         Step::Done
//!     })
//!     .on::<Stop>(|ctx, _stop| ctx.stop());
//! ctx.react(handler)
//! ```

use std::any::Any;
use std::sync::Arc;

use crate::context::ActorContext;
use crate::message::Msg;

type ArmPred = Arc<dyn Fn(&Msg) -> bool + Send + Sync>;
type ArmBody<R> = Box<dyn FnOnce(&mut ActorContext, Msg) -> R + Send>;

struct Arm<R> {
    pred: ArmPred,
    body: ArmBody<R>,
}

/// A partial handler: consumes the first queued message matching any of
/// its arms, in arm order for a given message. Single-use; looping
/// constructs rebuild their handler on every iteration.
pub struct Receive<R> {
    arms: Vec<Arm<R>>,
}

impl<R: 'static> Receive<R> {
    pub fn new() -> Self {
        Self { arms: Vec::new() }
    }

    /// Add an arm matching messages of type `T`.
    pub fn on<T, F>(mut self, body: F) -> Self
    where
        T: Any + Send,
        F: FnOnce(&mut ActorContext, T) -> R + Send + 'static,
    {
        self.arms.push(Arm {
            pred: Arc::new(|msg: &Msg| msg.is::<T>()),
            body: Box::new(move |ctx, msg| match msg.downcast::<T>() {
                Ok(value) => body(ctx, *value),
                Err(_) => unreachable!("arm predicate already checked the type"),
            }),
        });
        self
    }

    /// Add an arm matching messages of type `T` that also satisfy `guard`.
    pub fn on_when<T, P, F>(mut self, guard: P, body: F) -> Self
    where
        T: Any + Send,
        P: Fn(&T) -> bool + Send + Sync + 'static,
        F: FnOnce(&mut ActorContext, T) -> R + Send + 'static,
    {
        self.arms.push(Arm {
            pred: Arc::new(move |msg: &Msg| {
                msg.downcast_ref::<T>().map_or(false, |v| guard(v))
            }),
            body: Box::new(move |ctx, msg| match msg.downcast::<T>() {
                Ok(value) => body(ctx, *value),
                Err(_) => unreachable!("arm predicate already checked the type"),
            }),
        });
        self
    }

    /// Add a catch-all arm receiving the raw type-erased message.
    pub fn any<F>(mut self, body: F) -> Self
    where
        F: FnOnce(&mut ActorContext, Msg) -> R + Send + 'static,
    {
        self.arms.push(Arm {
            pred: Arc::new(|_| true),
            body: Box::new(body),
        });
        self
    }

    /// Alternative composition: try `self`'s arms first, then `other`'s.
    pub fn or(mut self, other: Receive<R>) -> Self {
        self.arms.extend(other.arms);
        self
    }

    /// The clonable predicate side of this handler.
    pub(crate) fn matcher(&self) -> Matcher {
        Matcher {
            preds: self.arms.iter().map(|arm| arm.pred.clone()).collect(),
        }
    }

    /// Run the first arm accepting `msg`. Callers check
    /// [`Matcher::accepts`] first.
    pub(crate) fn dispatch(mut self, ctx: &mut ActorContext, msg: Msg) -> R {
        match self.arms.iter().position(|arm| (arm.pred)(&msg)) {
            Some(idx) => {
                let arm = self.arms.remove(idx);
                (arm.body)(ctx, msg)
            }
            None => unreachable!("dispatched a message no arm accepts"),
        }
    }
}

impl<R: 'static> Default for Receive<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Detached predicate side of a [`Receive`].
#[derive(Clone)]
pub(crate) struct Matcher {
    preds: Vec<ArmPred>,
}

impl Matcher {
    pub fn accepts(&self, msg: &Msg) -> bool {
        self.preds.iter().any(|p| p(msg))
    }
}

/// Wait for a message matching either `a` or `b`, whichever arrives first;
/// `a`'s arms take priority when both accept the same message.
pub fn choose<R: 'static>(a: Receive<R>, b: Receive<R>) -> Receive<R> {
    a.or(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed<T: Any + Send>(v: T) -> Msg {
        Box::new(v)
    }

    #[test]
    fn test_matcher_accepts_by_type() {
        let r: Receive<i32> = Receive::new().on::<u64, _>(|_, _| 0);
        let m = r.matcher();
        assert!(m.accepts(&boxed(7u64)));
        assert!(!m.accepts(&boxed("nope")));
    }

    #[test]
    fn test_guard_narrows_match() {
        let r: Receive<()> = Receive::new().on_when::<i32, _, _>(|v| *v > 10, |_, _| ());
        let m = r.matcher();
        assert!(m.accepts(&boxed(42i32)));
        assert!(!m.accepts(&boxed(3i32)));
    }

    #[test]
    fn test_any_accepts_everything() {
        let r: Receive<()> = Receive::new().any(|_, _| ());
        let m = r.matcher();
        assert!(m.accepts(&boxed(1u8)));
        assert!(m.accepts(&boxed(String::from("x"))));
    }

    #[test]
    fn test_choose_unions_predicates() {
        let a: Receive<i32> = Receive::new().on::<i32, _>(|_, _| 1);
        let b: Receive<i32> = Receive::new().on::<String, _>(|_, _| 2);
        let m = choose(a, b).matcher();
        assert!(m.accepts(&boxed(5i32)));
        assert!(m.accepts(&boxed(String::from("s"))));
        assert!(!m.accepts(&boxed(5.0f64)));
    }
}
