//! Message model: type-erased payloads, actor identity, exit reasons
//!
//! Mailboxes are untyped; a message is any `Send` value behind
//! `Box<dyn Any>`. Typed dispatch happens through [`crate::Receive`] arms.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::context::ActorRef;

/// A type-erased message payload.
pub type Msg = Box<dyn Any + Send>;

/// Unique identifier for an actor instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActorId(pub u64);

impl ActorId {
    /// Identity of the null sender sentinel.
    pub const NULL: ActorId = ActorId(0);

    /// Create a new random actor ID.
    pub fn new() -> Self {
        Self(rand::random())
    }

    /// Create an actor ID from a specific value.
    pub fn from_u64(id: u64) -> Self {
        Self(id)
    }

    /// Get the underlying u64 value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Why an actor terminated. Any reason other than `Normal` propagates
/// through links and kills non-trapping peers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExitReason {
    /// The actor completed without error.
    Normal,
    /// The actor failed or was stopped with an explicit reason.
    Other(Arc<str>),
}

impl ExitReason {
    pub fn is_normal(&self) -> bool {
        matches!(self, ExitReason::Normal)
    }
}

impl From<&str> for ExitReason {
    fn from(s: &str) -> Self {
        if s == "normal" {
            ExitReason::Normal
        } else {
            ExitReason::Other(Arc::from(s))
        }
    }
}

impl From<String> for ExitReason {
    fn from(s: String) -> Self {
        ExitReason::from(s.as_str())
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Normal => write!(f, "normal"),
            ExitReason::Other(s) => write!(f, "{}", s),
        }
    }
}

/// Exit signal reified as an ordinary message, delivered to linked actors
/// that have trap-exit set instead of killing them.
#[derive(Debug, Clone)]
pub struct Exit {
    /// The actor that terminated.
    pub from: ActorRef,
    /// Its termination reason.
    pub reason: ExitReason,
}

/// Sentinel message delivered when a timed receive's deadline elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeout;

/// Internal unwind payload used to eject a thread-parked actor that was
/// killed by a linked peer. Never user-visible; the reaction runner swallows
/// it.
pub(crate) struct ExitSignal(pub(crate) ExitReason);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_id_creation() {
        let id1 = ActorId::new();
        let id2 = ActorId::new();
        assert_ne!(id1, id2);

        let id3 = ActorId::from_u64(42);
        assert_eq!(id3.as_u64(), 42);
    }

    #[test]
    fn test_actor_id_display() {
        let id = ActorId::from_u64(0x123456789abcdef0);
        assert_eq!(format!("{}", id), "123456789abcdef0");
    }

    #[test]
    fn test_exit_reason_from_str() {
        assert_eq!(ExitReason::from("normal"), ExitReason::Normal);
        assert!(ExitReason::from("normal").is_normal());

        let boom = ExitReason::from("boom");
        assert!(!boom.is_normal());
        assert_eq!(format!("{}", boom), "boom");
    }

    #[test]
    fn test_exit_reason_equality() {
        assert_eq!(ExitReason::from("boom"), ExitReason::from("boom"));
        assert_ne!(ExitReason::from("boom"), ExitReason::Normal);
    }
}
