//! Per-actor message queue with predicate-based extraction
//!
//! The mailbox itself is a plain FIFO; all synchronization happens under
//! the owning actor's monitor in `actor.rs`. Entries that do not match an
//! extraction predicate keep their insertion order.

use std::collections::VecDeque;

use crate::context::ActorRef;
use crate::message::Msg;

/// One queued message together with the ref of whoever sent it.
pub(crate) struct Entry {
    pub msg: Msg,
    pub sender: ActorRef,
}

#[derive(Default)]
pub(crate) struct Mailbox {
    entries: VecDeque<Entry>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unconditional enqueue at the tail.
    pub fn push(&mut self, msg: Msg, sender: ActorRef) {
        self.entries.push_back(Entry { msg, sender });
    }

    /// Remove and return the oldest entry whose message satisfies `pred`.
    /// Non-matching entries are left in place, in their original order.
    pub fn extract_first<P>(&mut self, pred: P) -> Option<Entry>
    where
        P: Fn(&Msg) -> bool,
    {
        self.extract_first_entry(|entry| pred(&entry.msg))
    }

    /// [`extract_first`](Self::extract_first) with a predicate over the
    /// whole entry, sender included.
    pub fn extract_first_entry<P>(&mut self, pred: P) -> Option<Entry>
    where
        P: Fn(&Entry) -> bool,
    {
        let idx = self.entries.iter().position(pred)?;
        self.entries.remove(idx)
    }

    /// The most recently enqueued entry, if any.
    pub fn back(&self) -> Option<&Entry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_val(mb: &mut Mailbox, v: i32) {
        mb.push(Box::new(v), ActorRef::null());
    }

    fn as_i32(entry: &Entry) -> i32 {
        *entry.msg.downcast_ref::<i32>().unwrap()
    }

    #[test]
    fn test_fifo_extraction() {
        let mut mb = Mailbox::new();
        push_val(&mut mb, 1);
        push_val(&mut mb, 2);
        push_val(&mut mb, 3);

        let first = mb.extract_first(|_| true).unwrap();
        assert_eq!(as_i32(&first), 1);
        let second = mb.extract_first(|_| true).unwrap();
        assert_eq!(as_i32(&second), 2);
        assert_eq!(mb.len(), 1);
    }

    #[test]
    fn test_predicate_skips_non_matches() {
        let mut mb = Mailbox::new();
        push_val(&mut mb, 1);
        mb.push(Box::new("text"), ActorRef::null());
        push_val(&mut mb, 3);

        // Extract the first string; the ints around it stay put, in order.
        let hit = mb
            .extract_first(|m| m.is::<&str>())
            .expect("string entry should match");
        assert_eq!(*hit.msg.downcast_ref::<&str>().unwrap(), "text");

        assert_eq!(mb.len(), 2);
        let a = mb.extract_first(|_| true).unwrap();
        let b = mb.extract_first(|_| true).unwrap();
        assert_eq!(as_i32(&a), 1);
        assert_eq!(as_i32(&b), 3);
    }

    #[test]
    fn test_oldest_match_wins() {
        let mut mb = Mailbox::new();
        push_val(&mut mb, 10);
        push_val(&mut mb, 20);

        let hit = mb.extract_first(|m| m.is::<i32>()).unwrap();
        assert_eq!(as_i32(&hit), 10);
    }

    #[test]
    fn test_no_match_leaves_queue_intact() {
        let mut mb = Mailbox::new();
        push_val(&mut mb, 1);
        push_val(&mut mb, 2);

        assert!(mb.extract_first(|m| m.is::<String>()).is_none());
        assert_eq!(mb.len(), 2);
    }
}
