//! Link graph and exit propagation
//!
//! Links are an unordered, idempotent, symmetric relation between actors,
//! kept in one central registry keyed by actor id. A single lock serializes
//! all graph updates.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::actor::ActorCore;
use crate::context::ActorRef;
use crate::message::{ActorId, Exit, ExitReason};

pub(crate) struct LinkRegistry {
    graph: Mutex<HashMap<ActorId, HashSet<ActorId>>>,
}

impl LinkRegistry {
    pub fn new() -> Self {
        Self {
            graph: Mutex::new(HashMap::new()),
        }
    }

    /// Add a link between `a` and `b`. Idempotent; self-links are ignored.
    pub fn link(&self, a: ActorId, b: ActorId) {
        if a == b {
            return;
        }
        let mut graph = self.graph.lock();
        graph.entry(a).or_default().insert(b);
        graph.entry(b).or_default().insert(a);
    }

    /// Remove the link between `a` and `b`, if present.
    pub fn unlink(&self, a: ActorId, b: ActorId) {
        let mut graph = self.graph.lock();
        if let Some(peers) = graph.get_mut(&a) {
            peers.remove(&b);
            if peers.is_empty() {
                graph.remove(&a);
            }
        }
        if let Some(peers) = graph.get_mut(&b) {
            peers.remove(&a);
            if peers.is_empty() {
                graph.remove(&b);
            }
        }
    }

    /// Current peers of `a`.
    pub fn linked(&self, a: ActorId) -> Vec<ActorId> {
        self.graph
            .lock()
            .get(&a)
            .map(|peers| peers.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Remove `a` from the graph entirely, returning its former peers, so a
    /// later termination of a peer can never re-signal the now-dead `a`.
    fn take_peers(&self, a: ActorId) -> Vec<ActorId> {
        let mut graph = self.graph.lock();
        let peers: Vec<ActorId> = match graph.remove(&a) {
            Some(set) => set.into_iter().collect(),
            None => return Vec::new(),
        };
        for peer in &peers {
            if let Some(set) = graph.get_mut(peer) {
                set.remove(&a);
                if set.is_empty() {
                    graph.remove(peer);
                }
            }
        }
        peers
    }

    /// Propagate `dying`'s termination to its linked peers: trap-exit peers
    /// get the reified [`Exit`] message, non-trapping peers are killed iff
    /// the reason is not normal. `visited` caps cyclic graphs at one signal
    /// per peer.
    pub fn exit_linked(
        &self,
        dying: &Arc<ActorCore>,
        reason: &ExitReason,
        visited: &mut HashSet<ActorId>,
    ) {
        let peers = self.take_peers(dying.id());
        if peers.is_empty() {
            return;
        }

        let from = ActorRef::from_core(dying.clone());
        for peer_id in peers {
            if visited.contains(&peer_id) {
                continue;
            }
            let peer = dying
                .shared()
                .registry
                .get(&peer_id)
                .map(|entry| entry.value().clone());
            let Some(peer) = peer else {
                continue;
            };
            let Some(core) = peer.core() else {
                continue;
            };

            if core.traps_exits() {
                tracing::trace!(from = %dying.id(), to = %peer_id, reason = %reason, "exit trapped");
                ActorCore::deliver(
                    core,
                    Box::new(Exit {
                        from: from.clone(),
                        reason: reason.clone(),
                    }),
                    from.clone(),
                );
            } else if !reason.is_normal() {
                tracing::trace!(from = %dying.id(), to = %peer_id, reason = %reason, "exit cascades");
                ActorCore::kill(core, reason.clone(), visited);
            }
        }
    }
}
