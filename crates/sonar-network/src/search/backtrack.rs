//! Backtracking depth-first search
//!
//! No traversal stack travels with the query. Each node keeps one
//! [`BacktrackState`] per query: the node it unwinds to (`mother`), the
//! neighbours it has not tried yet and the one it is currently probing.
//! Together these states form the DFS stack, spread over the overlay.

use crate::command::Outcome;
use crate::node::{Node, NodeEvent};
use crate::query::{BacktrackState, QueryKey};
use crate::transport::Transport;
use rand::Rng;
use sonar_wire::{Message, PeerAddr, SearchMode};
use tracing::{debug, info};

/// Decision taken by a node for one inbound SEARCH.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Step {
    /// Back at the origin with nothing left to try
    Exhausted,
    /// The query arrived over a cycle; return it to that sender
    Bounce(PeerAddr),
    /// Dead end; unwind to mother
    Backtrack(PeerAddr),
    /// Try an untried neighbour
    Probe(PeerAddr),
}

/// Advance `state` for a SEARCH that came from `sender`.
pub(crate) fn step<R: Rng + ?Sized>(
    state: &mut BacktrackState,
    local: &PeerAddr,
    sender: &PeerAddr,
    rng: &mut R,
) -> Step {
    if state.mother == *local && state.pending.is_empty() && state.active.as_ref() == Some(sender)
    {
        return Step::Exhausted;
    }

    if let Some(active) = &state.active {
        if active != sender {
            state.remove_pending(sender);
            return Step::Bounce(sender.clone());
        }
    }

    match state.probe(rng) {
        Some(next) => Step::Probe(next),
        None => Step::Backtrack(state.mother.clone()),
    }
}

pub(super) async fn originate<T: Transport>(
    node: &Node<T>,
    message: &Message,
    neighbours: &[PeerAddr],
) {
    let mut state = BacktrackState::new(node.local_addr().clone(), neighbours);
    let first = node.with_rng(|rng| state.probe(rng));
    node.backtrack.insert(QueryKey::of(message), state);

    if let Some(first) = first {
        node.send(&first, message).await;
    }
}

pub(super) async fn receive<T: Transport>(node: &Node<T>, message: &Message) -> Outcome {
    let args = match message.search_args() {
        Some(args) => args,
        None => return Outcome::failed(),
    };
    node.stats().record_hit(SearchMode::Backtracking);

    if let Some(value) = node.lookup(&args.key) {
        return Outcome::found(value);
    }

    let query = QueryKey::of(message);
    let next = match message.relayed(node.local_addr().port()) {
        Some(next) => next,
        None => {
            debug!("TTL exhausted for {}", query);
            return Outcome::failed();
        }
    };

    let local = node.local_addr();
    let sender = node.sender_of(args);
    let neighbours = node.neighbours();
    let decision = node.backtrack.update(
        query.clone(),
        || BacktrackState::new(sender.clone(), &neighbours),
        |state| node.with_rng(|rng| step(state, local, &sender, rng)),
    );
    debug!("{} at {}: {:?}", query, local, decision);

    match decision {
        Step::Exhausted => {
            info!("{} not found, every branch explored", args.key);
            node.emit(NodeEvent::SearchFailed {
                mode: SearchMode::Backtracking,
                key: args.key.clone(),
                seq_number: message.seq_number(),
            });
        }
        Step::Bounce(target) | Step::Backtrack(target) | Step::Probe(target) => {
            node.send(&target, &next).await;
        }
    }
    Outcome::failed()
}
