//! Search strategies
//!
//! Each strategy has an originating half, run by the node that starts the
//! search, and a receiving half, run for every SEARCH that reaches a node.
//! A receiver that holds the key returns it in the [`Outcome`]; the node
//! then answers the origin with a VAL.

mod backtrack;
mod flooding;
mod random_walk;

use crate::command::Outcome;
use crate::node::{Node, NodeEvent};
use crate::transport::Transport;
use rand::seq::SliceRandom;
use rand::Rng;
use sonar_wire::{Message, PeerAddr, SearchMode};
use tracing::{info, warn};

/// Start the search carried by `message`.
pub(crate) async fn originate<T: Transport>(
    node: &Node<T>,
    mode: SearchMode,
    message: &Message,
) -> Outcome {
    let args = match message.search_args() {
        Some(args) => args,
        None => return Outcome::failed(),
    };
    if let Some(value) = node.lookup(&args.key) {
        info!("{} is held locally: {}", args.key, value);
        return Outcome::found(value);
    }

    let neighbours = node.neighbours();
    if neighbours.is_empty() {
        warn!("No neighbours to search {} with {}", args.key, mode.name());
        node.emit(NodeEvent::SearchFailed {
            mode,
            key: args.key.clone(),
            seq_number: message.seq_number(),
        });
        return Outcome::failed();
    }

    info!(
        "Searching {} by {} (seq {}, ttl {})",
        args.key,
        mode.name(),
        message.seq_number(),
        message.ttl()
    );
    match mode {
        SearchMode::Flooding => flooding::originate(node, message, &neighbours).await,
        SearchMode::RandomWalk => random_walk::originate(node, message, &neighbours).await,
        SearchMode::Backtracking => backtrack::originate(node, message, &neighbours).await,
    }
    Outcome::failed()
}

/// Process a SEARCH that reached `node`.
pub(crate) async fn receive<T: Transport>(
    node: &Node<T>,
    mode: SearchMode,
    message: &Message,
) -> Outcome {
    match mode {
        SearchMode::Flooding => flooding::receive(node, message).await,
        SearchMode::RandomWalk => random_walk::receive(node, message).await,
        SearchMode::Backtracking => backtrack::receive(node, message).await,
    }
}

fn pick<R: Rng + ?Sized>(rng: &mut R, candidates: &[PeerAddr]) -> Option<PeerAddr> {
    candidates.choose(rng).cloned()
}
