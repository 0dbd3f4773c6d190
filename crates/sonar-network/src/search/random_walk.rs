//! Random walk: a single copy of the query wanders the overlay

use super::pick;
use crate::command::Outcome;
use crate::node::Node;
use crate::query::QueryKey;
use crate::transport::Transport;
use sonar_wire::{Message, PeerAddr, SearchMode};
use tracing::debug;

pub(super) async fn originate<T: Transport>(
    node: &Node<T>,
    message: &Message,
    neighbours: &[PeerAddr],
) {
    if let Some(next) = node.with_rng(|rng| pick(rng, neighbours)) {
        node.send(&next, message).await;
    }
}

pub(super) async fn receive<T: Transport>(node: &Node<T>, message: &Message) -> Outcome {
    let args = match message.search_args() {
        Some(args) => args,
        None => return Outcome::failed(),
    };
    node.stats().record_hit(SearchMode::RandomWalk);

    if let Some(value) = node.lookup(&args.key) {
        return Outcome::found(value);
    }

    let next = match message.relayed(node.local_addr().port()) {
        Some(next) => next,
        None => {
            debug!("TTL exhausted for {}", QueryKey::of(message));
            return Outcome::failed();
        }
    };

    let neighbours = node.neighbours();
    let target = if neighbours.len() == 1 {
        neighbours.into_iter().next()
    } else {
        let sender = node.sender_of(args);
        let candidates: Vec<PeerAddr> = neighbours.into_iter().filter(|n| *n != sender).collect();
        node.with_rng(|rng| pick(rng, &candidates))
    };

    match target {
        Some(target) => {
            node.send(&target, &next).await;
        }
        None => debug!("No neighbour to continue {}", QueryKey::of(message)),
    }
    Outcome::failed()
}
