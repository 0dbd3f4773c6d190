//! Flooding: every node relays a query once to all its neighbours

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
    node.flood_seen.first_sighting(&QueryKey::of(message));
    for neighbour in neighbours {
        node.send(neighbour, message).await;
    }
}

pub(super) async fn receive<T: Transport>(node: &Node<T>, message: &Message) -> Outcome {
    let args = match message.search_args() {
        Some(args) => args,
        None => return Outcome::failed(),
    };
    let query = QueryKey::of(message);
    if !node.flood_seen.first_sighting(&query) {
        debug!("Already flooded {}", query);
        return Outcome::failed();
    }
    node.stats().record_hit(SearchMode::Flooding);

    if let Some(value) = node.lookup(&args.key) {
        return Outcome::found(value);
    }

    let next = match message.relayed(node.local_addr().port()) {
        Some(next) => next,
        None => {
            debug!("TTL exhausted for {}", query);
            return Outcome::failed();
        }
    };
    let sender = node.sender_of(args);
    for neighbour in node.neighbours() {
        if neighbour != sender {
            node.send(&neighbour, &next).await;
        }
    }
    Outcome::failed()
}
