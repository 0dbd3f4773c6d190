//! Sender and receiver behaviour of each operation

use crate::node::{Node, NodeEvent};
use crate::search;
use crate::transport::Transport;
use sonar_wire::{Message, Operation, Payload, PeerAddr, SearchMode};
use tracing::{debug, info, warn};

/// Result of executing a command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Whether the command achieved its goal
    pub success: bool,
    /// Value found by a search, if any
    pub value: Option<String>,
}

impl Outcome {
    /// Successful, no value
    pub fn ok() -> Self {
        Self {
            success: true,
            value: None,
        }
    }

    /// Unsuccessful
    pub fn failed() -> Self {
        Self::default()
    }

    /// Successful search with its value
    pub fn found(value: impl Into<String>) -> Self {
        Self {
            success: true,
            value: Some(value.into()),
        }
    }
}

/// Handler selected by a message's operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Join a neighbour table
    Hello,
    /// Leave a neighbour table
    Bye,
    /// Look a key up with the given strategy
    Search(SearchMode),
    /// Answer to a search
    Val,
}

impl Command {
    /// Command handling `message`
    pub fn for_message(message: &Message) -> Self {
        match message.payload() {
            Payload::Hello => Command::Hello,
            Payload::Bye => Command::Bye,
            Payload::Search(args) => Command::Search(args.mode),
            Payload::Val(_) => Command::Val,
        }
    }

    /// Operation this command handles
    pub fn operation(&self) -> Operation {
        match self {
            Command::Hello => Operation::Hello,
            Command::Bye => Operation::Bye,
            Command::Search(_) => Operation::Search,
            Command::Val => Operation::Val,
        }
    }

    /// Send `message` on behalf of `node`.
    ///
    /// HELLO, BYE and VAL go to `target`. A SEARCH is answered from the
    /// local store when possible and otherwise handed to its strategy,
    /// which picks its own targets.
    pub async fn execute_as_sender<T: Transport>(
        &self,
        node: &Node<T>,
        message: &Message,
        target: Option<&PeerAddr>,
    ) -> Outcome {
        match self {
            Command::Search(mode) => search::originate(node, *mode, message).await,
            _ => {
                let target = match target {
                    Some(target) => target,
                    None => {
                        warn!("{} sent without a target", self.operation());
                        return Outcome::failed();
                    }
                };
                if node.send(target, message).await {
                    Outcome::ok()
                } else {
                    Outcome::failed()
                }
            }
        }
    }

    /// Process a `message` that arrived at `node`.
    pub async fn execute_as_receiver<T: Transport>(
        &self,
        node: &Node<T>,
        message: &Message,
    ) -> Outcome {
        match self {
            Command::Hello => {
                let origin = message.origin().clone();
                if node.add_neighbour(origin.clone()) {
                    info!("Neighbour {} joined", origin);
                } else {
                    debug!("Neighbour {} already known", origin);
                }
                Outcome::ok()
            }
            Command::Bye => {
                let origin = message.origin();
                if node.remove_neighbour(origin) {
                    info!("Neighbour {} left", origin);
                    Outcome::ok()
                } else {
                    warn!("BYE from {} which is not a neighbour", origin);
                    Outcome::failed()
                }
            }
            Command::Search(mode) => search::receive(node, *mode, message).await,
            Command::Val => {
                let args = match message.val_args() {
                    Some(args) => args,
                    None => return Outcome::failed(),
                };
                info!(
                    "{} search for {} resolved by {}: {} ({} hops)",
                    args.mode.name(),
                    args.key,
                    message.origin(),
                    args.value,
                    args.hop_count
                );
                node.stats().record_hops(args.mode, args.hop_count);
                node.emit(NodeEvent::SearchResolved {
                    mode: args.mode,
                    key: args.key.clone(),
                    value: args.value.clone(),
                    hop_count: args.hop_count,
                    from: message.origin().clone(),
                });
                Outcome::found(args.value.clone())
            }
        }
    }
}
