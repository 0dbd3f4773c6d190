//! Overlay protocol messages

use crate::address::PeerAddr;
use crate::builder::MessageBuilder;
use crate::error::WireError;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Protocol operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Ask the receiver to add the sender to its neighbour table
    Hello,
    /// Ask the receiver to drop the sender from its neighbour table
    Bye,
    /// Key lookup travelling through the overlay
    Search,
    /// Lookup answer sent straight back to the query origin
    Val,
}

impl Operation {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hello => "HELLO",
            Self::Bye => "BYE",
            Self::Search => "SEARCH",
            Self::Val => "VAL",
        }
    }

    /// Positional argument layout on the wire
    pub fn argument_schema(&self) -> &'static [ArgumentKey] {
        match self {
            Self::Hello | Self::Bye => &[],
            Self::Search => &[
                ArgumentKey::Mode,
                ArgumentKey::LastHopPort,
                ArgumentKey::Key,
                ArgumentKey::HopCount,
            ],
            Self::Val => &[
                ArgumentKey::Mode,
                ArgumentKey::Key,
                ArgumentKey::Value,
                ArgumentKey::HopCount,
            ],
        }
    }
}

impl FromStr for Operation {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HELLO" => Ok(Self::Hello),
            "BYE" => Ok(Self::Bye),
            "SEARCH" => Ok(Self::Search),
            "VAL" => Ok(Self::Val),
            other => Err(WireError::UnknownOperation(other.to_string())),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Distributed search strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SearchMode {
    /// Broadcast to every neighbour with per-node deduplication (`FL`)
    Flooding,
    /// One random neighbour per hop (`RW`)
    RandomWalk,
    /// Depth-first search with per-node backtracking state (`BP`)
    Backtracking,
}

impl SearchMode {
    /// All modes, in reporting order
    pub const ALL: [SearchMode; 3] = [Self::Flooding, Self::RandomWalk, Self::Backtracking];

    /// Wire code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flooding => "FL",
            Self::RandomWalk => "RW",
            Self::Backtracking => "BP",
        }
    }

    /// Human readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Flooding => "flooding",
            Self::RandomWalk => "random walk",
            Self::Backtracking => "depth-first",
        }
    }
}

impl FromStr for SearchMode {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FL" => Ok(Self::Flooding),
            "RW" => Ok(Self::RandomWalk),
            "BP" => Ok(Self::Backtracking),
            other => Err(WireError::UnknownMode(other.to_string())),
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named message arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgumentKey {
    /// Search mode
    Mode,
    /// Listening port of the node that sent this hop
    LastHopPort,
    /// Searched key
    Key,
    /// Value found for the key
    Value,
    /// Hops travelled so far, starting at 1
    HopCount,
}

impl ArgumentKey {
    /// Argument name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mode => "MODE",
            Self::LastHopPort => "LAST_HOP_PORT",
            Self::Key => "KEY",
            Self::Value => "VALUE",
            Self::HopCount => "HOP_COUNT",
        }
    }
}

impl fmt::Display for ArgumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arguments of a SEARCH message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchArgs {
    /// Search strategy
    pub mode: SearchMode,
    /// Listening port of the previous hop
    pub last_hop_port: u16,
    /// Searched key
    pub key: String,
    /// Hops travelled so far
    pub hop_count: u32,
}

/// Arguments of a VAL message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValArgs {
    /// Strategy that found the value
    pub mode: SearchMode,
    /// Searched key
    pub key: String,
    /// Value stored under the key
    pub value: String,
    /// Hop count of the SEARCH that reached the holder
    pub hop_count: u32,
}

/// Operation together with its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// HELLO, no arguments
    Hello,
    /// BYE, no arguments
    Bye,
    /// SEARCH
    Search(SearchArgs),
    /// VAL
    Val(ValArgs),
}

impl Payload {
    /// Operation carried by this payload
    pub fn operation(&self) -> Operation {
        match self {
            Self::Hello => Operation::Hello,
            Self::Bye => Operation::Bye,
            Self::Search(_) => Operation::Search,
            Self::Val(_) => Operation::Val,
        }
    }

    /// Value of one argument, if the operation defines it
    pub fn get(&self, key: ArgumentKey) -> Option<String> {
        match (self, key) {
            (Self::Search(args), ArgumentKey::Mode) => Some(args.mode.to_string()),
            (Self::Search(args), ArgumentKey::LastHopPort) => Some(args.last_hop_port.to_string()),
            (Self::Search(args), ArgumentKey::Key) => Some(args.key.clone()),
            (Self::Search(args), ArgumentKey::HopCount) => Some(args.hop_count.to_string()),
            (Self::Val(args), ArgumentKey::Mode) => Some(args.mode.to_string()),
            (Self::Val(args), ArgumentKey::Key) => Some(args.key.clone()),
            (Self::Val(args), ArgumentKey::Value) => Some(args.value.clone()),
            (Self::Val(args), ArgumentKey::HopCount) => Some(args.hop_count.to_string()),
            _ => None,
        }
    }
}

/// An overlay message.
///
/// Messages are immutable once built. Relaying derives a new message with
/// [`Message::relayed`], which keeps `origin` and `seq_number` so the pair
/// identifies one logical query on every hop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub(crate) origin: PeerAddr,
    pub(crate) seq_number: u64,
    pub(crate) ttl: u32,
    pub(crate) payload: Payload,
}

impl Message {
    /// Start building a message
    pub fn builder() -> MessageBuilder {
        MessageBuilder::new()
    }

    /// Node that created the query
    pub fn origin(&self) -> &PeerAddr {
        &self.origin
    }

    /// Sequence number assigned by the origin
    pub fn seq_number(&self) -> u64 {
        self.seq_number
    }

    /// Remaining hop budget
    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    /// Operation
    pub fn operation(&self) -> Operation {
        self.payload.operation()
    }

    /// Operation and arguments
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// SEARCH arguments, if this is a SEARCH
    pub fn search_args(&self) -> Option<&SearchArgs> {
        match &self.payload {
            Payload::Search(args) => Some(args),
            _ => None,
        }
    }

    /// VAL arguments, if this is a VAL
    pub fn val_args(&self) -> Option<&ValArgs> {
        match &self.payload {
            Payload::Val(args) => Some(args),
            _ => None,
        }
    }

    /// Arguments in wire order
    pub fn arguments(&self) -> Vec<(ArgumentKey, String)> {
        self.operation()
            .argument_schema()
            .iter()
            .filter_map(|key| self.payload.get(*key).map(|value| (*key, value)))
            .collect()
    }

    /// Look up one argument.
    ///
    /// Asking for an argument the operation does not define is tolerated:
    /// it is logged and answered with `None`.
    pub fn argument(&self, key: ArgumentKey) -> Option<String> {
        let value = self.payload.get(key);
        if value.is_none() {
            warn!("{} not in {} message arguments", key, self.operation());
        }
        value
    }

    /// Copy of this SEARCH prepared for the next hop.
    ///
    /// TTL drops by one, HOP_COUNT grows by one and LAST_HOP_PORT becomes
    /// `own_port`. Returns `None` when the decremented TTL is no longer
    /// positive or the message is not a SEARCH.
    pub fn relayed(&self, own_port: u16) -> Option<Message> {
        let args = self.search_args()?;
        let ttl = self.ttl.checked_sub(1).filter(|ttl| *ttl > 0)?;
        Some(Message {
            origin: self.origin.clone(),
            seq_number: self.seq_number,
            ttl,
            payload: Payload::Search(SearchArgs {
                mode: args.mode,
                last_hop_port: own_port,
                key: args.key.clone(),
                hop_count: args.hop_count.saturating_add(1),
            }),
        })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::codec::MessageCodec::encode(self))
    }
}
