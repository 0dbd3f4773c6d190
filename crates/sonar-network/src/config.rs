//! Node configuration

use sonar_wire::PeerAddr;
use std::collections::HashMap;
use std::time::Duration;

/// Default hop budget for self-originated searches
pub const DEFAULT_TTL: u32 = 100;

/// Configuration for an overlay node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Address to listen on; also the node's overlay identity
    pub listen_addr: PeerAddr,
    /// Neighbours greeted with HELLO on start
    pub neighbours: Vec<PeerAddr>,
    /// Initial key/value table
    pub store: HashMap<String, String>,
    /// TTL given to self-originated searches
    pub default_ttl: u32,
    /// Bound on connecting to and writing to a peer
    pub connect_timeout: Duration,
    /// Bound on reading one inbound message
    pub read_timeout: Duration,
    /// How long an accept waits before the run flag is checked again
    pub accept_poll_interval: Duration,
    /// Seed for neighbour selection; random when `None`
    pub rng_seed: Option<u64>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen_addr: PeerAddr::localhost(5000),
            neighbours: Vec::new(),
            store: HashMap::new(),
            default_ttl: DEFAULT_TTL,
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(5),
            accept_poll_interval: Duration::from_secs(1),
            rng_seed: None,
        }
    }
}

impl NodeConfig {
    /// Sets the listen address.
    pub fn with_listen_addr(mut self, addr: PeerAddr) -> Self {
        self.listen_addr = addr;
        self
    }

    /// Sets the neighbours to greet on start.
    pub fn with_neighbours(mut self, neighbours: Vec<PeerAddr>) -> Self {
        self.neighbours = neighbours;
        self
    }

    /// Sets the key/value table.
    pub fn with_store(mut self, store: HashMap<String, String>) -> Self {
        self.store = store;
        self
    }

    /// Adds one key/value pair.
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.store.insert(key.into(), value.into());
        self
    }

    /// Sets the default TTL.
    pub fn with_default_ttl(mut self, ttl: u32) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the read timeout.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the accept poll interval.
    pub fn with_accept_poll_interval(mut self, interval: Duration) -> Self {
        self.accept_poll_interval = interval;
        self
    }

    /// Makes neighbour selection deterministic.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }
}
