//! Overlay node state and operations

use crate::command::{Command, Outcome};
use crate::config::NodeConfig;
use crate::error::{NetworkError, NetworkResult};
use crate::query::{BacktrackState, BacktrackTable, FloodSeenSet, QueryKey};
use crate::stats::SearchStats;
use crate::table::{KeyStore, NeighbourTable};
use crate::transport::Transport;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use sonar_wire::{Message, Operation, PeerAddr, SearchArgs, SearchMode};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Capacity of the event channel; events are dropped when it is full
const EVENT_CHANNEL_SIZE: usize = 1024;

/// Event published by a node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeEvent {
    /// A neighbour was added to the table
    NeighbourAdded(PeerAddr),
    /// A neighbour was removed from the table
    NeighbourRemoved(PeerAddr),
    /// A VAL answered one of this node's searches
    SearchResolved {
        /// Strategy used
        mode: SearchMode,
        /// Key searched for
        key: String,
        /// Value found
        value: String,
        /// Hops taken to reach the holder
        hop_count: u32,
        /// Node holding the key
        from: PeerAddr,
    },
    /// A backtracking search returned home with every branch explored
    SearchFailed {
        /// Strategy used
        mode: SearchMode,
        /// Key searched for
        key: String,
        /// Sequence number of the search
        seq_number: u64,
    },
}

/// One node of the overlay.
///
/// Holds the neighbour table, the local key store, per-query search state
/// and statistics. Every table has its own lock and no lock is held across
/// a send, so a node can process many messages concurrently.
///
/// The previous hop of a SEARCH is rebuilt from this node's host and the
/// message's LAST_HOP_PORT, so all nodes of one overlay must share a host.
pub struct Node<T: Transport> {
    local: PeerAddr,
    transport: T,
    neighbours: NeighbourTable,
    store: KeyStore,
    pub(crate) flood_seen: FloodSeenSet,
    pub(crate) backtrack: BacktrackTable,
    stats: SearchStats,
    sequence: AtomicU64,
    default_ttl: AtomicU32,
    rng: Mutex<StdRng>,
    event_tx: mpsc::Sender<NodeEvent>,
    event_rx: Mutex<Option<mpsc::Receiver<NodeEvent>>>,
}

impl<T: Transport> Node<T> {
    /// Create a node identified by `config.listen_addr`.
    ///
    /// The neighbour table starts empty; see [`Node::bootstrap`].
    pub fn new(config: &NodeConfig, transport: T) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            local: config.listen_addr.clone(),
            transport,
            neighbours: NeighbourTable::new(),
            store: KeyStore::new(config.store.clone()),
            flood_seen: FloodSeenSet::new(),
            backtrack: BacktrackTable::new(),
            stats: SearchStats::new(),
            sequence: AtomicU64::new(0),
            default_ttl: AtomicU32::new(config.default_ttl),
            rng: Mutex::new(rng),
            event_tx,
            event_rx: Mutex::new(Some(event_rx)),
        }
    }

    /// Take event receiver
    pub fn take_events(&self) -> Option<mpsc::Receiver<NodeEvent>> {
        self.event_rx.lock().take()
    }

    /// Overlay address of this node
    pub fn local_addr(&self) -> &PeerAddr {
        &self.local
    }

    /// Transport used for outbound messages
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Neighbours in table order
    pub fn neighbours(&self) -> Vec<PeerAddr> {
        self.neighbours.list()
    }

    /// Neighbour at `index` of the table
    pub fn neighbour(&self, index: usize) -> NetworkResult<PeerAddr> {
        self.neighbours
            .get(index)
            .ok_or(NetworkError::NoSuchNeighbour(index))
    }

    /// Add a neighbour; returns `false` if it was already known
    pub fn add_neighbour(&self, addr: PeerAddr) -> bool {
        let added = self.neighbours.insert(addr.clone());
        if added {
            self.emit(NodeEvent::NeighbourAdded(addr));
        }
        added
    }

    /// Remove a neighbour; returns `false` if it was not known
    pub fn remove_neighbour(&self, addr: &PeerAddr) -> bool {
        let removed = self.neighbours.remove(addr);
        if removed {
            self.emit(NodeEvent::NeighbourRemoved(addr.clone()));
        }
        removed
    }

    /// Look a key up in the local store
    pub fn lookup(&self, key: &str) -> Option<String> {
        self.store.get(key)
    }

    /// Search statistics
    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    /// TTL given to new searches
    pub fn default_ttl(&self) -> u32 {
        self.default_ttl.load(Ordering::Relaxed)
    }

    /// Change the TTL given to new searches
    pub fn set_default_ttl(&self, ttl: u32) {
        self.default_ttl.store(ttl, Ordering::Relaxed);
        info!("Default TTL set to {}", ttl);
    }

    /// Backtracking state this node keeps for a query
    pub fn backtrack_state(&self, key: &QueryKey) -> Option<BacktrackState> {
        self.backtrack.get(key)
    }

    /// Whether this node has processed a flooding query
    pub fn has_flooded(&self, key: &QueryKey) -> bool {
        self.flood_seen.contains(key)
    }

    /// Sequence number for the next message originated here; starts at 1
    pub(crate) fn next_seq(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn with_rng<R>(&self, f: impl FnOnce(&mut StdRng) -> R) -> R {
        f(&mut self.rng.lock())
    }

    /// Previous hop of a SEARCH, rebuilt from LAST_HOP_PORT
    pub(crate) fn sender_of(&self, args: &SearchArgs) -> PeerAddr {
        self.local.with_port(args.last_hop_port)
    }

    pub(crate) fn emit(&self, event: NodeEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            debug!("Dropping node event: {}", e);
        }
    }

    /// Send one message; failures are logged and reported as `false`
    pub(crate) async fn send(&self, target: &PeerAddr, message: &Message) -> bool {
        debug!("{} -> {}: {}", self.local, target, message);
        match self.transport.send(target, message).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to send {} to {}: {}", message.operation(), target, e);
                false
            }
        }
    }

    fn control(&self, operation: Operation) -> NetworkResult<Message> {
        Ok(Message::builder()
            .origin(self.local.clone())
            .seq_number(self.next_seq())
            .ttl(1)
            .operation(operation)
            .build()?)
    }

    /// Process one inbound message.
    ///
    /// A SEARCH that finds its key here is answered with a VAL sent
    /// straight to the query's origin.
    pub async fn handle_message(&self, message: Message) -> Outcome {
        debug!("{} <- {}", self.local, message);
        let command = Command::for_message(&message);
        let outcome = command.execute_as_receiver(self, &message).await;

        if let (Command::Search(mode), Some(value)) = (command, outcome.value.as_deref()) {
            self.reply(mode, &message, value).await;
        }
        outcome
    }

    async fn reply(&self, mode: SearchMode, search: &Message, value: &str) {
        let args = match search.search_args() {
            Some(args) => args,
            None => return,
        };
        let reply = Message::builder()
            .origin(self.local.clone())
            .seq_number(self.next_seq())
            .ttl(1)
            .val(mode, args.key.clone(), value, args.hop_count)
            .build();
        match reply {
            Ok(reply) => {
                info!(
                    "Found {} for {}, answering {}",
                    args.key,
                    search.origin(),
                    mode.name()
                );
                Command::Val
                    .execute_as_sender(self, &reply, Some(search.origin()))
                    .await;
            }
            Err(e) => warn!("Cannot answer search for {}: {}", args.key, e),
        }
    }

    /// Greet each address with HELLO and keep those that accepted.
    ///
    /// Returns the number of neighbours added.
    pub async fn bootstrap(&self, peers: &[PeerAddr]) -> usize {
        let mut added = 0;
        for peer in peers {
            if *peer == self.local {
                warn!("Skipping own address {} in neighbour list", peer);
                continue;
            }
            match self.hello(peer).await {
                Ok(outcome) if outcome.success => {
                    if self.add_neighbour(peer.clone()) {
                        added += 1;
                    }
                }
                Ok(_) => info!("Neighbour {} unreachable, not added", peer),
                Err(e) => warn!("HELLO to {} failed: {}", peer, e),
            }
        }
        added
    }

    /// Send HELLO to `target`
    pub async fn hello(&self, target: &PeerAddr) -> NetworkResult<Outcome> {
        let message = self.control(Operation::Hello)?;
        Ok(Command::Hello
            .execute_as_sender(self, &message, Some(target))
            .await)
    }

    /// Send HELLO to the neighbour at `index`
    pub async fn hello_neighbour(&self, index: usize) -> NetworkResult<Outcome> {
        let target = self.neighbour(index)?;
        self.hello(&target).await
    }

    /// Send BYE to every neighbour; returns how many were reached
    pub async fn say_goodbye(&self) -> NetworkResult<usize> {
        let mut reached = 0;
        for neighbour in self.neighbours() {
            let message = self.control(Operation::Bye)?;
            if Command::Bye
                .execute_as_sender(self, &message, Some(&neighbour))
                .await
                .success
            {
                reached += 1;
            }
        }
        info!("Said goodbye to {} neighbours", reached);
        Ok(reached)
    }

    /// Start a search for `key`.
    ///
    /// A key held locally is answered at once. Otherwise the outcome is
    /// unsuccessful and the answer, if any, arrives later as a VAL
    /// ([`NodeEvent::SearchResolved`]).
    pub async fn search(&self, mode: SearchMode, key: &str) -> NetworkResult<Outcome> {
        let message = Message::builder()
            .origin(self.local.clone())
            .seq_number(self.next_seq())
            .ttl(self.default_ttl())
            .search(mode, self.local.port(), key)
            .build()?;
        Ok(Command::Search(mode)
            .execute_as_sender(self, &message, None)
            .await)
    }
}
