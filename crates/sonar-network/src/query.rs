//! Per-query bookkeeping for flooding and backtracking searches

use parking_lot::Mutex;
use rand::Rng;
use sonar_wire::{Message, PeerAddr};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Identity of one logical search across the overlay.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    /// Node that started the search
    pub origin: PeerAddr,
    /// Sequence number assigned by the origin
    pub seq_number: u64,
}

impl QueryKey {
    /// Create a key
    pub fn new(origin: PeerAddr, seq_number: u64) -> Self {
        Self { origin, seq_number }
    }

    /// Key of the query a message belongs to
    pub fn of(message: &Message) -> Self {
        Self::new(message.origin().clone(), message.seq_number())
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.origin, self.seq_number)
    }
}

/// Flooding queries already processed, by origin.
///
/// Entries are never evicted.
#[derive(Debug, Default)]
pub struct FloodSeenSet {
    seen: Mutex<HashMap<PeerAddr, HashSet<u64>>>,
}

impl FloodSeenSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `key`; returns `true` only the first time it is seen
    pub fn first_sighting(&self, key: &QueryKey) -> bool {
        self.seen
            .lock()
            .entry(key.origin.clone())
            .or_default()
            .insert(key.seq_number)
    }

    /// Check whether `key` was recorded
    pub fn contains(&self, key: &QueryKey) -> bool {
        self.seen
            .lock()
            .get(&key.origin)
            .map_or(false, |seqs| seqs.contains(&key.seq_number))
    }
}

/// One node's stack frame of a backtracking search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BacktrackState {
    /// Where to unwind to on a dead end
    pub mother: PeerAddr,
    /// Neighbours not yet tried, in table order
    pub pending: Vec<PeerAddr>,
    /// Neighbour currently being probed
    pub active: Option<PeerAddr>,
}

impl BacktrackState {
    /// Fresh state: every neighbour except `mother` is pending
    pub fn new(mother: PeerAddr, neighbours: &[PeerAddr]) -> Self {
        let mut pending: Vec<PeerAddr> = Vec::with_capacity(neighbours.len());
        for addr in neighbours {
            if *addr != mother && !pending.contains(addr) {
                pending.push(addr.clone());
            }
        }
        Self {
            mother,
            pending,
            active: None,
        }
    }

    /// Drop `addr` from the untried set; returns whether it was there
    pub fn remove_pending(&mut self, addr: &PeerAddr) -> bool {
        match self.pending.iter().position(|a| a == addr) {
            Some(index) => {
                self.pending.remove(index);
                true
            }
            None => false,
        }
    }

    /// Pick an untried neighbour at random and make it the active probe
    pub fn probe<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<PeerAddr> {
        if self.pending.is_empty() {
            return None;
        }
        let index = rng.gen_range(0..self.pending.len());
        let next = self.pending.remove(index);
        self.active = Some(next.clone());
        Some(next)
    }
}

/// Backtracking states of every query that passed through this node.
///
/// Entries are never evicted.
#[derive(Debug, Default)]
pub struct BacktrackTable {
    states: Mutex<HashMap<QueryKey, BacktrackState>>,
}

impl BacktrackTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the state of a query, replacing any previous one
    pub fn insert(&self, key: QueryKey, state: BacktrackState) {
        self.states.lock().insert(key, state);
    }

    /// Copy of the state of a query
    pub fn get(&self, key: &QueryKey) -> Option<BacktrackState> {
        self.states.lock().get(key).cloned()
    }

    /// Run `f` on the state of `key` under the table lock, creating the
    /// state with `init` first if the query is new here.
    pub fn update<T>(
        &self,
        key: QueryKey,
        init: impl FnOnce() -> BacktrackState,
        f: impl FnOnce(&mut BacktrackState) -> T,
    ) -> T {
        let mut states = self.states.lock();
        let state = states.entry(key).or_insert_with(init);
        f(state)
    }

    /// Number of tracked queries
    pub fn len(&self) -> usize {
        self.states.lock().len()
    }

    /// True when no query is tracked
    pub fn is_empty(&self) -> bool {
        self.states.lock().is_empty()
    }
}
