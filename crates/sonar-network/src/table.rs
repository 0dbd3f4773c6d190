//! Neighbour table and local key store

use parking_lot::RwLock;
use sonar_wire::PeerAddr;
use std::collections::HashMap;

/// Ordered set of neighbour addresses.
///
/// Insertion order is kept so neighbours can be addressed by index.
#[derive(Debug, Default)]
pub struct NeighbourTable {
    entries: RwLock<Vec<PeerAddr>>,
}

impl NeighbourTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an address; returns `false` if it was already present
    pub fn insert(&self, addr: PeerAddr) -> bool {
        let mut entries = self.entries.write();
        if entries.contains(&addr) {
            return false;
        }
        entries.push(addr);
        true
    }

    /// Remove an address; returns `false` if it was absent
    pub fn remove(&self, addr: &PeerAddr) -> bool {
        let mut entries = self.entries.write();
        match entries.iter().position(|a| a == addr) {
            Some(index) => {
                entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Check membership
    pub fn contains(&self, addr: &PeerAddr) -> bool {
        self.entries.read().contains(addr)
    }

    /// Snapshot of all neighbours in insertion order
    pub fn list(&self) -> Vec<PeerAddr> {
        self.entries.read().clone()
    }

    /// Neighbour at `index`
    pub fn get(&self, index: usize) -> Option<PeerAddr> {
        self.entries.read().get(index).cloned()
    }

    /// Number of neighbours
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True when there are no neighbours
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Key/value pairs this node can answer for.
#[derive(Debug, Default)]
pub struct KeyStore {
    entries: RwLock<HashMap<String, String>>,
}

impl KeyStore {
    /// Create a store from initial entries
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Look up a key
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    /// Insert or replace a value
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.write().insert(key.into(), value.into());
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True when the store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighbour_insert_is_idempotent() {
        let table = NeighbourTable::new();
        assert!(table.insert(PeerAddr::localhost(9001)));
        assert!(!table.insert(PeerAddr::localhost(9001)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_neighbour_order_and_index() {
        let table = NeighbourTable::new();
        table.insert(PeerAddr::localhost(9003));
        table.insert(PeerAddr::localhost(9001));
        table.insert(PeerAddr::localhost(9002));

        let ports: Vec<u16> = table.list().iter().map(|a| a.port()).collect();
        assert_eq!(ports, vec![9003, 9001, 9002]);
        assert_eq!(table.get(1), Some(PeerAddr::localhost(9001)));
        assert_eq!(table.get(3), None);
    }

    #[test]
    fn test_neighbour_remove() {
        let table = NeighbourTable::new();
        table.insert(PeerAddr::localhost(9001));
        table.insert(PeerAddr::localhost(9002));

        assert!(table.remove(&PeerAddr::localhost(9001)));
        assert!(!table.remove(&PeerAddr::localhost(9001)));
        assert!(!table.contains(&PeerAddr::localhost(9001)));
        assert_eq!(table.get(0), Some(PeerAddr::localhost(9002)));
    }

    #[test]
    fn test_key_store() {
        let store = KeyStore::default();
        assert!(store.is_empty());
        store.insert("k", "v1");
        store.insert("k", "v2");
        assert_eq!(store.get("k").as_deref(), Some("v2"));
        assert_eq!(store.get("missing"), None);
        assert_eq!(store.len(), 1);
    }
}
