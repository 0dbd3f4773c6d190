#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use sonar_network::{NetworkError, NetworkResult, Node, NodeConfig, NodeEvent, Transport};
use sonar_wire::{Message, Operation, PeerAddr};

/// Upper bound on deliveries in one pump, to catch runaway searches.
const MAX_DELIVERIES: usize = 10_000;

/// One message in flight.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub from: PeerAddr,
    pub to: PeerAddr,
    pub message: Message,
}

/// Transport that queues messages in a shared outbox instead of sending them.
#[derive(Clone)]
pub struct MemoryTransport {
    local: PeerAddr,
    outbox: Arc<Mutex<VecDeque<Envelope>>>,
    online: Arc<RwLock<HashSet<PeerAddr>>>,
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, target: &PeerAddr, message: &Message) -> NetworkResult<()> {
        if !self.online.read().contains(target) {
            return Err(NetworkError::ConnectionFailed {
                addr: target.to_string(),
                reason: "peer offline".into(),
            });
        }
        self.outbox.lock().push_back(Envelope {
            from: self.local.clone(),
            to: target.clone(),
            message: message.clone(),
        });
        Ok(())
    }
}

pub type TestNode = Arc<Node<MemoryTransport>>;

/// A set of nodes wired together through one in-memory outbox.
///
/// Nothing moves until [`Overlay::pump`] is called, which delivers queued
/// messages in FIFO order until the overlay is quiet.
pub struct Overlay {
    seed: u64,
    default_ttl: u32,
    nodes: HashMap<u16, TestNode>,
    outbox: Arc<Mutex<VecDeque<Envelope>>>,
    online: Arc<RwLock<HashSet<PeerAddr>>>,
    delivered: Vec<Envelope>,
}

impl Overlay {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            default_ttl: sonar_network::DEFAULT_TTL,
            nodes: HashMap::new(),
            outbox: Arc::new(Mutex::new(VecDeque::new())),
            online: Arc::new(RwLock::new(HashSet::new())),
            delivered: Vec::new(),
        }
    }

    pub fn with_default_ttl(mut self, ttl: u32) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn add_node(&mut self, port: u16, entries: &[(&str, &str)]) -> TestNode {
        let addr = PeerAddr::localhost(port);
        let mut config = NodeConfig::default()
            .with_listen_addr(addr.clone())
            .with_default_ttl(self.default_ttl)
            .with_rng_seed(self.seed.wrapping_mul(31).wrapping_add(u64::from(port)));
        for (key, value) in entries {
            config = config.with_entry(*key, *value);
        }
        let transport = MemoryTransport {
            local: addr.clone(),
            outbox: self.outbox.clone(),
            online: self.online.clone(),
        };
        let node = Arc::new(Node::new(&config, transport));
        self.online.write().insert(addr);
        self.nodes.insert(port, node.clone());
        node
    }

    pub fn node(&self, port: u16) -> TestNode {
        self.nodes
            .get(&port)
            .cloned()
            .unwrap_or_else(|| panic!("no node on port {}", port))
    }

    /// Make `a` and `b` neighbours through a HELLO from `a`.
    pub async fn link(&mut self, a: u16, b: u16) {
        let added = self.node(a).bootstrap(&[PeerAddr::localhost(b)]).await;
        assert_eq!(added, 1, "{} could not greet {}", a, b);
        self.pump().await;
        self.delivered.clear();
    }

    pub async fn link_all(&mut self, edges: &[(u16, u16)]) {
        for (a, b) in edges {
            self.link(*a, *b).await;
        }
    }

    pub fn take_offline(&self, port: u16) {
        self.online.write().remove(&PeerAddr::localhost(port));
    }

    /// Deliver queued messages until none are left; returns how many.
    pub async fn pump(&mut self) -> usize {
        let mut count = 0;
        loop {
            let next = self.outbox.lock().pop_front();
            let envelope = match next {
                Some(envelope) => envelope,
                None => break,
            };
            count += 1;
            assert!(count <= MAX_DELIVERIES, "overlay did not settle");

            let node = self.node(envelope.to.port());
            node.handle_message(envelope.message.clone()).await;
            self.delivered.push(envelope);
        }
        count
    }

    /// Messages waiting in the outbox
    pub fn queued(&self) -> Vec<Envelope> {
        self.outbox.lock().iter().cloned().collect()
    }

    /// Messages delivered since the last link or clear
    pub fn delivered(&self) -> &[Envelope] {
        &self.delivered
    }

    pub fn delivered_of(&self, operation: Operation) -> Vec<&Envelope> {
        self.delivered
            .iter()
            .filter(|e| e.message.operation() == operation)
            .collect()
    }

    pub fn clear_delivered(&mut self) {
        self.delivered.clear();
    }
}

/// Drain every event currently buffered.
pub fn drain(events: &mut tokio::sync::mpsc::Receiver<NodeEvent>) -> Vec<NodeEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}
