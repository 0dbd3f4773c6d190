//! Multi-node search scenarios over an in-memory overlay

mod common;

use std::collections::HashMap;

use common::{drain, Overlay};
use sonar_network::{NodeEvent, QueryKey};
use sonar_wire::{Message, Operation, PeerAddr, SearchMode};

const A: u16 = 9000;
const B: u16 = 9001;
const C: u16 = 9002;
const D: u16 = 9003;

async fn line(seed: u64, key_at_end: bool) -> Overlay {
    let mut overlay = Overlay::new(seed);
    overlay.add_node(A, &[]);
    overlay.add_node(B, &[]);
    if key_at_end {
        overlay.add_node(C, &[("k", "v")]);
    } else {
        overlay.add_node(C, &[]);
    }
    overlay.link_all(&[(A, B), (B, C)]).await;
    overlay
}

fn search(origin: u16, seq: u64, ttl: u32, mode: SearchMode, last_hop: u16) -> Message {
    Message::builder()
        .origin(PeerAddr::localhost(origin))
        .seq_number(seq)
        .ttl(ttl)
        .search(mode, last_hop, "missing")
        .build()
        .unwrap()
}

fn resolved(events: &[NodeEvent]) -> Vec<(String, u32)> {
    events
        .iter()
        .filter_map(|e| match e {
            NodeEvent::SearchResolved {
                value, hop_count, ..
            } => Some((value.clone(), *hop_count)),
            _ => None,
        })
        .collect()
}

fn failed_seq(events: &[NodeEvent]) -> Option<u64> {
    events.iter().find_map(|e| match e {
        NodeEvent::SearchFailed { seq_number, .. } => Some(*seq_number),
        _ => None,
    })
}

// ==================== Neighbour tables ====================

#[tokio::test]
async fn test_link_is_symmetric() {
    let overlay = line(1, false).await;
    assert_eq!(overlay.node(A).neighbours(), vec![PeerAddr::localhost(B)]);
    assert_eq!(
        overlay.node(B).neighbours(),
        vec![PeerAddr::localhost(A), PeerAddr::localhost(C)]
    );
    assert_eq!(overlay.node(C).neighbours(), vec![PeerAddr::localhost(B)]);
}

#[tokio::test]
async fn test_bootstrap_skips_offline_peer() {
    let mut overlay = Overlay::new(1);
    let a = overlay.add_node(A, &[]);
    overlay.add_node(B, &[]);
    overlay.take_offline(B);

    let added = a
        .bootstrap(&[PeerAddr::localhost(B), PeerAddr::localhost(D)])
        .await;
    assert_eq!(added, 0);
    assert!(a.neighbours().is_empty());
    assert_eq!(overlay.pump().await, 0);
}

#[tokio::test]
async fn test_goodbye_removes_node_everywhere() {
    let mut overlay = line(1, false).await;
    let reached = overlay.node(B).say_goodbye().await.unwrap();
    assert_eq!(reached, 2);
    overlay.pump().await;

    assert!(overlay.node(A).neighbours().is_empty());
    assert!(overlay.node(C).neighbours().is_empty());
    assert_eq!(overlay.node(B).neighbours().len(), 2);
}

#[tokio::test]
async fn test_hello_to_neighbour_index() {
    let mut overlay = line(1, false).await;
    let outcome = overlay.node(B).hello_neighbour(1).await.unwrap();
    assert!(outcome.success);
    assert!(overlay.node(B).hello_neighbour(2).await.is_err());

    overlay.pump().await;
    let hellos = overlay.delivered_of(Operation::Hello);
    assert_eq!(hellos.len(), 1);
    assert_eq!(hellos[0].to, PeerAddr::localhost(C));
    assert_eq!(overlay.node(C).neighbours().len(), 1);
}

// ==================== Flooding ====================

#[tokio::test]
async fn test_flooding_line_scenario() {
    let mut overlay = line(1, true).await;
    let a = overlay.node(A);
    let mut events = a.take_events().unwrap();

    let outcome = a.search(SearchMode::Flooding, "k").await.unwrap();
    assert!(!outcome.success);
    overlay.pump().await;

    let vals = overlay.delivered_of(Operation::Val);
    assert_eq!(vals.len(), 1);
    assert_eq!(vals[0].from, PeerAddr::localhost(C));
    assert_eq!(vals[0].to, PeerAddr::localhost(A));
    assert_eq!(vals[0].message.val_args().unwrap().hop_count, 2);

    assert_eq!(resolved(&drain(&mut events)), vec![("v".to_string(), 2)]);
    assert_eq!(a.stats().mean_hops(SearchMode::Flooding), 2.0);
    assert_eq!(overlay.node(B).stats().hits(SearchMode::Flooding), 1);
    assert_eq!(overlay.node(C).stats().hits(SearchMode::Flooding), 1);
}

#[tokio::test]
async fn test_flooding_duplicate_delivery_is_ignored() {
    let mut overlay = Overlay::new(1);
    for port in [A, B, C, D] {
        overlay.add_node(port, &[]);
    }
    overlay.link_all(&[(B, A), (B, C), (B, D)]).await;
    let b = overlay.node(B);

    let msg = search(A, 1, 5, SearchMode::Flooding, A);
    b.handle_message(msg.clone()).await;
    b.handle_message(msg).await;

    let queued = overlay.queued();
    assert_eq!(queued.len(), 2);
    let mut targets: Vec<u16> = queued.iter().map(|e| e.to.port()).collect();
    targets.sort();
    assert_eq!(targets, vec![C, D]);
    assert_eq!(b.stats().hits(SearchMode::Flooding), 1);
    assert!(b.has_flooded(&QueryKey::new(PeerAddr::localhost(A), 1)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_flooding_concurrent_deliveries_counted_once() {
    let mut overlay = Overlay::new(1);
    for port in [A, B, C, D] {
        overlay.add_node(port, &[]);
    }
    overlay.link_all(&[(B, A), (B, C), (B, D)]).await;
    let b = overlay.node(B);
    let msg = search(A, 1, 5, SearchMode::Flooding, A);

    let workers: Vec<_> = (0..64)
        .map(|_| {
            let b = b.clone();
            let msg = msg.clone();
            tokio::spawn(async move { b.handle_message(msg).await })
        })
        .collect();
    for worker in workers {
        worker.await.unwrap();
    }

    assert_eq!(b.stats().hits(SearchMode::Flooding), 1);
    let mut targets: Vec<u16> = overlay.queued().iter().map(|e| e.to.port()).collect();
    targets.sort();
    assert_eq!(targets, vec![C, D]);
}

#[tokio::test]
async fn test_flooding_ttl_decrements_and_expires() {
    let mut overlay = Overlay::new(1);
    for port in [A, B, C] {
        overlay.add_node(port, &[]);
    }
    overlay.link_all(&[(B, A), (B, C)]).await;
    let b = overlay.node(B);

    b.handle_message(search(A, 1, 1, SearchMode::Flooding, A)).await;
    assert!(overlay.queued().is_empty());

    b.handle_message(search(A, 2, 3, SearchMode::Flooding, A)).await;
    let queued = overlay.queued();
    assert_eq!(queued.len(), 1);
    let relayed = &queued[0].message;
    assert_eq!(relayed.ttl(), 2);
    assert_eq!(relayed.seq_number(), 2);
    assert_eq!(relayed.origin(), &PeerAddr::localhost(A));
    let args = relayed.search_args().unwrap();
    assert_eq!(args.hop_count, 2);
    assert_eq!(args.last_hop_port, B);
}

#[tokio::test]
async fn test_flooding_cycle_settles() {
    let mut overlay = Overlay::new(3);
    for port in [A, B, C, D] {
        overlay.add_node(port, &[]);
    }
    overlay
        .link_all(&[(A, B), (B, C), (C, D), (D, A), (A, C)])
        .await;

    overlay.node(A).search(SearchMode::Flooding, "nope").await.unwrap();
    overlay.pump().await;

    for port in [B, C, D] {
        assert_eq!(overlay.node(port).stats().hits(SearchMode::Flooding), 1);
    }
    assert_eq!(overlay.node(A).stats().hits(SearchMode::Flooding), 0);
    assert!(overlay.delivered_of(Operation::Val).is_empty());
}

// ==================== Random walk ====================

#[tokio::test]
async fn test_random_walk_line_scenario() {
    let mut overlay = line(5, true).await;
    let a = overlay.node(A);
    let mut events = a.take_events().unwrap();

    a.search(SearchMode::RandomWalk, "k").await.unwrap();
    overlay.pump().await;

    let searches = overlay.delivered_of(Operation::Search);
    let path: Vec<u16> = searches.iter().map(|e| e.to.port()).collect();
    assert_eq!(path, vec![B, C]);
    assert_eq!(resolved(&drain(&mut events)), vec![("v".to_string(), 2)]);
    assert_eq!(a.stats().mean_hops(SearchMode::RandomWalk), 2.0);
}

#[tokio::test]
async fn test_random_walk_single_path() {
    for seed in 0..5 {
        let mut overlay = Overlay::new(seed).with_default_ttl(10);
        let ports = [A, B, C, D, 9004];
        for port in ports {
            overlay.add_node(port, &[]);
        }
        overlay
            .link_all(&[(A, B), (B, C), (C, D), (D, 9004), (9004, A), (A, C)])
            .await;

        overlay.node(A).search(SearchMode::RandomWalk, "nope").await.unwrap();
        overlay.pump().await;

        let ttls: Vec<u32> = overlay
            .delivered_of(Operation::Search)
            .iter()
            .map(|e| e.message.ttl())
            .collect();
        assert_eq!(ttls, (1..=10).rev().collect::<Vec<u32>>(), "seed {}", seed);

        let delivered = overlay.delivered();
        for pair in delivered.windows(2) {
            assert_eq!(pair[0].to, pair[1].from, "walk forked (seed {})", seed);
        }
    }
}

#[tokio::test]
async fn test_random_walk_does_not_return_to_sender() {
    let mut overlay = Overlay::new(7);
    for port in [A, B, C, D] {
        overlay.add_node(port, &[]);
    }
    overlay.link_all(&[(B, A), (B, C), (B, D)]).await;
    let b = overlay.node(B);

    for seq in 1..=20 {
        b.handle_message(search(A, seq, 5, SearchMode::RandomWalk, A))
            .await;
    }
    let queued = overlay.queued();
    assert_eq!(queued.len(), 20);
    assert!(queued.iter().all(|e| e.to.port() != A));
    assert_eq!(b.stats().hits(SearchMode::RandomWalk), 20);
}

#[tokio::test]
async fn test_random_walk_bounces_from_leaf() {
    let mut overlay = line(1, false).await;
    let c = overlay.node(C);
    c.handle_message(search(A, 1, 5, SearchMode::RandomWalk, B))
        .await;

    let queued = overlay.queued();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].to, PeerAddr::localhost(B));
}

// ==================== Backtracking ====================

fn grid_edges() -> (Vec<u16>, Vec<(u16, u16)>) {
    let port = |row: u16, col: u16| 9000 + row * 3 + col;
    let mut ports = Vec::new();
    let mut edges = Vec::new();
    for row in 0..3 {
        for col in 0..3 {
            ports.push(port(row, col));
            if col + 1 < 3 {
                edges.push((port(row, col), port(row, col + 1)));
            }
            if row + 1 < 3 {
                edges.push((port(row, col), port(row + 1, col)));
            }
        }
    }
    (ports, edges)
}

fn complete_edges(ports: &[u16]) -> Vec<(u16, u16)> {
    let mut edges = Vec::new();
    for (i, a) in ports.iter().enumerate() {
        for b in &ports[i + 1..] {
            edges.push((*a, *b));
        }
    }
    edges
}

/// Every directed edge carries the query at most once.
fn assert_no_duplicate_probe(overlay: &Overlay) {
    let mut seen: HashMap<(u16, u16), usize> = HashMap::new();
    for envelope in overlay.delivered_of(Operation::Search) {
        *seen
            .entry((envelope.from.port(), envelope.to.port()))
            .or_default() += 1;
    }
    for (edge, count) in seen {
        assert_eq!(count, 1, "edge {:?} used {} times", edge, count);
    }
}

#[tokio::test]
async fn test_backtracking_line_finds_key() {
    let mut overlay = line(1, true).await;
    let a = overlay.node(A);
    let mut events = a.take_events().unwrap();

    a.search(SearchMode::Backtracking, "k").await.unwrap();
    overlay.pump().await;

    assert_eq!(resolved(&drain(&mut events)), vec![("v".to_string(), 2)]);
    assert_eq!(overlay.node(B).stats().hits(SearchMode::Backtracking), 1);
}

#[tokio::test]
async fn test_backtracking_line_exhausts() {
    let mut overlay = line(1, false).await;
    let a = overlay.node(A);
    let mut events = a.take_events().unwrap();

    a.search(SearchMode::Backtracking, "k").await.unwrap();
    overlay.pump().await;

    let path: Vec<(u16, u16)> = overlay
        .delivered_of(Operation::Search)
        .iter()
        .map(|e| (e.from.port(), e.to.port()))
        .collect();
    assert_eq!(path, vec![(A, B), (B, C), (C, B), (B, A)]);
    assert!(failed_seq(&drain(&mut events)).is_some());
}

#[tokio::test]
async fn test_backtracking_stops_when_ttl_runs_out() {
    let mut overlay = Overlay::new(1).with_default_ttl(2);
    for port in [A, B, C, D] {
        overlay.add_node(port, &[]);
    }
    overlay.link_all(&[(A, B), (B, C), (C, D)]).await;
    let a = overlay.node(A);
    let mut events = a.take_events().unwrap();

    a.search(SearchMode::Backtracking, "k").await.unwrap();
    overlay.pump().await;

    let path: Vec<(u16, u16, u32)> = overlay
        .delivered_of(Operation::Search)
        .iter()
        .map(|e| (e.from.port(), e.to.port(), e.message.ttl()))
        .collect();
    assert_eq!(path, vec![(A, B, 2), (B, C, 1)]);
    assert_eq!(overlay.node(C).stats().hits(SearchMode::Backtracking), 1);
    assert_eq!(overlay.node(D).stats().hits(SearchMode::Backtracking), 0);

    let query = QueryKey::of(&overlay.delivered_of(Operation::Search)[0].message);
    assert!(overlay.node(B).backtrack_state(&query).is_some());
    assert!(overlay.node(C).backtrack_state(&query).is_none());
    assert!(failed_seq(&drain(&mut events)).is_none());
}

#[tokio::test]
async fn test_backtracking_ring_terminates() {
    for seed in 0..5 {
        let mut overlay = Overlay::new(seed);
        for port in [A, B, C, D] {
            overlay.add_node(port, &[]);
        }
        overlay.link_all(&[(A, B), (B, C), (C, D), (D, A)]).await;
        let a = overlay.node(A);
        let mut events = a.take_events().unwrap();

        a.search(SearchMode::Backtracking, "k").await.unwrap();
        overlay.pump().await;

        let seq = failed_seq(&drain(&mut events)).expect("search did not fail");
        let state = a
            .backtrack_state(&QueryKey::new(PeerAddr::localhost(A), seq))
            .unwrap();
        assert!(state.pending.is_empty());
        assert_eq!(state.mother, PeerAddr::localhost(A));
        assert_eq!(overlay.delivered_of(Operation::Search).len(), 8);
        assert_no_duplicate_probe(&overlay);
    }
}

#[tokio::test]
async fn test_backtracking_complete_graph() {
    let ports = [A, B, C, D];
    for seed in 0..8 {
        let mut overlay = Overlay::new(seed);
        for port in ports {
            overlay.add_node(port, &[]);
        }
        overlay.link_all(&complete_edges(&ports)).await;
        let a = overlay.node(A);
        let mut events = a.take_events().unwrap();

        a.search(SearchMode::Backtracking, "k").await.unwrap();
        overlay.pump().await;

        assert!(failed_seq(&drain(&mut events)).is_some(), "seed {}", seed);
        assert_eq!(overlay.delivered_of(Operation::Search).len(), 12);
        assert_no_duplicate_probe(&overlay);
    }
}

#[tokio::test]
async fn test_backtracking_grid() {
    let (ports, edges) = grid_edges();
    let origin = ports[0];
    let holder = ports[8];

    for seed in 0..8 {
        let mut overlay = Overlay::new(seed);
        for port in &ports {
            if *port == holder {
                overlay.add_node(*port, &[("k", "v")]);
            } else {
                overlay.add_node(*port, &[]);
            }
        }
        overlay.link_all(&edges).await;
        let a = overlay.node(origin);
        let mut events = a.take_events().unwrap();

        a.search(SearchMode::Backtracking, "k").await.unwrap();
        overlay.pump().await;

        let found = resolved(&drain(&mut events));
        assert_eq!(found.len(), 1, "seed {}", seed);
        assert_eq!(found[0].0, "v");
        assert_no_duplicate_probe(&overlay);
    }
}

#[tokio::test]
async fn test_backtracking_grid_exhausts() {
    let (ports, edges) = grid_edges();
    for seed in 0..4 {
        let mut overlay = Overlay::new(seed);
        for port in &ports {
            overlay.add_node(*port, &[]);
        }
        overlay.link_all(&edges).await;
        let a = overlay.node(ports[4]);
        let mut events = a.take_events().unwrap();

        a.search(SearchMode::Backtracking, "k").await.unwrap();
        overlay.pump().await;

        assert!(failed_seq(&drain(&mut events)).is_some(), "seed {}", seed);
        assert_eq!(
            overlay.delivered_of(Operation::Search).len(),
            2 * edges.len()
        );
        assert_no_duplicate_probe(&overlay);
    }
}

#[tokio::test]
async fn test_search_without_neighbours_fails_at_once() {
    let mut overlay = Overlay::new(1);
    let a = overlay.add_node(A, &[]);
    let mut events = a.take_events().unwrap();

    for mode in SearchMode::ALL {
        let outcome = a.search(mode, "k").await.unwrap();
        assert!(!outcome.success);
    }
    assert_eq!(overlay.pump().await, 0);
    let failures = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e, NodeEvent::SearchFailed { .. }))
        .count();
    assert_eq!(failures, 3);
}
