//! Per-mode search statistics

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sonar_wire::SearchMode;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
struct ModeCounters {
    hits: AtomicU64,
    /// (sum of hop counts, number of resolved searches)
    hops: Mutex<(u64, u64)>,
}

/// Search statistics kept by one node.
#[derive(Debug, Default)]
pub struct SearchStats {
    modes: [ModeCounters; 3],
}

fn slot(mode: SearchMode) -> usize {
    match mode {
        SearchMode::Flooding => 0,
        SearchMode::RandomWalk => 1,
        SearchMode::Backtracking => 2,
    }
}

impl SearchStats {
    /// Create zeroed statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one SEARCH processed as receiver
    pub fn record_hit(&self, mode: SearchMode) {
        self.modes[slot(mode)].hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Fold the hop count of a resolved search into the running mean
    pub fn record_hops(&self, mode: SearchMode, hop_count: u32) {
        let mut hops = self.modes[slot(mode)].hops.lock();
        hops.0 += u64::from(hop_count);
        hops.1 += 1;
    }

    /// SEARCH messages processed as receiver
    pub fn hits(&self, mode: SearchMode) -> u64 {
        self.modes[slot(mode)].hits.load(Ordering::Relaxed)
    }

    /// Mean hop count to success; 0.0 before any search resolved
    pub fn mean_hops(&self, mode: SearchMode) -> f64 {
        let (sum, count) = *self.modes[slot(mode)].hops.lock();
        if count == 0 {
            0.0
        } else {
            sum as f64 / count as f64
        }
    }

    /// Number of resolved searches
    pub fn resolved(&self, mode: SearchMode) -> u64 {
        self.modes[slot(mode)].hops.lock().1
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            modes: SearchMode::ALL
                .iter()
                .map(|mode| ModeStats {
                    mode: mode.as_str().to_string(),
                    hits: self.hits(*mode),
                    resolved: self.resolved(*mode),
                    mean_hops: self.mean_hops(*mode),
                })
                .collect(),
        }
    }
}

/// Statistics of one search mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeStats {
    /// Wire code of the mode (FL, RW, BP)
    pub mode: String,
    /// SEARCH messages processed as receiver
    pub hits: u64,
    /// Searches resolved by a VAL
    pub resolved: u64,
    /// Mean hop count to success
    pub mean_hops: f64,
}

/// Snapshot of all search statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// One entry per mode, in FL, RW, BP order
    pub modes: Vec<ModeStats>,
}

impl StatsSnapshot {
    /// Entry for `mode`
    pub fn mode(&self, mode: SearchMode) -> Option<&ModeStats> {
        self.modes.iter().find(|m| m.mode == mode.as_str())
    }

    /// Export snapshot as JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
