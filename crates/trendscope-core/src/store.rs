//! Collaborator interfaces and in-memory implementations.
//!
//! The pipeline reads raw edges and occurrence counts, and persists
//! graphs, trend threads and exported networks, only through these traits.
//! Keys are typed (`GraphKey`, `TrendScope`) instead of encoded file names.
//! The in-memory implementations back the tests; `trendscope-runtime`
//! provides file and SQLite backends.

use crate::error::{Result, TrendError};
use crate::graph::CommunityGraph;
use crate::types::{CommunityId, Network, RawEdge, TimeWindow, TrendThread, WindowIndex};
use std::collections::HashMap;
use std::sync::RwLock;

/// Supplies the raw co-occurrence records of a window.
pub trait EdgeSource: Send + Sync {
    fn edges(&self, window: &TimeWindow) -> Result<Vec<RawEdge>>;
}

/// Occurrence counts per node and interaction totals per window.
pub trait OccurrenceIndex: Send + Sync {
    /// Occurrence count of `node` within `window`.
    fn occurrences(&self, window: &TimeWindow, node: &str) -> Result<u64>;

    /// Total interaction count of `window`, the PMI normalizer.
    fn total_interactions(&self, window: &TimeWindow) -> Result<u64>;

    /// Occurrence counts of several nodes, in order.
    fn occurrences_for(&self, window: &TimeWindow, nodes: &[String]) -> Result<Vec<u64>> {
        nodes.iter().map(|n| self.occurrences(window, n)).collect()
    }
}

/// Which stored graph of a window is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphKey {
    /// Graph as built from raw edges.
    Snapshot(WindowIndex),
    /// Filtered, PMI-weighted and community-labelled graph.
    Labelled(WindowIndex),
    /// Induced subgraph of one community.
    Community(WindowIndex, CommunityId),
}

/// Persists window graphs and the matched trend threads.
pub trait GraphStore: Send + Sync {
    fn save_graph(&self, key: GraphKey, graph: &CommunityGraph) -> Result<()>;

    fn load_graph(&self, key: GraphKey) -> Result<Option<CommunityGraph>>;

    fn save_threads(&self, threads: &[TrendThread]) -> Result<()>;

    fn load_threads(&self) -> Result<Option<Vec<TrendThread>>>;

    /// Remove labelled graphs, community graphs and threads; snapshots stay.
    fn clear_derived(&self) -> Result<()>;

    /// Load a graph that must exist.
    fn require_graph(&self, key: GraphKey) -> Result<CommunityGraph> {
        self.load_graph(key)?
            .ok_or_else(|| TrendError::storage(format!("missing graph {:?}", key)))
    }
}

/// Scope of an exported trend network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrendScope {
    Window(WindowIndex),
    Complete,
}

impl std::fmt::Display for TrendScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendScope::Window(w) => write!(f, "{}", w),
            TrendScope::Complete => write!(f, "complete"),
        }
    }
}

/// Persists exported trend networks keyed by `(scope, trend_id)`.
pub trait TrendStore: Send + Sync {
    fn save_network(&self, scope: TrendScope, trend_id: usize, network: &Network) -> Result<()>;

    /// `Ok(None)` when no network was exported for this key.
    fn load_network(&self, scope: TrendScope, trend_id: usize) -> Result<Option<Network>>;

    fn clear(&self) -> Result<()>;
}

fn poisoned<T>(_: T) -> TrendError {
    TrendError::storage("store lock poisoned")
}

/// In-memory edge source.
#[derive(Debug, Default)]
pub struct MemoryEdgeSource {
    edges: HashMap<TimeWindow, Vec<RawEdge>>,
}

impl MemoryEdgeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, window: TimeWindow, edges: Vec<RawEdge>) {
        self.edges.insert(window, edges);
    }
}

impl EdgeSource for MemoryEdgeSource {
    fn edges(&self, window: &TimeWindow) -> Result<Vec<RawEdge>> {
        Ok(self.edges.get(window).cloned().unwrap_or_default())
    }
}

/// In-memory occurrence index.
#[derive(Debug, Default)]
pub struct MemoryOccurrenceIndex {
    counts: HashMap<(TimeWindow, String), u64>,
    totals: HashMap<TimeWindow, u64>,
}

impl MemoryOccurrenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, window: TimeWindow, node: &str, count: u64) {
        self.counts.insert((window, node.to_string()), count);
    }

    pub fn set_total(&mut self, window: TimeWindow, total: u64) {
        self.totals.insert(window, total);
    }
}

impl OccurrenceIndex for MemoryOccurrenceIndex {
    fn occurrences(&self, window: &TimeWindow, node: &str) -> Result<u64> {
        self.counts
            .get(&(*window, node.to_string()))
            .copied()
            .ok_or_else(|| {
                TrendError::lookup(format!("no occurrence count for {} in {}", node, window.key()))
            })
    }

    fn total_interactions(&self, window: &TimeWindow) -> Result<u64> {
        self.totals.get(window).copied().ok_or_else(|| {
            TrendError::lookup(format!("no interaction total for {}", window.key()))
        })
    }
}

/// In-memory graph store.
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    graphs: RwLock<HashMap<GraphKey, CommunityGraph>>,
    threads: RwLock<Option<Vec<TrendThread>>>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GraphStore for MemoryGraphStore {
    fn save_graph(&self, key: GraphKey, graph: &CommunityGraph) -> Result<()> {
        self.graphs.write().map_err(poisoned)?.insert(key, graph.clone());
        Ok(())
    }

    fn load_graph(&self, key: GraphKey) -> Result<Option<CommunityGraph>> {
        Ok(self.graphs.read().map_err(poisoned)?.get(&key).cloned())
    }

    fn save_threads(&self, threads: &[TrendThread]) -> Result<()> {
        *self.threads.write().map_err(poisoned)? = Some(threads.to_vec());
        Ok(())
    }

    fn load_threads(&self) -> Result<Option<Vec<TrendThread>>> {
        Ok(self.threads.read().map_err(poisoned)?.clone())
    }

    fn clear_derived(&self) -> Result<()> {
        self.graphs
            .write()
            .map_err(poisoned)?
            .retain(|key, _| matches!(key, GraphKey::Snapshot(_)));
        *self.threads.write().map_err(poisoned)? = None;
        Ok(())
    }
}

/// In-memory trend store.
#[derive(Debug, Default)]
pub struct MemoryTrendStore {
    networks: RwLock<HashMap<(TrendScope, usize), Network>>,
}

impl MemoryTrendStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TrendStore for MemoryTrendStore {
    fn save_network(&self, scope: TrendScope, trend_id: usize, network: &Network) -> Result<()> {
        self.networks
            .write()
            .map_err(poisoned)?
            .insert((scope, trend_id), network.clone());
        Ok(())
    }

    fn load_network(&self, scope: TrendScope, trend_id: usize) -> Result<Option<Network>> {
        Ok(self
            .networks
            .read()
            .map_err(poisoned)?
            .get(&(scope, trend_id))
            .cloned())
    }

    fn clear(&self) -> Result<()> {
        self.networks.write().map_err(poisoned)?.clear();
        Ok(())
    }
}
