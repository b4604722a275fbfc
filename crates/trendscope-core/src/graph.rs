//! Per-window co-occurrence graph backed by petgraph.
//!
//! The graph is undirected and may carry parallel edges and self-loops
//! until [`CommunityGraph::simplify`] collapses them. Nodes are addressed by
//! name through a HashMap index; node and edge order follow insertion order
//! so every algorithm downstream iterates deterministically.

use crate::error::{Result, TrendError};
use crate::types::{CommunityId, RawEdge};
use petgraph::graph::{Graph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Undirected;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Node payload: name, occurrence count within the window, community label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    pub name: String,
    #[serde(default)]
    pub weight: u64,
    #[serde(default)]
    pub community: Option<CommunityId>,
}

impl NodeData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            weight: 0,
            community: None,
        }
    }
}

/// Edge payload. Before PMI weighting `weight` is the raw multiplicity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeData {
    pub weight: f64,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl EdgeData {
    pub fn new(weight: f64) -> Self {
        Self {
            weight,
            timestamp: None,
        }
    }
}

/// Undirected weighted co-occurrence graph of one window (or one trend).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "GraphRecord", into = "GraphRecord")]
pub struct CommunityGraph {
    graph: Graph<NodeData, EdgeData, Undirected>,
    /// Map from node name to petgraph's internal index.
    name_index: HashMap<String, NodeIndex>,
}

impl CommunityGraph {
    pub fn new() -> Self {
        Self {
            graph: Graph::new_undirected(),
            name_index: HashMap::new(),
        }
    }

    /// Insert a node by name, or return the existing index.
    pub fn add_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.name_index.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(NodeData::new(name));
        self.name_index.insert(name.to_string(), idx);
        idx
    }

    fn insert_node(&mut self, data: NodeData) -> NodeIndex {
        if let Some(&idx) = self.name_index.get(&data.name) {
            return idx;
        }
        let name = data.name.clone();
        let idx = self.graph.add_node(data);
        self.name_index.insert(name, idx);
        idx
    }

    /// Add an edge between two named nodes. Parallel edges are kept.
    pub fn add_edge(&mut self, a: &str, b: &str, data: EdgeData) {
        let ia = self.add_node(a);
        let ib = self.add_node(b);
        self.graph.add_edge(ia, ib, data);
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn index_of(&self, name: &str) -> Option<NodeIndex> {
        self.name_index.get(name).copied()
    }

    pub fn node(&self, name: &str) -> Option<&NodeData> {
        self.index_of(name).map(|idx| &self.graph[idx])
    }

    pub fn node_mut(&mut self, name: &str) -> Option<&mut NodeData> {
        self.index_of(name).map(move |idx| &mut self.graph[idx])
    }

    pub fn node_at(&self, idx: NodeIndex) -> &NodeData {
        &self.graph[idx]
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeData> + '_ {
        self.graph.node_indices().map(move |idx| &self.graph[idx])
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut NodeData> + '_ {
        self.graph.node_weights_mut()
    }

    pub fn node_names(&self) -> Vec<String> {
        self.nodes().map(|n| n.name.clone()).collect()
    }

    /// Edges as `(endpoint name, endpoint name, data)` in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, &EdgeData)> + '_ {
        self.graph.edge_references().map(move |e| {
            (
                self.graph[e.source()].name.as_str(),
                self.graph[e.target()].name.as_str(),
                e.weight(),
            )
        })
    }

    pub fn edges_mut(&mut self) -> impl Iterator<Item = &mut EdgeData> + '_ {
        self.graph.edge_weights_mut()
    }

    /// Edges as `(node position, node position, weight)` for index-based algorithms.
    pub fn indexed_edges(&self) -> Vec<(usize, usize, f64)> {
        self.graph
            .edge_references()
            .map(|e| (e.source().index(), e.target().index(), e.weight().weight))
            .collect()
    }

    /// Edge weight between two named nodes (first matching edge).
    pub fn edge_weight(&self, a: &str, b: &str) -> Option<f64> {
        let ia = self.index_of(a)?;
        let ib = self.index_of(b)?;
        let edge = self.graph.find_edge(ia, ib)?;
        Some(self.graph[edge].weight)
    }

    /// Degree per node position. Parallel edges count individually and a
    /// self-loop contributes two.
    pub fn degrees(&self) -> Vec<usize> {
        let mut degrees = vec![0; self.graph.node_count()];
        for e in self.graph.edge_references() {
            degrees[e.source().index()] += 1;
            degrees[e.target().index()] += 1;
        }
        degrees
    }

    /// Sum of node occurrence counts.
    pub fn total_node_weight(&self) -> u64 {
        self.nodes().map(|n| n.weight).sum()
    }

    /// True when the graph has neither parallel edges nor self-loops.
    pub fn is_simple(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        for e in self.graph.edge_references() {
            let (a, b) = (e.source().index(), e.target().index());
            if a == b {
                return false;
            }
            if !seen.insert((a.min(b), a.max(b))) {
                return false;
            }
        }
        true
    }

    /// Collapse parallel edges into one (weights summed, earliest timestamp
    /// kept) and drop self-loops.
    pub fn simplify(&mut self) {
        let mut merged: Vec<((usize, usize), EdgeData)> = Vec::new();
        let mut position: HashMap<(usize, usize), usize> = HashMap::new();

        for e in self.graph.edge_references() {
            let (a, b) = (e.source().index(), e.target().index());
            if a == b {
                continue;
            }
            let key = (a.min(b), a.max(b));
            match position.get(&key) {
                Some(&i) => {
                    let slot = &mut merged[i].1;
                    slot.weight += e.weight().weight;
                    slot.timestamp = earliest(slot.timestamp, e.weight().timestamp);
                }
                None => {
                    position.insert(key, merged.len());
                    merged.push((key, e.weight().clone()));
                }
            }
        }

        self.graph.clear_edges();
        for ((a, b), data) in merged {
            self.graph
                .add_edge(NodeIndex::new(a), NodeIndex::new(b), data);
        }
    }

    /// Graph induced by `keep`, preserving the original node and edge order.
    pub fn induced_subgraph(&self, keep: &[NodeIndex]) -> CommunityGraph {
        let mut mask = vec![false; self.graph.node_count()];
        for idx in keep {
            mask[idx.index()] = true;
        }

        let mut sub = CommunityGraph::new();
        for idx in self.graph.node_indices() {
            if mask[idx.index()] {
                sub.insert_node(self.graph[idx].clone());
            }
        }
        for e in self.graph.edge_references() {
            if mask[e.source().index()] && mask[e.target().index()] {
                let a = &self.graph[e.source()].name;
                let b = &self.graph[e.target()].name;
                sub.add_edge(a, b, e.weight().clone());
            }
        }
        sub
    }

    /// Community label to member positions, ordered by label.
    pub fn communities(&self) -> BTreeMap<CommunityId, Vec<NodeIndex>> {
        let mut groups: BTreeMap<CommunityId, Vec<NodeIndex>> = BTreeMap::new();
        for idx in self.graph.node_indices() {
            if let Some(c) = self.graph[idx].community {
                groups.entry(c).or_default().push(idx);
            }
        }
        groups
    }

    /// Induced subgraph of one community.
    pub fn community_subgraph(&self, community: CommunityId) -> CommunityGraph {
        let members: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|idx| self.graph[*idx].community == Some(community))
            .collect();
        self.induced_subgraph(&members)
    }

    /// Union of two graphs: node weights summed by name, edges between the
    /// same pair merged with summed weights, self-loops dropped.
    pub fn union(&self, other: &CommunityGraph) -> CommunityGraph {
        let mut result = CommunityGraph::new();
        for g in [self, other] {
            for node in g.nodes() {
                match result.node_mut(&node.name) {
                    Some(existing) => existing.weight += node.weight,
                    None => {
                        result.insert_node(node.clone());
                    }
                }
            }
        }
        for g in [self, other] {
            for (a, b, data) in g.edges() {
                result.add_edge(a, b, data.clone());
            }
        }
        result.simplify();
        result
    }
}

fn earliest(a: Option<i64>, b: Option<i64>) -> Option<i64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, None) => x,
        (None, y) => y,
    }
}

/// Build the undirected co-occurrence graph of one window.
///
/// A record `a -> b` is paired with a later or earlier `b -> a` record into a
/// single undirected edge carrying the earlier of the two timestamps.
/// Records without a reciprocal partner contribute their endpoints as nodes
/// but no edge. Self-loop records are kept as loop edges.
pub fn build_graph(records: &[RawEdge]) -> Result<CommunityGraph> {
    let mut graph = CommunityGraph::new();
    let mut pending: HashMap<(String, String), VecDeque<i64>> = HashMap::new();

    for (index, record) in records.iter().enumerate() {
        if record.source.trim().is_empty() {
            return Err(TrendError::MalformedInput {
                index,
                reason: "missing source".into(),
            });
        }
        if record.target.trim().is_empty() {
            return Err(TrendError::MalformedInput {
                index,
                reason: "missing target".into(),
            });
        }

        graph.add_node(&record.source);
        graph.add_node(&record.target);

        if record.source == record.target {
            graph.add_edge(
                &record.source,
                &record.target,
                EdgeData {
                    weight: 1.0,
                    timestamp: Some(record.timestamp),
                },
            );
            continue;
        }

        let reverse = (record.target.clone(), record.source.clone());
        let partner = pending.get_mut(&reverse).and_then(|q| q.pop_front());
        match partner {
            Some(ts) => graph.add_edge(
                &record.source,
                &record.target,
                EdgeData {
                    weight: 1.0,
                    timestamp: Some(ts.min(record.timestamp)),
                },
            ),
            None => pending
                .entry((record.source.clone(), record.target.clone()))
                .or_default()
                .push_back(record.timestamp),
        }
    }

    Ok(graph)
}

/// Serialized form of a [`CommunityGraph`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphRecord {
    pub nodes: Vec<NodeData>,
    pub edges: Vec<EdgeRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: usize,
    pub target: usize,
    #[serde(flatten)]
    pub data: EdgeData,
}

impl From<CommunityGraph> for GraphRecord {
    fn from(g: CommunityGraph) -> Self {
        GraphRecord {
            nodes: g.nodes().cloned().collect(),
            edges: g
                .graph
                .edge_references()
                .map(|e| EdgeRecord {
                    source: e.source().index(),
                    target: e.target().index(),
                    data: e.weight().clone(),
                })
                .collect(),
        }
    }
}

impl From<GraphRecord> for CommunityGraph {
    fn from(record: GraphRecord) -> Self {
        let mut g = CommunityGraph::new();
        let indices: Vec<NodeIndex> = record
            .nodes
            .into_iter()
            .map(|n| g.insert_node(n))
            .collect();
        for e in record.edges {
            if let (Some(&a), Some(&b)) = (indices.get(e.source), indices.get(e.target)) {
                g.graph.add_edge(a, b, e.data);
            }
        }
        g
    }
}
