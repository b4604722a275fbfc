//! Shared types used across the pipeline stages.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Community label, unique only within one window.
pub type CommunityId = usize;

/// Position of a window in the analysed range (0-based).
pub type WindowIndex = usize;

/// Half-open unix-time interval `[start, stop)` covered by one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: i64,
    pub stop: i64,
}

impl TimeWindow {
    pub fn new(start: i64, stop: i64) -> Self {
        Self { start, stop }
    }

    /// Storage key used by file-backed collaborators: `"<start>-<stop>"`.
    pub fn key(&self) -> String {
        format!("{}-{}", self.start, self.stop)
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.start && timestamp < self.stop
    }
}

/// One observed co-occurrence instance, directed as recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEdge {
    pub source: String,
    pub target: String,
    pub timestamp: i64,
}

impl RawEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>, timestamp: i64) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            timestamp,
        }
    }
}

/// Ordered representative node names identifying a community in one window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint(pub Vec<String>);

impl Fingerprint {
    pub fn new(names: Vec<String>) -> Self {
        Self(names)
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of representatives shared with `other`.
    pub fn overlap(&self, other: &Fingerprint) -> usize {
        num_overlap(&self.0, &other.0)
    }
}

/// Size of the set intersection of two name lists.
pub fn num_overlap(a: &[String], b: &[String]) -> usize {
    let left: HashSet<&str> = a.iter().map(String::as_str).collect();
    let right: HashSet<&str> = b.iter().map(String::as_str).collect();
    left.intersection(&right).count()
}

/// One `(window, community)` reference inside a trend thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ThreadEntry {
    pub window: WindowIndex,
    pub community: CommunityId,
}

/// Chain of matched communities, strictly increasing in window index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendThread {
    pub entries: Vec<ThreadEntry>,
}

impl TrendThread {
    pub fn start(window: WindowIndex, community: CommunityId) -> Self {
        Self {
            entries: vec![ThreadEntry { window, community }],
        }
    }

    pub fn from_entries(entries: Vec<(WindowIndex, CommunityId)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(window, community)| ThreadEntry { window, community })
                .collect(),
        }
    }

    pub fn push(&mut self, window: WindowIndex, community: CommunityId) {
        debug_assert!(self.last_window().map_or(true, |last| last < window));
        self.entries.push(ThreadEntry { window, community });
    }

    pub fn last_window(&self) -> Option<WindowIndex> {
        self.entries.last().map(|e| e.window)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn windows(&self) -> impl Iterator<Item = WindowIndex> + '_ {
        self.entries.iter().map(|e| e.window)
    }
}

/// Node tag in the exported network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeType {
    #[serde(rename = "hashtag")]
    Hashtag,
    #[serde(rename = "twitter user")]
    TwitterUser,
}

/// Edge tag in the exported network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeType {
    #[serde(rename = "co-occurrence")]
    CoOccurrence,
}

/// Exported node; `id` indexes into the network's own node list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkNode {
    pub id: usize,
    pub name: String,
    pub weight: f64,
    pub typ: NodeType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkEdge {
    pub node_id_1: usize,
    pub node_id_2: usize,
    pub weight: f64,
    pub typ: EdgeType,
}

/// Boundary representation of one trend in one scope (window or aggregate).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub nodes: Vec<NetworkNode>,
    pub edges: Vec<NetworkEdge>,
    pub trend_score: f64,
}

/// Keywords of a trend's aggregate network with their normalized weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendDescription {
    pub keywords: Vec<String>,
    pub weights: Vec<f64>,
}
