//! PageRank centrality and representative extraction.
//!
//! Representatives are every node whose centrality reaches the K-th largest
//! value, so ties at the threshold can yield more than K names. The list is
//! ordered by descending centrality with ties broken by name.

use crate::graph::CommunityGraph;
use crate::types::Fingerprint;
use petgraph::graph::NodeIndex;
use std::cmp::Ordering;

/// Damping factor of the random surfer.
pub const DAMPING: f64 = 0.85;
const MAX_ITERATIONS: usize = 1000;
const TOLERANCE: f64 = 1e-12;

/// PageRank per node position (sums to 1 on non-empty graphs).
///
/// Edges are traversed in both directions and counted by multiplicity;
/// edge weights are ignored. Isolated nodes spread their mass uniformly.
pub fn pagerank(graph: &CommunityGraph) -> Vec<f64> {
    let n = graph.node_count();
    if n == 0 {
        return Vec::new();
    }

    let mut neighbors: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (a, b, _) in graph.indexed_edges() {
        neighbors[a].push(b);
        if a != b {
            neighbors[b].push(a);
        }
    }

    let uniform = 1.0 / n as f64;
    let mut rank = vec![uniform; n];
    let mut next = vec![0.0; n];

    for _ in 0..MAX_ITERATIONS {
        let dangling: f64 = (0..n)
            .filter(|&i| neighbors[i].is_empty())
            .map(|i| rank[i])
            .sum();
        let base = (1.0 - DAMPING) * uniform + DAMPING * dangling * uniform;
        next.iter_mut().for_each(|v| *v = base);

        for (i, out) in neighbors.iter().enumerate() {
            if out.is_empty() {
                continue;
            }
            let share = DAMPING * rank[i] / out.len() as f64;
            for &j in out {
                next[j] += share;
            }
        }

        let delta: f64 = rank.iter().zip(&next).map(|(a, b)| (a - b).abs()).sum();
        std::mem::swap(&mut rank, &mut next);
        if delta < TOLERANCE {
            break;
        }
    }

    rank
}

/// Positions of the top `k` nodes by `centrality`, including every node
/// tied with the K-th value. Ordered by descending centrality, then name.
pub fn top_by_centrality(graph: &CommunityGraph, centrality: &[f64], k: usize) -> Vec<NodeIndex> {
    if k == 0 || centrality.is_empty() {
        return Vec::new();
    }

    let mut sorted = centrality.to_vec();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));
    let threshold = sorted[k.min(sorted.len()) - 1];

    let mut selected: Vec<NodeIndex> = graph
        .node_indices()
        .filter(|idx| centrality[idx.index()] >= threshold)
        .collect();
    selected.sort_by(|a, b| {
        centrality[b.index()]
            .partial_cmp(&centrality[a.index()])
            .unwrap_or(Ordering::Equal)
            .then_with(|| graph.node_at(*a).name.cmp(&graph.node_at(*b).name))
    });
    selected
}

/// Names of the most central nodes of `graph`.
pub fn extract_representatives(graph: &CommunityGraph, k: usize) -> Vec<String> {
    let centrality = pagerank(graph);
    top_by_centrality(graph, &centrality, k)
        .into_iter()
        .map(|idx| graph.node_at(idx).name.clone())
        .collect()
}

/// Identity fingerprint of a community graph for temporal matching.
pub fn fingerprint(graph: &CommunityGraph, k: usize) -> Fingerprint {
    Fingerprint::new(extract_representatives(graph, k))
}
