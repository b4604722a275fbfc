//! Exportable trend networks.
//!
//! A network keeps the most central nodes of a community or trend graph,
//! with PageRank rescaled so the exported node weights sum to one.

use crate::centrality::{pagerank, top_by_centrality};
use crate::error::{Result, TrendError};
use crate::graph::CommunityGraph;
use crate::types::{EdgeType, Network, NetworkEdge, NetworkNode, NodeType};
use std::collections::HashMap;

/// Number of nodes kept in an exported network.
pub const DEFAULT_NETWORK_SIZE: usize = 10;

/// Build the export form of `graph`, restricted to its `top` most central
/// nodes (ties at the threshold included).
///
/// Nodes are listed by descending centrality; edge weights are the graph's
/// PMI weights. Fails on graphs with parallel edges or self-loops.
pub fn build_network(graph: &CommunityGraph, trend_score: f64, top: usize) -> Result<Network> {
    if !graph.is_simple() {
        return Err(TrendError::data_quality(
            "trend network requires a simple graph",
        ));
    }

    let centrality = pagerank(graph);
    let selected = top_by_centrality(graph, &centrality, top);
    let total: f64 = selected.iter().map(|idx| centrality[idx.index()]).sum();

    let nodes: Vec<NetworkNode> = selected
        .iter()
        .enumerate()
        .map(|(id, idx)| NetworkNode {
            id,
            name: graph.node_at(*idx).name.clone(),
            weight: if total > 0.0 {
                centrality[idx.index()] / total
            } else {
                0.0
            },
            typ: NodeType::Hashtag,
        })
        .collect();

    let ids: HashMap<&str, usize> = nodes.iter().map(|n| (n.name.as_str(), n.id)).collect();
    let sub = graph.induced_subgraph(&selected);
    let edges = sub
        .edges()
        .filter_map(|(a, b, data)| {
            Some(NetworkEdge {
                node_id_1: *ids.get(a)?,
                node_id_2: *ids.get(b)?,
                weight: data.weight,
                typ: EdgeType::CoOccurrence,
            })
        })
        .collect();

    Ok(Network {
        nodes,
        edges,
        trend_score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeData;

    fn ring(n: usize) -> CommunityGraph {
        let mut g = CommunityGraph::new();
        for i in 0..n {
            let a = format!("n{i}");
            let b = format!("n{}", (i + 1) % n);
            g.add_edge(&a, &b, EdgeData::new(0.5 + i as f64));
        }
        g.add_edge("n0", "n5", EdgeData::new(2.0));
        g.add_edge("n0", "n7", EdgeData::new(2.0));
        g
    }

    #[test]
    fn exported_weights_sum_to_one() {
        let network = build_network(&ring(15), 42.0, DEFAULT_NETWORK_SIZE).unwrap();
        assert!(network.nodes.len() >= DEFAULT_NETWORK_SIZE);
        let total: f64 = network.nodes.iter().map(|n| n.weight).sum();
        assert!((total - 1.0).abs() < 1e-9, "{total}");
        assert_eq!(network.trend_score, 42.0);
        assert_eq!(network.nodes[0].name, "n0");
    }

    #[test]
    fn edges_reference_exported_ids() {
        let network = build_network(&ring(15), 1.0, 4).unwrap();
        let count = network.nodes.len();
        for (i, node) in network.nodes.iter().enumerate() {
            assert_eq!(node.id, i);
        }
        for edge in &network.edges {
            assert!(edge.node_id_1 < count && edge.node_id_2 < count);
            assert_eq!(edge.typ, EdgeType::CoOccurrence);
        }
    }

    #[test]
    fn non_simple_graph_is_rejected() {
        let mut g = ring(4);
        g.add_edge("n1", "n2", EdgeData::new(1.0));
        let err = build_network(&g, 0.0, 10).unwrap_err();
        assert!(matches!(err, TrendError::DataQuality(_)));
    }

    #[test]
    fn empty_graph_exports_empty_network() {
        let network = build_network(&CommunityGraph::new(), 3.0, 10).unwrap();
        assert!(network.nodes.is_empty() && network.edges.is_empty());
    }
}
