//! Trend scoring, ranking, selection and cumulative graph union.

use crate::error::{Result, TrendError};
use crate::graph::CommunityGraph;
use crate::store::{GraphKey, GraphStore};
use crate::types::TrendThread;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A trend thread with its cumulative score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedTrend {
    /// Position of the thread in discovery order.
    pub discovery: usize,
    pub thread: TrendThread,
    pub score: f64,
}

/// Score of one community: sum of its node occurrence counts.
pub fn community_score(graph: &CommunityGraph) -> f64 {
    graph.total_node_weight() as f64
}

/// Score of a thread: sum of its communities' scores.
pub fn thread_score<S: GraphStore + ?Sized>(store: &S, thread: &TrendThread) -> Result<f64> {
    let mut score = 0.0;
    for entry in &thread.entries {
        let graph = store.require_graph(GraphKey::Community(entry.window, entry.community))?;
        score += community_score(&graph);
    }
    Ok(score)
}

/// Rank scored threads by descending score, keeping discovery order on ties.
pub fn rank_threads(scored: Vec<(TrendThread, f64)>) -> Vec<RankedTrend> {
    let mut ranked: Vec<RankedTrend> = scored
        .into_iter()
        .enumerate()
        .map(|(discovery, (thread, score))| RankedTrend {
            discovery,
            thread,
            score,
        })
        .collect();
    // sort_by is stable
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

/// The first `n` ranked trends; fewer than `n` is fatal.
pub fn select_top(mut ranked: Vec<RankedTrend>, n: usize) -> Result<Vec<RankedTrend>> {
    if ranked.len() < n {
        return Err(TrendError::InsufficientData {
            found: ranked.len(),
            required: n,
        });
    }
    ranked.truncate(n);
    Ok(ranked)
}

/// Score, rank and select the top `n` threads in one go.
pub fn top_trends<S: GraphStore + ?Sized>(
    store: &S,
    threads: &[TrendThread],
    n: usize,
) -> Result<Vec<RankedTrend>> {
    let scored = threads
        .iter()
        .map(|t| Ok((t.clone(), thread_score(store, t)?)))
        .collect::<Result<Vec<_>>>()?;
    select_top(rank_threads(scored), n)
}

/// Cumulative graph of a thread: the union of its community graphs in
/// window order.
pub fn aggregate_trend<S: GraphStore + ?Sized>(
    store: &S,
    thread: &TrendThread,
) -> Result<CommunityGraph> {
    let mut cumulative = CommunityGraph::new();
    for entry in &thread.entries {
        let graph = store.require_graph(GraphKey::Community(entry.window, entry.community))?;
        cumulative = cumulative.union(&graph);
        debug!(
            window = entry.window,
            community = entry.community,
            nodes = cumulative.node_count(),
            edges = cumulative.edge_count(),
            "merged community into trend"
        );
    }
    Ok(cumulative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeData;
    use crate::store::MemoryGraphStore;

    fn thread(window: usize) -> TrendThread {
        TrendThread::start(window, 0)
    }

    fn community(nodes: &[(&str, u64)], edges: &[(&str, &str, f64)]) -> CommunityGraph {
        let mut g = CommunityGraph::new();
        for (name, weight) in nodes {
            g.add_node(name);
            if let Some(n) = g.node_mut(name) {
                n.weight = *weight;
            }
        }
        for (a, b, w) in edges {
            g.add_edge(a, b, EdgeData::new(*w));
        }
        g
    }

    #[test]
    fn ties_keep_discovery_order() {
        let (a, b, c) = (thread(0), thread(1), thread(2));
        let ranked = rank_threads(vec![(a.clone(), 10.0), (b.clone(), 10.0), (c.clone(), 5.0)]);
        let order: Vec<&TrendThread> = ranked.iter().map(|r| &r.thread).collect();
        assert_eq!(order, vec![&a, &b, &c]);

        let top = select_top(ranked, 2).unwrap();
        let order: Vec<usize> = top.iter().map(|r| r.discovery).collect();
        assert_eq!(order, vec![0, 1]);
    }

    #[test]
    fn higher_score_ranks_first() {
        let ranked = rank_threads(vec![(thread(0), 1.0), (thread(1), 7.0)]);
        assert_eq!(ranked[0].discovery, 1);
    }

    #[test]
    fn too_few_threads_is_insufficient() {
        let ranked = rank_threads(vec![(thread(0), 1.0)]);
        let err = select_top(ranked, 3).unwrap_err();
        assert!(matches!(
            err,
            TrendError::InsufficientData {
                found: 1,
                required: 3
            }
        ));
    }

    #[test]
    fn scores_and_union_follow_thread_windows() {
        let store = MemoryGraphStore::new();
        store
            .save_graph(
                GraphKey::Community(0, 2),
                &community(&[("a", 3), ("b", 4)], &[("a", "b", 1.0)]),
            )
            .unwrap();
        store
            .save_graph(
                GraphKey::Community(2, 0),
                &community(&[("b", 1), ("c", 2)], &[("b", "c", 0.5)]),
            )
            .unwrap();

        let t = TrendThread::from_entries(vec![(0, 2), (2, 0)]);
        assert_eq!(thread_score(&store, &t).unwrap(), 10.0);

        let merged = aggregate_trend(&store, &t).unwrap();
        assert_eq!(merged.node_names(), vec!["a", "b", "c"]);
        assert_eq!(merged.node("b").unwrap().weight, 5);
        assert_eq!(merged.edge_count(), 2);

        let missing = TrendThread::from_entries(vec![(1, 0)]);
        assert!(thread_score(&store, &missing).is_err());
    }

    #[test]
    fn top_trends_scores_from_store() {
        let store = MemoryGraphStore::new();
        store
            .save_graph(GraphKey::Community(0, 0), &community(&[("a", 1)], &[]))
            .unwrap();
        store
            .save_graph(GraphKey::Community(0, 1), &community(&[("b", 9)], &[]))
            .unwrap();
        let threads = vec![TrendThread::start(0, 0), TrendThread::start(0, 1)];
        let top = top_trends(&store, &threads, 1).unwrap();
        assert_eq!(top[0].thread, threads[1]);
        assert_eq!(top[0].score, 9.0);
    }
}
