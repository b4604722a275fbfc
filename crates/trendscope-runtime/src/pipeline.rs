//! Pipeline stages: prepare, communities, trends.
//!
//! Per-window work (graph construction, weighting, detection) and per-trend
//! export fan out over scoped worker threads; each job owns its graph, and
//! results are collected in index order. Temporal matching runs on the
//! calling thread once every window has been partitioned.

use crate::config::PipelineSettings;
use std::collections::BTreeMap;
use std::fmt;
use tracing::info;
use trendscope_core::aggregate::{aggregate_trend, community_score, top_trends, RankedTrend};
use trendscope_core::centrality::{extract_representatives, fingerprint};
use trendscope_core::detection::{apply_partition, detect_communities};
use trendscope_core::error::{Result, TrendError};
use trendscope_core::export::build_network;
use trendscope_core::graph::build_graph;
use trendscope_core::matching::{match_communities, PartitionSequenceBuilder, WindowFingerprints};
use trendscope_core::store::{EdgeSource, GraphKey, GraphStore, OccurrenceIndex, TrendScope, TrendStore};
use trendscope_core::types::{TimeWindow, TrendThread};
use trendscope_core::weighting::weight_window;
use trendscope_core::window::format_date;

/// Pipeline stage, for progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Prepare,
    Communities,
    Trends,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Prepare => write!(f, "snapshots"),
            Stage::Communities => write!(f, "communities"),
            Stage::Trends => write!(f, "trends"),
        }
    }
}

/// Receives progress events; called from worker threads.
pub trait StageObserver: Send + Sync {
    fn stage_started(&self, _stage: Stage, _items: usize) {}
    fn item_finished(&self, _stage: Stage) {}
    fn stage_finished(&self, _stage: Stage) {}
}

/// Observer that ignores every event.
pub struct NoopObserver;

impl StageObserver for NoopObserver {}

/// Size of one built window graph.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotSummary {
    pub window: TimeWindow,
    pub nodes: usize,
    pub edges: usize,
}

/// Result of the communities stage.
#[derive(Debug, Clone)]
pub struct CommunitiesReport {
    /// Community count per window.
    pub communities: Vec<usize>,
    pub modularity: Vec<f64>,
    pub threads: Vec<TrendThread>,
}

/// Run `job(i)` for `i in 0..count` on up to `workers` scoped threads.
///
/// Results come back in index order; the error of the lowest failing index
/// is returned. A panicking job panics the caller with the same payload.
fn run_indexed<T, F>(workers: usize, count: usize, job: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(usize) -> Result<T> + Sync,
{
    if workers <= 1 || count <= 1 {
        return (0..count).map(&job).collect();
    }

    let workers = workers.min(count);
    let job = &job;
    let mut slots: Vec<Option<Result<T>>> = (0..count).map(|_| None).collect();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|k| {
                scope.spawn(move || {
                    (k..count)
                        .step_by(workers)
                        .map(|i| (i, job(i)))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        for handle in handles {
            let results = handle
                .join()
                .unwrap_or_else(|payload| std::panic::resume_unwind(payload));
            for (i, result) in results {
                slots[i] = Some(result);
            }
        }
    });

    slots
        .into_iter()
        .enumerate()
        .map(|(i, slot)| {
            slot.unwrap_or_else(|| Err(TrendError::storage(format!("no result for item {i}"))))
        })
        .collect()
}

/// Batch pipeline over a fixed range of windows.
pub struct Pipeline<'a> {
    settings: PipelineSettings,
    graphs: &'a dyn GraphStore,
    trends: &'a dyn TrendStore,
    observer: &'a dyn StageObserver,
}

impl<'a> Pipeline<'a> {
    pub fn new(settings: PipelineSettings, graphs: &'a dyn GraphStore, trends: &'a dyn TrendStore) -> Self {
        Self {
            settings,
            graphs,
            trends,
            observer: &NoopObserver,
        }
    }

    pub fn with_observer(mut self, observer: &'a dyn StageObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    fn window_label(window: &TimeWindow) -> String {
        format!("{} - {}", format_date(window.start), format_date(window.stop))
    }

    /// Build and store the co-occurrence graph of every window.
    pub fn prepare(&self, edges: &dyn EdgeSource) -> Result<Vec<SnapshotSummary>> {
        let windows = &self.settings.windows;
        self.observer.stage_started(Stage::Prepare, windows.len());

        let summaries = run_indexed(self.settings.workers, windows.len(), |w| {
            let window = windows[w];
            let graph = build_graph(&edges.edges(&window)?)?;
            self.graphs.save_graph(GraphKey::Snapshot(w), &graph)?;
            info!(
                window = %Self::window_label(&window),
                nodes = graph.node_count(),
                edges = graph.edge_count(),
                "built snapshot"
            );
            self.observer.item_finished(Stage::Prepare);
            Ok(SnapshotSummary {
                window,
                nodes: graph.node_count(),
                edges: graph.edge_count(),
            })
        })?;

        self.observer.stage_finished(Stage::Prepare);
        Ok(summaries)
    }

    fn detect_window(&self, w: usize, occurrences: &dyn OccurrenceIndex) -> Result<(WindowFingerprints, f64)> {
        let window = &self.settings.windows[w];
        let mut graph = self.graphs.require_graph(GraphKey::Snapshot(w))?;
        weight_window(&mut graph, window, occurrences)?;

        let partition = detect_communities(&graph, &self.settings.method, &self.settings.detection)?;
        apply_partition(&mut graph, &partition);
        self.graphs.save_graph(GraphKey::Labelled(w), &graph)?;

        let mut fingerprints = BTreeMap::new();
        for community in graph.communities().into_keys() {
            let sub = graph.community_subgraph(community);
            info!(
                "Community subgraph: {:?}",
                extract_representatives(&sub, self.settings.representatives)
            );
            self.graphs.save_graph(GraphKey::Community(w, community), &sub)?;
            fingerprints.insert(community, fingerprint(&sub, self.settings.fingerprint_size));
        }
        Ok((fingerprints, partition.modularity))
    }

    /// Weight, partition and fingerprint every window, then match the
    /// communities into trend threads.
    pub fn communities(&self, occurrences: &dyn OccurrenceIndex) -> Result<CommunitiesReport> {
        self.graphs.clear_derived()?;
        let count = self.settings.windows.len();
        self.observer.stage_started(Stage::Communities, count);

        let detected = run_indexed(self.settings.workers, count, |w| {
            let result = self.detect_window(w, occurrences)?;
            self.observer.item_finished(Stage::Communities);
            Ok(result)
        })?;

        let mut builder = PartitionSequenceBuilder::new(count);
        let mut communities = Vec::with_capacity(count);
        let mut modularity = Vec::with_capacity(count);
        for (w, (fingerprints, q)) in detected.into_iter().enumerate() {
            communities.push(fingerprints.len());
            modularity.push(q);
            builder.insert(w, fingerprints)?;
        }

        let threads = match_communities(&builder.finish()?, &self.settings.matching);
        self.graphs.save_threads(&threads)?;
        self.observer.stage_finished(Stage::Communities);

        Ok(CommunitiesReport {
            communities,
            modularity,
            threads,
        })
    }

    fn export_trend(&self, trend_id: usize, trend: &RankedTrend) -> Result<()> {
        let top = self.settings.representatives;
        for entry in &trend.thread.entries {
            let community = self
                .graphs
                .require_graph(GraphKey::Community(entry.window, entry.community))?;
            let score = community_score(&community);
            info!(
                "Time window: {} | Trend score: {} -> {:?}",
                Self::window_label(&self.settings.windows[entry.window]),
                score,
                extract_representatives(&community, top)
            );
            let network = build_network(&community, score, top)?;
            self.trends
                .save_network(TrendScope::Window(entry.window), trend_id, &network)?;
        }

        let cumulative = aggregate_trend(self.graphs, &trend.thread)?;
        let score = community_score(&cumulative);
        let network = build_network(&cumulative, score, top)?;
        self.trends
            .save_network(TrendScope::Complete, trend_id, &network)?;
        info!(
            "Aggregated | Trend score: {} -> {:?}",
            score,
            extract_representatives(&cumulative, top)
        );
        Ok(())
    }

    /// Rank the matched threads and export the top trends.
    pub fn trends(&self) -> Result<Vec<RankedTrend>> {
        self.trends.clear()?;
        let threads = self.graphs.load_threads()?.ok_or_else(|| {
            TrendError::storage("no matched communities found; run the communities stage first")
        })?;
        let top = top_trends(self.graphs, &threads, self.settings.trend_count)?;
        self.observer.stage_started(Stage::Trends, top.len());

        run_indexed(self.settings.workers, top.len(), |trend_id| {
            self.export_trend(trend_id, &top[trend_id])?;
            self.observer.item_finished(Stage::Trends);
            Ok(())
        })?;

        self.observer.stage_finished(Stage::Trends);
        Ok(top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn indexed_results_keep_order() {
        for workers in [1, 3, 8] {
            let out = run_indexed(workers, 10, |i| Ok(i * i)).unwrap();
            assert_eq!(out, (0..10).map(|i| i * i).collect::<Vec<_>>());
        }
    }

    #[test]
    fn lowest_failing_index_wins() {
        let err = run_indexed(4, 10, |i| {
            if i == 3 || i == 7 {
                Err(TrendError::lookup(format!("item {i}")))
            } else {
                Ok(i)
            }
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "Lookup error: item 3");
    }

    #[test]
    #[should_panic(expected = "bad item 5")]
    fn worker_panic_reaches_caller() {
        let _ = run_indexed(3, 8, |i| {
            if i == 5 {
                panic!("bad item {i}");
            }
            Ok(i)
        });
    }

    #[test]
    fn every_item_runs_once() {
        let calls = AtomicUsize::new(0);
        run_indexed(3, 7, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 7);
    }
}
