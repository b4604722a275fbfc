//! JSON file stores for graphs, trend threads and trend networks.
//!
//! Graph files live flat in one directory:
//! - `window-<w>.json` for the built snapshot
//! - `window-<w>-com.json` for the labelled graph
//! - `window-<w>-com-<c>.json` for a community subgraph
//! - `matched-communities.json` for the trend threads
//!
//! Trend networks are written to `<dir>/<scope>/<trend_id>/network.json`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use trendscope_core::error::Result;
use trendscope_core::graph::CommunityGraph;
use trendscope_core::store::{GraphKey, GraphStore, TrendScope, TrendStore};
use trendscope_core::types::{Network, TrendThread};

const THREADS_FILE: &str = "matched-communities.json";

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&content)?))
}

/// Graph store backed by a directory of JSON files.
#[derive(Debug, Clone)]
pub struct JsonGraphStore {
    dir: PathBuf,
}

impl JsonGraphStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: GraphKey) -> PathBuf {
        let name = match key {
            GraphKey::Snapshot(w) => format!("window-{w}.json"),
            GraphKey::Labelled(w) => format!("window-{w}-com.json"),
            GraphKey::Community(w, c) => format!("window-{w}-com-{c}.json"),
        };
        self.dir.join(name)
    }
}

impl GraphStore for JsonGraphStore {
    fn save_graph(&self, key: GraphKey, graph: &CommunityGraph) -> Result<()> {
        write_json(&self.path_for(key), graph)
    }

    fn load_graph(&self, key: GraphKey) -> Result<Option<CommunityGraph>> {
        read_json(&self.path_for(key))
    }

    fn save_threads(&self, threads: &[TrendThread]) -> Result<()> {
        write_json(&self.dir.join(THREADS_FILE), threads)
    }

    fn load_threads(&self) -> Result<Option<Vec<TrendThread>>> {
        read_json(&self.dir.join(THREADS_FILE))
    }

    fn clear_derived(&self) -> Result<()> {
        if !self.dir.exists() {
            return Ok(());
        }
        let mut removed = 0usize;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if name.contains("-com") || name == THREADS_FILE {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        debug!(dir = %self.dir.display(), removed, "cleared derived graphs");
        Ok(())
    }
}

/// Trend store writing one `network.json` per `(scope, trend_id)`.
#[derive(Debug, Clone)]
pub struct JsonTrendStore {
    dir: PathBuf,
}

impl JsonTrendStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, scope: TrendScope, trend_id: usize) -> PathBuf {
        self.dir
            .join(scope.to_string())
            .join(trend_id.to_string())
            .join("network.json")
    }
}

impl TrendStore for JsonTrendStore {
    fn save_network(&self, scope: TrendScope, trend_id: usize, network: &Network) -> Result<()> {
        write_json(&self.path_for(scope, trend_id), network)
    }

    fn load_network(&self, scope: TrendScope, trend_id: usize) -> Result<Option<Network>> {
        read_json(&self.path_for(scope, trend_id))
    }

    fn clear(&self) -> Result<()> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir)?;
        }
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use trendscope_core::graph::EdgeData;
    use trendscope_core::types::{EdgeType, NetworkEdge, NetworkNode, NodeType};

    fn sample_graph() -> CommunityGraph {
        let mut g = CommunityGraph::new();
        g.add_edge("climate", "strike", EdgeData::new(1.25));
        g
    }

    #[test]
    fn graphs_round_trip_and_clear() {
        let dir = TempDir::new().unwrap();
        let store = JsonGraphStore::new(dir.path());
        let g = sample_graph();

        store.save_graph(GraphKey::Snapshot(0), &g).unwrap();
        store.save_graph(GraphKey::Labelled(0), &g).unwrap();
        store.save_graph(GraphKey::Community(0, 3), &g).unwrap();
        store
            .save_threads(&[TrendThread::from_entries(vec![(0, 3)])])
            .unwrap();

        let back = store.load_graph(GraphKey::Community(0, 3)).unwrap().unwrap();
        assert_eq!(back.edge_weight("strike", "climate"), Some(1.25));
        assert_eq!(store.load_threads().unwrap().unwrap().len(), 1);
        assert!(store.load_graph(GraphKey::Snapshot(9)).unwrap().is_none());

        store.clear_derived().unwrap();
        assert!(store.load_graph(GraphKey::Snapshot(0)).unwrap().is_some());
        assert!(store.load_graph(GraphKey::Labelled(0)).unwrap().is_none());
        assert!(store.load_graph(GraphKey::Community(0, 3)).unwrap().is_none());
        assert!(store.load_threads().unwrap().is_none());
    }

    #[test]
    fn networks_use_scope_directories() {
        let dir = TempDir::new().unwrap();
        let store = JsonTrendStore::new(dir.path().join("trends"));
        let network = Network {
            nodes: vec![
                NetworkNode {
                    id: 0,
                    name: "climate".into(),
                    weight: 0.75,
                    typ: NodeType::Hashtag,
                },
                NetworkNode {
                    id: 1,
                    name: "strike".into(),
                    weight: 0.25,
                    typ: NodeType::Hashtag,
                },
            ],
            edges: vec![NetworkEdge {
                node_id_1: 0,
                node_id_2: 1,
                weight: 1.5,
                typ: EdgeType::CoOccurrence,
            }],
            trend_score: 15.0,
        };

        store.save_network(TrendScope::Window(2), 0, &network).unwrap();
        store.save_network(TrendScope::Complete, 0, &network).unwrap();
        assert!(dir.path().join("trends/2/0/network.json").exists());
        assert!(dir.path().join("trends/complete/0/network.json").exists());
        assert_eq!(
            store.load_network(TrendScope::Window(2), 0).unwrap(),
            Some(network)
        );
        assert!(store.load_network(TrendScope::Window(1), 0).unwrap().is_none());

        store.clear().unwrap();
        assert!(store.load_network(TrendScope::Complete, 0).unwrap().is_none());
    }
}
