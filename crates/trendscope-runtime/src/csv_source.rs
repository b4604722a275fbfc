//! CSV-backed edge source and occurrence index.
//!
//! Layout:
//! - `<edge_dir>/<start>-<stop>.csv` with columns `source,target,timestamp`
//! - `<node_dir>/<start>-<stop>.csv` with the node name in the first column
//!   and a `count` column
//! - one interactions file with `start,stop,count` rows

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::debug;
use trendscope_core::error::{Result, TrendError};
use trendscope_core::store::{EdgeSource, OccurrenceIndex};
use trendscope_core::types::{RawEdge, TimeWindow};

fn open_reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| TrendError::storage(format!("Failed to open {}: {e}", path.display())))
}

fn poisoned<T>(_: T) -> TrendError {
    TrendError::storage("occurrence cache lock poisoned")
}

fn record_error(path: &Path, e: csv::Error) -> TrendError {
    TrendError::storage(format!("Failed to read CSV record in {}: {e}", path.display()))
}

/// Reads one edge list file per window. Records stamped outside the
/// window are skipped.
#[derive(Debug, Clone)]
pub struct CsvEdgeSource {
    dir: PathBuf,
}

impl CsvEdgeSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, window: &TimeWindow) -> PathBuf {
        self.dir.join(format!("{}.csv", window.key()))
    }
}

impl EdgeSource for CsvEdgeSource {
    fn edges(&self, window: &TimeWindow) -> Result<Vec<RawEdge>> {
        let path = self.path_for(window);
        let mut reader = open_reader(&path)?;
        let records = reader
            .deserialize::<RawEdge>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| record_error(&path, e))?;
        let total = records.len();
        let edges: Vec<RawEdge> = records
            .into_iter()
            .filter(|e| window.contains(e.timestamp))
            .collect();
        debug!(
            window = %window.key(),
            records = edges.len(),
            dropped = total - edges.len(),
            "read edge list"
        );
        Ok(edges)
    }
}

#[derive(Debug, Deserialize)]
struct InteractionRow {
    start: i64,
    stop: i64,
    count: u64,
}

type CountTable = Arc<HashMap<String, u64>>;

/// Node occurrence counts per window, loaded lazily and cached.
#[derive(Debug)]
pub struct CsvOccurrenceIndex {
    node_dir: PathBuf,
    totals: HashMap<TimeWindow, u64>,
    cache: RwLock<HashMap<TimeWindow, CountTable>>,
}

impl CsvOccurrenceIndex {
    /// Open the index; the interactions file is read eagerly.
    pub fn open(node_dir: impl Into<PathBuf>, interactions: &Path) -> Result<Self> {
        let mut reader = open_reader(interactions)?;
        let mut totals = HashMap::new();
        for row in reader.deserialize::<InteractionRow>() {
            let row = row.map_err(|e| record_error(interactions, e))?;
            totals.insert(TimeWindow::new(row.start, row.stop), row.count);
        }
        Ok(Self {
            node_dir: node_dir.into(),
            totals,
            cache: RwLock::new(HashMap::new()),
        })
    }

    fn load_counts(&self, window: &TimeWindow) -> Result<CountTable> {
        let path = self.node_dir.join(format!("{}.csv", window.key()));
        let mut reader = open_reader(&path)?;
        let column = reader
            .headers()
            .map_err(|e| record_error(&path, e))?
            .iter()
            .position(|h| h == "count")
            .ok_or_else(|| {
                TrendError::storage(format!("{} has no count column", path.display()))
            })?;

        let mut counts = HashMap::new();
        for record in reader.records() {
            let record = record.map_err(|e| record_error(&path, e))?;
            let name = record.get(0).unwrap_or_default().to_string();
            let count = record
                .get(column)
                .and_then(|c| c.parse::<u64>().ok())
                .ok_or_else(|| {
                    TrendError::storage(format!("invalid count for {name} in {}", path.display()))
                })?;
            counts.insert(name, count);
        }
        Ok(Arc::new(counts))
    }

    fn counts(&self, window: &TimeWindow) -> Result<CountTable> {
        if let Some(table) = self.cache.read().map_err(poisoned)?.get(window) {
            return Ok(Arc::clone(table));
        }
        let table = self.load_counts(window)?;
        self.cache
            .write()
            .map_err(poisoned)?
            .insert(*window, Arc::clone(&table));
        Ok(table)
    }
}

impl OccurrenceIndex for CsvOccurrenceIndex {
    fn occurrences(&self, window: &TimeWindow, node: &str) -> Result<u64> {
        self.counts(window)?.get(node).copied().ok_or_else(|| {
            TrendError::lookup(format!("no occurrence count for {} in {}", node, window.key()))
        })
    }

    fn total_interactions(&self, window: &TimeWindow) -> Result<u64> {
        self.totals.get(window).copied().ok_or_else(|| {
            TrendError::lookup(format!("no interaction total for {}", window.key()))
        })
    }

    fn occurrences_for(&self, window: &TimeWindow, nodes: &[String]) -> Result<Vec<u64>> {
        let table = self.counts(window)?;
        nodes
            .iter()
            .map(|n| {
                table.get(n).copied().ok_or_else(|| {
                    TrendError::lookup(format!("no occurrence count for {} in {}", n, window.key()))
                })
            })
            .collect()
    }
}
