//! # Trendscope Runtime
//!
//! Batch orchestration of the trend pipeline plus the file-backed
//! collaborators it reads from and writes to.
//!
//! The three stages run independently and communicate only through the
//! stores, so each can be re-run on its own:
//!
//! - `prepare`: edge lists to window graphs
//! - `communities`: weighting, detection, fingerprinting, temporal matching
//! - `trends`: ranking and export of the top trends

pub mod config;
pub mod csv_source;
pub mod file_store;
pub mod pipeline;

#[cfg(feature = "sqlite")]
pub mod sqlite_store;

pub use config::{PipelineConfig, PipelineSettings};
pub use csv_source::{CsvEdgeSource, CsvOccurrenceIndex};
pub use file_store::{JsonGraphStore, JsonTrendStore};
pub use pipeline::{CommunitiesReport, NoopObserver, Pipeline, SnapshotSummary, Stage, StageObserver};

#[cfg(feature = "sqlite")]
pub use sqlite_store::SqliteTrendStore;
