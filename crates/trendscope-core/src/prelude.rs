//! Trendscope Core Prelude: convenient imports for common usage.
//!
//! ```rust
//! use trendscope_core::prelude::*;
//! ```

// Re-export commonly used types
pub use crate::types::{
    CommunityId, WindowIndex,
    TimeWindow, RawEdge,
    Fingerprint, num_overlap,
    ThreadEntry, TrendThread,
    Network, NetworkNode, NetworkEdge, NodeType, EdgeType,
    TrendDescription,
};

// Graph construction and weighting
pub use crate::graph::{build_graph, CommunityGraph, EdgeData, NodeData};
pub use crate::weighting::{assign_pmi, degree_median, weight_window, WeightingReport};

// Detection and fingerprints
pub use crate::detection::{apply_partition, detect_communities, DetectionConfig, DetectionMethod, Partition};
pub use crate::centrality::{extract_representatives, fingerprint};

// Matching, aggregation and export
pub use crate::matching::{
    match_communities, CompletePartitionSequence, MatchingConfig, PartitionSequenceBuilder, TieBreak,
};
pub use crate::aggregate::{aggregate_trend, rank_threads, select_top, top_trends, RankedTrend};
pub use crate::export::build_network;
pub use crate::trend::{trend_description, trend_scores};
pub use crate::window::{time_window, time_windows};

// Collaborator traits
pub use crate::store::{EdgeSource, GraphKey, GraphStore, OccurrenceIndex, TrendScope, TrendStore};

// Re-export error types
pub use crate::error::{ConfigError, Result, TrendError};
