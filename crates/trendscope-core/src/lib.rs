//! # Trendscope Core
//!
//! Temporal graph analytics for discovering persistent topical trends in a
//! sequence of monthly co-occurrence networks.
//!
//! Per window the pipeline is:
//!
//! - **build**: collapse raw co-occurrence records into an undirected graph ([`graph`])
//! - **weight**: drop low-degree nodes, assign PMI edge weights ([`weighting`])
//! - **detect**: best-of-N modularity optimization ([`detection`], [`louvain`])
//! - **fingerprint**: top-K PageRank representatives per community ([`centrality`])
//!
//! Across windows:
//!
//! - **match**: chain fingerprints into trend threads with bounded memory ([`matching`])
//! - **aggregate**: score, rank and merge threads into trend graphs ([`aggregate`])
//! - **export**: centrality-normalized trend networks ([`export`])
//!
//! ## Quick Start
//!
//! ```rust
//! use trendscope_core::prelude::*;
//!
//! let edges = vec![
//!     RawEdge::new("rust", "async", 10),
//!     RawEdge::new("async", "rust", 11),
//! ];
//! let graph = build_graph(&edges).unwrap();
//! assert_eq!(graph.node_count(), 2);
//! assert_eq!(graph.edge_count(), 1);
//! ```

pub mod aggregate;
pub mod centrality;
pub mod detection;
pub mod error;
pub mod export;
pub mod graph;
pub mod louvain;
pub mod matching;
pub mod prelude;
pub mod store;
pub mod trend;
pub mod types;
pub mod weighting;
pub mod window;
