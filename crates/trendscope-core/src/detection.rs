//! Best-of-N community detection.
//!
//! Each trial runs the selected algorithm with its own seeded RNG; the
//! partition with the strictly highest modularity wins and the first trial
//! wins exact ties. The trial loop is a fold over trial results, so a fixed
//! base seed reproduces the same partition.

use crate::error::{ConfigError, Result, TrendError};
use crate::graph::CommunityGraph;
use crate::louvain::{louvain_communities, LouvainConfig};
use crate::types::CommunityId;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::str::FromStr;
use tracing::{debug, info};

/// Default number of independent trials.
pub const DEFAULT_TRIALS: usize = 10;

/// Modularity-optimizing algorithm family.
///
/// Only Leiden accepts a starting partition, so the invalid combination
/// cannot be constructed.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionMethod {
    Louvain,
    Leiden {
        initial_membership: Option<Vec<CommunityId>>,
    },
}

impl DetectionMethod {
    pub fn leiden() -> Self {
        DetectionMethod::Leiden {
            initial_membership: None,
        }
    }

    /// Resolve a configured selector plus optional hint.
    pub fn from_selector(name: &str, initial_membership: Option<Vec<CommunityId>>) -> Result<Self> {
        match (name.parse::<DetectionMethod>()?, initial_membership) {
            (DetectionMethod::Louvain, Some(_)) => {
                Err(ConfigError::InitialMembershipNotAllowed("louvain".into()).into())
            }
            (DetectionMethod::Louvain, None) => Ok(DetectionMethod::Louvain),
            (DetectionMethod::Leiden { .. }, initial_membership) => {
                Ok(DetectionMethod::Leiden { initial_membership })
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DetectionMethod::Louvain => "louvain",
            DetectionMethod::Leiden { .. } => "leiden",
        }
    }

    fn louvain_config(&self, resolution: f64) -> LouvainConfig {
        LouvainConfig {
            resolution,
            refine: matches!(self, DetectionMethod::Leiden { .. }),
        }
    }

    fn initial_membership(&self) -> Option<&[CommunityId]> {
        match self {
            DetectionMethod::Leiden {
                initial_membership: Some(m),
            } => Some(m.as_slice()),
            _ => None,
        }
    }
}

impl FromStr for DetectionMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "louvain" => Ok(DetectionMethod::Louvain),
            "leiden" => Ok(DetectionMethod::leiden()),
            other => Err(ConfigError::UnknownMethod(other.to_string())),
        }
    }
}

/// Trial count, seeding and resolution.
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    pub trials: usize,
    /// Base seed; trial `i` uses `seed + i`. `None` draws a random base.
    pub seed: Option<u64>,
    pub resolution: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            trials: DEFAULT_TRIALS,
            seed: None,
            resolution: 1.0,
        }
    }
}

/// Community label per node position plus its modularity.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub membership: Vec<CommunityId>,
    pub modularity: f64,
}

impl Partition {
    pub fn community_count(&self) -> usize {
        self.membership.iter().max().map_or(0, |m| m + 1)
    }
}

/// Keep the strictly better partition; the incumbent wins ties.
fn keep_best(best: Option<Partition>, candidate: Partition) -> Option<Partition> {
    match best {
        Some(incumbent) if candidate.modularity <= incumbent.modularity => Some(incumbent),
        _ => Some(candidate),
    }
}

/// Partition `graph` with the best of `config.trials` independent runs.
pub fn detect_communities(
    graph: &CommunityGraph,
    method: &DetectionMethod,
    config: &DetectionConfig,
) -> Result<Partition> {
    if config.trials == 0 {
        return Err(TrendError::invalid_config(
            "trials",
            "0",
            "at least one trial is required",
        ));
    }
    if let Some(initial) = method.initial_membership() {
        if initial.len() != graph.node_count() {
            return Err(TrendError::invalid_config(
                "initial_membership",
                initial.len().to_string(),
                format!("expected one label per node ({})", graph.node_count()),
            ));
        }
    }

    let edges = graph.indexed_edges();
    let louvain = method.louvain_config(config.resolution);
    let base_seed = config.seed.unwrap_or_else(rand::random);

    let best = (0..config.trials)
        .map(|trial| {
            let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(trial as u64));
            let result = louvain_communities(
                graph.node_count(),
                &edges,
                method.initial_membership(),
                &louvain,
                &mut rng,
            );
            debug!(
                trial,
                method = method.name(),
                modularity = result.modularity,
                passes = result.passes,
                "detection trial"
            );
            Partition {
                membership: result.membership,
                modularity: result.modularity,
            }
        })
        .fold(None, keep_best);

    let best = best.ok_or_else(|| TrendError::invalid_config("trials", "0", "no trial ran"))?;
    info!(
        method = method.name(),
        modularity = best.modularity,
        communities = best.community_count(),
        "best partition"
    );
    Ok(best)
}

/// Write the partition's labels onto the graph's nodes.
pub fn apply_partition(graph: &mut CommunityGraph, partition: &Partition) {
    for (node, &c) in graph.nodes_mut().zip(&partition.membership) {
        node.community = Some(c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeData;

    fn clique_pair() -> CommunityGraph {
        let mut g = CommunityGraph::new();
        for group in [["a", "b", "c", "d"], ["e", "f", "g", "h"]] {
            for i in 0..4 {
                for j in (i + 1)..4 {
                    g.add_edge(group[i], group[j], EdgeData::new(1.0));
                }
            }
        }
        g.add_edge("d", "e", EdgeData::new(0.2));
        g
    }

    fn seeded(seed: u64) -> DetectionConfig {
        DetectionConfig {
            seed: Some(seed),
            ..DetectionConfig::default()
        }
    }

    #[test]
    fn selector_parsing() {
        assert_eq!("Leiden".parse::<DetectionMethod>().unwrap(), DetectionMethod::leiden());
        assert_eq!("louvain".parse::<DetectionMethod>().unwrap(), DetectionMethod::Louvain);
        assert!(matches!(
            "infomap".parse::<DetectionMethod>(),
            Err(ConfigError::UnknownMethod(_))
        ));
    }

    #[test]
    fn louvain_rejects_initial_membership() {
        let err = DetectionMethod::from_selector("louvain", Some(vec![0, 1])).unwrap_err();
        assert!(matches!(
            err,
            TrendError::Config(ConfigError::InitialMembershipNotAllowed(_))
        ));
        assert!(DetectionMethod::from_selector("leiden", Some(vec![0, 1])).is_ok());
    }

    #[test]
    fn best_partition_clears_modularity_floor() {
        for method in [DetectionMethod::Louvain, DetectionMethod::leiden()] {
            let p = detect_communities(&clique_pair(), &method, &seeded(42)).unwrap();
            assert_eq!(p.community_count(), 2, "{}", method.name());
            assert!(p.modularity > 0.4, "{} modularity {}", method.name(), p.modularity);
        }
    }

    #[test]
    fn fixed_seed_is_reproducible() {
        let g = clique_pair();
        let a = detect_communities(&g, &DetectionMethod::leiden(), &seeded(9)).unwrap();
        let b = detect_communities(&g, &DetectionMethod::leiden(), &seeded(9)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn first_trial_wins_ties() {
        let first = Partition {
            membership: vec![0, 0],
            modularity: 0.5,
        };
        let tie = Partition {
            membership: vec![0, 1],
            modularity: 0.5,
        };
        let better = Partition {
            membership: vec![1, 0],
            modularity: 0.6,
        };
        let best = [first.clone(), tie].into_iter().fold(None, keep_best).unwrap();
        assert_eq!(best, first);
        let best = [first, better.clone()].into_iter().fold(None, keep_best).unwrap();
        assert_eq!(best, better);
    }

    #[test]
    fn zero_trials_is_config_error() {
        let config = DetectionConfig {
            trials: 0,
            ..DetectionConfig::default()
        };
        let err = detect_communities(&clique_pair(), &DetectionMethod::Louvain, &config).unwrap_err();
        assert!(matches!(err, TrendError::Config(_)));
    }

    #[test]
    fn wrong_hint_length_is_config_error() {
        let method = DetectionMethod::Leiden {
            initial_membership: Some(vec![0; 3]),
        };
        let err = detect_communities(&clique_pair(), &method, &seeded(1)).unwrap_err();
        assert!(matches!(err, TrendError::Config(_)));
    }

    #[test]
    fn partition_labels_nodes() {
        let mut g = clique_pair();
        let p = detect_communities(&g, &DetectionMethod::Louvain, &seeded(5)).unwrap();
        apply_partition(&mut g, &p);
        assert_eq!(g.node("a").unwrap().community, Some(0));
        assert_eq!(g.node("h").unwrap().community, Some(1));
        assert_eq!(g.communities().len(), 2);
    }
}
