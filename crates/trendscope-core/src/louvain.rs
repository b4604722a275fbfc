//! Louvain community detection with an optional Leiden-style refinement.
//!
//! The Louvain algorithm is a greedy optimization method for detecting
//! communities in large networks. It optimizes modularity through a
//! two-phase iterative process:
//!
//! 1. **Local Moving**: Greedily move nodes to maximize modularity gain,
//!    visiting nodes in a random order drawn from the caller's RNG
//! 2. **Aggregation**: Build a new graph with communities as nodes
//!
//! With refinement enabled, each community is split into its connected
//! components before aggregation and the aggregate nodes start in the
//! community they came from, so no returned community is internally
//! disconnected.
//!
//! Reference: Blondel et al. (2008) "Fast unfolding of communities in large networks";
//! Traag et al. (2019) "From Louvain to Leiden: guaranteeing well-connected communities"

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::VecDeque;

const MAX_PASSES: usize = 100;
const MAX_SWEEPS: usize = 1000;
const GAIN_EPSILON: f64 = 1e-12;

/// Tuning knobs for one Louvain run.
#[derive(Debug, Clone)]
pub struct LouvainConfig {
    /// Resolution parameter γ (1.0 = classic modularity).
    pub resolution: f64,
    /// Split communities into connected components before aggregating.
    pub refine: bool,
}

impl Default for LouvainConfig {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            refine: false,
        }
    }
}

/// Result of Louvain community detection.
#[derive(Debug, Clone)]
pub struct LouvainResult {
    /// Community per node, numbered 0.. in order of first appearance.
    pub membership: Vec<usize>,
    /// Modularity of `membership` on the input graph.
    pub modularity: f64,
    /// Number of Louvain passes performed.
    pub passes: usize,
}

impl LouvainResult {
    /// Node positions grouped by community.
    pub fn communities(&self) -> Vec<Vec<usize>> {
        let count = self.membership.iter().max().map_or(0, |m| m + 1);
        let mut groups = vec![Vec::new(); count];
        for (node, &c) in self.membership.iter().enumerate() {
            groups[c].push(node);
        }
        groups
    }
}

/// Internal node representation for the algorithm.
#[derive(Clone)]
struct LouvainNode {
    /// Current community assignment.
    community: usize,
    /// Weighted degree (sum of incident edge weights).
    weighted_degree: f64,
    /// Self-loop weight (for aggregated nodes).
    self_loop: f64,
}

/// Graph representation optimized for Louvain.
struct LouvainGraph {
    nodes: Vec<LouvainNode>,
    /// Adjacency list: node_idx -> [(neighbor_idx, weight)], self-loops excluded.
    adj: Vec<Vec<(usize, f64)>>,
    /// Total edge weight (sum of all weights, counting undirected edges once).
    total_weight: f64,
    /// Sum of weighted degrees per community id.
    community_degree: Vec<f64>,
}

impl LouvainGraph {
    fn from_edges(node_count: usize, edges: &[(usize, usize, f64)]) -> Self {
        let mut nodes: Vec<LouvainNode> = (0..node_count)
            .map(|i| LouvainNode {
                community: i,
                weighted_degree: 0.0,
                self_loop: 0.0,
            })
            .collect();

        let mut adj: Vec<Vec<(usize, f64)>> = vec![Vec::new(); node_count];
        let mut total_weight = 0.0;

        for &(from, to, weight) in edges {
            if from == to {
                nodes[from].self_loop += weight;
                nodes[from].weighted_degree += 2.0 * weight;
            } else {
                adj[from].push((to, weight));
                adj[to].push((from, weight));
                nodes[from].weighted_degree += weight;
                nodes[to].weighted_degree += weight;
            }
            total_weight += weight;
        }

        let community_degree = nodes.iter().map(|n| n.weighted_degree).collect();
        Self {
            nodes,
            adj,
            total_weight,
            community_degree,
        }
    }

    /// Overwrite community assignments; ids must be below the node count.
    fn assign(&mut self, communities: &[usize]) {
        self.community_degree = vec![0.0; self.nodes.len()];
        for (node, &c) in self.nodes.iter_mut().zip(communities) {
            node.community = c;
            self.community_degree[c] += node.weighted_degree;
        }
    }

    /// Q = Σc [ (internal_c / m) - γ (degree_c / 2m)^2 ]
    fn modularity(&self, resolution: f64) -> f64 {
        if self.total_weight == 0.0 {
            return 0.0;
        }

        let n = self.nodes.len();
        let m2 = 2.0 * self.total_weight;
        let mut internal = vec![0.0; n];
        let mut degree = vec![0.0; n];

        for node in &self.nodes {
            degree[node.community] += node.weighted_degree;
            internal[node.community] += node.self_loop;
        }
        for (i, neighbors) in self.adj.iter().enumerate() {
            let ci = self.nodes[i].community;
            for &(j, weight) in neighbors {
                if i < j && self.nodes[j].community == ci {
                    internal[ci] += weight;
                }
            }
        }

        (0..n)
            .map(|c| internal[c] / self.total_weight - resolution * (degree[c] / m2).powi(2))
            .sum()
    }

    /// Phase 1: Local moving of nodes to maximize modularity.
    /// Returns true if any node changed community.
    fn local_moving<R: Rng + ?Sized>(&mut self, resolution: f64, rng: &mut R) -> bool {
        let n = self.nodes.len();
        let m2 = 2.0 * self.total_weight;
        let mut order: Vec<usize> = (0..n).collect();
        let mut weight_to: Vec<f64> = vec![0.0; n];
        let mut touched: Vec<usize> = Vec::new();
        let mut improved = false;

        for _ in 0..MAX_SWEEPS {
            order.shuffle(rng);
            let mut changed = false;

            for &i in &order {
                let current = self.nodes[i].community;
                let ki = self.nodes[i].weighted_degree;

                for &(j, weight) in &self.adj[i] {
                    let c = self.nodes[j].community;
                    if weight_to[c] == 0.0 && !touched.contains(&c) {
                        touched.push(c);
                    }
                    weight_to[c] += weight;
                }

                // Take i out of its community before comparing gains
                self.community_degree[current] -= ki;

                let mut best = current;
                let mut best_gain =
                    weight_to[current] - resolution * self.community_degree[current] * ki / m2;
                for &c in &touched {
                    let gain = weight_to[c] - resolution * self.community_degree[c] * ki / m2;
                    if gain > best_gain + GAIN_EPSILON {
                        best_gain = gain;
                        best = c;
                    }
                }

                self.community_degree[best] += ki;
                self.nodes[i].community = best;
                if best != current {
                    changed = true;
                    improved = true;
                }

                for c in touched.drain(..) {
                    weight_to[c] = 0.0;
                }
                weight_to[current] = 0.0;
            }

            if !changed {
                break;
            }
        }

        improved
    }

    /// Current communities renumbered 0.. in node order.
    fn community_groups(&self) -> (Vec<usize>, usize) {
        let mut renumber = vec![usize::MAX; self.nodes.len()];
        let mut next = 0;
        let groups = self
            .nodes
            .iter()
            .map(|node| {
                if renumber[node.community] == usize::MAX {
                    renumber[node.community] = next;
                    next += 1;
                }
                renumber[node.community]
            })
            .collect();
        (groups, next)
    }

    /// Connected components within each community, numbered in node order.
    fn refined_groups(&self) -> (Vec<usize>, usize) {
        let n = self.nodes.len();
        let mut groups = vec![usize::MAX; n];
        let mut next = 0;
        let mut queue = VecDeque::new();

        for start in 0..n {
            if groups[start] != usize::MAX {
                continue;
            }
            let community = self.nodes[start].community;
            groups[start] = next;
            queue.push_back(start);
            while let Some(current) = queue.pop_front() {
                for &(j, _) in &self.adj[current] {
                    if groups[j] == usize::MAX && self.nodes[j].community == community {
                        groups[j] = next;
                        queue.push_back(j);
                    }
                }
            }
            next += 1;
        }
        (groups, next)
    }

    /// Phase 2: Aggregate groups into super-nodes.
    fn aggregate(&self, groups: &[usize], group_count: usize) -> Self {
        let mut edges: Vec<(usize, usize, f64)> = Vec::new();
        let mut slot: std::collections::HashMap<(usize, usize), usize> =
            std::collections::HashMap::new();
        let mut push = |a: usize, b: usize, w: f64| {
            let key = (a.min(b), a.max(b));
            match slot.get(&key) {
                Some(&i) => edges[i].2 += w,
                None => {
                    slot.insert(key, edges.len());
                    edges.push((key.0, key.1, w));
                }
            }
        };

        for (i, neighbors) in self.adj.iter().enumerate() {
            for &(j, weight) in neighbors {
                if i < j {
                    push(groups[i], groups[j], weight);
                }
            }
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if node.self_loop != 0.0 {
                push(groups[i], groups[i], node.self_loop);
            }
        }

        LouvainGraph::from_edges(group_count, &edges)
    }
}

fn renumber(labels: &[usize]) -> Vec<usize> {
    let mut mapping = std::collections::HashMap::new();
    labels
        .iter()
        .map(|&l| {
            let next = mapping.len();
            *mapping.entry(l).or_insert(next)
        })
        .collect()
}

/// Run Louvain community detection on a graph.
///
/// # Arguments
/// * `node_count` - Number of nodes
/// * `edges` - Edges as (from_idx, to_idx, weight); parallel edges and self-loops allowed
/// * `initial` - Optional starting community per node
/// * `config` - Resolution and refinement settings
/// * `rng` - Source of the node visiting order
pub fn louvain_communities<R: Rng + ?Sized>(
    node_count: usize,
    edges: &[(usize, usize, f64)],
    initial: Option<&[usize]>,
    config: &LouvainConfig,
    rng: &mut R,
) -> LouvainResult {
    if node_count == 0 {
        return LouvainResult {
            membership: Vec::new(),
            modularity: 0.0,
            passes: 0,
        };
    }

    let mut graph = LouvainGraph::from_edges(node_count, edges);
    if graph.total_weight <= 0.0 {
        // Degenerate weighting, nothing to optimize
        return LouvainResult {
            membership: (0..node_count).collect(),
            modularity: 0.0,
            passes: 0,
        };
    }
    if let Some(initial) = initial {
        graph.assign(&renumber(initial));
    }

    // Original node -> node of the current (aggregated) graph
    let mut membership: Vec<usize> = (0..node_count).collect();
    let mut passes = 0;

    loop {
        passes += 1;
        let moved = graph.local_moving(config.resolution, rng);
        if !moved || passes >= MAX_PASSES {
            break;
        }

        let (groups, group_count) = if config.refine {
            graph.refined_groups()
        } else {
            graph.community_groups()
        };
        if group_count == graph.nodes.len() {
            break;
        }

        // Aggregate nodes start in the (unrefined) community of their members
        let mut seed = vec![0; group_count];
        for (i, &g) in groups.iter().enumerate() {
            seed[g] = graph.nodes[i].community;
        }
        let seed = renumber(&seed);

        for m in membership.iter_mut() {
            *m = groups[*m];
        }
        graph = graph.aggregate(&groups, group_count);
        graph.assign(&seed);
    }

    let labels: Vec<usize> = membership
        .iter()
        .map(|&node| graph.nodes[node].community)
        .collect();
    let membership = renumber(&labels);
    let modularity = compute_modularity(node_count, edges, &membership);

    LouvainResult {
        membership,
        modularity,
        passes,
    }
}

/// Compute modularity of a given partition.
///
/// # Arguments
/// * `node_count` - Number of nodes
/// * `edges` - Edges as (from_idx, to_idx, weight)
/// * `partition` - Community assignment for each node (indexed by node index)
///
/// # Returns
/// Modularity score (typically 0.3-0.7 for good community structure).
pub fn compute_modularity(
    node_count: usize,
    edges: &[(usize, usize, f64)],
    partition: &[usize],
) -> f64 {
    if node_count == 0 || edges.is_empty() {
        return 0.0;
    }

    let mut graph = LouvainGraph::from_edges(node_count, edges);
    let labels = renumber(&partition[..node_count.min(partition.len())]);
    graph.assign(&labels);
    graph.modularity(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn run(node_count: usize, edges: &[(usize, usize, f64)]) -> LouvainResult {
        let mut rng = StdRng::seed_from_u64(7);
        louvain_communities(node_count, edges, None, &LouvainConfig::default(), &mut rng)
    }

    fn two_cliques() -> Vec<(usize, usize, f64)> {
        vec![
            // Group A internal (complete)
            (0, 1, 1.0),
            (0, 2, 1.0),
            (0, 3, 1.0),
            (1, 2, 1.0),
            (1, 3, 1.0),
            (2, 3, 1.0),
            // Group B internal (complete)
            (4, 5, 1.0),
            (4, 6, 1.0),
            (4, 7, 1.0),
            (5, 6, 1.0),
            (5, 7, 1.0),
            (6, 7, 1.0),
            // Inter-group (sparse)
            (3, 4, 0.2),
        ]
    }

    #[test]
    fn empty_graph() {
        let result = run(0, &[]);
        assert!(result.membership.is_empty());
        assert_eq!(result.modularity, 0.0);
    }

    #[test]
    fn single_node() {
        let result = run(1, &[]);
        assert_eq!(result.membership, vec![0]);
    }

    #[test]
    fn two_disconnected_nodes() {
        let result = run(2, &[]);
        // Each node in its own community
        assert_eq!(result.communities().len(), 2);
    }

    #[test]
    fn two_connected_nodes() {
        let result = run(2, &[(0, 1, 1.0)]);
        assert_eq!(result.membership, vec![0, 0]);
    }

    #[test]
    fn triangle() {
        let result = run(3, &[(0, 1, 1.0), (1, 2, 1.0), (0, 2, 1.0)]);
        assert_eq!(result.communities().len(), 1);
    }

    #[test]
    fn karate_club_style() {
        let result = run(8, &two_cliques());

        assert_eq!(result.communities().len(), 2, "{:?}", result.membership);
        assert_eq!(&result.membership[..4], &[0, 0, 0, 0]);
        assert_eq!(&result.membership[4..], &[1, 1, 1, 1]);
        assert!(
            result.modularity > 0.3,
            "modularity {} should be > 0.3",
            result.modularity
        );
    }

    #[test]
    fn refinement_finds_the_same_split() {
        let mut rng = StdRng::seed_from_u64(11);
        let config = LouvainConfig {
            refine: true,
            ..LouvainConfig::default()
        };
        let result = louvain_communities(8, &two_cliques(), None, &config, &mut rng);
        assert_eq!(result.communities().len(), 2);
        assert!(result.modularity > 0.3);
    }

    #[test]
    fn same_seed_same_partition() {
        let edges = two_cliques();
        let a = run(8, &edges);
        let b = run(8, &edges);
        assert_eq!(a.membership, b.membership);
        assert_eq!(a.modularity, b.modularity);
    }

    #[test]
    fn optimal_initial_membership_is_kept() {
        let mut rng = StdRng::seed_from_u64(3);
        let initial = [5, 5, 5, 5, 9, 9, 9, 9];
        let result = louvain_communities(
            8,
            &two_cliques(),
            Some(&initial),
            &LouvainConfig::default(),
            &mut rng,
        );
        assert_eq!(result.membership, vec![0, 0, 0, 0, 1, 1, 1, 1]);
    }

    #[test]
    fn modularity_calculation() {
        // Simple case: 4 nodes in 2 pairs
        let edges = vec![(0, 1, 1.0), (2, 3, 1.0)];
        let partition = vec![0, 0, 1, 1];

        let q = compute_modularity(4, &edges, &partition);
        // Q = 2 * (1/2 - (2/4)^2) = 2 * (0.5 - 0.25) = 0.5
        assert!((q - 0.5).abs() < 1e-9, "modularity = {}, expected 0.5", q);
    }

    #[test]
    fn modularity_all_one_community() {
        let edges = vec![(0, 1, 1.0), (1, 2, 1.0), (0, 2, 1.0)];
        let q = compute_modularity(3, &edges, &[0, 0, 0]);
        assert!(q.abs() < 1e-9, "modularity = {}, expected ~0", q);
    }

    #[test]
    fn weighted_edges() {
        // Strong edges within communities, weak between
        let edges = vec![(0, 1, 5.0), (2, 3, 5.0), (1, 2, 0.1)];
        let result = run(4, &edges);

        assert_eq!(result.communities().len(), 2);
        assert_eq!(result.membership[0], result.membership[1]);
        assert_eq!(result.membership[2], result.membership[3]);
    }
}
