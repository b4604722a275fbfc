//! Degree filtering and PMI edge weighting.
//!
//! Two ordered steps per window:
//!
//! 1. Fit a discrete power law (fixed `xmin = 1`) to the degree sequence,
//!    check it against an exponential alternative with a log-likelihood
//!    ratio, and drop every node whose degree is below the power law's
//!    median `k½ = 2^(1/(α−1)) · xmin`.
//! 2. Attach occurrence counts to the surviving nodes, collapse parallel
//!    edges into co-occurrence counts and replace each count with
//!    `ln(p(u,v) / (p(u)·p(v)))`.
//!
//! Reference: Clauset, Shalizi, Newman (2009) "Power-law distributions in
//! empirical data"

use crate::error::{Result, TrendError};
use crate::graph::CommunityGraph;
use crate::store::OccurrenceIndex;
use crate::types::TimeWindow;
use petgraph::graph::NodeIndex;
use tracing::{debug, info};

/// Lower bound of the fitted power-law tail.
pub const DEFAULT_XMIN: usize = 1;

/// Outcome of fitting the degree distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerLawFit {
    pub alpha: f64,
    pub xmin: usize,
    /// Sum of per-sample log-likelihood differences (power law minus exponential).
    pub log_likelihood_ratio: f64,
    /// Ratio normalized by its standard deviation (Vuong's statistic).
    pub normalized_ratio: f64,
}

impl PowerLawFit {
    /// Theoretical median of the fitted power law.
    pub fn median(&self) -> Result<f64> {
        if self.alpha <= 1.0 + 1e-4 {
            return Err(TrendError::data_quality(format!(
                "cannot determine median: power-law exponent {:.4} <= 1",
                self.alpha
            )));
        }
        Ok(2f64.powf(1.0 / (self.alpha - 1.0)) * self.xmin as f64)
    }
}

/// Summary of one window's weighting pass.
#[derive(Debug, Clone)]
pub struct WeightingReport {
    pub fit: PowerLawFit,
    pub median: f64,
    pub removed_nodes: usize,
    pub total_interactions: u64,
}

/// Hurwitz zeta `ζ(s, q) = Σ_{k≥0} (k+q)^-s` for `s > 1` via Euler–Maclaurin.
fn hurwitz_zeta(s: f64, q: f64) -> f64 {
    const DIRECT_TERMS: usize = 16;
    // B2, B4, B6, B8, B10
    const BERNOULLI: [f64; 5] = [1.0 / 6.0, -1.0 / 30.0, 1.0 / 42.0, -1.0 / 30.0, 5.0 / 66.0];

    let mut sum = 0.0;
    for k in 0..DIRECT_TERMS {
        sum += (k as f64 + q).powf(-s);
    }

    let n = DIRECT_TERMS as f64 + q;
    sum += n.powf(1.0 - s) / (s - 1.0) + 0.5 * n.powf(-s);

    // Σ B_2j / (2j)! · s(s+1)…(s+2j−2) · n^(−s−2j+1)
    let mut rising = s;
    let mut factorial = 2.0;
    let mut power = n.powf(-s - 1.0);
    for (j, b) in BERNOULLI.iter().enumerate() {
        sum += b / factorial * rising * power;
        let m = 2.0 * (j as f64 + 1.0);
        rising *= (s + m - 1.0) * (s + m);
        factorial *= (m + 1.0) * (m + 2.0);
        power /= n * n;
    }
    sum
}

/// Approximate discrete MLE of the exponent: `1 + n / Σ ln(x / (xmin − ½))`.
pub fn discrete_alpha(samples: &[f64], xmin: usize) -> f64 {
    let shift = xmin as f64 - 0.5;
    let log_sum: f64 = samples.iter().map(|x| (x / shift).ln()).sum();
    1.0 + samples.len() as f64 / log_sum
}

/// Fit a discrete power law to `degrees` (values below `xmin` are ignored)
/// and compare it against a discrete exponential distribution.
pub fn fit_power_law(degrees: &[usize], xmin: usize) -> Result<PowerLawFit> {
    let xmin = xmin.max(1);
    let samples: Vec<f64> = degrees
        .iter()
        .filter(|&&d| d >= xmin)
        .map(|&d| d as f64)
        .collect();
    if samples.len() < 2 {
        return Err(TrendError::data_quality(format!(
            "cannot fit degree distribution: only {} nodes with degree >= {}",
            samples.len(),
            xmin
        )));
    }

    let n = samples.len() as f64;
    let alpha = discrete_alpha(&samples, xmin);

    // Discrete exponential on x >= xmin: p(x) = (1 − e^−λ) e^−λ(x − xmin)
    let mean = samples.iter().sum::<f64>() / n;
    let excess = mean - xmin as f64;
    let lambda = if excess > 0.0 {
        (1.0 + 1.0 / excess).ln()
    } else {
        f64::INFINITY
    };

    let log_norm = hurwitz_zeta(alpha, xmin as f64).ln();
    let diffs: Vec<f64> = samples
        .iter()
        .map(|&x| {
            let pl = -alpha * x.ln() - log_norm;
            let exp = if lambda.is_finite() {
                (1.0 - (-lambda).exp()).ln() - lambda * (x - xmin as f64)
            } else {
                0.0
            };
            pl - exp
        })
        .collect();

    let ratio: f64 = diffs.iter().sum();
    let mean_diff = ratio / n;
    let variance = diffs.iter().map(|d| (d - mean_diff).powi(2)).sum::<f64>() / n;
    let normalized_ratio = if variance > 0.0 {
        ratio / (n.sqrt() * variance.sqrt())
    } else {
        ratio
    };

    Ok(PowerLawFit {
        alpha,
        xmin,
        log_likelihood_ratio: ratio,
        normalized_ratio,
    })
}

/// Median degree implied by a valid power-law fit of `degrees`.
///
/// Fails when the exponential alternative fits at least as well, or when
/// the exponent leaves the median undefined.
pub fn degree_median(degrees: &[usize]) -> Result<(PowerLawFit, f64)> {
    let fit = fit_power_law(degrees, DEFAULT_XMIN)?;
    debug!(
        alpha = fit.alpha,
        ratio = fit.log_likelihood_ratio,
        normalized = fit.normalized_ratio,
        "degree distribution fit"
    );
    if fit.normalized_ratio <= 0.0 {
        return Err(TrendError::data_quality(format!(
            "power law is not a good fit for the degree distribution (R = {:.4})",
            fit.normalized_ratio
        )));
    }
    let median = fit.median()?;
    Ok((fit, median))
}

/// Which positions survive a `degree >= median` cut.
pub fn degree_filter_mask(degrees: &[usize], median: f64) -> Vec<bool> {
    degrees.iter().map(|&d| d as f64 >= median).collect()
}

/// Remove every node with degree strictly below `median`. Returns the
/// number of removed nodes.
pub fn remove_below_degree(graph: &mut CommunityGraph, median: f64) -> usize {
    let mask = degree_filter_mask(&graph.degrees(), median);
    let kept: Vec<NodeIndex> = graph.node_indices().filter(|idx| mask[idx.index()]).collect();
    let removed = graph.node_count() - kept.len();
    *graph = graph.induced_subgraph(&kept);
    removed
}

/// Pointwise mutual information of a co-occurrence count.
pub fn pmi(count: f64, weight_u: f64, weight_v: f64, total: f64) -> f64 {
    let p_uv = count / total;
    let p_u = weight_u / total;
    let p_v = weight_v / total;
    (p_uv / (p_u * p_v)).ln()
}

/// Attach occurrence counts, collapse parallel edges and assign PMI weights.
pub fn assign_pmi<I>(graph: &mut CommunityGraph, window: &TimeWindow, index: &I) -> Result<u64>
where
    I: OccurrenceIndex + ?Sized,
{
    let names = graph.node_names();
    let counts = index.occurrences_for(window, &names)?;
    for (node, count) in graph.nodes_mut().zip(counts) {
        node.weight = count;
    }

    for edge in graph.edges_mut() {
        edge.weight = 1.0;
    }
    graph.simplify();

    let total = index.total_interactions(window)?;
    if total == 0 {
        return Err(TrendError::data_quality(format!(
            "window {} has no interactions",
            window.key()
        )));
    }

    let mut weights = Vec::with_capacity(graph.edge_count());
    for (a, b, edge) in graph.edges() {
        let wa = graph.node(a).map(|n| n.weight).unwrap_or(0);
        let wb = graph.node(b).map(|n| n.weight).unwrap_or(0);
        if wa == 0 || wb == 0 || edge.weight <= 0.0 {
            return Err(TrendError::data_quality(format!(
                "PMI undefined for edge {a} - {b}: zero occurrence probability"
            )));
        }
        weights.push(pmi(edge.weight, wa as f64, wb as f64, total as f64));
    }
    for (edge, w) in graph.edges_mut().zip(weights) {
        edge.weight = w;
    }

    Ok(total)
}

/// Run degree filtering followed by PMI weighting on one window's graph.
pub fn weight_window<I>(
    graph: &mut CommunityGraph,
    window: &TimeWindow,
    index: &I,
) -> Result<WeightingReport>
where
    I: OccurrenceIndex + ?Sized,
{
    let (fit, median) = degree_median(&graph.degrees())?;
    let removed_nodes = remove_below_degree(graph, median);
    info!(
        window = %window.key(),
        alpha = fit.alpha,
        median,
        removed_nodes,
        remaining = graph.node_count(),
        "filtered low-degree nodes"
    );

    let total_interactions = assign_pmi(graph, window, index)?;

    Ok(WeightingReport {
        fit,
        median,
        removed_nodes,
        total_interactions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeData;
    use crate::store::MemoryOccurrenceIndex;

    fn heavy_tailed() -> Vec<usize> {
        let mut degrees = vec![1; 60];
        degrees.extend(vec![2; 15]);
        degrees.extend(vec![3; 7]);
        degrees.extend(vec![4; 4]);
        degrees.extend(vec![5; 3]);
        degrees.extend(vec![8; 2]);
        degrees.extend([13, 20, 40, 90]);
        degrees
    }

    #[test]
    fn zeta_matches_known_values() {
        // ζ(2) = π²/6
        let z2 = hurwitz_zeta(2.0, 1.0);
        assert!((z2 - std::f64::consts::PI.powi(2) / 6.0).abs() < 1e-9, "{z2}");
        // ζ(3) = 1.2020569...
        assert!((hurwitz_zeta(3.0, 1.0) - 1.202_056_903_159_594).abs() < 1e-9);
        // ζ(2, 2) = ζ(2) − 1
        assert!((hurwitz_zeta(2.0, 2.0) - (z2 - 1.0)).abs() < 1e-9);
    }

    #[test]
    fn heavy_tail_prefers_power_law() {
        let (fit, median) = degree_median(&heavy_tailed()).unwrap();
        assert!(fit.log_likelihood_ratio > 0.0);
        assert!(fit.normalized_ratio > 0.0);
        let expected = 2f64.powf(1.0 / (fit.alpha - 1.0));
        assert!((median - expected).abs() < 1e-12);
    }

    #[test]
    fn exponent_uses_discrete_approximation() {
        let degrees = heavy_tailed();
        let (fit, median) = degree_median(&degrees).unwrap();
        assert!((fit.alpha - 1.846_565).abs() < 1e-5, "alpha = {}", fit.alpha);
        assert!((median - 2.267_723).abs() < 1e-5, "median = {median}");

        // Degree-2 nodes fall below the median and are dropped.
        let kept = degree_filter_mask(&degrees, median).iter().filter(|&&k| k).count();
        assert_eq!(kept, 20);
    }

    #[test]
    fn discrete_alpha_closed_form() {
        // 1 + 2 / (ln 2 + ln 4) = 1 + 2 / (3 ln 2)
        let alpha = discrete_alpha(&[1.0, 2.0], 1);
        assert!((alpha - (1.0 + 2.0 / (3.0 * 2f64.ln()))).abs() < 1e-12);
    }

    #[test]
    fn narrow_distribution_is_rejected() {
        let degrees = vec![5, 6, 5, 6, 5, 6, 5, 6, 5, 6];
        let fit = fit_power_law(&degrees, DEFAULT_XMIN).unwrap();
        assert!(fit.normalized_ratio < 0.0);
        let err = degree_median(&degrees).unwrap_err();
        assert!(matches!(err, TrendError::DataQuality(_)), "{err}");
        assert!(err.to_string().contains(&format!("R = {:.4}", fit.normalized_ratio)), "{err}");
    }

    #[test]
    fn exponent_at_one_has_no_median() {
        let fit = PowerLawFit {
            alpha: 1.0,
            xmin: 1,
            log_likelihood_ratio: 1.0,
            normalized_ratio: 1.0,
        };
        assert!(matches!(fit.median(), Err(TrendError::DataQuality(_))));
    }

    #[test]
    fn filter_boundary_keeps_degrees_above_median() {
        let degrees = [1, 1, 2, 2, 3, 3, 4, 4];
        let mask = degree_filter_mask(&degrees, 2.5);
        assert_eq!(mask, vec![false, false, false, false, true, true, true, true]);
    }

    #[test]
    fn filter_removes_low_degree_nodes_from_graph() {
        let mut g = CommunityGraph::new();
        let edges = [
            ("h", "g"),
            ("h", "f"),
            ("h", "e"),
            ("h", "d"),
            ("g", "f"),
            ("g", "e"),
            ("g", "c"),
            ("f", "c"),
            ("e", "d"),
            ("a", "b"),
        ];
        for (a, b) in edges {
            g.add_edge(a, b, EdgeData::new(1.0));
        }
        let removed = remove_below_degree(&mut g, 2.5);
        assert_eq!(removed, 4);
        let mut left = g.node_names();
        left.sort();
        assert_eq!(left, vec!["e", "f", "g", "h"]);
    }

    #[test]
    fn pmi_is_symmetric() {
        for (c, wu, wv, t) in [(3.0, 10.0, 40.0, 1000.0), (1.0, 2.0, 7.0, 50.0), (9.0, 9.0, 9.0, 9.0)] {
            assert_eq!(pmi(c, wu, wv, t), pmi(c, wv, wu, t));
        }
    }

    #[test]
    fn pmi_weights_use_collapsed_counts() {
        let window = TimeWindow::new(0, 10);
        let mut index = MemoryOccurrenceIndex::new();
        index.set_total(window, 100);
        index.set(window, "a", 10);
        index.set(window, "b", 20);

        let mut g = CommunityGraph::new();
        g.add_edge("a", "b", EdgeData::new(1.0));
        g.add_edge("b", "a", EdgeData::new(1.0));

        let total = assign_pmi(&mut g, &window, &index).unwrap();
        assert_eq!(total, 100);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.node("b").unwrap().weight, 20);

        // p(a,b) = 0.02, p(a) = 0.1, p(b) = 0.2 → ln(1)
        let w = g.edge_weight("a", "b").unwrap();
        assert!(w.abs() < 1e-12, "{w}");
    }

    #[test]
    fn missing_occurrence_is_lookup_error() {
        let window = TimeWindow::new(0, 10);
        let mut index = MemoryOccurrenceIndex::new();
        index.set_total(window, 100);
        index.set(window, "a", 10);

        let mut g = CommunityGraph::new();
        g.add_edge("a", "b", EdgeData::new(1.0));
        let err = assign_pmi(&mut g, &window, &index).unwrap_err();
        assert!(matches!(err, TrendError::Lookup(_)));
    }
}
