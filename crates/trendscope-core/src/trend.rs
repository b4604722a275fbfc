//! Read-only queries over exported trend networks.

use crate::error::Result;
use crate::store::{TrendScope, TrendStore};
use crate::types::{Network, TrendDescription};

/// Per-window score history of a trend; windows without an exported
/// network score 0.
pub fn trend_scores<S: TrendStore + ?Sized>(
    store: &S,
    trend_id: usize,
    num_windows: usize,
) -> Result<Vec<f64>> {
    (0..num_windows)
        .map(|w| {
            Ok(store
                .load_network(TrendScope::Window(w), trend_id)?
                .map_or(0.0, |n| n.trend_score))
        })
        .collect()
}

/// Keywords and weights of a network, in exported order.
pub fn describe_network(network: &Network) -> TrendDescription {
    TrendDescription {
        keywords: network.nodes.iter().map(|n| n.name.clone()).collect(),
        weights: network.nodes.iter().map(|n| n.weight).collect(),
    }
}

/// Description of a trend's aggregate network, if it was exported.
pub fn trend_description<S: TrendStore + ?Sized>(
    store: &S,
    trend_id: usize,
) -> Result<Option<TrendDescription>> {
    Ok(store
        .load_network(TrendScope::Complete, trend_id)?
        .as_ref()
        .map(describe_network))
}
