//! Temporal matching of community fingerprints into trend threads.
//!
//! A single forward pass over the windows keeps a pool of open threads,
//! each remembering the fingerprint of its latest community. A community
//! extends the open thread it shares the most representatives with, as long
//! as the overlap reaches `min_overlap`; otherwise it starts a new thread.
//! A thread that has missed more than `memory` consecutive windows is
//! closed for good but stays in the output.
//!
//! Every `(window, community)` pair ends up in exactly one thread, and a
//! thread never holds two communities of the same window.

use crate::error::{ConfigError, Result, TrendError};
use crate::types::{CommunityId, Fingerprint, TrendThread, WindowIndex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, info};

/// Fingerprints of one window's communities, iterated by ascending id.
pub type WindowFingerprints = BTreeMap<CommunityId, Fingerprint>;

/// How to choose between open threads with the same overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreak {
    /// Prefer the thread updated most recently (smallest gap).
    #[default]
    MostRecent,
    /// Prefer the thread discovered first.
    EarliestDiscovered,
}

impl FromStr for TieBreak {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "most-recent" => Ok(TieBreak::MostRecent),
            "earliest-discovered" => Ok(TieBreak::EarliestDiscovered),
            other => Err(ConfigError::UnknownTieBreak(other.to_string())),
        }
    }
}

/// Matching parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingConfig {
    /// Maximum number of consecutive windows a thread may be missing.
    pub memory: usize,
    /// Minimum number of shared representatives to extend a thread.
    pub min_overlap: usize,
    pub tie_break: TieBreak,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            memory: 4,
            min_overlap: 1,
            tie_break: TieBreak::MostRecent,
        }
    }
}

/// Fingerprinted partitions of every window of the analysed range.
///
/// Only obtainable once each window has a partition, which is what the
/// matcher requires.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletePartitionSequence {
    windows: Vec<WindowFingerprints>,
}

impl CompletePartitionSequence {
    pub fn from_windows(windows: Vec<WindowFingerprints>) -> Self {
        Self { windows }
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn windows(&self) -> &[WindowFingerprints] {
        &self.windows
    }

    /// Total number of communities across all windows.
    pub fn community_count(&self) -> usize {
        self.windows.iter().map(BTreeMap::len).sum()
    }
}

/// Collects per-window fingerprints in any order.
#[derive(Debug, Clone)]
pub struct PartitionSequenceBuilder {
    slots: Vec<Option<WindowFingerprints>>,
}

impl PartitionSequenceBuilder {
    pub fn new(window_count: usize) -> Self {
        Self {
            slots: vec![None; window_count],
        }
    }

    pub fn insert(&mut self, window: WindowIndex, fingerprints: WindowFingerprints) -> Result<()> {
        let count = self.slots.len();
        let slot = self.slots.get_mut(window).ok_or_else(|| {
            TrendError::invalid_config(
                "window",
                window.to_string(),
                format!("only {} windows configured", count),
            )
        })?;
        *slot = Some(fingerprints);
        Ok(())
    }

    /// Seal the sequence; fails on the first window without a partition.
    pub fn finish(self) -> Result<CompletePartitionSequence> {
        let mut windows = Vec::with_capacity(self.slots.len());
        for (w, slot) in self.slots.into_iter().enumerate() {
            windows.push(slot.ok_or(TrendError::IncompleteSequence(w))?);
        }
        Ok(CompletePartitionSequence { windows })
    }
}

struct OpenThread {
    thread: usize,
    last_window: WindowIndex,
    fingerprint: Fingerprint,
}

/// Chain communities across windows into trend threads.
///
/// Threads are returned in discovery order.
pub fn match_communities(
    sequence: &CompletePartitionSequence,
    config: &MatchingConfig,
) -> Vec<TrendThread> {
    let mut threads: Vec<TrendThread> = Vec::new();
    let mut open: Vec<OpenThread> = Vec::new();

    for (w, communities) in sequence.windows().iter().enumerate() {
        // Missing windows between the thread's last entry and w
        open.retain(|t| w - t.last_window - 1 <= config.memory);

        for (&community, fingerprint) in communities {
            let mut best: Option<(usize, usize)> = None;

            for (k, candidate) in open.iter().enumerate() {
                if candidate.last_window >= w {
                    continue;
                }
                let overlap = fingerprint.overlap(&candidate.fingerprint);
                if overlap < config.min_overlap {
                    continue;
                }
                let better = match best {
                    None => true,
                    Some((b, best_overlap)) => {
                        overlap > best_overlap
                            || (overlap == best_overlap
                                && config.tie_break == TieBreak::MostRecent
                                && candidate.last_window > open[b].last_window)
                    }
                };
                if better {
                    best = Some((k, overlap));
                }
            }

            match best {
                Some((k, overlap)) => {
                    let slot = &mut open[k];
                    debug!(
                        window = w,
                        community,
                        thread = slot.thread,
                        overlap,
                        gap = w - slot.last_window - 1,
                        "extended thread"
                    );
                    threads[slot.thread].push(w, community);
                    slot.last_window = w;
                    slot.fingerprint = fingerprint.clone();
                }
                None => {
                    open.push(OpenThread {
                        thread: threads.len(),
                        last_window: w,
                        fingerprint: fingerprint.clone(),
                    });
                    threads.push(TrendThread::start(w, community));
                }
            }
        }
    }

    info!(
        windows = sequence.len(),
        communities = sequence.community_count(),
        threads = threads.len(),
        "matched communities"
    );
    threads
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ThreadEntry;
    use std::collections::HashSet;

    fn fp(names: &[&str]) -> Fingerprint {
        Fingerprint::new(names.iter().map(|s| s.to_string()).collect())
    }

    fn window(communities: &[(CommunityId, &[&str])]) -> WindowFingerprints {
        communities.iter().map(|(c, names)| (*c, fp(names))).collect()
    }

    fn entries(thread: &TrendThread) -> Vec<(usize, usize)> {
        thread.entries.iter().map(|e| (e.window, e.community)).collect()
    }

    fn topic_with_gap(gap: usize) -> CompletePartitionSequence {
        let mut windows = vec![window(&[(0, &["covid", "lockdown", "mask"])])];
        for _ in 0..gap {
            windows.push(window(&[(0, &["football", "goal"])]));
        }
        windows.push(window(&[(0, &["football", "goal"]), (1, &["covid", "vaccine"])]));
        CompletePartitionSequence::from_windows(windows)
    }

    #[test]
    fn reappearance_within_memory_continues_thread() {
        let threads = match_communities(&topic_with_gap(4), &MatchingConfig::default());
        assert_eq!(entries(&threads[0]), vec![(0, 0), (5, 1)]);
        assert_eq!(threads.len(), 2);
    }

    #[test]
    fn reappearance_beyond_memory_starts_new_thread() {
        let threads = match_communities(&topic_with_gap(5), &MatchingConfig::default());
        assert_eq!(entries(&threads[0]), vec![(0, 0)]);
        assert_eq!(threads.len(), 3);
        assert_eq!(entries(&threads[2]), vec![(6, 1)]);
    }

    #[test]
    fn no_shared_representative_opens_new_thread() {
        let seq = CompletePartitionSequence::from_windows(vec![
            window(&[(0, &["a", "b"])]),
            window(&[(0, &["c", "d"])]),
        ]);
        let threads = match_communities(&seq, &MatchingConfig::default());
        assert_eq!(threads.len(), 2);
    }

    #[test]
    fn highest_overlap_beats_recency() {
        let seq = CompletePartitionSequence::from_windows(vec![
            window(&[(0, &["a", "b", "c"])]),
            window(&[(0, &["x", "y"])]),
            window(&[(0, &["a", "b", "x"])]),
        ]);
        let threads = match_communities(&seq, &MatchingConfig::default());
        assert_eq!(entries(&threads[0]), vec![(0, 0), (2, 0)]);
        assert_eq!(entries(&threads[1]), vec![(1, 0)]);
    }

    #[test]
    fn tie_break_rules() {
        let seq = CompletePartitionSequence::from_windows(vec![
            window(&[(0, &["a", "b"])]),
            window(&[(0, &["a", "c"])]),
            window(&[(0, &["a", "z"])]),
        ]);

        let recent = match_communities(&seq, &MatchingConfig::default());
        // window 1 joins thread 0, so window 2 has a single candidate
        assert_eq!(entries(&recent[0]), vec![(0, 0), (1, 0), (2, 0)]);

        let seq = CompletePartitionSequence::from_windows(vec![
            window(&[(0, &["a", "b"]), (1, &["c", "d"])]),
            window(&[(0, &["c", "x"])]),
            window(&[(0, &["a", "c"])]),
        ]);
        let recent = match_communities(&seq, &MatchingConfig::default());
        assert_eq!(entries(&recent[1]), vec![(0, 1), (1, 0), (2, 0)]);

        let earliest = MatchingConfig {
            tie_break: TieBreak::EarliestDiscovered,
            ..MatchingConfig::default()
        };
        let first = match_communities(&seq, &earliest);
        assert_eq!(entries(&first[0]), vec![(0, 0), (2, 0)]);
        assert_eq!(entries(&first[1]), vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn one_community_per_window_per_thread() {
        let seq = CompletePartitionSequence::from_windows(vec![
            window(&[(0, &["a", "b"])]),
            window(&[(0, &["a"]), (1, &["b"])]),
        ]);
        let threads = match_communities(&seq, &MatchingConfig::default());
        assert_eq!(entries(&threads[0]), vec![(0, 0), (1, 0)]);
        assert_eq!(entries(&threads[1]), vec![(1, 1)]);
    }

    #[test]
    fn matching_is_deterministic_and_covers_every_community() {
        let topics = ["a", "b", "c", "d", "e", "f", "g", "h"];
        let windows: Vec<WindowFingerprints> = (0..12)
            .map(|w| {
                (0..(w % 4 + 1))
                    .map(|c| {
                        let names = vec![
                            topics[(w + c) % topics.len()].to_string(),
                            topics[(w * 3 + c) % topics.len()].to_string(),
                        ];
                        (c, Fingerprint::new(names))
                    })
                    .collect()
            })
            .collect();
        let seq = CompletePartitionSequence::from_windows(windows);

        let first = match_communities(&seq, &MatchingConfig::default());
        let second = match_communities(&seq, &MatchingConfig::default());
        assert_eq!(first, second);

        let mut seen: HashSet<ThreadEntry> = HashSet::new();
        for thread in &first {
            let windows: Vec<usize> = thread.windows().collect();
            assert!(windows.windows(2).all(|p| p[0] < p[1]), "{windows:?}");
            for entry in &thread.entries {
                assert!(seen.insert(*entry), "{entry:?} matched twice");
            }
        }
        assert_eq!(seen.len(), seq.community_count());
    }

    #[test]
    fn builder_requires_every_window() {
        let mut builder = PartitionSequenceBuilder::new(3);
        builder.insert(0, window(&[(0, &["a"])])).unwrap();
        builder.insert(2, window(&[(0, &["a"])])).unwrap();
        assert!(builder.insert(3, WindowFingerprints::new()).is_err());
        let err = builder.finish().unwrap_err();
        assert!(matches!(err, TrendError::IncompleteSequence(1)));
    }

    #[test]
    fn tie_break_parsing() {
        assert_eq!("most-recent".parse::<TieBreak>().unwrap(), TieBreak::MostRecent);
        assert!("newest".parse::<TieBreak>().is_err());
    }
}
