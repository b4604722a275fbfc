//! Pipeline configuration.
//!
//! Every field has a default, so a partial (or absent) config file still
//! yields a runnable pipeline. Selector strings are only checked when the
//! config is resolved into [`PipelineSettings`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use trendscope_core::detection::{DetectionConfig, DetectionMethod};
use trendscope_core::error::{Result, TrendError};
use trendscope_core::matching::{MatchingConfig, TieBreak};
use trendscope_core::types::TimeWindow;
use trendscope_core::window::time_windows;

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Worker threads for per-window and per-trend work.
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    #[serde(default)]
    pub windows: WindowsConfig,
    #[serde(default)]
    pub detection: DetectionSection,
    #[serde(default)]
    pub matching: MatchingSection,
    #[serde(default)]
    pub trends: TrendsSection,
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowsConfig {
    /// First day of the first monthly window (UTC).
    #[serde(default = "default_start")]
    pub start: NaiveDate,
    #[serde(default = "default_window_count")]
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionSection {
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default = "default_trials")]
    pub trials: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default = "default_resolution")]
    pub resolution: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingSection {
    #[serde(default = "default_memory")]
    pub memory: usize,
    #[serde(default = "default_fingerprint_size")]
    pub fingerprint_size: usize,
    #[serde(default = "default_min_overlap")]
    pub min_overlap: usize,
    #[serde(default = "default_tie_break")]
    pub tie_break: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendsSection {
    /// Number of top trends to export.
    #[serde(default = "default_trend_count")]
    pub count: usize,
    /// Nodes kept per exported network.
    #[serde(default = "default_representatives")]
    pub representatives: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_edge_dir")]
    pub edge_dir: PathBuf,
    #[serde(default = "default_node_dir")]
    pub node_dir: PathBuf,
    #[serde(default = "default_interactions")]
    pub interactions: PathBuf,
    #[serde(default = "default_graph_dir")]
    pub graph_dir: PathBuf,
    #[serde(default = "default_trends_dir")]
    pub trends_dir: PathBuf,
    /// SQLite database for trend networks instead of `trends_dir`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trends_db: Option<PathBuf>,
}

// Default value functions
fn default_workers() -> usize { 1 }
fn default_start() -> NaiveDate { NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default() }
fn default_window_count() -> usize { 12 }
fn default_method() -> String { "leiden".into() }
fn default_trials() -> usize { 10 }
fn default_resolution() -> f64 { 1.0 }
fn default_memory() -> usize { 4 }
fn default_fingerprint_size() -> usize { 5 }
fn default_min_overlap() -> usize { 1 }
fn default_tie_break() -> String { "most-recent".into() }
fn default_trend_count() -> usize { 10 }
fn default_representatives() -> usize { 10 }
fn default_edge_dir() -> PathBuf { PathBuf::from("data/edges") }
fn default_node_dir() -> PathBuf { PathBuf::from("data/nodes") }
fn default_interactions() -> PathBuf { PathBuf::from("data/interactions.csv") }
fn default_graph_dir() -> PathBuf { PathBuf::from("data/graphs") }
fn default_trends_dir() -> PathBuf { PathBuf::from("data/trends") }

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            log_file: None,
            windows: WindowsConfig::default(),
            detection: DetectionSection::default(),
            matching: MatchingSection::default(),
            trends: TrendsSection::default(),
            paths: PathsConfig::default(),
        }
    }
}

impl Default for WindowsConfig {
    fn default() -> Self {
        Self {
            start: default_start(),
            count: default_window_count(),
        }
    }
}

impl Default for DetectionSection {
    fn default() -> Self {
        Self {
            method: default_method(),
            trials: default_trials(),
            seed: None,
            resolution: default_resolution(),
        }
    }
}

impl Default for MatchingSection {
    fn default() -> Self {
        Self {
            memory: default_memory(),
            fingerprint_size: default_fingerprint_size(),
            min_overlap: default_min_overlap(),
            tie_break: default_tie_break(),
        }
    }
}

impl Default for TrendsSection {
    fn default() -> Self {
        Self {
            count: default_trend_count(),
            representatives: default_representatives(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            edge_dir: default_edge_dir(),
            node_dir: default_node_dir(),
            interactions: default_interactions(),
            graph_dir: default_graph_dir(),
            trends_dir: default_trends_dir(),
            trends_db: None,
        }
    }
}

/// Validated, typed view of a [`PipelineConfig`].
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub windows: Vec<TimeWindow>,
    pub method: DetectionMethod,
    pub detection: DetectionConfig,
    pub matching: MatchingConfig,
    pub fingerprint_size: usize,
    pub trend_count: usize,
    pub representatives: usize,
    pub workers: usize,
}

fn positive(field: &str, value: usize) -> Result<usize> {
    if value == 0 {
        return Err(TrendError::invalid_config(field, "0", "must be at least 1"));
    }
    Ok(value)
}

impl PipelineConfig {
    /// Check selectors and ranges and build the typed settings.
    pub fn settings(&self) -> Result<PipelineSettings> {
        let method = DetectionMethod::from_selector(&self.detection.method, None)?;
        let tie_break: TieBreak = self.matching.tie_break.parse()?;
        if self.detection.resolution.is_nan() || self.detection.resolution <= 0.0 {
            return Err(TrendError::invalid_config(
                "detection.resolution",
                self.detection.resolution.to_string(),
                "must be positive",
            ));
        }

        Ok(PipelineSettings {
            windows: time_windows(self.windows.start, positive("windows.count", self.windows.count)?)?,
            method,
            detection: DetectionConfig {
                trials: positive("detection.trials", self.detection.trials)?,
                seed: self.detection.seed,
                resolution: self.detection.resolution,
            },
            matching: MatchingConfig {
                memory: self.matching.memory,
                min_overlap: positive("matching.min_overlap", self.matching.min_overlap)?,
                tie_break,
            },
            fingerprint_size: positive("matching.fingerprint_size", self.matching.fingerprint_size)?,
            trend_count: positive("trends.count", self.trends.count)?,
            representatives: positive("trends.representatives", self.trends.representatives)?,
            workers: positive("workers", self.workers)?,
        })
    }
}
