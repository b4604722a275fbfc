//! Error types for Trendscope operations.
//!
//! Every fatal condition of the pipeline maps to one variant. Missing trend
//! artifacts are not errors: stores return `Ok(None)` and callers substitute
//! a default.

use thiserror::Error;

/// Result type for Trendscope operations.
pub type Result<T> = std::result::Result<T, TrendError>;

/// Errors that can occur while building, weighting, matching or exporting.
#[derive(Debug, Error)]
pub enum TrendError {
    /// Invalid algorithm selector or incompatible parameter combination.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// The window's data violates an assumption of the pipeline.
    #[error("Data quality error: {0}")]
    DataQuality(String),

    /// Fewer ranked trend threads than requested.
    #[error("Not enough trends found: {found} available, {required} required")]
    InsufficientData { found: usize, required: usize },

    /// A node or window has no entry in the occurrence index.
    #[error("Lookup error: {0}")]
    Lookup(String),

    /// A raw edge record is missing its source or target.
    #[error("Malformed input at record {index}: {reason}")]
    MalformedInput { index: usize, reason: String },

    /// Matching was requested before every window was partitioned.
    #[error("Incomplete partition sequence: window {0} has no partition")]
    IncompleteSequence(usize),

    /// Store backend failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O errors (wrapped).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Unknown detection method selector.
    #[error("Unknown community detection method: {0}")]
    UnknownMethod(String),

    /// Unknown matching tie-break selector.
    #[error("Unknown tie-break rule: {0}")]
    UnknownTieBreak(String),

    /// Initial partition hint supplied to a method that cannot use it.
    #[error("Initial membership not allowed with {0}")]
    InitialMembershipNotAllowed(String),

    /// Invalid value.
    #[error("Invalid value for {field}: {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

// Convenience constructors
impl TrendError {
    pub fn data_quality(msg: impl Into<String>) -> Self {
        TrendError::DataQuality(msg.into())
    }

    pub fn lookup(msg: impl Into<String>) -> Self {
        TrendError::Lookup(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        TrendError::Storage(msg.into())
    }

    pub fn invalid_config(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        TrendError::Config(ConfigError::InvalidValue {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        })
    }
}
