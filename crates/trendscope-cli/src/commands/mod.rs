//! CLI command implementations.

pub mod inspect;
pub mod progress;
pub mod stages;
