//! Error types for the ceremony engine.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised by the engine.
///
/// Configuration problems surface before the first tick; distribution
/// problems surface at the draw that hit them. Neither is retried.
#[derive(Debug, Error)]
pub enum CeremonyError {
    /// Non-finite or negative rate/probability/capacity, empty catalog, ...
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// Weighted choice over an empty or all-zero-weight set
    #[error("invalid distribution: {0}")]
    InvalidDistribution(String),
    /// Configuration file could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// History export failed
    #[error("export failed: {0}")]
    Export(#[from] std::io::Error),
}

impl CeremonyError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        CeremonyError::InvalidConfiguration(msg.into())
    }

    pub(crate) fn distribution(msg: impl Into<String>) -> Self {
        CeremonyError::InvalidDistribution(msg.into())
    }
}

pub type Result<T, E = CeremonyError> = std::result::Result<T, E>;
