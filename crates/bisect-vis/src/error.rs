//! Error types for bisect-vis.

use thiserror::Error;

/// Result type for bisect-vis operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in bisect-vis operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Target input was not a finite integer.
    #[error("invalid target: {0:?}")]
    InvalidTarget(String),

    /// A configuration value could not be parsed.
    #[error("invalid setting {key}: {value:?}")]
    InvalidSetting { key: &'static str, value: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
