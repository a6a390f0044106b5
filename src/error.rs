//! Error types for binarize-rs.

use thiserror::Error;

/// Result type alias for binarize-rs operations.
pub type Result<T> = std::result::Result<T, BinarizeError>;

/// Errors that can occur while building or running a binarization strategy.
#[derive(Debug, Error)]
pub enum BinarizeError {
    /// Invalid configuration parameter.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Tensor has a shape the operation cannot handle.
    #[error("invalid shape: {0}")]
    InvalidShape(String),

    /// Shape mismatch in tensor operations.
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Expected shape.
        expected: Vec<usize>,
        /// Actual shape.
        actual: Vec<usize>,
    },

    /// A named parameter was not found in the store.
    #[error("missing parameter: {0}")]
    MissingParameter(String),

    /// No strategy registered under the requested name.
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),

    /// Candle tensor operation error.
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for BinarizeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for BinarizeError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
