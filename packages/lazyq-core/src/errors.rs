//! Error types for lazyq-core
//!
//! Provides unified error handling across the crate.

use thiserror::Error;

use crate::config::ConfigError;

/// Main error type for query composition and consumption
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Contract violation detected at composition time (before any pull)
    #[error("Argument error: {0}")]
    Argument(String),

    /// A caller-supplied selector, predicate or result projection failed
    #[error("Callback error: {0}")]
    Callback(String),

    /// Value-shape failure (empty sequence, out of range, limit exceeded)
    #[error("Value error: {0}")]
    Value(String),

    /// A caller-supplied producer failed mid-pull
    #[error("Source error: {0}")]
    Source(String),
}

impl QueryError {
    /// Create an argument (contract violation) error
    pub fn argument(msg: impl Into<String>) -> Self {
        QueryError::Argument(msg.into())
    }

    /// Create a callback error
    pub fn callback(msg: impl Into<String>) -> Self {
        QueryError::Callback(msg.into())
    }

    /// Create a value-shape error
    pub fn value(msg: impl Into<String>) -> Self {
        QueryError::Value(msg.into())
    }

    /// Create a source error
    pub fn source(msg: impl Into<String>) -> Self {
        QueryError::Source(msg.into())
    }

    /// Error for operations that need at least one element
    pub fn no_elements() -> Self {
        QueryError::Value("sequence contains no elements".to_string())
    }
}

impl From<ConfigError> for QueryError {
    fn from(err: ConfigError) -> Self {
        QueryError::Argument(err.to_string())
    }
}

/// Result type alias for query operations
pub type Result<T> = std::result::Result<T, QueryError>;
