//! Shared module - Common contracts
//!
//! Types shared across all features. Nothing here depends on a feature.

pub mod ports;

// Re-exports for convenience
pub use ports::*;
