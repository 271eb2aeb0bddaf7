//! Engine Configuration System
//!
//! 2-tier configuration:
//! - Level 1: Preset - Simple one-liner
//! - Level 2: YAML overrides - Complete control
//!
//! # Examples
//!
//! ```rust,ignore
//! use lazyq_core::config::{EngineConfig, Preset, SortStrategy};
//!
//! // Level 1: preset
//! EngineConfig::preset(Preset::Guarded).install()?;
//!
//! // Level 2: YAML
//! EngineConfig::from_yaml("engine.yaml")?.install()?;
//! ```

pub mod engine_config;
pub mod error;
pub mod preset;

// Re-exports
pub use engine_config::{
    EngineConfig, EngineConfigExportV1, EngineOverrides, MaterializeConfig, SortConfig,
    SortStrategy, SpanConfig,
};
pub use error::{ConfigError, ConfigResult};
pub use preset::Preset;
