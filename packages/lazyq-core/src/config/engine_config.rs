//! Engine configuration
//!
//! Settings are read at realization time (when a sort, grouping or
//! reversal first materializes its source), never at composition time.
//! The active configuration is per thread: queries are single-threaded and
//! `Rc`-based, so a thread-local is the natural scope.
//!
//! ```yaml
//! version: 1
//! preset: guarded
//! overrides:
//!   sort:
//!     strategy: stable
//!   materialize:
//!     initial_capacity: 64
//!     max_len: 50000
//! ```

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{ConfigError, ConfigResult};
use super::preset::Preset;

pub const SUPPORTED_VERSIONS: &[u32] = &[1];

const MAX_INITIAL_CAPACITY: usize = 1 << 20;

/// How the deferred sort orders its permutation array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortStrategy {
    /// Unstable sort; stability comes from the original-index tie-break
    Permutation,
    /// Std stable merge sort (index tie-break still applied)
    Stable,
}

impl Default for SortStrategy {
    fn default() -> Self {
        Self::Permutation
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct SortConfig {
    #[serde(default)]
    pub strategy: SortStrategy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaterializeConfig {
    /// Initial buffer capacity for realized sources
    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: usize,

    /// Fail realization once a source yields more than this many elements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_len: Option<usize>,
}

fn default_initial_capacity() -> usize {
    16
}

impl Default for MaterializeConfig {
    fn default() -> Self {
        Self {
            initial_capacity: default_initial_capacity(),
            max_len: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpanConfig {
    /// Buffer the remainder of a split so it can be consumed repeatedly
    #[serde(default = "default_cache_remainder")]
    pub cache_remainder: bool,
}

fn default_cache_remainder() -> bool {
    true
}

impl Default for SpanConfig {
    fn default() -> Self {
        Self {
            cache_remainder: default_cache_remainder(),
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub preset: Preset,
    pub sort: SortConfig,
    pub materialize: MaterializeConfig,
    pub span: SpanConfig,
}

/// YAML Schema v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfigExportV1 {
    /// Schema version (always 1 for v1)
    pub version: u32,

    /// Base preset
    pub preset: String,

    /// Fine-grained overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<EngineOverrides>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct EngineOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub materialize: Option<MaterializeConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<SpanConfig>,
}

impl EngineConfig {
    /// Complete configuration for a preset
    pub fn preset(preset: Preset) -> Self {
        Self {
            preset,
            sort: SortConfig::default(),
            materialize: MaterializeConfig {
                max_len: preset.max_materialized(),
                ..MaterializeConfig::default()
            },
            span: SpanConfig::default(),
        }
    }

    pub fn sort_strategy(mut self, strategy: SortStrategy) -> Self {
        self.sort.strategy = strategy;
        self
    }

    pub fn max_materialized(mut self, max_len: Option<usize>) -> Self {
        self.materialize.max_len = max_len;
        self
    }

    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.materialize.initial_capacity = capacity;
        self
    }

    pub fn cache_span_remainder(mut self, cache: bool) -> Self {
        self.span.cache_remainder = cache;
        self
    }

    /// Range checks + cross-field consistency
    pub fn validate(&self) -> ConfigResult<()> {
        let capacity = self.materialize.initial_capacity;
        if capacity > MAX_INITIAL_CAPACITY {
            return Err(ConfigError::range_with_hint(
                "materialize.initial_capacity",
                capacity,
                0,
                MAX_INITIAL_CAPACITY,
                "The buffer is allocated on every realization; keep it small",
            ));
        }

        if let Some(max_len) = self.materialize.max_len {
            if max_len == 0 {
                return Err(ConfigError::range_with_hint(
                    "materialize.max_len",
                    max_len,
                    1,
                    usize::MAX,
                    "Omit max_len to disable the limit",
                ));
            }
            if capacity > max_len {
                return Err(ConfigError::conflict(
                    format!(
                        "initial_capacity ({}) exceeds max_len ({})",
                        capacity, max_len
                    ),
                    "lower materialize.initial_capacity or raise materialize.max_len",
                ));
            }
        }

        Ok(())
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let export: EngineConfigExportV1 = serde_yaml::from_str(content)?;

        if !SUPPORTED_VERSIONS.contains(&export.version) {
            return Err(ConfigError::UnsupportedVersion {
                found: export.version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }

        let preset = export
            .preset
            .parse::<Preset>()
            .map_err(|_| ConfigError::UnknownPreset(export.preset.clone()))?;

        let mut config = Self::preset(preset);
        if let Some(overrides) = export.overrides {
            if let Some(sort) = overrides.sort {
                config.sort = sort;
            }
            if let Some(materialize) = overrides.materialize {
                config.materialize = materialize;
            }
            if let Some(span) = overrides.span {
                config.span = span;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file
    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        let export = EngineConfigExportV1 {
            version: 1,
            preset: self.preset.to_string(),
            overrides: Some(EngineOverrides {
                sort: Some(self.sort.clone()),
                materialize: Some(self.materialize.clone()),
                span: Some(self.span.clone()),
            }),
        };

        serde_yaml::to_string(&export).map_err(ConfigError::Yaml)
    }

    /// Validate and make this the active configuration of the current thread
    pub fn install(self) -> ConfigResult<()> {
        self.validate()?;
        debug!(preset = %self.preset, "engine config installed");
        ACTIVE.with(|active| *active.borrow_mut() = Rc::new(self));
        Ok(())
    }

    /// Active configuration of the current thread
    pub fn current() -> Rc<EngineConfig> {
        ACTIVE.with(|active| active.borrow().clone())
    }

    /// Run `f` with `self` active, restoring the previous configuration after
    pub fn scoped<R>(self, f: impl FnOnce() -> R) -> ConfigResult<R> {
        self.validate()?;
        let previous = ACTIVE.with(|active| {
            std::mem::replace(&mut *active.borrow_mut(), Rc::new(self))
        });
        let _restore = RestoreOnDrop(Some(previous));
        Ok(f())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::preset(Preset::Standard)
    }
}

thread_local! {
    static ACTIVE: RefCell<Rc<EngineConfig>> = RefCell::new(Rc::new(EngineConfig::default()));
}

struct RestoreOnDrop(Option<Rc<EngineConfig>>);

impl Drop for RestoreOnDrop {
    fn drop(&mut self) {
        if let Some(previous) = self.0.take() {
            ACTIVE.with(|active| *active.borrow_mut() = previous);
        }
    }
}
