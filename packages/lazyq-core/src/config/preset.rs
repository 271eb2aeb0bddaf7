//! Preset configurations
//!
//! Presets provide complete default configurations for common use cases.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Configuration preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Default engine behavior
    ///
    /// - Sort: permutation array with index tie-break
    /// - Materialization: unbounded
    /// - Span remainder: cached (re-consumable)
    Standard,

    /// Standard plus a materialization limit
    ///
    /// Sorting, grouping or reversing an accidentally infinite source fails
    /// with a value error instead of exhausting memory.
    Guarded,

    /// Custom: User-defined (YAML only)
    ///
    /// Starts from standard defaults; overrides carry the intent.
    Custom,
}

impl FromStr for Preset {
    type Err = String;

    /// Case-insensitive preset name
    fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "guarded" => Ok(Self::Guarded),
            "custom" => Ok(Self::Custom),
            _ => Err(format!(
                "Unknown preset '{}'. Valid presets: standard, guarded, custom",
                s
            )),
        }
    }
}

impl Preset {
    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Guarded => "guarded",
            Self::Custom => "custom",
        }
    }

    /// Materialization limit implied by the preset
    pub fn max_materialized(&self) -> Option<usize> {
        match self {
            Self::Guarded => Some(1_000_000),
            Self::Standard | Self::Custom => None,
        }
    }
}

impl Default for Preset {
    fn default() -> Self {
        Self::Standard
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_parsing() {
        assert_eq!(Preset::from_str("standard").unwrap(), Preset::Standard);
        assert_eq!(Preset::from_str("GUARDED").unwrap(), Preset::Guarded);
        assert_eq!(Preset::from_str("custom").unwrap(), Preset::Custom);
        assert!(Preset::from_str("turbo").is_err());
        assert_eq!("Standard".parse::<Preset>().unwrap(), Preset::Standard);
    }

    #[test]
    fn test_preset_display() {
        assert_eq!(Preset::Standard.to_string(), "standard");
        assert_eq!(Preset::Guarded.to_string(), "guarded");
        assert_eq!(Preset::Custom.to_string(), "custom");
    }

    #[test]
    fn test_preset_limits() {
        assert_eq!(Preset::Standard.max_materialized(), None);
        assert_eq!(Preset::Guarded.max_materialized(), Some(1_000_000));
    }
}
