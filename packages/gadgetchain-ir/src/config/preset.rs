//! Preset configurations
//!
//! Presets provide complete default option sets for common use cases.

use super::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Configuration preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// CI triage: short chains, tight budgets
    ///
    /// - max_len=6, max_chains=1000, collect timeout 1s
    Fast,

    /// Day-to-day auditing
    ///
    /// - max_len=8, max_chains=10000, collect timeout 5s
    #[default]
    Balanced,

    /// Full audit of a library
    ///
    /// - max_len=12, max_chains=100000, collect timeout 30s
    Thorough,
}

impl Preset {
    /// Parse preset from string
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "balanced" => Ok(Self::Balanced),
            "thorough" => Ok(Self::Thorough),
            _ => Err(ConfigError::UnknownPreset(s.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Balanced => "balanced",
            Self::Thorough => "thorough",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_parse() {
        assert_eq!(Preset::parse("fast").unwrap(), Preset::Fast);
        assert_eq!(Preset::parse("BALANCED").unwrap(), Preset::Balanced);
        assert_eq!(Preset::parse("Thorough").unwrap(), Preset::Thorough);
        assert!(matches!(
            Preset::parse("custom"),
            Err(ConfigError::UnknownPreset(_))
        ));
    }

    #[test]
    fn test_preset_display_roundtrip() {
        for preset in [Preset::Fast, Preset::Balanced, Preset::Thorough] {
            assert_eq!(Preset::parse(preset.as_str()).unwrap(), preset);
        }
    }
}
