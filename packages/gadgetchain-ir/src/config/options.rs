//! Analysis options and their YAML schema
//!
//! Options are resolved in two steps: a [`Preset`] supplies every value, then
//! the optional `overrides` block of the YAML file replaces individual fields.
//!
//! ```yaml
//! version: 1
//! preset: balanced
//! overrides:
//!   max_len: 10
//!   filter_non_serializable: false
//! ```

use super::error::{ConfigError, ConfigResult};
use super::preset::Preset;
use serde::{Deserialize, Serialize};
use std::path::Path;

const SUPPORTED_VERSIONS: &[u32] = &[1];

/// Engine-wide analysis options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    /// Maximum chain length in call edges (2..=64)
    pub max_len: usize,

    /// Global cap on recorded chains; the search stops enumerating once reached
    pub max_chains: usize,

    /// Wall-clock bound for one sink-path enumeration, in milliseconds
    pub collect_timeout_ms: u64,

    /// Per-method fixed-point iteration cap (1..=100000)
    pub max_fixpoint_iterations: usize,

    /// Only serializable classes may appear as dispatch / reflective candidates
    pub filter_non_serializable: bool,

    /// Rule entries naming a missing method abort loading
    pub strict_rules: bool,
}

impl AnalysisOptions {
    /// Complete option set for a preset
    pub fn preset(preset: Preset) -> Self {
        match preset {
            Preset::Fast => Self {
                max_len: 6,
                max_chains: 1_000,
                collect_timeout_ms: 1_000,
                max_fixpoint_iterations: 200,
                filter_non_serializable: true,
                strict_rules: true,
            },
            Preset::Balanced => Self {
                max_len: 8,
                max_chains: 10_000,
                collect_timeout_ms: 5_000,
                max_fixpoint_iterations: 1_000,
                filter_non_serializable: true,
                strict_rules: true,
            },
            Preset::Thorough => Self {
                max_len: 12,
                max_chains: 100_000,
                collect_timeout_ms: 30_000,
                max_fixpoint_iterations: 5_000,
                filter_non_serializable: true,
                strict_rules: true,
            },
        }
    }

    pub fn max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    pub fn max_chains(mut self, max_chains: usize) -> Self {
        self.max_chains = max_chains;
        self
    }

    pub fn collect_timeout_ms(mut self, ms: u64) -> Self {
        self.collect_timeout_ms = ms;
        self
    }

    pub fn filter_non_serializable(mut self, on: bool) -> Self {
        self.filter_non_serializable = on;
        self
    }

    pub fn strict_rules(mut self, on: bool) -> Self {
        self.strict_rules = on;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_len < 2 || self.max_len > 64 {
            return Err(ConfigError::range_with_hint(
                "max_len",
                self.max_len,
                2,
                64,
                "A chain needs at least a source hop and a sink hop",
            ));
        }

        if self.max_chains == 0 {
            return Err(ConfigError::range_with_hint(
                "max_chains",
                self.max_chains,
                1,
                usize::MAX,
                "Set a positive cap on recorded chains",
            ));
        }

        if self.collect_timeout_ms == 0 || self.collect_timeout_ms > 3_600_000 {
            return Err(ConfigError::range_with_hint(
                "collect_timeout_ms",
                self.collect_timeout_ms,
                1,
                3_600_000,
                "Path enumeration timeout should be at most 1 hour",
            ));
        }

        if self.max_fixpoint_iterations == 0 || self.max_fixpoint_iterations > 100_000 {
            return Err(ConfigError::range_with_hint(
                "max_fixpoint_iterations",
                self.max_fixpoint_iterations,
                1,
                100_000,
                "Fixed-point iterations must be finite",
            ));
        }

        Ok(())
    }

    /// Parse and validate an options document
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let raw: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        if raw.get("version").is_none() {
            return Err(ConfigError::MissingVersion);
        }

        let file: OptionsFileV1 = serde_yaml::from_value(raw)?;
        if !SUPPORTED_VERSIONS.contains(&file.version) {
            return Err(ConfigError::UnsupportedVersion {
                found: file.version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }

        let preset = match &file.preset {
            Some(name) => Preset::parse(name)?,
            None => Preset::default(),
        };
        let mut options = Self::preset(preset);
        if let Some(overrides) = file.overrides {
            overrides.apply(&mut options);
        }
        options.validate()?;
        Ok(options)
    }

    /// Load options from a YAML file
    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Serialize as a fully-overridden v1 document
    pub fn to_yaml(&self) -> ConfigResult<String> {
        let file = OptionsFileV1 {
            version: 1,
            preset: None,
            overrides: Some(OptionsOverrides::from(self)),
        };
        Ok(serde_yaml::to_string(&file)?)
    }
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self::preset(Preset::default())
    }
}

/// YAML Schema v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionsFileV1 {
    /// Schema version (always 1 for v1)
    pub version: u32,

    /// Base preset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,

    /// Fine-grained overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<OptionsOverrides>,
}

/// Per-field overrides on top of a preset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionsOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_len: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_chains: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collect_timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_fixpoint_iterations: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_non_serializable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict_rules: Option<bool>,
}

impl OptionsOverrides {
    fn apply(self, options: &mut AnalysisOptions) {
        if let Some(v) = self.max_len {
            options.max_len = v;
        }
        if let Some(v) = self.max_chains {
            options.max_chains = v;
        }
        if let Some(v) = self.collect_timeout_ms {
            options.collect_timeout_ms = v;
        }
        if let Some(v) = self.max_fixpoint_iterations {
            options.max_fixpoint_iterations = v;
        }
        if let Some(v) = self.filter_non_serializable {
            options.filter_non_serializable = v;
        }
        if let Some(v) = self.strict_rules {
            options.strict_rules = v;
        }
    }
}

impl From<&AnalysisOptions> for OptionsOverrides {
    fn from(o: &AnalysisOptions) -> Self {
        Self {
            max_len: Some(o.max_len),
            max_chains: Some(o.max_chains),
            collect_timeout_ms: Some(o.collect_timeout_ms),
            max_fixpoint_iterations: Some(o.max_fixpoint_iterations),
            filter_non_serializable: Some(o.filter_non_serializable),
            strict_rules: Some(o.strict_rules),
        }
    }
}
