//! Configuration System
//!
//! Two documents configure a run:
//! - Analysis options: a [`Preset`] plus per-field YAML overrides ([`AnalysisOptions`])
//! - Rule table: sources, sinks, transfers, imitated behaviors and ignores
//!   (see [`crate::features::rules`])
//!
//! # Examples
//!
//! ```rust,ignore
//! use gadgetchain_ir::config::{AnalysisOptions, Preset};
//!
//! let options = AnalysisOptions::preset(Preset::Fast).max_len(10);
//! options.validate()?;
//!
//! let options = AnalysisOptions::from_yaml("analysis.yaml")?;
//! ```

pub mod error;
pub mod options;
pub mod preset;

// Re-exports
pub use error::{ConfigError, ConfigResult};
pub use options::{AnalysisOptions, OptionsFileV1, OptionsOverrides};
pub use preset::Preset;
