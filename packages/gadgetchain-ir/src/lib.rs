/*
 * Gadgetchain IR - Deserialization Gadget Chain Discovery
 *
 * Feature-First Hexagonal Architecture:
 * - config/    : Analysis options (YAML, presets)
 * - features/  : Vertical slices (program → rules → controllability →
 *                pointer_flow → call_graph → gadget_chain → summary)
 * - pipeline/  : Load, analyze, report
 *
 * One run summarizes every method reachable from the deserialization
 * entries exactly once and assembles source-to-sink chains while the call
 * graph grows.
 */

#![allow(clippy::too_many_arguments)] // Call-edge construction threads many parts
#![allow(clippy::new_without_default)] // Default impl not always needed
#![allow(clippy::module_inception)] // Module naming intentional

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports - Feature-First Architecture
// ═══════════════════════════════════════════════════════════════════════════

/// Analysis options and presets
pub mod config;

/// Crate-level error type
pub mod errors;

/// Feature slices (program model, rules, engine, chains)
pub mod features;

/// End-to-end orchestration
pub mod pipeline;

pub use config::{AnalysisOptions, ConfigError, Preset};
pub use errors::{GadgetError, Result};
pub use features::gadget_chain::{
    ChainCollector, ChainReport, ChainSink, GadgetChain, JsonReportWriter, TextReportWriter,
};
pub use features::program::Program;
pub use features::rules::{RuleLoader, RuleTable};
pub use features::summary::SummaryEngine;
pub use pipeline::{GadgetChainPipeline, PipelineResult};
