//! Pipeline: load inputs, run the summary engine, hand chains to a sink
//!
//! ```text
//! program.json ─┐
//! rules.yaml ───┼─▶ Load ─▶ Analyze ─▶ Report ─▶ ChainSink
//! options.yaml ─┘
//! ```

pub mod orchestrator;
pub mod result;

pub use orchestrator::GadgetChainPipeline;
pub use result::{PipelineMetadata, PipelineResult, StageMetrics};
