//! Summary engine: worklist driver, per-statement transfer, call handling

mod engine;
mod invoke;
mod plugins;
mod points_to;
mod stmt_processor;

pub use engine::{EngineStats, SummaryEngine};
pub use plugins::{AnalysisTimer, ClassInitializer, CompositePlugin};
pub use stmt_processor::StmtProcessor;
