//! Fixed-point solver and the global summary table

pub mod dataflow;
pub mod summary_table;

pub use dataflow::{DataflowAnalysis, DataflowResult, ForwardSolver};
pub use summary_table::SummaryTable;
