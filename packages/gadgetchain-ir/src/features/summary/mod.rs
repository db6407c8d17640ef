//! # Method Summaries
//!
//! Every analyzed method is reduced once to a [`MethodSummary`]: the
//! controllability of its return value and of what it writes into its
//! receiver, parameters and receiver fields, expressed relative to its own
//! formals. Callers rewrite the summary into their frame at each call site.
//!
//! [`SummaryEngine`] drives the analysis from the rule table's entries. For
//! each method a forward dataflow solver runs the [`StmtProcessor`], which
//! grows the pointer-flow graph, answers points-to queries on demand and
//! analyzes callees eagerly; every resolved call is handed to the chain
//! search as it appears.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use application::{
    AnalysisTimer, ClassInitializer, CompositePlugin, EngineStats, StmtProcessor, SummaryEngine,
};
pub use domain::{MethodSummary, PointsTo, SummaryKey};
pub use infrastructure::{DataflowAnalysis, DataflowResult, ForwardSolver, SummaryTable};
pub use ports::AnalysisPlugin;
