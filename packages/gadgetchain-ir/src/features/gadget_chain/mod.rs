//! # Gadget Chains
//!
//! Source-to-sink call sequences assembled from the call edges the summary
//! engine emits. The chain graph remembers which methods reach a sink;
//! [`ChainSearch`] stitches active call stacks onto it, type-checks,
//! simplifies and deduplicates the result.
//!
//! Output goes through the [`ChainSink`] port: a text report, a JSON report,
//! or an in-memory collector.

pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use domain::{ChainHop, ChainReport, GadgetChain, GadgetChainNode};
pub use infrastructure::{
    CalleeState, ChainCollector, ChainGraphStats, ChainSearch, ChainSearchStats, GadgetChainGraph,
    JsonReportWriter, PathBudget, SearchContext, TextReportWriter,
};
pub use ports::{write_report, ChainSink};
