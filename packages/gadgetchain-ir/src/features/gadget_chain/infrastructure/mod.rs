pub mod chain_graph;
pub mod chain_search;
pub mod report;

pub use chain_graph::{ChainGraphStats, GadgetChainGraph, PathBudget};
pub use chain_search::{CalleeState, ChainSearch, ChainSearchStats, SearchContext};
pub use report::{ChainCollector, JsonReportWriter, TextReportWriter};
