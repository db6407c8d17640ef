//! Call graph storage, the active analysis stack and dispatch filters

pub mod call_graph;
pub mod callee_filter;
pub mod stack_manager;

pub use call_graph::{CallGraph, CallGraphStats};
pub use callee_filter::{filter_cha, filter_methods, NamePattern};
pub use stack_manager::StackManager;
