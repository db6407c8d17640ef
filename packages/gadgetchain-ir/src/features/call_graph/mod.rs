//! # Call Graph
//!
//! Built on the fly while methods are summarized. Every resolved call becomes
//! a [`CallEdge`] carrying the caller-relative controllability of the receiver
//! and arguments; the [`StackManager`] tracks which methods are being analyzed
//! right now so recursion is detected instead of followed.

pub mod domain;
pub mod infrastructure;

pub use domain::{CallEdge, CallEdgeId, CallSite};
pub use infrastructure::{
    filter_cha, filter_methods, CallGraph, CallGraphStats, NamePattern, StackManager,
};
