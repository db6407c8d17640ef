//! Call-graph domain types

pub mod call_edge;

pub use call_edge::{CallEdge, CallEdgeId, CallSite};
