pub mod pointer_flow_graph;

pub use pointer_flow_graph::{AddEdge, PfgStats, PointerFlowGraph};
