//! # Pointer Flow Graph
//!
//! Abstract storage locations and the typed value flows between them. The
//! graph is append-only; points-to answers are computed lazily by the summary
//! solver walking in-edges backwards.

pub mod domain;
pub mod infrastructure;

pub use domain::{
    FlowEdge, FlowEdgeId, FlowKind, FlowSource, HeapModel, HeapObj, ObjId, Pointer, PointerArena,
    PointerId, PointerKind, Transfer,
};
pub use infrastructure::{AddEdge, PfgStats, PointerFlowGraph};
