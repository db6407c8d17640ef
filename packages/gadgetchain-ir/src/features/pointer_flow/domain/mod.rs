//! Pointer-flow domain: locations, heap objects, flow edges

pub mod flow_edge;
pub mod heap;
pub mod pointer;

pub use flow_edge::{FlowEdge, FlowEdgeId, FlowKind, FlowSource, Transfer};
pub use heap::{HeapModel, HeapObj, ObjId};
pub use pointer::{Pointer, PointerArena, PointerId, PointerKind};
