//! Pointer-flow edges

use super::heap::ObjId;
use super::pointer::PointerId;
use crate::features::program::domain::JavaType;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlowEdgeId(pub u32);

impl FlowEdgeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowKind {
    /// Allocation site to variable
    New,
    /// Mock controllable object to pointer (boundary seeds, polluted results)
    NewContr,
    LocalAssign,
    Cast,
    StaticLoad,
    StaticStore,
    /// Field or array-element read
    InstanceLoad,
    /// Field or array-element write
    InstanceStore,
    /// Element written into the array variable itself
    ElementStore,
    /// Assignment implied by applying a callee summary
    SummaryAssign,
    /// Taint-transfer rule edge
    Other,
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlowKind::New => "NEW",
            FlowKind::NewContr => "NEW_CONTR",
            FlowKind::LocalAssign => "LOCAL_ASSIGN",
            FlowKind::Cast => "CAST",
            FlowKind::StaticLoad => "STATIC_LOAD",
            FlowKind::StaticStore => "STATIC_STORE",
            FlowKind::InstanceLoad => "INSTANCE_LOAD",
            FlowKind::InstanceStore => "INSTANCE_STORE",
            FlowKind::ElementStore => "ELEMENT_STORE",
            FlowKind::SummaryAssign => "SUMMARY_ASSIGN",
            FlowKind::Other => "OTHER",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowSource {
    Pointer(PointerId),
    Obj(ObjId),
}

impl FlowSource {
    pub fn pointer(self) -> Option<PointerId> {
        match self {
            FlowSource::Pointer(p) => Some(p),
            FlowSource::Obj(_) => None,
        }
    }

    pub fn obj(self) -> Option<ObjId> {
        match self {
            FlowSource::Obj(o) => Some(o),
            FlowSource::Pointer(_) => None,
        }
    }
}

/// Value rewrite attached to an edge
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Transfer {
    Identity,
    /// Re-type the flowing value (casts)
    SpecialType(JavaType),
    /// Taint-transfer rule: re-type, optionally reclassify as freshly allocated
    Taint { ty: JavaType, is_new: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowEdge {
    pub kind: FlowKind,
    pub source: FlowSource,
    pub target: PointerId,
    pub line: u32,
    pub transfers: Vec<Transfer>,
}

impl FlowEdge {
    pub fn new(kind: FlowKind, source: FlowSource, target: PointerId, line: u32) -> Self {
        Self {
            kind,
            source,
            target,
            line,
            transfers: vec![Transfer::Identity],
        }
    }

    pub fn with_transfer(mut self, transfer: Transfer) -> Self {
        self.transfers = vec![transfer];
        self
    }

    pub fn source_pointer(&self) -> Option<PointerId> {
        self.source.pointer()
    }
}
