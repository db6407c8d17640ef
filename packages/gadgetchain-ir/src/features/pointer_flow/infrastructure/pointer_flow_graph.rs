//! Pointer Flow Graph
//!
//! Append-only graph of value flows between abstract locations. Nodes are
//! [`PointerId`]s from the shared arena; edges are stored once in a flat table
//! and referenced by [`FlowEdgeId`] from per-pointer in/out lists.
//!
//! # Deduplication
//! An edge is novel when no edge with the same `(source, target, kind)` exists.
//! Taint-transfer edges ([`FlowKind::Other`]) also key on their transfer; adding
//! an equal one hands back the stored edge so callers attach to it.
//!
//! # Alias index
//! Every `InstanceStore` edge is indexed for alias matching: field stores by
//! field, array stores by (declaring class of the base's method, base type).
//! Stores made inside a controllable `if` carry a validity bound (the branch
//! target's line) in a side table.

use crate::features::pointer_flow::domain::{
    FlowEdge, FlowEdgeId, FlowKind, FlowSource, PointerArena, PointerId, PointerKind, Transfer,
};
use crate::features::program::domain::{ClassId, FieldId, JavaType};
use crate::features::program::Program;
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EdgeKey {
    source: FlowSource,
    target: PointerId,
    kind: FlowKind,
    transfer: Option<Transfer>,
}

impl EdgeKey {
    fn of(edge: &FlowEdge) -> Self {
        let transfer = match edge.kind {
            FlowKind::Other => edge.transfers.first().cloned(),
            _ => None,
        };
        Self {
            source: edge.source,
            target: edge.target,
            kind: edge.kind,
            transfer,
        }
    }
}

/// Outcome of [`PointerFlowGraph::add_edge`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddEdge {
    /// New edge stored
    Added(FlowEdgeId),
    /// Equal taint-transfer edge already stored
    Existing(FlowEdgeId),
    /// Already present, nothing to do
    Duplicate,
}

impl AddEdge {
    pub fn is_novel(self) -> bool {
        matches!(self, AddEdge::Added(_))
    }

    pub fn edge(self) -> Option<FlowEdgeId> {
        match self {
            AddEdge::Added(e) | AddEdge::Existing(e) => Some(e),
            AddEdge::Duplicate => None,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct PfgStats {
    pub edges_added: usize,
    pub duplicates: usize,
    pub detached: usize,
}

#[derive(Debug, Default)]
pub struct PointerFlowGraph {
    edges: Vec<FlowEdge>,
    in_edges: FxHashMap<PointerId, Vec<FlowEdgeId>>,
    out_edges: FxHashMap<PointerId, Vec<FlowEdgeId>>,
    keys: FxHashMap<EdgeKey, FlowEdgeId>,
    field_matches: FxHashMap<FieldId, Vec<FlowEdgeId>>,
    array_matches: FxHashMap<(ClassId, JavaType), Vec<FlowEdgeId>>,
    if_ranges: FxHashMap<FlowEdgeId, u32>,
    pub stats: PfgStats,
}

impl PointerFlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_edge(&mut self, edge: FlowEdge, arena: &PointerArena, program: &Program) -> AddEdge {
        let key = EdgeKey::of(&edge);
        if let Some(&existing) = self.keys.get(&key) {
            self.stats.duplicates += 1;
            return match edge.kind {
                FlowKind::Other => AddEdge::Existing(existing),
                _ => AddEdge::Duplicate,
            };
        }

        let id = FlowEdgeId(self.edges.len() as u32);
        if edge.kind == FlowKind::InstanceStore {
            self.index_store(id, edge.target, arena, program);
        }
        self.in_edges.entry(edge.target).or_default().push(id);
        if let FlowSource::Pointer(src) = edge.source {
            self.out_edges.entry(src).or_default().push(id);
        }
        self.keys.insert(key, id);
        self.edges.push(edge);
        self.stats.edges_added += 1;
        AddEdge::Added(id)
    }

    fn index_store(&mut self, id: FlowEdgeId, target: PointerId, arena: &PointerArena, program: &Program) {
        match arena.get(target).kind {
            PointerKind::InstanceField { field, .. } => {
                self.field_matches.entry(field).or_default().push(id);
            }
            PointerKind::ArrayIndex { base } => {
                let base_ptr = arena.get(base);
                if let Some(method) = base_ptr.method {
                    let class = program.method(method).class;
                    self.array_matches
                        .entry((class, base_ptr.ty.clone()))
                        .or_default()
                        .push(id);
                }
            }
            _ => {}
        }
    }

    pub fn edge(&self, id: FlowEdgeId) -> &FlowEdge {
        &self.edges[id.index()]
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn in_edges(&self, p: PointerId) -> &[FlowEdgeId] {
        self.in_edges.get(&p).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn out_edges(&self, p: PointerId) -> &[FlowEdgeId] {
        self.out_edges.get(&p).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn field_matches(&self, field: FieldId) -> &[FlowEdgeId] {
        self.field_matches.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn array_matches(&self, class: ClassId, ty: &JavaType) -> &[FlowEdgeId] {
        self.array_matches
            .get(&(class, ty.clone()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Candidate alias stores for a field or array load source
    pub fn match_edges(&self, source: PointerId, arena: &PointerArena, program: &Program) -> Vec<FlowEdgeId> {
        match arena.get(source).kind {
            PointerKind::InstanceField { field, .. } => self.field_matches(field).to_vec(),
            PointerKind::ArrayIndex { base } => {
                let base_ptr = arena.get(base);
                match base_ptr.method {
                    Some(m) => self
                        .array_matches(program.method(m).class, &base_ptr.ty)
                        .to_vec(),
                    None => Vec::new(),
                }
            }
            _ => Vec::new(),
        }
    }

    /// Bound a store's validity to lines before `end_line`
    pub fn set_if_range(&mut self, edge: FlowEdgeId, end_line: u32) {
        self.if_ranges.insert(edge, end_line);
    }

    pub fn if_range(&self, edge: FlowEdgeId) -> Option<u32> {
        self.if_ranges.get(&edge).copied()
    }

    /// Unlink an edge from its endpoints. The key stays reserved, so the same
    /// edge is never re-added.
    pub fn detach(&mut self, id: FlowEdgeId) {
        let (source, target) = {
            let e = &self.edges[id.index()];
            (e.source, e.target)
        };
        if let Some(list) = self.in_edges.get_mut(&target) {
            list.retain(|e| *e != id);
        }
        if let FlowSource::Pointer(src) = source {
            if let Some(list) = self.out_edges.get_mut(&src) {
                list.retain(|e| *e != id);
            }
        }
        self.stats.detached += 1;
    }

    /// `start` plus every pointer reachable from it along out-edges
    pub fn forward_closure(&self, start: PointerId) -> Vec<PointerId> {
        let mut seen = FxHashSet::default();
        let mut order = Vec::new();
        let mut stack = vec![start];
        while let Some(p) = stack.pop() {
            if !seen.insert(p) {
                continue;
            }
            order.push(p);
            for &e in self.out_edges(p) {
                stack.push(self.edges[e.index()].target);
            }
        }
        order
    }
}
