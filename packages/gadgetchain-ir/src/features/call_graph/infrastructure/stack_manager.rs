//! Active analysis stack
//!
//! The method stack holds every method whose analysis is in progress; the
//! edge stack holds the call edges that led into them. An edge is pushed
//! right before its callee is analyzed and popped together with it, so the
//! two stacks describe the same path from the entry method.

use super::call_graph::CallGraph;
use crate::features::call_graph::domain::CallEdgeId;
use crate::features::program::domain::MethodId;

#[derive(Debug, Default)]
pub struct StackManager {
    methods: Vec<MethodId>,
    edges: Vec<CallEdgeId>,
    max_depth: usize,
}

impl StackManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_method(&mut self, method: MethodId) {
        self.methods.push(method);
        self.max_depth = self.max_depth.max(self.methods.len());
    }

    /// Pop the top method and the edge that led into it
    pub fn pop_method(&mut self, graph: &CallGraph) -> Option<MethodId> {
        let method = self.methods.pop()?;
        if let Some(&top) = self.edges.last() {
            if graph.edge(top).callee == method {
                self.edges.pop();
            }
        }
        Some(method)
    }

    pub fn contains_method(&self, method: MethodId) -> bool {
        self.methods.contains(&method)
    }

    pub fn current_method(&self) -> Option<MethodId> {
        self.methods.last().copied()
    }

    pub fn depth(&self) -> usize {
        self.methods.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn push_edge(&mut self, edge: CallEdgeId) {
        self.edges.push(edge);
    }

    /// Edges into the active methods, entry side first
    pub fn edges(&self) -> &[CallEdgeId] {
        &self.edges
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}
