//! On-the-fly call graph
//!
//! Append-only. Edges are deduplicated by [`CallEdge`] identity and indexed
//! by callee and by caller.

use crate::features::call_graph::domain::{CallEdge, CallEdgeId};
use crate::features::program::domain::MethodId;
use rustc_hash::FxHashMap;

#[derive(Debug, Default, Clone)]
pub struct CallGraphStats {
    pub edges: usize,
    pub duplicates: usize,
}

#[derive(Debug, Default)]
pub struct CallGraph {
    edges: Vec<CallEdge>,
    index: FxHashMap<CallEdge, CallEdgeId>,
    into: FxHashMap<MethodId, Vec<CallEdgeId>>,
    out_of: FxHashMap<MethodId, Vec<CallEdgeId>>,
    pub stats: CallGraphStats,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `edge` unless an equal one exists; returns the stored id and
    /// whether it was new
    pub fn add_edge(&mut self, edge: CallEdge) -> (CallEdgeId, bool) {
        if let Some(&id) = self.index.get(&edge) {
            self.stats.duplicates += 1;
            return (id, false);
        }
        let id = CallEdgeId(self.edges.len() as u32);
        self.into.entry(edge.callee).or_default().push(id);
        self.out_of.entry(edge.caller()).or_default().push(id);
        self.index.insert(edge.clone(), id);
        self.edges.push(edge);
        self.stats.edges += 1;
        (id, true)
    }

    pub fn edge(&self, id: CallEdgeId) -> &CallEdge {
        &self.edges[id.index()]
    }

    pub fn edges_into(&self, callee: MethodId) -> &[CallEdgeId] {
        self.into.get(&callee).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn edges_out_of(&self, caller: MethodId) -> &[CallEdgeId] {
        self.out_of.get(&caller).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First recorded edge `caller -> callee`
    pub fn edge_between(&self, caller: MethodId, callee: MethodId) -> Option<CallEdgeId> {
        self.edges_into(callee)
            .iter()
            .copied()
            .find(|id| self.edge(*id).caller() == caller)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CallEdgeId, &CallEdge)> {
        self.edges
            .iter()
            .enumerate()
            .map(|(i, e)| (CallEdgeId(i as u32), e))
    }

    /// Methods reachable from `from` along recorded edges, `from` included
    pub fn reachable_from(&self, from: MethodId) -> Vec<MethodId> {
        let mut seen = rustc_hash::FxHashSet::default();
        let mut order = Vec::new();
        let mut stack = vec![from];
        while let Some(m) = stack.pop() {
            if !seen.insert(m) {
                continue;
            }
            order.push(m);
            stack.extend(self.edges_out_of(m).iter().map(|e| self.edge(*e).callee));
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::call_graph::domain::CallSite;
    use crate::features::controllability::domain::ContrValue;
    use crate::features::program::domain::CallKind;

    fn edge(caller: u32, stmt: usize, callee: u32, v: &str) -> CallEdge {
        CallEdge::new(
            CallKind::Virtual,
            CallSite {
                caller: MethodId(caller),
                stmt,
            },
            MethodId(callee),
            vec![ContrValue::from(v)],
            1,
        )
    }

    #[test]
    fn test_dedup_and_indexes() {
        let mut cg = CallGraph::new();
        let (a, new_a) = cg.add_edge(edge(0, 1, 1, "this"));
        let (b, new_b) = cg.add_edge(edge(0, 1, 1, "this-name"));
        let (c, new_c) = cg.add_edge(edge(0, 1, 1, "param-0"));
        assert!(new_a && !new_b && new_c);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(cg.edges_into(MethodId(1)), &[a, c]);
        assert_eq!(cg.edges_out_of(MethodId(0)).len(), 2);
        assert_eq!(cg.stats.duplicates, 1);
    }

    #[test]
    fn test_edge_between_and_reachability() {
        let mut cg = CallGraph::new();
        cg.add_edge(edge(0, 1, 1, "this"));
        cg.add_edge(edge(1, 3, 2, "this"));
        cg.add_edge(edge(2, 0, 0, "this"));
        assert!(cg.edge_between(MethodId(1), MethodId(2)).is_some());
        assert!(cg.edge_between(MethodId(0), MethodId(2)).is_none());
        let mut reach = cg.reachable_from(MethodId(1));
        reach.sort();
        assert_eq!(reach, vec![MethodId(0), MethodId(1), MethodId(2)]);
    }
}
