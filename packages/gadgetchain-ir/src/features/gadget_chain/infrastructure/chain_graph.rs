//! Gadget-chain graph
//!
//! Union of every sink-reaching call path found so far. Nodes are methods,
//! an edge `a -> b` means some recorded path calls `b` from `a`. The graph
//! only grows; a method that is a node is known to reach a sink.
//!
//! [`GadgetChainGraph::collect_paths`] enumerates the sink-reaching suffixes
//! from a node under a [`PathBudget`].

use crate::features::gadget_chain::domain::GadgetChainNode;
use crate::features::program::domain::MethodId;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use rustc_hash::{FxHashMap, FxHashSet};
use std::time::{Duration, Instant};

/// Cooperative bound on one path enumeration
#[derive(Debug, Clone)]
pub struct PathBudget {
    deadline: Option<Instant>,
    remaining: usize,
    exhausted: bool,
}

impl PathBudget {
    pub fn new(timeout: Duration, max_paths: usize) -> Self {
        Self {
            deadline: Instant::now().checked_add(timeout),
            remaining: max_paths,
            exhausted: false,
        }
    }

    pub fn unbounded() -> Self {
        Self {
            deadline: None,
            remaining: usize::MAX,
            exhausted: false,
        }
    }

    /// Whether the enumeration was cut short
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    fn allows_more(&mut self) -> bool {
        if self.exhausted {
            return false;
        }
        let late = self.deadline.map_or(false, |d| Instant::now() >= d);
        if late || self.remaining == 0 {
            self.exhausted = true;
        }
        !self.exhausted
    }

    fn take_path(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }
}

#[derive(Debug, Default, Clone)]
pub struct ChainGraphStats {
    pub paths_added: usize,
    pub enumerations: usize,
    pub exhausted_enumerations: usize,
}

#[derive(Debug, Default)]
pub struct GadgetChainGraph {
    graph: StableDiGraph<GadgetChainNode, ()>,
    index: FxHashMap<MethodId, NodeIndex>,
    pub stats: ChainGraphStats,
}

impl GadgetChainGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, method: MethodId) -> bool {
        self.index.contains_key(&method)
    }

    pub fn node(&self, method: MethodId) -> Option<&GadgetChainNode> {
        self.index.get(&method).map(|&n| &self.graph[n])
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn ensure_node(&mut self, method: MethodId) -> (NodeIndex, bool) {
        if let Some(&n) = self.index.get(&method) {
            return (n, false);
        }
        let n = self.graph.add_node(GadgetChainNode::new(method));
        self.index.insert(method, n);
        (n, true)
    }

    /// Add consecutive edges of `path`; returns whether any node was new
    pub fn add_path(&mut self, path: &[MethodId]) -> bool {
        let mut grew = false;
        let mut prev: Option<NodeIndex> = None;
        for &method in path {
            let (n, created) = self.ensure_node(method);
            grew |= created;
            if let Some(p) = prev {
                if self.graph.find_edge(p, n).is_none() {
                    self.graph.add_edge(p, n, ());
                }
            }
            prev = Some(n);
        }
        self.stats.paths_added += 1;
        grew
    }

    pub fn tc(&self, method: MethodId, sink: MethodId) -> Option<&[i32]> {
        self.node(method).and_then(|n| n.tc(sink))
    }

    /// First write per (method, sink) wins; unknown methods are ignored
    pub fn update_tc(&mut self, method: MethodId, sink: MethodId, tc: Vec<i32>) -> bool {
        match self.index.get(&method) {
            Some(&n) => self.graph[n].update_tc(sink, tc),
            None => false,
        }
    }

    fn successors(&self, n: NodeIndex) -> Vec<NodeIndex> {
        let mut next: Vec<NodeIndex> = self.graph.neighbors(n).collect();
        next.sort_by_key(|&s| self.graph[s].method);
        next
    }

    /// Simple paths from `from` to a leaf (a sink), at most `max_len` nodes
    /// each, in depth-first order
    pub fn collect_paths(
        &mut self,
        from: MethodId,
        max_len: usize,
        budget: &mut PathBudget,
    ) -> Vec<Vec<MethodId>> {
        let mut paths = Vec::new();
        let Some(&start) = self.index.get(&from) else {
            return paths;
        };
        self.stats.enumerations += 1;
        let mut visited = FxHashSet::default();
        let mut path = Vec::new();
        self.dfs(start, max_len, budget, &mut visited, &mut path, &mut paths);
        if budget.is_exhausted() {
            self.stats.exhausted_enumerations += 1;
        }
        paths
    }

    fn dfs(
        &self,
        n: NodeIndex,
        max_len: usize,
        budget: &mut PathBudget,
        visited: &mut FxHashSet<NodeIndex>,
        path: &mut Vec<MethodId>,
        paths: &mut Vec<Vec<MethodId>>,
    ) {
        if !budget.allows_more() {
            return;
        }
        visited.insert(n);
        path.push(self.graph[n].method);

        let next = self.successors(n);
        if next.is_empty() {
            paths.push(path.clone());
            budget.take_path();
        } else if path.len() < max_len {
            for s in next {
                if !visited.contains(&s) {
                    self.dfs(s, max_len, budget, visited, path, paths);
                }
            }
        }

        path.pop();
        visited.remove(&n);
    }
}
