//! Chain search
//!
//! Assembles source-to-sink chains out of the call edges the summary engine
//! produces. Every edge goes through [`ChainSearch::push_call_edge`]:
//!
//! - an edge into a sink back-propagates the sink's required indices (the TC
//!   vector) down the active edge stack;
//! - an edge into a summarized method that already reaches a sink links the
//!   stack prefix to each recorded suffix from that method;
//! - an edge into a method still on the stack, or into one queued for a
//!   later top-level analysis (reflective jumps, proxy handlers), is parked
//!   under that method and replayed once the method is summarized and
//!   reaches a sink.
//!
//! Edge lists are kept sink-first: `list[0]` calls the sink, each following
//! edge calls the previous edge's caller. A list whose last caller is a source
//! is type-checked, loop-simplified and recorded once per method sequence.
//! Lists that stop short of a source still extend the chain graph so later
//! callers can link to them.

use super::chain_graph::{GadgetChainGraph, PathBudget};
use crate::config::AnalysisOptions;
use crate::features::call_graph::domain::{CallEdge, CallEdgeId};
use crate::features::call_graph::infrastructure::{CallGraph, NamePattern};
use crate::features::controllability::domain::{ContrValue, POLLUTED};
use crate::features::gadget_chain::domain::{ChainHop, ChainReport, GadgetChain};
use crate::features::program::domain::{JavaType, MethodId};
use crate::features::program::{Program, TypeOracle};
use crate::features::rules::domain::{CallerFilter, RuleTable};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, trace};

/// Borrowed analysis state the search reads (and, for loop shortcuts,
/// appends call edges to)
pub struct SearchContext<'a> {
    pub program: &'a Program,
    pub rules: &'a RuleTable,
    pub options: &'a AnalysisOptions,
    pub call_graph: &'a mut CallGraph,
    pub is_summarized: &'a dyn Fn(MethodId) -> bool,
}

/// Where the callee of a new edge stands in the analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalleeState {
    /// Summarized already, or analyzed right away with the edge on the stack
    Inline,
    /// Being analyzed somewhere up the stack
    OnStack,
    /// Left to the worklist; analyzed later without this edge on the stack
    Queued,
}

#[derive(Debug, Default, Clone)]
pub struct ChainSearchStats {
    pub sink_edges: usize,
    pub linked: usize,
    pub deferred: usize,
    pub replayed: usize,
    pub type_rejected: usize,
    pub duplicates: usize,
    pub simplified: usize,
}

#[derive(Debug, Default)]
pub struct ChainSearch {
    graph: GadgetChainGraph,
    /// Parked edge stacks per on-stack or queued callee, entry side first
    deferred: BTreeMap<MethodId, Vec<Vec<CallEdgeId>>>,
    discovered: FxHashSet<Vec<MethodId>>,
    chains: Vec<GadgetChain>,
    truncated: bool,
    pub stats: ChainSearchStats,
}

impl ChainSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph(&self) -> &GadgetChainGraph {
        &self.graph
    }

    pub fn chains(&self) -> &[GadgetChain] {
        &self.chains
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn deferred_len(&self) -> usize {
        self.deferred.values().map(Vec::len).sum()
    }

    pub fn report(&self) -> ChainReport {
        ChainReport {
            chains: self.chains.clone(),
            truncated: self.truncated,
        }
    }

    pub fn into_report(self) -> ChainReport {
        ChainReport {
            chains: self.chains,
            truncated: self.truncated,
        }
    }

    fn is_saturated(&self, options: &AnalysisOptions) -> bool {
        self.discovered.len() >= options.max_chains
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Entry points
    // ═══════════════════════════════════════════════════════════════════════

    /// Route a freshly added call edge. `stack` holds the edges into the
    /// active methods, entry side first; its top leads into the edge's caller.
    pub fn push_call_edge(
        &mut self,
        cx: &mut SearchContext<'_>,
        edge: CallEdgeId,
        stack: &[CallEdgeId],
        state: CalleeState,
    ) {
        let callee = cx.call_graph.edge(edge).callee;
        let summarized = (cx.is_summarized)(callee);
        if cx.rules.is_sink(callee) {
            self.record_sink_edge(cx, edge, stack);
        } else if state == CalleeState::OnStack {
            self.defer(cx, edge, stack);
        } else if summarized && self.graph.contains(callee) {
            let suffixes = self.suffixes_from(cx, callee);
            self.link(cx, edge, &suffixes, stack);
        } else if state == CalleeState::Queued && !summarized {
            self.defer(cx, edge, stack);
        }
        self.replay_deferred(cx);
    }

    /// Replay parked stacks whose callee is now summarized and reaches a sink
    pub fn replay_deferred(&mut self, cx: &mut SearchContext<'_>) {
        let ready: Vec<MethodId> = self
            .deferred
            .keys()
            .copied()
            .filter(|&m| (cx.is_summarized)(m) && self.graph.contains(m))
            .collect();
        for method in ready {
            let Some(stacks) = self.deferred.remove(&method) else {
                continue;
            };
            let suffixes = self.suffixes_from(cx, method);
            for stored in stacks {
                if let Some((&init, rest)) = stored.split_last() {
                    self.stats.replayed += 1;
                    self.link(cx, init, &suffixes, rest);
                }
            }
        }
    }

    fn record_sink_edge(&mut self, cx: &mut SearchContext<'_>, edge: CallEdgeId, stack: &[CallEdgeId]) {
        self.stats.sink_edges += 1;
        let sink = cx.call_graph.edge(edge).callee;
        let Some(tc) = cx.rules.sink_indices(sink) else {
            return;
        };
        let list = back_propagate(cx, Some(tc), edge, stack, 0);
        if !list.is_empty() {
            self.settle(cx, list);
        }
    }

    fn defer(&mut self, cx: &mut SearchContext<'_>, edge: CallEdgeId, stack: &[CallEdgeId]) {
        let mut list = back_propagate(cx, None, edge, stack, 1);
        if list.is_empty() {
            return;
        }
        list.reverse();
        let callee = cx.call_graph.edge(edge).callee;
        let parked = self.deferred.entry(callee).or_default();
        if !parked.contains(&list) {
            trace!("deferring {} edge(s) into {}", list.len(), cx.program.signature(callee));
            parked.push(list);
            self.stats.deferred += 1;
        }
    }

    fn link(
        &mut self,
        cx: &mut SearchContext<'_>,
        call_edge: CallEdgeId,
        suffixes: &[Vec<CallEdgeId>],
        stack: &[CallEdgeId],
    ) {
        for suffix in suffixes {
            if self.is_saturated(cx.options) {
                self.truncated = true;
                return;
            }
            let (Some(&first), Some(&last)) = (suffix.first(), suffix.last()) else {
                continue;
            };
            let size = suffix.len();
            let node = cx.call_graph.edge(last).caller();
            let sink = cx.call_graph.edge(first).callee;
            let tc = match self.graph.tc(node, sink) {
                Some(tc) => tc.to_vec(),
                None => match entry_tc(cx, suffix) {
                    Some(tc) => tc,
                    None => continue,
                },
            };
            let prefix = back_propagate(cx, Some(&tc), call_edge, stack, size);
            if prefix.is_empty() {
                continue;
            }
            let mut joined = suffix.clone();
            joined.extend(prefix);
            let joined = filter_edge_list(cx, &joined);
            if joined.len() <= size {
                continue;
            }
            self.stats.linked += 1;
            self.settle(cx, joined);
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Recording
    // ═══════════════════════════════════════════════════════════════════════

    /// Extend the chain graph with `list` and, when it starts at a source,
    /// check, simplify and record it
    fn settle(&mut self, cx: &mut SearchContext<'_>, list: Vec<CallEdgeId>) -> bool {
        let methods = method_sequence(&*cx.call_graph, &list);
        let from_source = cx.rules.is_source(methods[0]);
        self.extend_graph(cx, &methods, &list, from_source);
        if !from_source {
            return false;
        }
        if !type_check(cx, &list) {
            self.stats.type_rejected += 1;
            debug!("chain from {} rejected by type check", cx.program.signature(methods[0]));
            return false;
        }
        let simplified = self.simplify(cx, &methods, &list);
        self.record(cx, &simplified)
    }

    fn extend_graph(&mut self, cx: &SearchContext<'_>, methods: &[MethodId], list: &[CallEdgeId], from_source: bool) {
        let mut path = methods;
        if path.len() > cx.options.max_len || (from_source && path.len() > 2) {
            path = &path[1..];
        }
        self.graph.add_path(path);

        let sink = methods[methods.len() - 1];
        if let Some(required) = cx.rules.sink_indices(sink) {
            let memo = recovery_tc_map(&*cx.call_graph, list, required);
            for m in &path[..path.len() - 1] {
                if let Some(tc) = memo.get(m) {
                    self.graph.update_tc(*m, sink, tc.clone());
                }
            }
        }
    }

    /// Collapse a repeated sub-signature into a direct edge when the later
    /// occurrence is itself reachable from the source; returns the edges
    /// source first
    fn simplify(&mut self, cx: &mut SearchContext<'_>, methods: &[MethodId], list: &[CallEdgeId]) -> Vec<CallEdgeId> {
        let program = cx.program;
        let source = methods[0];
        let mut subsigs: Vec<&str> = Vec::new();
        let mut simplified: Vec<CallEdgeId> = Vec::new();

        // source side first; `tail` runs from the sink up to this hop
        for (k, &edge) in list.iter().rev().enumerate() {
            let gadget = cx.call_graph.edge(edge).caller();
            let subsig = program.method(gadget).subsignature.as_str();
            let tail = &list[..list.len() - k];
            if let Some(from) = subsigs.iter().rposition(|s| *s == subsig) {
                if from > 0 {
                    if let Some(shortcut) = shortcut(cx, gadget, source, &simplified[..from], tail) {
                        subsigs.truncate(from);
                        simplified.truncate(from - 1);
                        simplified.push(shortcut);
                        self.stats.simplified += 1;
                    }
                }
            }
            subsigs.push(subsig);
            simplified.push(edge);
        }
        simplified
    }

    fn record(&mut self, cx: &SearchContext<'_>, edges: &[CallEdgeId]) -> bool {
        let Some(&last) = edges.last() else {
            return false;
        };
        let cg = &*cx.call_graph;
        let sink = cg.edge(last).callee;
        let mut key: Vec<MethodId> = edges.iter().map(|&e| cg.edge(e).caller()).collect();
        key.push(sink);

        if self.discovered.contains(&key) {
            self.stats.duplicates += 1;
            return false;
        }
        if self.is_saturated(cx.options) {
            self.truncated = true;
            return false;
        }
        self.discovered.insert(key);

        let chain = GadgetChain {
            hops: edges
                .iter()
                .map(|&e| {
                    let edge = cg.edge(e);
                    ChainHop {
                        caller: cx.program.signature(edge.caller()).to_string(),
                        vector: edge.int_vector.clone(),
                    }
                })
                .collect(),
            sink: cx.program.signature(sink).to_string(),
        };
        debug!("gadget chain #{} ({} hops) -> {}", self.chains.len() + 1, chain.len(), chain.sink);
        self.chains.push(chain);
        true
    }

    /// Sink-reaching edge lists (sink first) from `method`, within budget
    fn suffixes_from(&mut self, cx: &SearchContext<'_>, method: MethodId) -> Vec<Vec<CallEdgeId>> {
        if self.is_saturated(cx.options) {
            self.truncated = true;
            return Vec::new();
        }
        let remaining = cx.options.max_chains - self.discovered.len();
        let mut budget = PathBudget::new(Duration::from_millis(cx.options.collect_timeout_ms), remaining);
        let paths = self.graph.collect_paths(method, cx.options.max_len, &mut budget);
        if budget.is_exhausted() {
            self.truncated = true;
            debug!("path enumeration from {} hit its budget", cx.program.signature(method));
        }

        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        for path in paths {
            if let Some(list) = edge_list_of(cx, &path) {
                if seen.insert(list.clone()) {
                    out.push(list);
                }
            }
        }
        out
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// TC vectors
// ═══════════════════════════════════════════════════════════════════════════

/// Rewrite required indices of a callee into the caller's terms through the
/// edge's vector
fn new_tc_list(tc: &[i32], edge: &CallEdge) -> Vec<i32> {
    let mut out = Vec::with_capacity(tc.len());
    for &t in tc {
        let mapped = if t > POLLUTED {
            edge.int_at((t + 1) as usize)
        } else {
            POLLUTED
        };
        if !out.contains(&mapped) {
            out.push(mapped);
        }
    }
    out
}

fn all_controllable(tc: &[i32]) -> bool {
    tc.iter().all(|&t| t >= POLLUTED)
}

/// TC vector per caller along `edges`, stopping at the first uncontrollable
/// step
fn recovery_tc_map(cg: &CallGraph, edges: &[CallEdgeId], tc: &[i32]) -> FxHashMap<MethodId, Vec<i32>> {
    let mut memo = FxHashMap::default();
    let mut tc = tc.to_vec();
    for &id in edges {
        let edge = cg.edge(id);
        tc = new_tc_list(&tc, edge);
        if !all_controllable(&tc) {
            break;
        }
        memo.insert(edge.caller(), tc.clone());
    }
    memo
}

/// TC vector at the caller of the last edge of a sink-first list,
/// recomputed from the sink
fn entry_tc(cx: &SearchContext<'_>, list: &[CallEdgeId]) -> Option<Vec<i32>> {
    let cg = &*cx.call_graph;
    let sink = cg.edge(*list.first()?).callee;
    let mut tc = cx.rules.sink_indices(sink)?.to_vec();
    for &id in list {
        tc = new_tc_list(&tc, cg.edge(id));
        if !all_controllable(&tc) {
            return None;
        }
    }
    Some(tc)
}

// ═══════════════════════════════════════════════════════════════════════════
// Edge lists
// ═══════════════════════════════════════════════════════════════════════════

/// Walk the active stack down from `init` while each edge leads into the
/// previous caller and, with a TC vector, the required indices stay
/// controllable. Stops at sources and class initializers. Returns the list
/// sink first, after caller filters.
fn back_propagate(
    cx: &SearchContext<'_>,
    tc: Option<&[i32]>,
    init: CallEdgeId,
    stack: &[CallEdgeId],
    sink_len: usize,
) -> Vec<CallEdgeId> {
    let cg = &*cx.call_graph;
    let mut tc = tc.map(|t| new_tc_list(t, cg.edge(init)));
    if tc.as_deref().map_or(false, |t| !all_controllable(t)) {
        return Vec::new();
    }

    let mut list = vec![init];
    let range = cx.options.max_len.saturating_sub(sink_len + 1);
    for i in 0..range {
        let caller = cg.edge(list[i]).caller();
        if cx.rules.is_source(caller) || i == stack.len() {
            break;
        }
        if cx.program.method(caller).is_class_initializer() {
            break;
        }
        let next = stack[stack.len() - i - 1];
        if cg.edge(next).callee != caller {
            break;
        }
        if let Some(current) = tc.as_mut() {
            let mapped = new_tc_list(current, cg.edge(next));
            if !all_controllable(&mapped) {
                break;
            }
            *current = mapped;
        }
        list.push(next);
    }
    filter_edge_list(cx, &list)
}

/// Apply caller filters: an edge whose filter rejects some of its callers
/// cuts the list after the callers it keeps
fn filter_edge_list(cx: &SearchContext<'_>, list: &[CallEdgeId]) -> Vec<CallEdgeId> {
    let cg = &*cx.call_graph;
    let mut out = Vec::with_capacity(list.len());
    for (i, &id) in list.iter().enumerate() {
        out.push(id);
        let edge = cg.edge(id);
        if let Some(filter) = &edge.filter {
            let callers = &list[i + 1..];
            let kept = filter_by_caller(cx.program, cg, edge, filter, callers);
            if kept.len() < callers.len() {
                out.extend(kept);
                break;
            }
        }
    }
    out
}

fn filter_by_caller(
    program: &Program,
    cg: &CallGraph,
    edge: &CallEdge,
    filter: &CallerFilter,
    callers: &[CallEdgeId],
) -> Vec<CallEdgeId> {
    match filter {
        CallerFilter::Name(name) => match callers.first() {
            Some(&first) if cg.edge(first).invoked_name == *name => callers.to_vec(),
            _ => Vec::new(),
        },
        CallerFilter::Param(index) => {
            let target = program.method(edge.callee).name.as_str();
            let mut slot = *index as usize + 1;
            for (j, &caller) in callers.iter().enumerate() {
                let value = cg.edge(caller).vector.get(slot).cloned().unwrap_or_default();
                if value.has_constant() || value.is_this_derived() || value == ContrValue::Polluted {
                    if NamePattern::new(&value.to_regex()).matches(target) {
                        return callers[j..].to_vec();
                    }
                    break;
                }
                match value.param_index() {
                    Some(k) if value.is_controllable_param() => slot = k as usize + 1,
                    _ => break,
                }
            }
            Vec::new()
        }
    }
}

/// Callers from the source side, then the sink
fn method_sequence(cg: &CallGraph, list: &[CallEdgeId]) -> Vec<MethodId> {
    let mut methods: Vec<MethodId> = list.iter().rev().map(|&e| cg.edge(e).caller()).collect();
    if let Some(&first) = list.first() {
        methods.push(cg.edge(first).callee);
    }
    methods
}

/// Recorded edges along a chain-graph path, sink first; `None` when an edge
/// is missing or a caller filter rejects part of the path
fn edge_list_of(cx: &SearchContext<'_>, path: &[MethodId]) -> Option<Vec<CallEdgeId>> {
    let mut list = Vec::with_capacity(path.len());
    for pair in path.windows(2) {
        list.push(cx.call_graph.edge_between(pair[0], pair[1])?);
    }
    if list.is_empty() {
        return None;
    }
    list.reverse();
    let filtered = filter_edge_list(cx, &list);
    (filtered.len() == list.len()).then_some(list)
}

/// Direct edge from the caller of the earlier occurrence to `gadget`, if
/// the source still reaches it with every required index controllable.
/// `tail` is sink first and ends with the edge out of `gadget`.
fn shortcut(
    cx: &mut SearchContext<'_>,
    gadget: MethodId,
    source: MethodId,
    head: &[CallEdgeId],
    tail: &[CallEdgeId],
) -> Option<CallEdgeId> {
    let last = *head.last()?;
    let from_edge = cx.call_graph.edge(last).clone();
    if from_edge.kind.is_static() {
        return None;
    }
    let tc = entry_tc(cx, tail)?;
    let back: Vec<CallEdgeId> = head.iter().rev().copied().collect();
    if !recovery_tc_map(&*cx.call_graph, &back, &tc).contains_key(&source) {
        return None;
    }
    let (id, _) = cx.call_graph.add_edge(CallEdge {
        callee: gadget,
        ..from_edge
    });
    Some(id)
}

// ═══════════════════════════════════════════════════════════════════════════
// Type check
// ═══════════════════════════════════════════════════════════════════════════

/// `[declaring class, params..]` of `method`
fn formal_types(program: &Program, method: MethodId) -> Vec<JavaType> {
    let info = program.method(method);
    std::iter::once(program.class(info.class).class_type())
        .chain(info.param_types.iter().cloned())
        .collect()
}

/// Walk from the source toward the sink; every hop's passed types must be
/// compatible (subtype either way) with the callee's formals. A value
/// forwarded unchanged from the caller's receiver or parameter keeps the
/// type bound at the previous hop.
fn type_check(cx: &SearchContext<'_>, list: &[CallEdgeId]) -> bool {
    let cg = &*cx.call_graph;
    let mut passed: Option<Vec<JavaType>> = None;
    for &id in list.iter().rev() {
        let edge = cg.edge(id);
        if edge.skips_type_check {
            return true;
        }
        let formals = formal_types(cx.program, edge.callee);
        let actual = match &passed {
            None => edge.arg_types.clone(),
            Some(prev) => narrow(edge, prev, &formals),
        };
        if actual.len() == formals.len() && !cx.program.all_compatible(&actual, &formals) {
            return false;
        }
        passed = Some(actual);
    }
    true
}

fn narrow(edge: &CallEdge, prev: &[JavaType], formals: &[JavaType]) -> Vec<JavaType> {
    formals
        .iter()
        .enumerate()
        .map(|(slot, formal)| {
            let bound = match edge.vector.get(slot) {
                Some(ContrValue::Param(k, path)) if path.is_empty() => prev.get(*k as usize + 1),
                Some(ContrValue::This(path)) if path.is_empty() => prev.first(),
                Some(v) if v.is_controllable() => edge.arg_types.get(slot),
                _ => None,
            };
            bound.unwrap_or(formal).clone()
        })
        .collect()
}
