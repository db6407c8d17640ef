/*
 * Summary Engine
 *
 * Owns every mutable structure of one analysis run and drives the method
 * worklist.
 *
 * Flow:
 * 1. Seed rule-provided summaries, queue every entry method
 * 2. Poll a method; skip it if summarized
 * 3. analyze_method:
 *    a. plugins may schedule other methods first (class init, readObject)
 *    b. push the edge that led here and the method onto the stack
 *    c. run the forward solver with a StmtProcessor; calls inside the body
 *       recurse into analyze_method for unsummarized callees
 *    d. complement the summary from the exit fact, write it once
 *    e. pop, replay deferred chain edges
 * 4. Every novel call edge is routed to the chain search as it is added
 *
 * Lifetime: one engine per run; it borrows the program, rules and options.
 */

use super::plugins::{AnalysisTimer, ClassInitializer, CompositePlugin};
use super::stmt_processor::StmtProcessor;
use crate::config::AnalysisOptions;
use crate::features::call_graph::domain::{CallEdge, CallEdgeId};
use crate::features::call_graph::{CallGraph, StackManager};
use crate::features::controllability::domain::ContrValue;
use crate::features::gadget_chain::domain::ChainReport;
use crate::features::gadget_chain::infrastructure::{CalleeState, ChainSearch, SearchContext};
use crate::features::pointer_flow::{HeapModel, PointerArena, PointerFlowGraph};
use crate::features::program::domain::MethodId;
use crate::features::program::Program;
use crate::features::rules::RuleTable;
use crate::features::summary::domain::MethodSummary;
use crate::features::summary::infrastructure::{ForwardSolver, SummaryTable};
use crate::features::summary::ports::AnalysisPlugin;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub methods_analyzed: usize,
    /// Methods whose solver hit the iteration cap
    pub not_converged: usize,
    pub call_edges: usize,
    pub worklist_polls: usize,
}

pub struct SummaryEngine<'p> {
    pub(super) program: &'p Program,
    pub(super) rules: &'p RuleTable,
    pub(super) options: &'p AnalysisOptions,
    pub(super) arena: PointerArena,
    pub(super) heap: HeapModel,
    pub(super) pfg: PointerFlowGraph,
    pub(super) call_graph: CallGraph,
    pub(super) stack: StackManager,
    pub(super) search: ChainSearch,
    pub(super) summaries: SummaryTable,
    /// Partial summaries of the methods currently on the stack
    pub(super) pending: FxHashMap<MethodId, MethodSummary>,
    worklist: VecDeque<MethodId>,
    queued: FxHashSet<MethodId>,
    plugins: CompositePlugin,
    pub stats: EngineStats,
}

impl<'p> SummaryEngine<'p> {
    pub fn new(program: &'p Program, rules: &'p RuleTable, options: &'p AnalysisOptions) -> Self {
        Self {
            program,
            rules,
            options,
            arena: PointerArena::new(),
            heap: HeapModel::new(),
            pfg: PointerFlowGraph::new(),
            call_graph: CallGraph::new(),
            stack: StackManager::new(),
            search: ChainSearch::new(),
            summaries: SummaryTable::new(),
            pending: FxHashMap::default(),
            worklist: VecDeque::new(),
            queued: FxHashSet::default(),
            plugins: CompositePlugin::new(),
            stats: EngineStats::default(),
        }
    }

    /// Engine with the timer and class-initializer plugins installed
    pub fn with_default_plugins(program: &'p Program, rules: &'p RuleTable, options: &'p AnalysisOptions) -> Self {
        let mut engine = Self::new(program, rules, options);
        engine.add_plugin(Box::new(AnalysisTimer::new()));
        engine.add_plugin(Box::new(ClassInitializer::new()));
        engine
    }

    pub fn add_plugin(&mut self, plugin: Box<dyn AnalysisPlugin>) {
        self.plugins.add(plugin);
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn summary(&self, method: MethodId) -> Option<Arc<MethodSummary>> {
        self.summaries.get(method)
    }

    pub fn summaries(&self) -> &SummaryTable {
        &self.summaries
    }

    pub fn call_graph(&self) -> &CallGraph {
        &self.call_graph
    }

    pub fn pointer_flow_graph(&self) -> &PointerFlowGraph {
        &self.pfg
    }

    pub fn chain_search(&self) -> &ChainSearch {
        &self.search
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.depth()
    }

    pub fn report(&self) -> ChainReport {
        self.search.report()
    }

    pub fn into_report(self) -> ChainReport {
        self.search.into_report()
    }

    // ========================================================================
    // Worklist
    // ========================================================================

    /// Queue `method` for top-level analysis unless ignored or already queued
    pub fn enqueue(&mut self, method: MethodId) {
        if self.rules.is_ignored(self.program, method) {
            return;
        }
        if self.queued.insert(method) {
            self.worklist.push_back(method);
        }
    }

    /// Analyze every entry and everything reachable from it; returns the
    /// chains found
    pub fn run(&mut self) -> ChainReport {
        let rules = self.rules;
        info!(
            "summary analysis: {} entries, {} sinks",
            rules.entries().len(),
            rules.stats.sinks
        );
        self.plugins.on_start();

        for (method, summary) in rules.seeded_summaries() {
            self.summaries.insert_once(method, summary.clone());
        }
        for &entry in rules.entries() {
            self.enqueue(entry);
        }

        while let Some(method) = self.worklist.pop_front() {
            self.queued.remove(&method);
            self.stats.worklist_polls += 1;
            if !self.summaries.contains(method) {
                self.analyze_method(method, None);
            }
        }

        self.plugins.on_finish();
        let report = self.search.report();
        info!(
            "analyzed {} methods, {} call edges, {} chains{}",
            self.stats.methods_analyzed,
            self.stats.call_edges,
            report.total(),
            if report.truncated { " (truncated)" } else { "" }
        );
        report
    }

    // ========================================================================
    // Per-method analysis
    // ========================================================================

    /// Summarize `method` now. `via` is the call edge that led here, if any.
    /// Returns whether an analysis actually ran.
    pub fn analyze_method(&mut self, method: MethodId, via: Option<CallEdgeId>) -> bool {
        if !self.is_analyzable(method) {
            return false;
        }
        let program = self.program;
        let info = program.method(method);
        let (Some(body), Some(cfg)) = (info.body.as_ref(), info.cfg()) else {
            trace!("no body: {}", info.signature);
            return false;
        };

        for first in self.plugins.on_new_method(program, self.rules, method) {
            if first != method {
                self.analyze_method(first, None);
            }
        }
        // a plugin-scheduled method may have reached this one already
        if !self.is_analyzable(method) {
            return false;
        }

        debug!("analyzing {} (depth {})", info.signature, self.stack.depth());
        // an analysis not entered through a call edge starts a path of its own
        let outer = match via {
            None if !self.stack.is_empty() => Some(std::mem::take(&mut self.stack)),
            _ => None,
        };
        if let Some(edge) = via {
            self.stack.push_edge(edge);
        }
        self.stack.push_method(method);
        self.pending.insert(method, MethodSummary::new());

        let solver = ForwardSolver::new().with_max_iterations(self.options.max_fixpoint_iterations);
        let converged = {
            let mut processor = StmtProcessor::new(self, method, body);
            let result = solver.solve(&mut processor, cfg);
            processor.complement(cfg, &result);
            result.converged
        };
        if !converged {
            warn!(
                "{} did not converge within {} iterations",
                info.signature, self.options.max_fixpoint_iterations
            );
            self.stats.not_converged += 1;
        }

        self.stack.pop_method(&self.call_graph);
        if let Some(outer) = outer {
            self.stack = outer;
        }
        let mut summary = self.pending.remove(&method).unwrap_or_default();
        if summary.is_empty() {
            summary.set_return(ContrValue::NotPolluted, None);
        }
        trace!("summary of {}: {}", info.signature, summary);
        self.summaries.insert_once(method, summary);
        self.stats.methods_analyzed += 1;
        self.replay_deferred();
        true
    }

    fn is_analyzable(&self, method: MethodId) -> bool {
        !self.rules.is_sink(method)
            && !self.summaries.contains(method)
            && !self.is_active(method)
            && !self.rules.is_ignored(self.program, method)
    }

    /// Analysis of `method` is in progress somewhere up the call chain
    pub(super) fn is_active(&self, method: MethodId) -> bool {
        self.pending.contains_key(&method)
    }

    /// Finished summary, or the partial one of a method still on the stack
    pub(super) fn summary_of(&self, method: MethodId) -> Option<Arc<MethodSummary>> {
        if let Some(done) = self.summaries.get(method) {
            return Some(done);
        }
        self.pending.get(&method).cloned().map(Arc::new)
    }

    // ========================================================================
    // Call edges
    // ========================================================================

    /// Insert `edge` into the call graph; a novel edge is routed to the
    /// chain search right away
    pub(super) fn add_call_edge(&mut self, edge: CallEdge) -> CallEdgeId {
        self.insert_call_edge(edge, false)
    }

    /// Edge whose callee is left to the worklist instead of being analyzed
    /// under it; the callee is queued
    pub(super) fn add_queued_call_edge(&mut self, edge: CallEdge) -> CallEdgeId {
        let callee = edge.callee;
        let id = self.insert_call_edge(edge, true);
        self.enqueue(callee);
        id
    }

    fn insert_call_edge(&mut self, edge: CallEdge, queued: bool) -> CallEdgeId {
        let (id, novel) = self.call_graph.add_edge(edge);
        if novel {
            self.stats.call_edges += 1;
            trace!("call edge {}", self.call_graph.edge(id));
            self.route_call_edge(id, queued);
        }
        id
    }

    fn route_call_edge(&mut self, edge: CallEdgeId, queued: bool) {
        let callee = self.call_graph.edge(edge).callee;
        let state = if self.is_active(callee) {
            CalleeState::OnStack
        } else if queued {
            CalleeState::Queued
        } else {
            CalleeState::Inline
        };
        let summaries = &self.summaries;
        let is_summarized = |m: MethodId| summaries.contains(m);
        let mut cx = SearchContext {
            program: self.program,
            rules: self.rules,
            options: self.options,
            call_graph: &mut self.call_graph,
            is_summarized: &is_summarized,
        };
        self.search.push_call_edge(&mut cx, edge, self.stack.edges(), state);
    }

    fn replay_deferred(&mut self) {
        let summaries = &self.summaries;
        let is_summarized = |m: MethodId| summaries.contains(m);
        let mut cx = SearchContext {
            program: self.program,
            rules: self.rules,
            options: self.options,
            call_graph: &mut self.call_graph,
            is_summarized: &is_summarized,
        };
        self.search.replay_deferred(&mut cx);
    }
}
