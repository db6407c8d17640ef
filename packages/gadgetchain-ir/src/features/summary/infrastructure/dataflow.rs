/*
 * Forward Worklist Solver
 *
 * Kildall-style iterative dataflow over a method CFG.
 *
 * Algorithm:
 * 1. out[n] = initial fact for every node; every node queued in index order
 * 2. While worklist not empty:
 *    a. Pop node n
 *    b. Meet: in[n] = boundary (entry only) ⊓ out[p] for p in preds(n)
 *    c. Transfer: out[n] = f_n(in[n])
 *    d. If out[n] changed: queue successors not already queued
 * 3. Fixpoint when the worklist drains
 *
 * The analysis owns the facts' semantics; the solver only orders the visits.
 * Transfers may have side effects (summary application, call-graph growth),
 * so a node can be visited more than once even when its in-fact is stable.
 */

use crate::features::program::Cfg;
use std::collections::VecDeque;
use tracing::warn;

/// Forward dataflow problem over statement indices
pub trait DataflowAnalysis {
    type Fact: Clone + PartialEq;

    /// In-fact of the entry node
    fn boundary_fact(&mut self) -> Self::Fact;

    /// Starting out-fact of every node
    fn initial_fact(&mut self) -> Self::Fact;

    /// Join `fact` into `target`
    fn meet_into(&mut self, fact: &Self::Fact, target: &mut Self::Fact);

    /// Compute `output` from `input` at `node`; returns whether `output`
    /// changed
    fn transfer(&mut self, node: usize, input: &Self::Fact, output: &mut Self::Fact) -> bool;
}

/// Per-node facts at the fixpoint
#[derive(Debug, Clone)]
pub struct DataflowResult<F> {
    pub in_facts: Vec<F>,
    pub out_facts: Vec<F>,
    pub iterations: usize,
    /// False when the iteration cap stopped the solver first
    pub converged: bool,
}

pub struct ForwardSolver {
    max_iterations: usize,
}

impl Default for ForwardSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ForwardSolver {
    pub fn new() -> Self {
        Self { max_iterations: 1000 }
    }

    /// Node visits allowed per node before giving up
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn solve<A: DataflowAnalysis>(&self, analysis: &mut A, cfg: &Cfg) -> DataflowResult<A::Fact> {
        let n = cfg.len();
        let boundary = analysis.boundary_fact();
        let mut in_facts: Vec<A::Fact> = Vec::with_capacity(n);
        let mut out_facts: Vec<A::Fact> = Vec::with_capacity(n);
        for _ in 0..n {
            in_facts.push(analysis.initial_fact());
            out_facts.push(analysis.initial_fact());
        }

        let mut worklist: VecDeque<usize> = (0..n).collect();
        let mut queued = vec![true; n];
        let budget = self.max_iterations.saturating_mul(n.max(1));
        let mut iterations = 0;
        let mut converged = true;

        while let Some(node) = worklist.pop_front() {
            queued[node] = false;
            iterations += 1;
            if iterations > budget {
                warn!(
                    "dataflow did not converge after {} node visits ({} nodes), keeping current facts",
                    budget, n
                );
                converged = false;
                break;
            }

            let mut input = if cfg.is_entry(node) {
                boundary.clone()
            } else {
                analysis.initial_fact()
            };
            for &pred in cfg.preds(node) {
                analysis.meet_into(&out_facts[pred], &mut input);
            }

            let changed = analysis.transfer(node, &input, &mut out_facts[node]);
            in_facts[node] = input;
            if changed {
                for &succ in cfg.succs(node) {
                    if !queued[succ] {
                        queued[succ] = true;
                        worklist.push_back(succ);
                    }
                }
            }
        }

        DataflowResult {
            in_facts,
            out_facts,
            iterations,
            converged,
        }
    }
}
