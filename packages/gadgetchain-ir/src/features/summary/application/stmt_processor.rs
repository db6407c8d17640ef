//! Statement transfer function of the summary solver
//!
//! One [`StmtProcessor`] exists per method activation. It is the
//! [`DataflowAnalysis`] the forward solver drives: every visit copies the
//! in-fact, lets the statement add pointer-flow edges (which invalidates the
//! cached entries downstream of them), and resolves calls. Points-to queries
//! live in `points_to.rs`, call handling in `invoke.rs`.

use super::engine::SummaryEngine;
use crate::features::controllability::domain::{Contr, ContrFact, ContrValue};
use crate::features::pointer_flow::domain::{
    FlowEdge, FlowEdgeId, FlowKind, FlowSource, PointerId, PointerKind, Transfer,
};
use crate::features::program::domain::{FieldRef, JavaType, MethodBody, MethodId, StmtKind, VarId};
use crate::features::program::{Cfg, Program};
use crate::features::summary::domain::{MethodSummary, SummaryKey};
use crate::features::summary::infrastructure::{DataflowAnalysis, DataflowResult};
use rustc_hash::FxHashSet;
use tracing::trace;

/// A conditional branch whose operand is controllable. Stores between the
/// branch and its target are only visible to loads before `end_line`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct IfScope {
    branch: usize,
    target: usize,
    end_line: u32,
}

pub struct StmtProcessor<'e, 'p> {
    pub(super) engine: &'e mut SummaryEngine<'p>,
    pub(super) program: &'p Program,
    pub(super) method: MethodId,
    pub(super) body: &'p MethodBody,
    pub(super) this_ptr: Option<PointerId>,
    pub(super) params: Vec<PointerId>,
    /// Fact under transformation at the current statement
    pub(super) fact: ContrFact,
    pub(super) index: usize,
    pub(super) line: u32,
    /// Points-to queries in progress, innermost last
    pub(super) queries: Vec<PointerId>,
    /// Results of reflective dispatch calls
    pub(super) reflective_results: FxHashSet<PointerId>,
    ifs: Vec<IfScope>,
}

impl<'e, 'p> StmtProcessor<'e, 'p> {
    pub fn new(engine: &'e mut SummaryEngine<'p>, method: MethodId, body: &'p MethodBody) -> Self {
        let program = engine.program;
        let this_ptr = body.this_var.map(|v| engine.arena.var(program, method, v));
        let params = body
            .params
            .iter()
            .map(|&v| engine.arena.var(program, method, v))
            .collect();
        Self {
            engine,
            program,
            method,
            body,
            this_ptr,
            params,
            fact: ContrFact::new(),
            index: 0,
            line: 0,
            queries: Vec::new(),
            reflective_results: FxHashSet::default(),
            ifs: Vec::new(),
        }
    }

    // ========================================================================
    // Fact helpers
    // ========================================================================

    pub(super) fn var(&mut self, var: VarId) -> PointerId {
        self.engine.arena.var(self.program, self.method, var)
    }

    /// Declared type; bodies are validated, so every handle is in range
    pub(super) fn var_type(&self, var: VarId) -> &'p JavaType {
        let body = self.body;
        &body.vars[var.index()].ty
    }

    /// Fresh descriptor for `p`
    pub(super) fn new_contr(&self, p: PointerId) -> Contr {
        Contr::for_pointer(&self.engine.arena, p, self.program)
    }

    /// Descriptor of `p` at the current statement, resolving it on demand.
    /// `None` for values of primitive or null type and for locations nothing
    /// flows into.
    pub(super) fn get_contr(&mut self, p: PointerId) -> Option<Contr> {
        if let Some(c) = self.fact.get(p) {
            return Some(c.clone());
        }
        if self.engine.arena.get(p).ty.is_ignored() {
            return None;
        }
        let contr = match self.const_string_of(p) {
            Some(text) => {
                let mut c = self.new_contr(p);
                c.set_const_string(text);
                c
            }
            None => self.find_points_to(p).into_merged()?,
        };
        self.update_contr(p, contr.clone());
        Some(contr)
    }

    pub(super) fn get_contr_value(&mut self, p: Option<PointerId>) -> ContrValue {
        p.and_then(|p| self.get_contr(p))
            .map(|c| c.value().clone())
            .unwrap_or_default()
    }

    /// Existing descriptor of `p`, or a fresh one recorded in the fact
    pub(super) fn get_or_add_contr(&mut self, p: PointerId) -> Contr {
        if let Some(c) = self.fact.get(p) {
            return c.clone();
        }
        let contr = self.get_contr(p).unwrap_or_else(|| self.new_contr(p));
        self.update_contr(p, contr.clone());
        contr
    }

    /// Cache `contr` for `p`; only locations of this activation are kept
    pub(super) fn update_contr(&mut self, p: PointerId, contr: Contr) {
        if self.engine.arena.method_of(p) == Some(self.method) {
            self.fact.update(p, contr);
        }
    }

    fn const_string_of(&self, p: PointerId) -> Option<String> {
        match self.engine.arena.get(p).kind {
            PointerKind::Var { method, var } => self
                .program
                .method(method)
                .body
                .as_ref()?
                .var(var)?
                .const_string
                .clone(),
            _ => None,
        }
    }

    /// Add a pointer-flow edge. A novel edge drops every cached descriptor
    /// it can reach.
    pub(super) fn add_flow_edge(&mut self, edge: FlowEdge) -> Option<FlowEdgeId> {
        let target = edge.target;
        let added = self.engine.pfg.add_edge(edge, &self.engine.arena, self.program);
        if added.is_novel() {
            for p in self.engine.pfg.forward_closure(target) {
                self.fact.remove(p);
            }
        }
        added.edge()
    }

    pub(super) fn summary_mut(&mut self) -> &mut MethodSummary {
        self.engine.pending.entry(self.method).or_default()
    }

    pub(super) fn summary_value(&self, key: &SummaryKey) -> Option<ContrValue> {
        self.engine
            .pending
            .get(&self.method)
            .and_then(|s| s.get(key))
            .cloned()
    }

    /// Raise a summary slot if `value` upgrades it
    pub(super) fn raise_summary(&mut self, key: SummaryKey, value: ContrValue) {
        let old = self.summary_value(&key);
        if ContrValue::upgrades(old.as_ref(), &value) {
            self.summary_mut().set(key, value);
        }
    }

    /// Summary key naming `p` from a caller's point of view
    pub(super) fn summary_key_of(&self, p: PointerId) -> Option<SummaryKey> {
        if Some(p) == self.this_ptr {
            return Some(SummaryKey::This);
        }
        if let Some(i) = self.params.iter().position(|&q| q == p) {
            return Some(SummaryKey::Param(i as u32));
        }
        match self.engine.arena.get(p).kind {
            PointerKind::InstanceField { base, field } if Some(base) == self.this_ptr => {
                Some(SummaryKey::ThisField(self.program.field(field).name.clone()))
            }
            _ => None,
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn process(&mut self, index: usize) {
        let body = self.body;
        let stmt = &body.stmts[index];
        self.index = index;
        self.line = stmt.line;
        match &stmt.kind {
            StmtKind::New { lhs, ty } => self.visit_new(*lhs, ty),
            StmtKind::Copy { lhs, rhs } => self.visit_copy(*lhs, *rhs),
            StmtKind::Cast { lhs, rhs, ty } => self.visit_cast(*lhs, *rhs, ty),
            StmtKind::LoadField { lhs, base, field } => self.visit_load_field(*lhs, *base, field),
            StmtKind::StoreField { base, field, rhs } => self.visit_store_field(*base, field, *rhs),
            StmtKind::LoadArray { lhs, base } => self.visit_load_array(*lhs, *base),
            StmtKind::StoreArray { base, rhs } => self.visit_store_array(*base, *rhs),
            StmtKind::If { lhs, target, .. } => self.visit_if(*lhs, *target),
            StmtKind::Return { value } => self.visit_return(*value),
            StmtKind::Invoke(inv) => self.visit_invoke(inv),
            StmtKind::Goto { .. } | StmtKind::Nop => {}
        }
    }

    fn visit_new(&mut self, lhs: VarId, ty: &JavaType) {
        let p = self.var(lhs);
        let obj = self.engine.heap.alloc(self.method, self.index, ty.clone());
        self.add_flow_edge(FlowEdge::new(FlowKind::New, FlowSource::Obj(obj), p, self.line));
    }

    fn visit_copy(&mut self, lhs: VarId, rhs: VarId) {
        if self.var_type(rhs).is_ignored() {
            return;
        }
        let (from, to) = (self.var(rhs), self.var(lhs));
        self.add_flow_edge(FlowEdge::new(FlowKind::LocalAssign, FlowSource::Pointer(from), to, self.line));
    }

    fn visit_cast(&mut self, lhs: VarId, rhs: VarId, ty: &JavaType) {
        if self.var_type(rhs).is_ignored() {
            return;
        }
        let (from, to) = (self.var(rhs), self.var(lhs));
        let edge = FlowEdge::new(FlowKind::Cast, FlowSource::Pointer(from), to, self.line)
            .with_transfer(Transfer::SpecialType(ty.clone()));
        self.add_flow_edge(edge);
    }

    fn visit_load_field(&mut self, lhs: VarId, base: Option<VarId>, field: &FieldRef) {
        if self.var_type(lhs).is_ignored() {
            return;
        }
        let Some(fid) = self.program.resolve_field(field) else {
            trace!("unresolved field {}.{}", field.declaring_class, field.name);
            return;
        };
        let to = self.var(lhs);
        let (kind, from) = match base {
            None => (FlowKind::StaticLoad, self.engine.arena.static_field(self.program, fid)),
            Some(b) => {
                let b = self.var(b);
                (FlowKind::InstanceLoad, self.engine.arena.instance_field(self.program, b, fid))
            }
        };
        self.add_flow_edge(FlowEdge::new(kind, FlowSource::Pointer(from), to, self.line));
    }

    fn visit_store_field(&mut self, base: Option<VarId>, field: &FieldRef, rhs: VarId) {
        if self.var_type(rhs).is_ignored() {
            return;
        }
        let Some(fid) = self.program.resolve_field(field) else {
            trace!("unresolved field {}.{}", field.declaring_class, field.name);
            return;
        };
        let from = self.var(rhs);
        match base {
            None => {
                let to = self.engine.arena.static_field(self.program, fid);
                self.add_flow_edge(FlowEdge::new(FlowKind::StaticStore, FlowSource::Pointer(from), to, self.line));
            }
            Some(b) => {
                let b = self.var(b);
                let to = self.engine.arena.instance_field(self.program, b, fid);
                self.add_scoped_store(from, to);
            }
        }
    }

    fn visit_load_array(&mut self, lhs: VarId, base: VarId) {
        if self.var_type(lhs).is_ignored() {
            return;
        }
        let b = self.var(base);
        let from = self.engine.arena.array_index(b);
        let to = self.var(lhs);
        self.add_flow_edge(FlowEdge::new(FlowKind::InstanceLoad, FlowSource::Pointer(from), to, self.line));
    }

    fn visit_store_array(&mut self, base: VarId, rhs: VarId) {
        if self.var_type(rhs).is_ignored() {
            return;
        }
        let from = self.var(rhs);
        let b = self.var(base);
        let slot = self.engine.arena.array_index(b);
        self.add_scoped_store(from, slot);
        // the array value itself also absorbs the element
        if let Some(origin) = self.get_contr(b).and_then(|c| c.origin()) {
            self.add_flow_edge(FlowEdge::new(FlowKind::ElementStore, FlowSource::Pointer(from), origin, self.line));
        }
    }

    fn add_scoped_store(&mut self, from: PointerId, to: PointerId) {
        let edge = FlowEdge::new(FlowKind::InstanceStore, FlowSource::Pointer(from), to, self.line);
        if let Some(id) = self.add_flow_edge(edge) {
            if let Some(end) = self.if_end() {
                self.engine.pfg.set_if_range(id, end);
            }
        }
    }

    fn visit_if(&mut self, lhs: VarId, target: usize) {
        if target <= self.index || self.ifs.iter().any(|s| s.branch == self.index) {
            return;
        }
        let p = self.var(lhs);
        let controllable = self.reflective_results.contains(&p) || self.get_contr(p).map_or(false, |c| c.is_controllable());
        if controllable {
            let end_line = self.body.stmts.get(target).map_or(u32::MAX, |s| s.line);
            self.ifs.push(IfScope {
                branch: self.index,
                target,
                end_line,
            });
        }
    }

    /// End line of the innermost controllable branch enclosing the current
    /// statement
    fn if_end(&self) -> Option<u32> {
        self.ifs
            .iter()
            .rev()
            .find(|s| s.branch < self.index && self.index < s.target)
            .map(|s| s.end_line)
    }

    fn visit_return(&mut self, value: Option<VarId>) {
        let value = value.filter(|&v| !self.var_type(v).is_ignored());
        let Some(v) = value else {
            if !self.summary_mut().contains(&SummaryKey::Return) {
                self.summary_mut().set_return(ContrValue::NotPolluted, None);
            }
            return;
        };
        let p = self.var(v);
        let (value, ty) = match self.get_contr(p) {
            Some(c) => (c.value().clone(), c.ty().cloned()),
            None => (ContrValue::NotPolluted, None),
        };
        let old = self.summary_value(&SummaryKey::Return);
        if ContrValue::upgrades(old.as_ref(), &value) {
            self.summary_mut().set_return(value, ty);
        }
    }

    // ========================================================================
    // Summary completion
    // ========================================================================

    /// Fill the summary from the exit fact: parameters that received other
    /// values, and fields of `this` the body touched
    pub fn complement(&mut self, cfg: &Cfg, result: &DataflowResult<ContrFact>) {
        let mut exit = ContrFact::new();
        for n in 0..cfg.len() {
            if cfg.succs(n).is_empty() {
                result.out_facts[n].meet_into(&mut exit);
            }
        }
        self.fact = exit;
        self.index = self.body.stmts.len();
        self.line = self.body.stmts.last().map_or(0, |s| s.line);

        for (i, p) in self.params.clone().into_iter().enumerate() {
            let in_edges = self.engine.pfg.in_edges(p).to_vec();
            if in_edges.len() <= 1 {
                continue;
            }
            for e in in_edges {
                if self.engine.pfg.edge(e).kind == FlowKind::NewContr {
                    self.engine.pfg.detach(e);
                }
            }
            self.fact.remove(p);
            let value = self.get_contr_value(Some(p));
            self.raise_summary(SummaryKey::Param(i as u32), value);
        }

        if let Some(this) = self.this_ptr {
            let program = self.program;
            for &field in program.method(self.method).used_this_fields() {
                let info = program.field(field);
                if info.ty.is_ignored() || info.is_static {
                    continue;
                }
                let fp = self.engine.arena.instance_field(program, this, field);
                let value = self.get_contr_value(Some(fp));
                self.raise_summary(SummaryKey::ThisField(info.name.clone()), value);
            }
        }
    }
}

impl DataflowAnalysis for StmtProcessor<'_, '_> {
    type Fact = ContrFact;

    /// Seeds the formals with mock objects and records every allocation
    /// up front; the entry fact itself starts empty
    fn boundary_fact(&mut self) -> ContrFact {
        self.fact = ContrFact::new();
        let seeds = self
            .params
            .iter()
            .enumerate()
            .map(|(i, &p)| (p, ContrValue::param(i as u32)))
            .chain(self.this_ptr.map(|p| (p, ContrValue::this())))
            .collect::<Vec<_>>();
        for (p, value) in seeds {
            let ty = self.engine.arena.get(p).ty.clone();
            if ty.is_ignored() {
                continue;
            }
            let obj = self.engine.heap.mock(p, value, ty);
            self.add_flow_edge(FlowEdge::new(FlowKind::NewContr, FlowSource::Obj(obj), p, 0));
        }
        let body = self.body;
        for (i, stmt) in body.stmts.iter().enumerate() {
            if let StmtKind::New { lhs, ty } = &stmt.kind {
                self.index = i;
                self.line = stmt.line;
                self.visit_new(*lhs, ty);
            }
        }
        ContrFact::new()
    }

    fn initial_fact(&mut self) -> ContrFact {
        ContrFact::new()
    }

    fn meet_into(&mut self, fact: &ContrFact, target: &mut ContrFact) {
        fact.meet_into(target);
    }

    fn transfer(&mut self, node: usize, input: &ContrFact, output: &mut ContrFact) -> bool {
        self.fact = input.clone();
        if !matches!(self.body.stmts[node].kind, StmtKind::New { .. }) {
            self.process(node);
        }
        output.copy_from(&self.fact)
    }
}
