//! Call handling: callee resolution, imitated reflection, summary application
//!
//! ```text
//! invoke ─► transfer rules? ─► taint edges, done
//!        ─► no controllable operand ─► pruned (unless string-ish / sink)
//!        ─► sink ─► edge (+ jump), done
//!        ─► callees: dispatch on exact type | CHA filtered by receiver type
//!               └─► per callee: edge, jump or analyze, then apply summary
//! ```

use super::stmt_processor::StmtProcessor;
use crate::features::call_graph::domain::{CallEdge, CallEdgeId, CallSite};
use crate::features::call_graph::{filter_cha, filter_methods, NamePattern};
use crate::features::controllability::domain::{is_any_match, Contr, ContrValue};
use crate::features::pointer_flow::domain::{FlowEdge, FlowKind, FlowSource, PointerId, PointerKind, Transfer};
use crate::features::program::domain::{CallKind, InvokeExpr, JavaType, MethodId, INIT};
use crate::features::program::TypeOracle;
use crate::features::rules::{CallerFilter, ImitatedBehavior, IndexKind, IndexRef, Jump, RESULT};
use crate::features::summary::domain::SummaryKey;
use tracing::{debug, trace};

const STRING: &str = "java.lang.String";
const OBJECT_INPUT_STREAM: &str = "java.io.ObjectInputStream";
const CLASS_NEW_INSTANCE: &str = "<java.lang.Class: java.lang.Object newInstance()>";
const TO_STRING: &str = "toString";
const GETTER: &str = "get+polluted";
const SETTER: &str = "set+polluted";

/// Call-site pointers: receiver slot first, then arguments
type SiteVars = [Option<PointerId>];

impl<'p> StmtProcessor<'_, 'p> {
    pub(super) fn visit_invoke(&mut self, inv: &'p InvokeExpr) {
        if inv.kind == CallKind::Dynamic {
            return;
        }
        let program = self.program;
        let rules = self.engine.rules;
        let Some(target) = program.resolve_method(&inv.method) else {
            trace!("unresolved call {}", inv.method);
            return;
        };
        if rules.is_ignored(program, target) {
            return;
        }

        let vars: Vec<Option<PointerId>> = inv
            .call_site_vars()
            .into_iter()
            .map(|v| v.map(|v| self.var(v)))
            .collect();
        let result = inv
            .result
            .filter(|&r| !self.var_type(r).is_ignored())
            .map(|r| self.var(r));

        if !rules.transfers(target).is_empty() {
            self.process_transfers(target, &vars, result);
            return;
        }

        let cs: Vec<ContrValue> = vars.iter().map(|&p| self.get_contr_value(p)).collect();
        if !cs.iter().any(ContrValue::is_controllable) && !self.keeps_uncontrolled_call(target) {
            return;
        }
        if let (Some(b), Some(r)) = (rules.behavior(target), result) {
            if b.is_invoke {
                self.reflective_results.insert(r);
            }
        }
        self.process_receiver(target, &vars, &cs);

        if rules.is_sink(target) {
            let cs = self.check_receiver_type(target, &vars, cs);
            self.add_call_edge(inv, target, target, &vars, cs.clone());
            if let Some(b) = rules.behavior(target) {
                self.process_behavior(inv, b, &vars, result, &cs);
            }
            return;
        }

        let callees: Vec<MethodId> = self
            .resolve_callees(inv, target, &vars, &cs)
            .into_iter()
            .filter(|&m| !rules.is_ignored(program, m))
            .collect();
        let mut summarized = Vec::with_capacity(callees.len());
        for &callee in &callees {
            let edge = self.add_call_edge(inv, target, callee, &vars, cs.clone());
            if let Some(b) = rules.behavior(callee) {
                self.process_behavior(inv, b, &vars, result, &cs);
                continue;
            }
            if !self.engine.summaries.contains(callee)
                && !rules.is_sink(callee)
                && !self.engine.is_active(callee)
                && !program.method(callee).is_native
            {
                self.engine.analyze_method(callee, Some(edge));
            }
            summarized.push(callee);
        }
        for callee in summarized {
            self.apply_summary(callee, &vars, result);
        }
    }

    // ========================================================================
    // Pruning and receivers
    // ========================================================================

    /// Calls worth resolving even when no operand is controllable
    fn keeps_uncontrolled_call(&self, target: MethodId) -> bool {
        let info = self.program.method(target);
        (!info.is_constructor() && info.param_types.iter().any(|t| t.is_class(STRING)))
            || info.name == "equals"
            || self.engine.rules.is_sink(target)
            || self.program.class(info.class).name == OBJECT_INPUT_STREAM
    }

    /// Taint the receiver of a constructor fed controllable arguments, or of
    /// a `pollute_receiver` method fed only controllable arguments
    fn process_receiver(&mut self, target: MethodId, vars: &SiteVars, cs: &[ContrValue]) {
        let Some(base) = vars.first().copied().flatten() else { return };
        if Some(base) == self.this_ptr {
            return;
        }
        let args = cs.get(1..).unwrap_or_default();
        let pollute = if self.program.method(target).is_constructor() {
            args.iter().any(ContrValue::is_controllable)
        } else {
            self.engine
                .rules
                .behavior(target)
                .map_or(false, |b| b.pollute_receiver)
                && args.iter().all(ContrValue::is_controllable)
        };
        if !pollute {
            return;
        }
        if let Some(mut contr) = self.fact.get(base).cloned() {
            contr.set_value(ContrValue::Polluted);
            self.update_contr(base, contr);
        }
    }

    /// `Class.newInstance` on a class read from a field declared with an
    /// upper bound (`Class<? extends T>`) cannot produce an arbitrary type
    fn check_receiver_type(&self, target: MethodId, vars: &SiteVars, cs: Vec<ContrValue>) -> Vec<ContrValue> {
        if self.program.signature(target) != CLASS_NEW_INSTANCE {
            return cs;
        }
        let Some(base) = vars.first().copied().flatten() else {
            return cs;
        };
        let bounded = self
            .fact
            .get(base)
            .and_then(Contr::origin)
            .map_or(false, |origin| match self.engine.arena.get(origin).kind {
                PointerKind::InstanceField { field, .. } => self
                    .program
                    .field(field)
                    .generic_signature
                    .as_deref()
                    .map_or(false, |g| g.contains("extends")),
                _ => false,
            });
        if bounded {
            debug!("bounded Class receiver at line {}", self.line);
            vec![ContrValue::NotPolluted]
        } else {
            cs
        }
    }

    // ========================================================================
    // Transfers
    // ========================================================================

    fn process_transfers(&mut self, target: MethodId, vars: &SiteVars, result: Option<PointerId>) {
        let rules = self.engine.rules;
        for rule in rules.transfers(target) {
            let (Some(from), Some(to)) = (
                self.index_pointer(rule.from, vars, result),
                self.index_pointer(rule.to, vars, result),
            ) else {
                continue;
            };
            let Some(contr) = self.get_contr(from) else { continue };
            if !(contr.is_controllable() || contr.is_new() || contr.const_string().is_some()) {
                continue;
            }
            let edge = FlowEdge::new(FlowKind::Other, FlowSource::Pointer(from), to, self.line).with_transfer(
                Transfer::Taint {
                    ty: rule.ty.clone(),
                    is_new: rule.is_new,
                },
            );
            self.add_flow_edge(edge);
        }
    }

    fn index_pointer(&mut self, index: IndexRef, vars: &SiteVars, result: Option<PointerId>) -> Option<PointerId> {
        let var = match index.index {
            RESULT => result,
            i => ImitatedBehavior::slot(i).and_then(|s| vars.get(s).copied().flatten()),
        }?;
        Some(match index.kind {
            IndexKind::Var => var,
            IndexKind::Array => self.engine.arena.array_index(var),
            IndexKind::Field(field) => self.engine.arena.instance_field(self.program, var, field),
        })
    }

    // ========================================================================
    // Callee resolution
    // ========================================================================

    fn resolve_callees(&mut self, inv: &InvokeExpr, target: MethodId, vars: &SiteVars, cs: &[ContrValue]) -> Vec<MethodId> {
        let base = match vars.first().copied().flatten() {
            Some(b) if !matches!(inv.kind, CallKind::Static | CallKind::Special) => b,
            _ => return vec![target],
        };
        let Some(contr) = self.fact.get(base).cloned() else {
            return self.cha_or_target(inv, target);
        };
        let ty = self.runtime_type(Some(base));
        if !contr.is_controllable() || contr.is_new() {
            return vec![self.program.resolve_dispatch(&ty, &inv.method).unwrap_or(target)];
        }

        let candidates = self.cha_or_target(inv, target);
        if candidates.len() <= 1 {
            return candidates;
        }
        let callees = filter_cha(
            self.program,
            &candidates,
            &ty,
            self.engine.options.filter_non_serializable,
        );
        if inv.kind == CallKind::Interface && contr.value().is_call_site() && !contr.is_casted() {
            self.process_dynamic_proxy(inv, cs);
        }
        callees
    }

    fn cha_or_target(&self, inv: &InvokeExpr, target: MethodId) -> Vec<MethodId> {
        let targets = self.program.cha_targets(&inv.method);
        if targets.is_empty() {
            vec![target]
        } else {
            targets
        }
    }

    /// A controllable interface receiver may be a `java.lang.reflect.Proxy`:
    /// every `InvocationHandler.invoke` becomes reachable
    fn process_dynamic_proxy(&mut self, inv: &InvokeExpr, cs: &[ContrValue]) {
        let receiver = cs.first().cloned().unwrap_or_default();
        let arg = cs
            .iter()
            .skip(1)
            .find(|v| v.is_controllable())
            .cloned()
            .unwrap_or_default();
        for handler in self.program.invocation_handlers() {
            let vector = vec![receiver.clone(), receiver.clone(), ContrValue::NotPolluted, arg.clone()];
            self.add_jump_edge(inv, handler, vector, None);
        }
    }

    // ========================================================================
    // Call edges
    // ========================================================================

    /// Type the call-graph will see for a call-site slot
    fn runtime_type(&self, p: Option<PointerId>) -> JavaType {
        match p {
            None => JavaType::Null,
            Some(p) => self
                .fact
                .get(p)
                .and_then(|c| c.ty().cloned())
                .unwrap_or_else(|| self.engine.arena.get(p).ty.clone()),
        }
    }

    fn add_call_edge(
        &mut self,
        inv: &InvokeExpr,
        target: MethodId,
        callee: MethodId,
        vars: &SiteVars,
        vector: Vec<ContrValue>,
    ) -> CallEdgeId {
        let behavior = self.engine.rules.behavior(target);
        let arg_types = vars.iter().map(|&p| self.runtime_type(p)).collect();
        let edge = CallEdge::new(
            inv.kind,
            CallSite {
                caller: self.method,
                stmt: self.index,
            },
            callee,
            vector,
            self.line,
        )
        .with_arg_types(arg_types)
        .with_invoked_name(inv.method.name.clone())
        .with_filter(behavior.and_then(|b| b.filter.clone()))
        .skipping_type_check(behavior.is_some());
        self.engine.add_call_edge(edge)
    }

    /// Edge synthesized by a reflective jump or a proxy handler. The callee's
    /// own declaration stands in for the argument types; the callee is left
    /// to the worklist.
    fn add_jump_edge(
        &mut self,
        inv: &InvokeExpr,
        callee: MethodId,
        vector: Vec<ContrValue>,
        filter: Option<CallerFilter>,
    ) -> CallEdgeId {
        let info = self.program.method(callee);
        let kind = if info.is_static {
            CallKind::Static
        } else if info.is_constructor() {
            CallKind::Special
        } else {
            CallKind::Virtual
        };
        let arg_types = std::iter::once(self.program.class(info.class).class_type())
            .chain(info.param_types.iter().cloned())
            .collect();
        let edge = CallEdge::new(
            kind,
            CallSite {
                caller: self.method,
                stmt: self.index,
            },
            callee,
            vector,
            self.line,
        )
        .with_arg_types(arg_types)
        .with_invoked_name(inv.method.name.clone())
        .with_filter(filter)
        .skipping_type_check(true);
        self.engine.add_queued_call_edge(edge)
    }

    // ========================================================================
    // Imitated behaviors
    // ========================================================================

    fn process_behavior(
        &mut self,
        inv: &InvokeExpr,
        behavior: &ImitatedBehavior,
        vars: &SiteVars,
        result: Option<PointerId>,
        cs: &[ContrValue],
    ) {
        let Some(jump) = behavior.jump else { return };
        let from_slot = ImitatedBehavior::slot(behavior.from);
        let from_ptr = from_slot.and_then(|s| vars.get(s).copied().flatten());
        let from_value = from_slot.and_then(|s| cs.get(s)).cloned().unwrap_or_default();
        trace!("imitating {} at line {}", jump, self.line);

        match jump {
            Jump::Constructor => self.jump_to_constructors(inv, behavior, from_ptr, cs),
            Jump::ClassInit => self.jump_to_class_initializer(inv, behavior, from_ptr),
            Jump::Inference => self.jump_by_name(inv, behavior, vars, cs, &from_value),
            Jump::Get | Jump::Set => {
                let Some(r) = result else { return };
                if !from_value.is_controllable() {
                    return;
                }
                let mut contr = self.get_or_add_contr(r);
                contr.set_value(ContrValue::from(if jump == Jump::Get { GETTER } else { SETTER }));
                self.update_contr(r, contr);
            }
            Jump::ToString => self.jump_to_string(inv, behavior, from_ptr, &from_value),
        }
    }

    /// Every constructor a value of the `from` location's declared type can
    /// run; each parameter receives the first argument's controllability
    fn jump_to_constructors(
        &mut self,
        inv: &InvokeExpr,
        behavior: &ImitatedBehavior,
        from: Option<PointerId>,
        cs: &[ContrValue],
    ) {
        let Some(from) = from else { return };
        let Some(contr) = self.get_contr(from) else { return };
        let ty = contr
            .origin()
            .map(|o| self.engine.arena.get(o).ty.clone())
            .or_else(|| contr.ty().cloned())
            .unwrap_or_else(JavaType::object);
        let receiver = cs.first().cloned().unwrap_or_default();
        let arg = cs.get(1).cloned().unwrap_or_default();
        let inits = filter_methods(
            self.program,
            &NamePattern::Exact(INIT.to_string()),
            &ty,
            None,
            self.engine.options.filter_non_serializable,
        );
        for init in inits {
            let arity = self.program.method(init).arity();
            let mut vector = vec![receiver.clone()];
            vector.extend(std::iter::repeat(arg.clone()).take(arity));
            self.add_jump_edge(inv, init, vector, behavior.filter.clone());
        }
    }

    /// `<clinit>` of the class named by a constant string
    fn jump_to_class_initializer(&mut self, inv: &InvokeExpr, behavior: &ImitatedBehavior, from: Option<PointerId>) {
        let Some(name) = from
            .and_then(|p| self.get_contr(p))
            .and_then(|c| c.const_string().map(str::to_string))
        else {
            return;
        };
        let Some(clinit) = self
            .program
            .class_by_name(&name)
            .and_then(|c| self.program.class_initializer(c))
        else {
            return;
        };
        self.add_jump_edge(inv, clinit, vec![ContrValue::NotPolluted], behavior.filter.clone());
    }

    /// `Method.invoke`: methods whose name matches the controllable name
    /// value, called on the reflective receiver with the array's elements
    fn jump_by_name(
        &mut self,
        inv: &InvokeExpr,
        behavior: &ImitatedBehavior,
        vars: &SiteVars,
        cs: &[ContrValue],
        name: &ContrValue,
    ) {
        let regex = name.to_regex();
        if regex.is_empty() || is_any_match(&regex) {
            return;
        }
        debug!("possible method name regex {}", regex);

        let receiver_slot = ImitatedBehavior::slot(behavior.receiver);
        let receiver_ptr = receiver_slot.and_then(|s| vars.get(s).copied().flatten());
        let receiver_value = receiver_slot.and_then(|s| cs.get(s)).cloned().unwrap_or_default();
        let params_ptr = ImitatedBehavior::slot(behavior.params).and_then(|s| vars.get(s).copied().flatten());
        let elements: Vec<Contr> = params_ptr
            .and_then(|p| self.fact.get(p))
            .map(|c| c.array_elements().to_vec())
            .unwrap_or_default();

        let mut vector = vec![receiver_value];
        vector.extend(elements.iter().map(|e| e.value().clone()));
        let arg_types: Vec<JavaType> = elements
            .iter()
            .map(|e| e.ty().cloned().unwrap_or_else(JavaType::object))
            .collect();
        let receiver_ty = self.runtime_type(receiver_ptr);

        let callees = filter_methods(
            self.program,
            &NamePattern::new(&regex),
            &receiver_ty,
            Some(&arg_types),
            self.engine.options.filter_non_serializable,
        );
        for callee in callees {
            self.add_jump_edge(inv, callee, vector.clone(), behavior.filter.clone());
        }
    }

    /// String conversion of a controllable value reaches every `toString`
    /// its runtime type can dispatch to
    fn jump_to_string(
        &mut self,
        inv: &InvokeExpr,
        behavior: &ImitatedBehavior,
        from: Option<PointerId>,
        value: &ContrValue,
    ) {
        if !value.is_controllable() {
            return;
        }
        let Some(contr) = from.and_then(|p| self.fact.get(p)).cloned() else {
            return;
        };
        let ty = self.contr_type(&contr);
        let callees = filter_methods(
            self.program,
            &NamePattern::Exact(TO_STRING.to_string()),
            &ty,
            Some(&[]),
            self.engine.options.filter_non_serializable,
        );
        for callee in callees {
            self.add_jump_edge(inv, callee, vec![value.clone()], behavior.filter.clone());
        }
    }

    /// Type of a value; for arrays, the most general type among the stored
    /// elements (or the declared element type)
    fn contr_type(&self, contr: &Contr) -> JavaType {
        let ty = contr.ty().cloned().unwrap_or_else(JavaType::object);
        let Some(declared) = ty.element_type() else {
            return ty;
        };
        let mut widest: Option<JavaType> = None;
        for element in contr.array_elements() {
            let Some(ety) = element.ty() else { continue };
            match &widest {
                Some(w) if !self.program.is_subtype(w, ety) => {}
                _ => widest = Some(ety.clone()),
            }
        }
        widest.unwrap_or_else(|| declared.clone())
    }

    // ========================================================================
    // Summary application
    // ========================================================================

    /// Rewrite the callee's summary into this frame: its return value into
    /// the result, its side effects into receiver, arguments and fields
    fn apply_summary(&mut self, callee: MethodId, vars: &SiteVars, result: Option<PointerId>) {
        let summary = self.engine.summary_of(callee);
        let empty = summary.as_ref().map_or(true, |s| s.is_empty());
        if self.engine.is_active(callee) && empty {
            // recursion: assume the worst for the pending result
            if let Some(r) = result {
                let mut contr = self.get_or_add_contr(r);
                contr.set_value(ContrValue::Polluted);
                self.update_contr(r, contr);
            }
        }
        let Some(summary) = summary else { return };

        for (key, value) in summary.iter() {
            match key {
                SummaryKey::Return => {
                    let Some(r) = result else { continue };
                    let mut ret = self.get_or_add_contr(r);
                    if !ContrValue::upgrades(Some(ret.value()), value) {
                        continue;
                    }
                    if let Some(ty) = summary.return_type() {
                        ret.set_type(ty.clone());
                    }
                    if value.is_call_site() {
                        let from = self.call_site_contr(value, vars);
                        ret.update_value(from.value());
                        if let Some(origin) = from.origin() {
                            if let PointerKind::ArrayIndex { base } = self.engine.arena.get(origin).kind {
                                self.add_flow_edge(FlowEdge::new(
                                    FlowKind::SummaryAssign,
                                    FlowSource::Pointer(base),
                                    r,
                                    self.line,
                                ));
                            }
                        }
                    } else {
                        ret.set_value(value.clone());
                    }
                    self.update_contr(r, ret);
                }
                key => self.apply_side_effect(key, value, vars),
            }
        }
    }

    fn apply_side_effect(&mut self, key: &SummaryKey, value: &ContrValue, vars: &SiteVars) {
        let mut to = self.call_site_contr(&key.as_value(), vars);
        let origin = to.origin();
        if value.is_call_site() {
            let from = self.call_site_contr(value, vars);
            to.update_value(from.value());
            self.pollute_base(&to);
            if let (Some(src), Some(dst)) = (from.origin(), origin) {
                if self.engine.arena.method_of(dst) == Some(self.method) {
                    self.add_flow_edge(FlowEdge::new(
                        FlowKind::SummaryAssign,
                        FlowSource::Pointer(src),
                        dst,
                        self.line,
                    ));
                }
            }
            // the caller now exposes the same effect to its own callers
            if let Some(k) = origin.and_then(|o| self.summary_key_of(o)) {
                self.raise_summary(k, from.value().clone());
            }
        } else if *value == ContrValue::Polluted {
            to.set_value(ContrValue::Polluted);
            if let Some(o) = origin {
                let ty = self.engine.arena.get(o).ty.clone();
                let obj = self.engine.heap.mock(o, ContrValue::Polluted, ty);
                self.add_flow_edge(FlowEdge::new(FlowKind::NewContr, FlowSource::Obj(obj), o, self.line));
            }
        } else {
            to.set_value(value.clone());
            if let Some(k) = origin.and_then(|o| self.summary_key_of(o)) {
                self.raise_summary(k, value.clone());
            }
        }
        if let Some(o) = origin {
            self.update_contr(o, to);
        }
    }

    /// Descriptor of the caller-side location a callee-relative value names
    fn call_site_contr(&mut self, value: &ContrValue, vars: &SiteVars) -> Contr {
        let (origin, caller_value) = match value {
            ContrValue::This(path) => {
                let Some(base) = vars.first().copied().flatten() else {
                    return Contr::detached();
                };
                let base_value = self.get_contr_value(Some(base));
                match path.first() {
                    None => (base, base_value),
                    Some(name) => {
                        let base_ty = self.engine.arena.get(base).ty.clone();
                        let Some(field) = self.program.field_of_type(&base_ty, name) else {
                            return Contr::detached();
                        };
                        let origin = self.engine.arena.instance_field(self.program, base, field);
                        let v = if base_value.is_controllable() {
                            base_value.with_field(name)
                        } else {
                            base_value
                        };
                        (origin, v)
                    }
                }
            }
            ContrValue::Param(i, path) => {
                let Some(origin) = vars.get(*i as usize + 1).copied().flatten() else {
                    return Contr::detached();
                };
                if self.engine.arena.get(origin).ty.is_ignored() {
                    return Contr::detached();
                }
                if let Some(mut existing) = self.fact.get(origin).cloned() {
                    let rebased = path
                        .iter()
                        .fold(existing.value().clone(), |v, f| if v.is_controllable() { v.with_field(f) } else { v });
                    existing.set_value(rebased);
                    self.fact.remove(origin);
                    return existing;
                }
                (origin, ContrValue::NotPolluted)
            }
            ContrValue::Polluted => {
                let mut contr = Contr::detached();
                contr.set_value(ContrValue::Polluted);
                return contr;
            }
            _ => return Contr::detached(),
        };
        if let Some(existing) = self.fact.get(origin) {
            return existing.clone();
        }
        let mut contr = self.new_contr(origin);
        if !contr.is_transient() {
            contr.set_value(caller_value);
        }
        contr
    }

    /// A controllable value written into a field of an uncontrolled object
    /// makes the object itself attacker-shaped
    fn pollute_base(&mut self, to: &Contr) {
        let Some(origin) = to.origin() else { return };
        let PointerKind::InstanceField { base, .. } = self.engine.arena.get(origin).kind else {
            return;
        };
        if !to.is_controllable() {
            return;
        }
        let base_controllable = self.get_contr(base).map_or(false, |c| c.is_controllable());
        if base_controllable {
            return;
        }
        if let Some(mut contr) = self.fact.get(base).cloned() {
            contr.set_value(ContrValue::Polluted);
            self.fact.update(base, contr);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{AnalysisOptions, Preset};
    use crate::features::controllability::domain::ContrValue;
    use crate::features::program::domain::{JavaType, MethodRef};
    use crate::features::program::{ClassBuilder, MethodBuilder, Program};
    use crate::features::rules::{ImitatedBehavior, IndexRef, Jump, RuleTable, TransferRule};
    use crate::features::summary::application::SummaryEngine;
    use crate::features::summary::domain::SummaryKey;
    use pretty_assertions::assert_eq;

    const OBJ: &str = "java.lang.Object";
    const HOLDER: &str = "Holder";

    fn mref(class: &str, name: &str, params: &[&str], ret: &str) -> MethodRef {
        MethodRef::new(
            class,
            name,
            params.iter().map(|p| JavaType::from(*p)).collect(),
            JavaType::from(ret),
        )
    }

    fn options() -> AnalysisOptions {
        AnalysisOptions::preset(Preset::Balanced)
    }

    fn sig(p: &Program, s: &str) -> crate::features::program::domain::MethodId {
        p.method_by_signature(s).unwrap()
    }

    /// `Holder.set(p)` stores into `this.value`; `Holder.use(p)` calls it
    fn setter_program() -> Program {
        let mut set = MethodBuilder::new("set");
        let this = set.this_var(HOLDER);
        let p = set.param("p", OBJ);
        set.store_field(this, HOLDER, "value", p);
        set.ret(None);

        let mut use_ = MethodBuilder::new("use");
        let this = use_.this_var(HOLDER);
        let p = use_.param("p", OBJ);
        use_.invoke_virtual(None, this, mref(HOLDER, "set", &[OBJ], "void"), &[p]);
        use_.ret(None);

        let holder = ClassBuilder::new(HOLDER)
            .field("value", OBJ)
            .method(set.build())
            .method(use_.build())
            .build();
        Program::new(vec![holder]).unwrap()
    }

    #[test]
    fn test_setter_summary_propagates_to_caller() {
        let program = setter_program();
        let rules = RuleTable::new();
        let options = options();
        let mut engine = SummaryEngine::new(&program, &rules, &options);
        let use_ = sig(&program, "<Holder: void use(java.lang.Object)>");
        engine.analyze_method(use_, None);

        let set = sig(&program, "<Holder: void set(java.lang.Object)>");
        assert_eq!(
            engine.summary(set).unwrap().get(&SummaryKey::ThisField("value".into())),
            Some(&ContrValue::param(0))
        );
        assert_eq!(
            engine.summary(use_).unwrap().get(&SummaryKey::ThisField("value".into())),
            Some(&ContrValue::param(0))
        );
    }

    #[test]
    fn test_transfer_rule_moves_taint_into_result() {
        const SB: &str = "java.lang.StringBuilder";
        let append = MethodBuilder::new("append")
            .param_type("java.lang.String")
            .returns(SB)
            .native_()
            .build();
        let builder = ClassBuilder::new(SB).method(append).build();

        let mut f = MethodBuilder::new("f").returns(SB);
        f.this_var(HOLDER);
        let s = f.param("s", "java.lang.String");
        let sb = f.local("sb", SB);
        let out = f.local("out", SB);
        f.new_obj(sb, SB);
        f.invoke_virtual(Some(out), sb, mref(SB, "append", &["java.lang.String"], SB), &[s]);
        f.ret(Some(out));
        let holder = ClassBuilder::new(HOLDER).method(f.build()).build();
        let program = Program::new(vec![builder, holder]).unwrap();

        let mut rules = RuleTable::new();
        rules.add_transfer(
            sig(&program, "<java.lang.StringBuilder: java.lang.StringBuilder append(java.lang.String)>"),
            TransferRule {
                from: IndexRef::var(0),
                to: IndexRef::var(crate::features::rules::RESULT),
                ty: JavaType::from(SB),
                is_new: false,
            },
        );
        let options = options();
        let mut engine = SummaryEngine::new(&program, &rules, &options);
        let f = sig(&program, "<Holder: java.lang.StringBuilder f(java.lang.String)>");
        engine.analyze_method(f, None);
        assert_eq!(
            engine.summary(f).unwrap().get(&SummaryKey::Return),
            Some(&ContrValue::param(0))
        );
    }

    #[test]
    fn test_getter_jump_marks_result() {
        const BEANS: &str = "Beans";
        let get = MethodBuilder::new("read")
            .param_type(OBJ)
            .returns(OBJ)
            .static_()
            .native_()
            .build();
        let beans = ClassBuilder::new(BEANS).method(get).build();

        let mut f = MethodBuilder::new("f").returns(OBJ);
        f.this_var(HOLDER);
        let p = f.param("p", OBJ);
        let r = f.local("r", OBJ);
        f.invoke_static(Some(r), mref(BEANS, "read", &[OBJ], OBJ), &[p]);
        f.ret(Some(r));
        let holder = ClassBuilder::new(HOLDER).method(f.build()).build();
        let program = Program::new(vec![beans, holder]).unwrap();

        let mut rules = RuleTable::new();
        rules.add_behavior(
            sig(&program, "<Beans: java.lang.Object read(java.lang.Object)>"),
            ImitatedBehavior {
                jump: Some(Jump::Get),
                from: 0,
                ..ImitatedBehavior::default()
            },
        );
        let options = options();
        let mut engine = SummaryEngine::new(&program, &rules, &options);
        let f = sig(&program, "<Holder: java.lang.Object f(java.lang.Object)>");
        engine.analyze_method(f, None);
        assert_eq!(
            engine.summary(f).unwrap().get(&SummaryKey::Return),
            Some(&ContrValue::from("get+polluted"))
        );
    }

    // ========== EDGE CASES ==========

    #[test]
    fn test_uncontrolled_call_is_pruned() {
        let mut callee = MethodBuilder::new("g");
        callee.this_var(HOLDER);
        callee.ret(None);

        let mut f = MethodBuilder::new("f");
        f.this_var(HOLDER);
        let local = f.local("h", HOLDER);
        f.new_obj(local, HOLDER);
        f.invoke_virtual(None, local, mref(HOLDER, "g", &[], "void"), &[]);
        f.ret(None);
        let holder = ClassBuilder::new(HOLDER).method(callee.build()).method(f.build()).build();
        let program = Program::new(vec![holder]).unwrap();

        let rules = RuleTable::new();
        let options = options();
        let mut engine = SummaryEngine::new(&program, &rules, &options);
        engine.analyze_method(sig(&program, "<Holder: void f()>"), None);
        assert_eq!(engine.call_graph().len(), 0);
        assert!(engine.summary(sig(&program, "<Holder: void g()>")).is_none());
    }

    #[test]
    fn test_recursive_call_pollutes_result() {
        let mut f = MethodBuilder::new("f").returns(OBJ);
        let this = f.this_var(HOLDER);
        let p = f.param("p", OBJ);
        let r = f.local("r", OBJ);
        f.invoke_virtual(Some(r), this, mref(HOLDER, "f", &[OBJ], OBJ), &[p]);
        f.ret(Some(r));
        let holder = ClassBuilder::new(HOLDER).method(f.build()).build();
        let program = Program::new(vec![holder]).unwrap();

        let rules = RuleTable::new();
        let options = options();
        let mut engine = SummaryEngine::new(&program, &rules, &options);
        let f = sig(&program, "<Holder: java.lang.Object f(java.lang.Object)>");
        assert!(engine.analyze_method(f, None));
        assert_eq!(
            engine.summary(f).unwrap().get(&SummaryKey::Return),
            Some(&ContrValue::Polluted)
        );
    }
}
