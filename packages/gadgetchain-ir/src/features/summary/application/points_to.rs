//! Demand-driven backward points-to resolution
//!
//! A query walks the in-edges of a pointer and folds what each edge kind
//! contributes into a [`PointsTo`]. Field and array loads first look for
//! aliasing stores (bounded by their if-range) and fall back to deriving the
//! value from the base. Queries already on the query stack answer empty.

use super::stmt_processor::StmtProcessor;
use crate::features::controllability::domain::{Contr, ContrValue};
use crate::features::pointer_flow::domain::{
    FlowEdgeId, FlowKind, HeapObj, ObjId, PointerId, PointerKind, Transfer,
};
use crate::features::summary::domain::PointsTo;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;

/// Synthetic field name of an array element
const ARRAY_ELEMENT: &str = "arr";
/// Compiler-generated link from an inner class to its outer instance
const OUTER_THIS: &str = "this$0";

impl StmtProcessor<'_, '_> {
    pub(super) fn find_points_to(&mut self, pointer: PointerId) -> PointsTo {
        let mut pt = PointsTo::new();
        if self.queries.contains(&pointer) {
            return pt;
        }
        self.queries.push(pointer);

        let mut worklist = VecDeque::from([pointer]);
        let mut marked = FxHashSet::default();
        marked.insert(pointer);

        while let Some(p) = worklist.pop_front() {
            if let Some(cached) = self.fact.get(p) {
                pt.add(p, Some(cached.clone()));
                continue;
            }
            let in_edges = self.engine.pfg.in_edges(p).to_vec();
            for id in in_edges {
                let edge = self.engine.pfg.edge(id).clone();
                let source = edge.source_pointer();
                match edge.kind {
                    FlowKind::New | FlowKind::NewContr => {
                        let Some(obj) = edge.source.obj() else { continue };
                        let contr = self.object_contr(p, obj);
                        pt.add(p, Some(contr));
                    }
                    FlowKind::LocalAssign | FlowKind::SummaryAssign => {
                        if let Some(src) = source {
                            if marked.insert(src) {
                                worklist.push_front(src);
                            }
                        }
                    }
                    FlowKind::Cast => {
                        let Some(src) = source else { continue };
                        let Some(from) = self.find_points_to(src).into_merged() else {
                            continue;
                        };
                        if from.is_controllable() {
                            let mut contr = self.new_contr(p);
                            for t in &edge.transfers {
                                if let Transfer::SpecialType(ty) = t {
                                    contr.set_type(ty.clone());
                                }
                            }
                            contr.set_value(from.value().clone());
                            contr.set_casted();
                            pt.add(p, Some(contr));
                        } else if from.is_new() {
                            pt.add(p, Some(from.copy_to(&self.engine.arena, Some(p), self.program)));
                        }
                    }
                    FlowKind::StaticLoad | FlowKind::StaticStore | FlowKind::InstanceStore => {
                        if let Some(src) = source {
                            let found = self.find_points_to(src);
                            pt.add_all(found);
                        }
                    }
                    FlowKind::InstanceLoad => {
                        if let Some(src) = source {
                            self.resolve_load(src, edge.line, &mut pt);
                        }
                    }
                    FlowKind::ElementStore => {
                        let Some(src) = source else { continue };
                        let mut array = self.get_or_add_contr(p);
                        if let Some(element) = self.get_contr(src) {
                            array.add_array_element(element);
                            self.update_contr(p, array.clone());
                        }
                        pt.add(p, Some(array));
                    }
                    FlowKind::Other => {
                        let Some(src) = source else { continue };
                        let Some(from) = self.get_contr(src) else { continue };
                        if !(from.is_controllable() || from.is_new() || from.const_string().is_some()) {
                            continue;
                        }
                        let mut contr = from.copy_to(&self.engine.arena, Some(p), self.program);
                        for t in &edge.transfers {
                            if let Transfer::Taint { ty, is_new } = t {
                                contr.set_type(ty.clone());
                                if *is_new {
                                    contr.set_new();
                                }
                            }
                        }
                        pt.add(p, Some(contr));
                    }
                }
            }
        }

        self.queries.pop();
        pt
    }

    /// Descriptor of a heap object flowing into `p`
    fn object_contr(&self, p: PointerId, obj: ObjId) -> Contr {
        let mut contr = self.new_contr(p);
        match self.engine.heap.get(obj) {
            HeapObj::Mock { value, ty, .. } => {
                contr.set_type(ty.clone());
                contr.set_value(value.clone());
            }
            HeapObj::Alloc { ty, .. } => {
                contr.set_type(ty.clone());
                contr.set_value(ContrValue::Fresh(ty.clone()));
                contr.set_new();
            }
        }
        contr
    }

    /// Value read from the field or array slot `source` by a load at `line`
    fn resolve_load(&mut self, source: PointerId, line: u32, pt: &mut PointsTo) {
        let (base, field_name) = match self.engine.arena.get(source).kind {
            PointerKind::InstanceField { base, field } => (base, self.program.field(field).name.clone()),
            PointerKind::ArrayIndex { base } => (base, ARRAY_ELEMENT.to_string()),
            _ => return,
        };

        // a slot already resolved in this activation answers directly
        if let Some(cached) = self.fact.get(source) {
            pt.add(source, Some(cached.clone()));
            return;
        }

        let matches = self
            .engine
            .pfg
            .match_edges(source, &self.engine.arena, self.program);
        if self.process_alias(source, &matches, line, pt) {
            return;
        }

        let mut contr = self.new_contr(source);
        if field_name == ARRAY_ELEMENT {
            contr.set_type(self.engine.arena.get(source).ty.clone());
        }
        if let Some(base_contr) = self.get_contr(base) {
            if base_contr.is_controllable() && !contr.is_transient() {
                if field_name == OUTER_THIS {
                    contr.update_value(base_contr.value());
                } else {
                    contr.update_value(&base_contr.value().with_field(&field_name));
                }
            }
        }
        pt.add(base, Some(contr));
    }

    /// Resolve `source` through stores to an aliasing location. Returns
    /// whether any store contributed.
    fn process_alias(&mut self, source: PointerId, matches: &[FlowEdgeId], line: u32, pt: &mut PointsTo) -> bool {
        let mut found = PointsTo::new();
        for &id in matches {
            let (store_source, store_target) = {
                let edge = self.engine.pfg.edge(id);
                (edge.source_pointer(), edge.target)
            };
            let Some(store_source) = store_source else { continue };
            if !self.engine.arena.same(source, store_target) {
                continue;
            }
            let cross_method = self.engine.arena.method_of(source) != self.engine.arena.method_of(store_target);
            if !cross_method {
                if let Some(end) = self.engine.pfg.if_range(id) {
                    if line >= end {
                        continue;
                    }
                }
            }
            let mut answer = self.find_points_to(store_source);
            if cross_method && answer.merged().map_or(false, |c| c.value().is_controllable_param()) {
                // a parameter of another activation is just attacker data here
                answer.set_value(ContrValue::Polluted);
            }
            found.add_all(answer);
        }
        if found.is_empty() {
            return false;
        }
        pt.add_all(found);
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{AnalysisOptions, Preset};
    use crate::features::controllability::domain::ContrValue;
    use crate::features::program::domain::JavaType;
    use crate::features::program::{ClassBuilder, MethodBuilder, Program};
    use crate::features::rules::RuleTable;
    use crate::features::summary::application::SummaryEngine;
    use crate::features::summary::domain::SummaryKey;
    use pretty_assertions::assert_eq;

    const BOX: &str = "Box";

    fn return_of(build: impl FnOnce(&mut MethodBuilder)) -> ContrValue {
        let mut m = MethodBuilder::new("f").returns("java.lang.Object");
        build(&mut m);
        let class = ClassBuilder::new(BOX)
            .field("f", "java.lang.Object")
            .field("g", "java.lang.Object")
            .transient_field("t", "java.lang.Object")
            .method(m.build())
            .build();
        let program = Program::new(vec![class]).unwrap();
        let rules = RuleTable::new();
        let options = AnalysisOptions::preset(Preset::Balanced);
        let mut engine = SummaryEngine::new(&program, &rules, &options);
        let f = program.methods().next().unwrap().id;
        engine.analyze_method(f, None);
        engine.summary(f).unwrap().get(&SummaryKey::Return).cloned().unwrap()
    }

    #[test]
    fn test_store_then_load_aliases() {
        let value = return_of(|m| {
            m.this_var(BOX);
            let p = m.param("p", "java.lang.Object");
            let obj = m.local("obj", BOX);
            let x = m.local("x", "java.lang.Object");
            m.new_obj(obj, BOX);
            m.store_field(obj, BOX, "f", p);
            m.load_field(x, obj, BOX, "f");
            m.ret(Some(x));
        });
        assert_eq!(value, ContrValue::param(0));
    }

    #[test]
    fn test_store_inside_controllable_branch_is_not_visible_after_join() {
        let value = return_of(|m| {
            m.this_var(BOX);
            let p = m.param("p", "java.lang.Object");
            let obj = m.local("obj", BOX);
            let x = m.local("x", "java.lang.Object");
            m.new_obj(obj, BOX); // 0
            m.if_goto(p, 3); // 1
            m.store_field(obj, BOX, "f", p); // 2
            m.load_field(x, obj, BOX, "f"); // 3
            m.ret(Some(x)); // 4
        });
        assert_eq!(value, ContrValue::NotPolluted);
    }

    #[test]
    fn test_field_of_this_derives_from_receiver() {
        let value = return_of(|m| {
            let this = m.this_var(BOX);
            let x = m.local("x", "java.lang.Object");
            m.load_field(x, this, BOX, "g");
            m.ret(Some(x));
        });
        assert_eq!(value, ContrValue::This(vec!["g".to_string()]));
    }

    #[test]
    fn test_cast_keeps_controllability() {
        let value = return_of(|m| {
            m.this_var(BOX);
            let p = m.param("p", "java.lang.Object");
            let s = m.local("s", "java.lang.String");
            m.cast(s, p, "java.lang.String");
            m.ret(Some(s));
        });
        assert_eq!(value, ContrValue::param(0));
    }

    // ========== EDGE CASES ==========

    #[test]
    fn test_transient_field_is_not_controllable() {
        let value = return_of(|m| {
            let this = m.this_var(BOX);
            let x = m.local("x", "java.lang.Object");
            m.load_field(x, this, BOX, "t");
            m.ret(Some(x));
        });
        assert_eq!(value, ContrValue::NotPolluted);
    }

    #[test]
    fn test_array_element_of_parameter() {
        let value = return_of(|m| {
            m.this_var(BOX);
            let arr = m.param("arr", JavaType::array_of(JavaType::object()));
            let x = m.local("x", "java.lang.Object");
            m.load_array(x, arr);
            m.ret(Some(x));
        });
        assert_eq!(value, ContrValue::Param(0, vec!["arr".to_string()]));
    }

    #[test]
    fn test_fresh_allocation_is_known_data() {
        let value = return_of(|m| {
            m.this_var(BOX);
            let obj = m.local("obj", BOX);
            m.new_obj(obj, BOX);
            m.ret(Some(obj));
        });
        assert_eq!(value, ContrValue::Fresh(JavaType::class(BOX)));
    }
}
