//! Abstract storage locations
//!
//! Pointers live in a [`PointerArena`] and are referred to by [`PointerId`].
//! Field and array pointers hold the id of their base variable, never a
//! reference, so `a.next = a` style cycles are plain integers.
//!
//! Interning is structural: asking twice for `obj.f` in the same method yields
//! the same id.

use crate::features::program::domain::{FieldId, JavaType, MethodId, VarId};
use crate::features::program::Program;
use rustc_hash::FxHashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointerId(pub u32);

impl PointerId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PointerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerKind {
    /// Local variable of one method activation
    Var { method: MethodId, var: VarId },
    InstanceField { base: PointerId, field: FieldId },
    StaticField { field: FieldId },
    /// All elements of the array held by `base`
    ArrayIndex { base: PointerId },
}

#[derive(Debug, Clone)]
pub struct Pointer {
    pub kind: PointerKind,
    /// Declared type of the location
    pub ty: JavaType,
    /// Owning method; `None` for static fields
    pub method: Option<MethodId>,
    /// Human-readable name, e.g. `%this.name` or `arr[*]`
    pub name: String,
    /// Variable pointer for the receiver of its method
    pub is_this: bool,
    /// Field pointer whose field is declared `transient`
    pub is_transient: bool,
}

#[derive(Debug, Default)]
pub struct PointerArena {
    pointers: Vec<Pointer>,
    index: FxHashMap<PointerKind, PointerId>,
}

impl PointerArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pointers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }

    pub fn get(&self, id: PointerId) -> &Pointer {
        &self.pointers[id.index()]
    }

    pub fn lookup(&self, kind: &PointerKind) -> Option<PointerId> {
        self.index.get(kind).copied()
    }

    fn intern(&mut self, kind: PointerKind, make: impl FnOnce(&Self) -> Pointer) -> PointerId {
        if let Some(&id) = self.index.get(&kind) {
            return id;
        }
        let pointer = make(self);
        let id = PointerId(self.pointers.len() as u32);
        self.pointers.push(pointer);
        self.index.insert(kind, id);
        id
    }

    /// Variable `var` of `method`.
    ///
    /// Unknown variables (outside the body) get type `java.lang.Object`.
    pub fn var(&mut self, program: &Program, method: MethodId, var: VarId) -> PointerId {
        let kind = PointerKind::Var { method, var };
        self.intern(kind, |_| {
            let body = program.method(method).body.as_ref();
            let decl = body.and_then(|b| b.var(var));
            Pointer {
                kind,
                ty: decl.map(|d| d.ty.clone()).unwrap_or_else(JavaType::object),
                method: Some(method),
                name: decl.map(|d| d.name.clone()).unwrap_or_else(|| var.to_string()),
                is_this: body.map_or(false, |b| b.is_this(var)),
                is_transient: false,
            }
        })
    }

    pub fn instance_field(&mut self, program: &Program, base: PointerId, field: FieldId) -> PointerId {
        let kind = PointerKind::InstanceField { base, field };
        self.intern(kind, |arena| {
            let info = program.field(field);
            let owner = arena.get(base);
            Pointer {
                kind,
                ty: info.ty.clone(),
                method: owner.method,
                name: format!("{}.{}", owner.name, info.name),
                is_this: false,
                is_transient: info.is_transient,
            }
        })
    }

    pub fn static_field(&mut self, program: &Program, field: FieldId) -> PointerId {
        let kind = PointerKind::StaticField { field };
        self.intern(kind, |_| {
            let info = program.field(field);
            Pointer {
                kind,
                ty: info.ty.clone(),
                method: None,
                name: format!("<{}: {}>", program.class(info.class).name, info.name),
                is_this: false,
                is_transient: info.is_transient,
            }
        })
    }

    pub fn array_index(&mut self, base: PointerId) -> PointerId {
        let kind = PointerKind::ArrayIndex { base };
        self.intern(kind, |arena| {
            let owner = arena.get(base);
            Pointer {
                kind,
                ty: owner
                    .ty
                    .element_type()
                    .cloned()
                    .unwrap_or_else(JavaType::object),
                method: owner.method,
                name: format!("{}[*]", owner.name),
                is_this: false,
                is_transient: false,
            }
        })
    }

    /// Base variable of a field or array pointer
    pub fn base_of(&self, id: PointerId) -> Option<PointerId> {
        match self.get(id).kind {
            PointerKind::InstanceField { base, .. } | PointerKind::ArrayIndex { base } => Some(base),
            _ => None,
        }
    }

    pub fn field_of(&self, id: PointerId) -> Option<FieldId> {
        match self.get(id).kind {
            PointerKind::InstanceField { field, .. } | PointerKind::StaticField { field } => {
                Some(field)
            }
            _ => None,
        }
    }

    pub fn method_of(&self, id: PointerId) -> Option<MethodId> {
        self.get(id).method
    }

    /// Structural sameness used by alias matching.
    ///
    /// Identical ids match. Two field pointers match on the same field with
    /// the same base; two array pointers match on the same base. Bases are
    /// the same if identical or both are the receiver of a method on the same
    /// declared type (the receiver of different activations).
    pub fn same(&self, a: PointerId, b: PointerId) -> bool {
        if a == b {
            return true;
        }
        match (self.get(a).kind, self.get(b).kind) {
            (
                PointerKind::InstanceField { base: b1, field: f1 },
                PointerKind::InstanceField { base: b2, field: f2 },
            ) => f1 == f2 && self.same_base(b1, b2),
            (PointerKind::ArrayIndex { base: b1 }, PointerKind::ArrayIndex { base: b2 }) => {
                self.same_base(b1, b2)
            }
            _ => false,
        }
    }

    fn same_base(&self, a: PointerId, b: PointerId) -> bool {
        if a == b {
            return true;
        }
        let (pa, pb) = (self.get(a), self.get(b));
        pa.is_this && pb.is_this && pa.ty == pb.ty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::program::{ClassBuilder, MethodBuilder};

    fn program() -> (Program, MethodId, MethodId) {
        let mut get = MethodBuilder::new("get");
        get.this_var("Node");
        get.ret(None);
        let mut set = MethodBuilder::new("set");
        set.this_var("Node");
        set.param("items", "java.lang.Object[]");
        set.ret(None);
        let node = ClassBuilder::new("Node")
            .field("next", "Node")
            .transient_field("cache", "java.lang.Object")
            .method(get.build())
            .method(set.build())
            .build();
        let p = Program::new(vec![node]).unwrap();
        let get = p.method_by_signature("<Node: void get()>").unwrap();
        let set = p.method_by_signature("<Node: void set(java.lang.Object[])>").unwrap();
        (p, get, set)
    }

    #[test]
    fn test_interning_is_structural() {
        let (p, get, _) = program();
        let mut arena = PointerArena::new();
        let this = arena.var(&p, get, VarId(0));
        let next = p.field_of_type(&JavaType::from("Node"), "next").unwrap();
        let a = arena.instance_field(&p, this, next);
        let b = arena.instance_field(&p, this, next);
        assert_eq!(a, b);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(a).name, "%this.next");
        assert_eq!(arena.base_of(a), Some(this));
        assert_eq!(arena.method_of(a), Some(get));
    }

    #[test]
    fn test_receivers_of_different_activations_are_same_base() {
        let (p, get, set) = program();
        let mut arena = PointerArena::new();
        let next = p.field_of_type(&JavaType::from("Node"), "next").unwrap();
        let this_get = arena.var(&p, get, VarId(0));
        let this_set = arena.var(&p, set, VarId(0));
        let f1 = arena.instance_field(&p, this_get, next);
        let f2 = arena.instance_field(&p, this_set, next);
        assert_ne!(f1, f2);
        assert!(arena.same(f1, f2));
    }

    #[test]
    fn test_array_index_and_transient() {
        let (p, _, set) = program();
        let mut arena = PointerArena::new();
        let items = arena.var(&p, set, VarId(1));
        let elems = arena.array_index(items);
        assert_eq!(arena.get(elems).ty, JavaType::object());
        assert_eq!(arena.get(elems).name, "items[*]");

        let this = arena.var(&p, set, VarId(0));
        let cache = p.field_of_type(&JavaType::from("Node"), "cache").unwrap();
        let cached = arena.instance_field(&p, this, cache);
        assert!(arena.get(cached).is_transient);
    }

    // ========== EDGE CASES ==========

    #[test]
    fn test_non_receiver_bases_do_not_alias() {
        let (p, _, set) = program();
        let mut arena = PointerArena::new();
        let this = arena.var(&p, set, VarId(0));
        let items = arena.var(&p, set, VarId(1));
        let a = arena.array_index(this);
        let b = arena.array_index(items);
        assert!(!arena.same(a, b));
    }
}
