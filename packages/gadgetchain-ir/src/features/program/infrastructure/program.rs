//! Indexed program model and class-hierarchy oracle
//!
//! [`Program::new`] assigns integer ids, validates bodies (branch targets and
//! variable handles), precomputes ancestor sets for O(1) subtype checks and
//! builds one [`Cfg`] per concrete method.
//!
//! Classes referenced but not declared (library types the frontend did not
//! load) are known by name only: they are subtypes of themselves and of
//! `java.lang.Object`, and never dispatch.

use super::cfg::Cfg;
use crate::errors::{GadgetError, Result};
use crate::features::program::domain::signature::{signature, subsignature};
use crate::features::program::domain::types::{
    CLONEABLE, INVOCATION_HANDLER, OBJECT, SERIALIZABLE,
};
use crate::features::program::domain::{
    ClassDecl, ClassId, FieldId, FieldRef, JavaType, MethodBody, MethodId, MethodRef, StmtKind,
    CLINIT, INIT,
};
use crate::features::program::ports::TypeOracle;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;
use std::path::Path;

const INVOCATION_HANDLER_INVOKE: &str =
    "java.lang.Object invoke(java.lang.Object,java.lang.reflect.Method,java.lang.Object[])";

#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub id: ClassId,
    pub name: String,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub is_interface: bool,
    pub is_abstract: bool,
    pub fields: Vec<FieldId>,
    pub methods: Vec<MethodId>,
    ancestors: FxHashSet<String>,
}

impl ClassInfo {
    pub fn is_concrete(&self) -> bool {
        !self.is_interface && !self.is_abstract
    }

    pub fn class_type(&self) -> JavaType {
        JavaType::class(self.name.clone())
    }
}

#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub id: FieldId,
    pub class: ClassId,
    pub name: String,
    pub ty: JavaType,
    pub is_static: bool,
    pub is_transient: bool,
    pub generic_signature: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub id: MethodId,
    pub class: ClassId,
    pub name: String,
    pub param_types: Vec<JavaType>,
    pub return_type: JavaType,
    pub is_static: bool,
    pub is_private: bool,
    pub is_abstract: bool,
    pub is_native: bool,
    pub body: Option<MethodBody>,
    pub signature: String,
    pub subsignature: String,
    cfg: Option<Cfg>,
    used_this_fields: Vec<FieldId>,
}

impl MethodInfo {
    pub fn is_constructor(&self) -> bool {
        self.name == INIT
    }

    pub fn is_class_initializer(&self) -> bool {
        self.name == CLINIT
    }

    pub fn arity(&self) -> usize {
        self.param_types.len()
    }

    pub fn cfg(&self) -> Option<&Cfg> {
        self.cfg.as_ref()
    }

    /// Instance fields read or written through `this` in the body
    pub fn used_this_fields(&self) -> &[FieldId] {
        &self.used_this_fields
    }
}

#[derive(Debug, Deserialize)]
struct ProgramDump {
    classes: Vec<ClassDecl>,
}

#[derive(Debug, Default)]
pub struct Program {
    classes: Vec<ClassInfo>,
    methods: Vec<MethodInfo>,
    fields: Vec<FieldInfo>,
    class_index: FxHashMap<String, ClassId>,
    signature_index: FxHashMap<String, MethodId>,
    subsig_index: FxHashMap<(ClassId, String), MethodId>,
    direct_subtypes: Vec<Vec<ClassId>>,
}

impl Program {
    pub fn new(decls: Vec<ClassDecl>) -> Result<Self> {
        let mut program = Program::default();

        for decl in &decls {
            if program.class_index.contains_key(&decl.name) {
                return Err(GadgetError::program(format!("duplicate class {}", decl.name)));
            }
            let id = ClassId::from_index(program.classes.len());
            program.class_index.insert(decl.name.clone(), id);
            program.classes.push(ClassInfo {
                id,
                name: decl.name.clone(),
                super_class: decl.super_class.clone(),
                interfaces: decl.interfaces.clone(),
                is_interface: decl.is_interface,
                is_abstract: decl.is_abstract,
                fields: Vec::new(),
                methods: Vec::new(),
                ancestors: FxHashSet::default(),
            });
        }

        for (ci, decl) in decls.into_iter().enumerate() {
            let class = ClassId::from_index(ci);
            for f in decl.fields {
                let id = FieldId::from_index(program.fields.len());
                program.classes[ci].fields.push(id);
                program.fields.push(FieldInfo {
                    id,
                    class,
                    name: f.name,
                    ty: f.ty,
                    is_static: f.is_static,
                    is_transient: f.is_transient,
                    generic_signature: f.generic_signature,
                });
            }
            for m in decl.methods {
                let sig = signature(&decl.name, &m.name, &m.param_types, &m.return_type);
                let subsig = subsignature(&m.name, &m.param_types, &m.return_type);
                if program.signature_index.contains_key(&sig) {
                    return Err(GadgetError::program(format!("duplicate method {}", sig)));
                }
                if let Some(body) = &m.body {
                    validate_body(&sig, body)?;
                }
                let id = MethodId::from_index(program.methods.len());
                program.signature_index.insert(sig.clone(), id);
                program.subsig_index.insert((class, subsig.clone()), id);
                program.classes[ci].methods.push(id);
                program.methods.push(MethodInfo {
                    id,
                    class,
                    cfg: m.body.as_ref().map(Cfg::build),
                    name: m.name,
                    param_types: m.param_types,
                    return_type: m.return_type,
                    is_static: m.is_static,
                    is_private: m.is_private,
                    is_abstract: m.is_abstract,
                    is_native: m.is_native,
                    body: m.body,
                    signature: sig,
                    subsignature: subsig,
                    used_this_fields: Vec::new(),
                });
            }
        }

        program.link_hierarchy();
        program.collect_used_fields();
        Ok(program)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let dump: ProgramDump = serde_json::from_str(json)?;
        Self::new(dump.classes)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    fn link_hierarchy(&mut self) {
        self.direct_subtypes = vec![Vec::new(); self.classes.len()];
        for class in &self.classes {
            for parent in class.super_class.iter().chain(class.interfaces.iter()) {
                if let Some(&pid) = self.class_index.get(parent) {
                    self.direct_subtypes[pid.index()].push(class.id);
                }
            }
        }

        for ci in 0..self.classes.len() {
            let mut ancestors = FxHashSet::default();
            let mut stack = vec![self.classes[ci].name.clone()];
            while let Some(name) = stack.pop() {
                if !ancestors.insert(name.clone()) {
                    continue;
                }
                if let Some(&id) = self.class_index.get(&name) {
                    let c = &self.classes[id.index()];
                    stack.extend(c.super_class.iter().cloned());
                    stack.extend(c.interfaces.iter().cloned());
                }
            }
            self.classes[ci].ancestors = ancestors;
        }
    }

    fn collect_used_fields(&mut self) {
        for mi in 0..self.methods.len() {
            let Some(body) = &self.methods[mi].body else {
                continue;
            };
            let Some(this) = body.this_var else {
                continue;
            };
            let mut used = Vec::new();
            for stmt in &body.stmts {
                let field = match &stmt.kind {
                    StmtKind::LoadField {
                        base: Some(b),
                        field,
                        ..
                    }
                    | StmtKind::StoreField {
                        base: Some(b),
                        field,
                        ..
                    } if *b == this => field,
                    _ => continue,
                };
                if let Some(fid) = self.resolve_field(field) {
                    if !self.fields[fid.index()].is_static && !used.contains(&fid) {
                        used.push(fid);
                    }
                }
            }
            self.methods[mi].used_this_fields = used;
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Lookups
    // ═══════════════════════════════════════════════════════════════════════

    pub fn class(&self, id: ClassId) -> &ClassInfo {
        &self.classes[id.index()]
    }

    pub fn method(&self, id: MethodId) -> &MethodInfo {
        &self.methods[id.index()]
    }

    pub fn field(&self, id: FieldId) -> &FieldInfo {
        &self.fields[id.index()]
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassInfo> {
        self.classes.iter()
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodInfo> {
        self.methods.iter()
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    pub fn class_by_name(&self, name: &str) -> Option<ClassId> {
        self.class_index.get(name).copied()
    }

    pub fn method_by_signature(&self, sig: &str) -> Option<MethodId> {
        self.signature_index.get(sig).copied()
    }

    pub fn signature(&self, id: MethodId) -> &str {
        &self.methods[id.index()].signature
    }

    pub fn declaring_class(&self, id: MethodId) -> &ClassInfo {
        self.class(self.method(id).class)
    }

    pub fn declared_method(&self, class: ClassId, subsig: &str) -> Option<MethodId> {
        self.subsig_index.get(&(class, subsig.to_string())).copied()
    }

    pub fn class_initializer(&self, class: ClassId) -> Option<MethodId> {
        self.declared_method(class, &subsignature(CLINIT, &[], &JavaType::void()))
    }

    /// Superclass chain starting at `class` itself
    pub fn super_chain(&self, class: ClassId) -> Vec<ClassId> {
        let mut chain = vec![class];
        let mut cur = class;
        while let Some(parent) = self
            .class(cur)
            .super_class
            .as_deref()
            .and_then(|n| self.class_by_name(n))
        {
            if chain.contains(&parent) {
                break;
            }
            chain.push(parent);
            cur = parent;
        }
        chain
    }

    /// `class` and every declared transitive subtype, in id order
    pub fn subtypes(&self, class: ClassId) -> Vec<ClassId> {
        let mut seen = FxHashSet::default();
        let mut stack = vec![class];
        while let Some(c) = stack.pop() {
            if seen.insert(c) {
                stack.extend(self.direct_subtypes[c.index()].iter().copied());
            }
        }
        let mut out: Vec<ClassId> = seen.into_iter().collect();
        out.sort();
        out
    }

    /// Declared method lookup: the class chain first, then its interfaces
    pub fn resolve_method(&self, mref: &MethodRef) -> Option<MethodId> {
        let start = self.class_by_name(&mref.declaring_class)?;
        let subsig = mref.subsignature();
        let mut seen = FxHashSet::default();
        let mut queue = std::collections::VecDeque::from([start]);
        while let Some(c) = queue.pop_front() {
            if !seen.insert(c) {
                continue;
            }
            if let Some(m) = self.declared_method(c, &subsig) {
                return Some(m);
            }
            let info = self.class(c);
            for parent in info.super_class.iter().chain(info.interfaces.iter()) {
                if let Some(p) = self.class_by_name(parent) {
                    queue.push_back(p);
                }
            }
        }
        None
    }

    pub fn resolve_field(&self, fref: &FieldRef) -> Option<FieldId> {
        let class = self.class_by_name(&fref.declaring_class)?;
        self.field_in_hierarchy(class, &fref.name)
    }

    /// Field `name` visible on a value of type `ty`
    pub fn field_of_type(&self, ty: &JavaType, name: &str) -> Option<FieldId> {
        let class = self.class_by_name(ty.class_name()?)?;
        self.field_in_hierarchy(class, name)
    }

    fn field_in_hierarchy(&self, class: ClassId, name: &str) -> Option<FieldId> {
        self.super_chain(class).into_iter().find_map(|c| {
            self.class(c)
                .fields
                .iter()
                .copied()
                .find(|f| self.fields[f.index()].name == name)
        })
    }

    /// Reconstruct a [`MethodRef`] naming a declared method
    pub fn method_ref(&self, id: MethodId) -> MethodRef {
        let m = self.method(id);
        MethodRef::new(
            self.class(m.class).name.clone(),
            m.name.clone(),
            m.param_types.clone(),
            m.return_type.clone(),
        )
    }

    /// Concrete `InvocationHandler.invoke` implementations
    pub fn invocation_handlers(&self) -> Vec<MethodId> {
        let handler = JavaType::class(INVOCATION_HANDLER);
        self.classes
            .iter()
            .filter(|c| c.is_concrete() && self.is_subtype(&c.class_type(), &handler))
            .filter_map(|c| self.dispatch_from(c.id, INVOCATION_HANDLER_INVOKE))
            .collect()
    }

    fn dispatch_from(&self, class: ClassId, subsig: &str) -> Option<MethodId> {
        self.super_chain(class).into_iter().find_map(|c| {
            self.declared_method(c, subsig)
                .filter(|m| !self.method(*m).is_abstract)
        })
    }

    fn class_is_subtype(&self, sub: &str, sup: &str) -> bool {
        if sub == sup || sup == OBJECT {
            return true;
        }
        match self.class_by_name(sub) {
            Some(id) => self.class(id).ancestors.contains(sup),
            None => false,
        }
    }
}

fn validate_body(sig: &str, body: &MethodBody) -> Result<()> {
    let nvars = body.vars.len();
    let nstmts = body.stmts.len();
    let bad_var = |v: crate::features::program::domain::VarId| v.index() >= nvars;

    if body.this_var.into_iter().chain(body.params.iter().copied()).any(bad_var) {
        return Err(GadgetError::program(format!(
            "{}: this/parameter variable out of range",
            sig
        )));
    }
    for (i, stmt) in body.stmts.iter().enumerate() {
        if stmt.vars().into_iter().any(bad_var) {
            return Err(GadgetError::program(format!(
                "{}: statement {} references an undeclared variable",
                sig, i
            )));
        }
        if let Some(t) = stmt.jump_target() {
            if t >= nstmts {
                return Err(GadgetError::program(format!(
                    "{}: statement {} jumps to {} (body has {} statements)",
                    sig, i, t, nstmts
                )));
            }
        }
    }
    Ok(())
}

impl TypeOracle for Program {
    fn is_subtype(&self, sub: &JavaType, sup: &JavaType) -> bool {
        if sub == sup {
            return true;
        }
        match (sub, sup) {
            (JavaType::Null, s) => s.is_reference(),
            (JavaType::Class(a), JavaType::Class(b)) => self.class_is_subtype(a, b),
            (JavaType::Array(_), JavaType::Class(b)) => {
                b == OBJECT || b == CLONEABLE || b == SERIALIZABLE
            }
            (JavaType::Array(a), JavaType::Array(b)) => {
                if a.is_primitive() || b.is_primitive() {
                    a == b
                } else {
                    self.is_subtype(a, b)
                }
            }
            _ => false,
        }
    }

    fn resolve_dispatch(&self, receiver: &JavaType, method: &MethodRef) -> Option<MethodId> {
        let class_name = match receiver {
            JavaType::Class(name) => name.as_str(),
            JavaType::Array(_) => OBJECT,
            _ => return None,
        };
        let class = self.class_by_name(class_name)?;
        self.dispatch_from(class, &method.subsignature())
    }

    fn cha_targets(&self, method: &MethodRef) -> Vec<MethodId> {
        let Some(decl) = self.class_by_name(&method.declaring_class) else {
            return Vec::new();
        };
        let subsig = method.subsignature();
        let mut seen = FxHashSet::default();
        self.subtypes(decl)
            .into_iter()
            .filter(|c| self.class(*c).is_concrete())
            .filter_map(|c| self.dispatch_from(c, &subsig))
            .filter(|m| seen.insert(*m))
            .collect()
    }

    fn is_serializable(&self, ty: &JavaType) -> bool {
        match ty {
            JavaType::Primitive(_) => true,
            JavaType::Array(elem) => self.is_serializable(elem),
            JavaType::Class(name) => self.class_is_subtype(name, SERIALIZABLE),
            JavaType::Null => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::program::infrastructure::builder::{ClassBuilder, MethodBuilder};
    use pretty_assertions::assert_eq;

    fn hierarchy() -> Program {
        let base = ClassBuilder::new("Base")
            .implements(SERIALIZABLE)
            .field("name", "java.lang.String")
            .method(MethodBuilder::new("run").body_stub("Base").build())
            .build();
        let left = ClassBuilder::new("Left")
            .extends("Base")
            .method(MethodBuilder::new("run").body_stub("Left").build())
            .build();
        let right = ClassBuilder::new("Right").extends("Base").build();
        let iface = ClassBuilder::new("Shape").interface().build();
        let circle = ClassBuilder::new("Circle")
            .implements("Shape")
            .method(MethodBuilder::new("run").body_stub("Circle").build())
            .build();
        Program::new(vec![base, left, right, iface, circle]).unwrap()
    }

    #[test]
    fn test_subtype_relation() {
        let p = hierarchy();
        let t = |s: &str| JavaType::from(s);
        assert!(p.is_subtype(&t("Left"), &t("Base")));
        assert!(p.is_subtype(&t("Left"), &t(SERIALIZABLE)));
        assert!(!p.is_subtype(&t("Base"), &t("Left")));
        assert!(p.is_subtype(&t("Circle"), &t("Shape")));
        assert!(p.is_subtype(&t("Unknown"), &t(OBJECT)));
        assert!(p.is_subtype(&t("Left[]"), &t("Base[]")));
        assert!(!p.is_subtype(&t("int[]"), &t("long[]")));
        assert!(p.is_subtype(&JavaType::Null, &t("Base")));
        assert!(p.compatible(&t("Base"), &t("Left")));
    }

    #[test]
    fn test_dispatch_walks_superclasses() {
        let p = hierarchy();
        let run: MethodRef = "<Base: void run()>".parse().unwrap();
        let m = p.resolve_dispatch(&JavaType::from("Right"), &run).unwrap();
        assert_eq!(p.signature(m), "<Base: void run()>");
        let m = p.resolve_dispatch(&JavaType::from("Left"), &run).unwrap();
        assert_eq!(p.signature(m), "<Left: void run()>");
        assert!(p.resolve_dispatch(&JavaType::from("Nowhere"), &run).is_none());
    }

    #[test]
    fn test_cha_targets_dedup() {
        let p = hierarchy();
        let run: MethodRef = "<Base: void run()>".parse().unwrap();
        let sigs: Vec<&str> = p.cha_targets(&run).into_iter().map(|m| p.signature(m)).collect();
        assert_eq!(sigs, vec!["<Base: void run()>", "<Left: void run()>"]);
    }

    #[test]
    fn test_serializable_and_fields() {
        let p = hierarchy();
        assert!(p.is_serializable(&JavaType::from("Right")));
        assert!(!p.is_serializable(&JavaType::from("Circle")));
        let f = p.field_of_type(&JavaType::from("Left"), "name").unwrap();
        assert_eq!(p.field(f).name, "name");
        assert_eq!(p.class(p.field(f).class).name, "Base");
    }

    // ========== EDGE CASES ==========

    #[test]
    fn test_duplicate_class_rejected() {
        let a = ClassBuilder::new("A").build();
        let err = Program::new(vec![a.clone(), a]).unwrap_err();
        assert!(err.to_string().contains("duplicate class A"));
    }

    #[test]
    fn test_bad_branch_target_rejected() {
        let mut m = MethodBuilder::new("f");
        let this = m.this_var("A");
        m.if_goto(this, 42);
        let a = ClassBuilder::new("A").method(m.build()).build();
        let err = Program::new(vec![a]).unwrap_err();
        assert!(err.to_string().contains("jumps to 42"));
    }

    #[test]
    fn test_json_loading() {
        let json = r#"{"classes":[{"name":"A","super_class":"java.lang.Object",
            "methods":[{"name":"f","return_type":"void","body":{
                "vars":[{"name":"this","ty":"A"}],"this_var":0,
                "stmts":[{"line":1,"op":"return"}]}}]}]}"#;
        let p = Program::from_json_str(json).unwrap();
        let m = p.method_by_signature("<A: void f()>").unwrap();
        assert_eq!(p.method(m).cfg().unwrap().len(), 1);
    }
}
