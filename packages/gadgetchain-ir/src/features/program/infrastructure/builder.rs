//! Fluent builders for [`ClassDecl`] / [`MethodDecl`]
//!
//! Used by tests and by embedders that construct programs in memory instead of
//! loading a JSON dump. Statement lines default to `index + 1`.

use crate::features::program::domain::{
    CallKind, ClassDecl, FieldDecl, FieldRef, InvokeExpr, JavaType, MethodBody, MethodDecl,
    MethodRef, Stmt, StmtKind, VarDecl, VarId,
};

#[derive(Debug, Clone)]
pub struct ClassBuilder {
    decl: ClassDecl,
}

impl ClassBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            decl: ClassDecl {
                name: name.into(),
                super_class: None,
                interfaces: Vec::new(),
                is_interface: false,
                is_abstract: false,
                fields: Vec::new(),
                methods: Vec::new(),
            },
        }
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.decl.super_class = Some(parent.into());
        self
    }

    pub fn implements(mut self, iface: impl Into<String>) -> Self {
        self.decl.interfaces.push(iface.into());
        self
    }

    pub fn interface(mut self) -> Self {
        self.decl.is_interface = true;
        self.decl.is_abstract = true;
        self
    }

    pub fn abstract_(mut self) -> Self {
        self.decl.is_abstract = true;
        self
    }

    pub fn field(self, name: impl Into<String>, ty: impl Into<JavaType>) -> Self {
        self.push_field(name.into(), ty.into(), false, false, None)
    }

    pub fn transient_field(self, name: impl Into<String>, ty: impl Into<JavaType>) -> Self {
        self.push_field(name.into(), ty.into(), false, true, None)
    }

    pub fn static_field(self, name: impl Into<String>, ty: impl Into<JavaType>) -> Self {
        self.push_field(name.into(), ty.into(), true, false, None)
    }

    pub fn generic_field(
        self,
        name: impl Into<String>,
        ty: impl Into<JavaType>,
        generic_signature: impl Into<String>,
    ) -> Self {
        self.push_field(name.into(), ty.into(), false, false, Some(generic_signature.into()))
    }

    fn push_field(
        mut self,
        name: String,
        ty: JavaType,
        is_static: bool,
        is_transient: bool,
        generic_signature: Option<String>,
    ) -> Self {
        self.decl.fields.push(FieldDecl {
            name,
            ty,
            is_static,
            is_transient,
            generic_signature,
        });
        self
    }

    pub fn method(mut self, method: MethodDecl) -> Self {
        self.decl.methods.push(method);
        self
    }

    pub fn build(self) -> ClassDecl {
        self.decl
    }
}

#[derive(Debug, Clone)]
pub struct MethodBuilder {
    decl: MethodDecl,
    body: MethodBody,
    next_line: Option<u32>,
}

impl MethodBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            decl: MethodDecl {
                name: name.into(),
                param_types: Vec::new(),
                return_type: JavaType::void(),
                is_static: false,
                is_private: false,
                is_abstract: false,
                is_native: false,
                body: None,
            },
            body: MethodBody::default(),
            next_line: None,
        }
    }

    pub fn returns(mut self, ty: impl Into<JavaType>) -> Self {
        self.decl.return_type = ty.into();
        self
    }

    pub fn static_(mut self) -> Self {
        self.decl.is_static = true;
        self
    }

    pub fn private_(mut self) -> Self {
        self.decl.is_private = true;
        self
    }

    pub fn abstract_(mut self) -> Self {
        self.decl.is_abstract = true;
        self
    }

    pub fn native_(mut self) -> Self {
        self.decl.is_native = true;
        self
    }

    /// Declare a parameter type without a body variable (bodiless methods)
    pub fn param_type(mut self, ty: impl Into<JavaType>) -> Self {
        self.decl.param_types.push(ty.into());
        self
    }

    /// `this` + `return;`
    pub fn body_stub(mut self, class: impl Into<JavaType>) -> Self {
        self.this_var(class);
        self.ret(None);
        self
    }

    fn push_var(&mut self, name: String, ty: JavaType, const_string: Option<String>) -> VarId {
        let id = VarId::from_index(self.body.vars.len());
        self.body.vars.push(VarDecl {
            name,
            ty,
            const_string,
        });
        id
    }

    pub fn this_var(&mut self, class: impl Into<JavaType>) -> VarId {
        let id = self.push_var("%this".to_string(), class.into(), None);
        self.body.this_var = Some(id);
        id
    }

    pub fn param(&mut self, name: impl Into<String>, ty: impl Into<JavaType>) -> VarId {
        let ty = ty.into();
        self.decl.param_types.push(ty.clone());
        let id = self.push_var(name.into(), ty, None);
        self.body.params.push(id);
        id
    }

    pub fn local(&mut self, name: impl Into<String>, ty: impl Into<JavaType>) -> VarId {
        self.push_var(name.into(), ty.into(), None)
    }

    pub fn string_const(&mut self, name: impl Into<String>, value: impl Into<String>) -> VarId {
        self.push_var(name.into(), JavaType::string(), Some(value.into()))
    }

    /// Index the next pushed statement will get
    pub fn next_index(&self) -> usize {
        self.body.stmts.len()
    }

    /// Line number for the next pushed statement; later ones continue from it
    pub fn at_line(&mut self, line: u32) -> &mut Self {
        self.next_line = Some(line);
        self
    }

    pub fn push(&mut self, kind: StmtKind) -> usize {
        let index = self.body.stmts.len();
        let line = match self.next_line {
            Some(l) => {
                self.next_line = Some(l + 1);
                l
            }
            None => index as u32 + 1,
        };
        self.body.stmts.push(Stmt::new(line, kind));
        index
    }

    pub fn new_obj(&mut self, lhs: VarId, ty: impl Into<JavaType>) -> usize {
        self.push(StmtKind::New { lhs, ty: ty.into() })
    }

    pub fn copy(&mut self, lhs: VarId, rhs: VarId) -> usize {
        self.push(StmtKind::Copy { lhs, rhs })
    }

    pub fn cast(&mut self, lhs: VarId, rhs: VarId, ty: impl Into<JavaType>) -> usize {
        self.push(StmtKind::Cast {
            lhs,
            rhs,
            ty: ty.into(),
        })
    }

    pub fn load_field(&mut self, lhs: VarId, base: VarId, class: &str, field: &str) -> usize {
        self.push(StmtKind::LoadField {
            lhs,
            base: Some(base),
            field: FieldRef::new(class, field),
        })
    }

    pub fn load_static(&mut self, lhs: VarId, class: &str, field: &str) -> usize {
        self.push(StmtKind::LoadField {
            lhs,
            base: None,
            field: FieldRef::new(class, field),
        })
    }

    pub fn store_field(&mut self, base: VarId, class: &str, field: &str, rhs: VarId) -> usize {
        self.push(StmtKind::StoreField {
            base: Some(base),
            field: FieldRef::new(class, field),
            rhs,
        })
    }

    pub fn store_static(&mut self, class: &str, field: &str, rhs: VarId) -> usize {
        self.push(StmtKind::StoreField {
            base: None,
            field: FieldRef::new(class, field),
            rhs,
        })
    }

    pub fn load_array(&mut self, lhs: VarId, base: VarId) -> usize {
        self.push(StmtKind::LoadArray { lhs, base })
    }

    pub fn store_array(&mut self, base: VarId, rhs: VarId) -> usize {
        self.push(StmtKind::StoreArray { base, rhs })
    }

    pub fn if_goto(&mut self, lhs: VarId, target: usize) -> usize {
        self.push(StmtKind::If {
            lhs,
            rhs: None,
            target,
        })
    }

    pub fn goto(&mut self, target: usize) -> usize {
        self.push(StmtKind::Goto { target })
    }

    pub fn ret(&mut self, value: Option<VarId>) -> usize {
        self.push(StmtKind::Return { value })
    }

    pub fn nop(&mut self) -> usize {
        self.push(StmtKind::Nop)
    }

    pub fn invoke(
        &mut self,
        kind: CallKind,
        result: Option<VarId>,
        base: Option<VarId>,
        method: MethodRef,
        args: &[VarId],
    ) -> usize {
        self.push(StmtKind::Invoke(InvokeExpr {
            kind,
            method,
            base,
            args: args.to_vec(),
            result,
        }))
    }

    pub fn invoke_virtual(
        &mut self,
        result: Option<VarId>,
        base: VarId,
        method: MethodRef,
        args: &[VarId],
    ) -> usize {
        self.invoke(CallKind::Virtual, result, Some(base), method, args)
    }

    pub fn invoke_interface(
        &mut self,
        result: Option<VarId>,
        base: VarId,
        method: MethodRef,
        args: &[VarId],
    ) -> usize {
        self.invoke(CallKind::Interface, result, Some(base), method, args)
    }

    pub fn invoke_special(
        &mut self,
        result: Option<VarId>,
        base: VarId,
        method: MethodRef,
        args: &[VarId],
    ) -> usize {
        self.invoke(CallKind::Special, result, Some(base), method, args)
    }

    pub fn invoke_static(&mut self, result: Option<VarId>, method: MethodRef, args: &[VarId]) -> usize {
        self.invoke(CallKind::Static, result, None, method, args)
    }

    pub fn build(mut self) -> MethodDecl {
        let bodiless = self.decl.is_abstract || self.decl.is_native;
        if !bodiless && !self.body.stmts.is_empty() {
            self.decl.body = Some(self.body);
        }
        self.decl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_builder_params() {
        let mut m = MethodBuilder::new("readObject");
        let this = m.this_var("Gadget");
        let input = m.param("in", "java.io.ObjectInputStream");
        m.ret(None);
        let decl = m.build();

        assert_eq!(decl.param_types, vec![JavaType::from("java.io.ObjectInputStream")]);
        let body = decl.body.unwrap();
        assert_eq!(body.this_var, Some(this));
        assert_eq!(body.params, vec![input]);
    }

    #[test]
    fn test_line_numbers() {
        let mut m = MethodBuilder::new("f");
        m.nop();
        m.at_line(40);
        m.nop();
        m.nop();
        let body = m.build().body.unwrap();
        let lines: Vec<u32> = body.stmts.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![1, 40, 41]);
    }

    #[test]
    fn test_native_has_no_body() {
        let m = MethodBuilder::new("exec")
            .param_type("java.lang.String")
            .native_()
            .build();
        assert!(m.body.is_none());
        assert_eq!(m.param_types.len(), 1);
    }
}
