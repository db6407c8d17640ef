//! Class, field and method declarations consumed by the engine
//!
//! This is the frontend hand-off format. A bytecode loader (out of scope) or a
//! JSON dump produces `Vec<ClassDecl>`; [`Program`](super::super::Program)
//! indexes it.

use super::ids::VarId;
use super::stmt::Stmt;
use super::types::JavaType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub super_class: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub is_interface: bool,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
    #[serde(default)]
    pub methods: Vec<MethodDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub ty: JavaType,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_transient: bool,
    /// Generic signature attribute, e.g. `Ljava/lang/Class<+LFoo;>;`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generic_signature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    #[serde(default)]
    pub param_types: Vec<JavaType>,
    pub return_type: JavaType,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub is_native: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<MethodBody>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarDecl {
    pub name: String,
    pub ty: JavaType,
    /// Value of a string-literal temporary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub const_string: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodBody {
    pub vars: Vec<VarDecl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub this_var: Option<VarId>,
    #[serde(default)]
    pub params: Vec<VarId>,
    pub stmts: Vec<Stmt>,
}

impl MethodBody {
    pub fn var(&self, id: VarId) -> Option<&VarDecl> {
        self.vars.get(id.index())
    }

    pub fn var_type(&self, id: VarId) -> Option<&JavaType> {
        self.var(id).map(|v| &v.ty)
    }

    pub fn param_index(&self, id: VarId) -> Option<usize> {
        self.params.iter().position(|p| *p == id)
    }

    pub fn is_this(&self, id: VarId) -> bool {
        self.this_var == Some(id)
    }
}
