//! # Program Model
//!
//! The analyzed program as the engine consumes it: classes, fields, methods
//! with three-address bodies, a CFG per body, and a class-hierarchy oracle.
//!
//! Bytecode loading is out of scope; a frontend hands over `Vec<ClassDecl>`
//! (or a JSON dump of it) and [`Program::new`] indexes it.

pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use domain::{
    CallKind, ClassDecl, ClassId, FieldDecl, FieldId, FieldRef, InvokeExpr, JavaType, MethodBody,
    MethodDecl, MethodId, MethodRef, Stmt, StmtKind, VarDecl, VarId,
};
pub use infrastructure::{Cfg, ClassBuilder, ClassInfo, FieldInfo, MethodBuilder, MethodInfo, Program};
pub use ports::TypeOracle;
