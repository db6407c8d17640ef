//! Program model domain types

pub mod ids;
pub mod model;
pub mod signature;
pub mod stmt;
pub mod types;

pub use ids::{ClassId, FieldId, MethodId, VarId};
pub use model::{ClassDecl, FieldDecl, MethodBody, MethodDecl, VarDecl};
pub use signature::{FieldRef, MethodRef, SignatureError, CLINIT, INIT};
pub use stmt::{CallKind, InvokeExpr, Stmt, StmtKind};
pub use types::{JavaType, ParseTypeError, PrimitiveType};
