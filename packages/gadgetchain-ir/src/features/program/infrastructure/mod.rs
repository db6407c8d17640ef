//! Program model infrastructure: indexing, CFG construction, builders

pub mod builder;
pub mod cfg;
pub mod program;

pub use builder::{ClassBuilder, MethodBuilder};
pub use cfg::Cfg;
pub use program::{ClassInfo, FieldInfo, MethodInfo, Program};
