//! Rule file schema and loader

pub mod rule_file;
pub mod rule_loader;

pub use rule_file::{IndexText, RuleFile};
pub use rule_loader::RuleLoader;
