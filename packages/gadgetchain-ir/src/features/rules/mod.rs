//! # Rule Table
//!
//! Prior knowledge about library code: which methods are sources and sinks,
//! which calls merely move taint (transfers), which reflection idioms are
//! imitated instead of analyzed, and what is ignored altogether.
//!
//! The YAML file is resolved against the [`Program`](crate::features::program::Program)
//! once at startup by [`RuleLoader`]; the engine only sees [`RuleTable`].

pub mod domain;
pub mod infrastructure;

pub use domain::{
    CallerFilter, ImitatedBehavior, IndexKind, IndexRef, Jump, RuleStats, RuleTable,
    TransferRule, BASE, RESULT,
};
pub use infrastructure::{RuleFile, RuleLoader};
