//! Common test utilities for gadgetchain-ir
//!
//! Program fixtures are built in memory with [`GadgetBuilder`]; the
//! [`fixtures`] module writes them (and rule files) to disk for the
//! file-based pipeline entry points.

#![allow(dead_code)]

mod builders;
mod fixtures;

pub use builders::*;
pub use fixtures::*;
