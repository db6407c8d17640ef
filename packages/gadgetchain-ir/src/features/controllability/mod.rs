//! # Controllability Domain
//!
//! Who can control a value: nobody, the attacker, the i-th argument or the
//! receiver of the method under analysis. [`ContrValue`] is the lattice
//! element, [`Contr`] the per-pointer descriptor, [`ContrFact`] the dataflow
//! fact.

pub mod domain;

pub use domain::{
    is_any_match, Contr, ContrFact, ContrValue, Controllability, FieldPath, NOT_POLLUTED,
    POLLUTED, THIS,
};
