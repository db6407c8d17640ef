//! Ports (interfaces) for the program model
//!
//! The engine asks hierarchy questions only through [`TypeOracle`], so a
//! frontend with its own class hierarchy can stand in for [`Program`](super::Program).

use super::domain::{JavaType, MethodId, MethodRef};

/// Subtype / dispatch oracle
pub trait TypeOracle {
    /// `sub <: sup`, reflexive
    fn is_subtype(&self, sub: &JavaType, sup: &JavaType) -> bool;

    /// Single dispatch of `method` on a receiver of exactly `receiver` type
    fn resolve_dispatch(&self, receiver: &JavaType, method: &MethodRef) -> Option<MethodId>;

    /// Class-hierarchy candidates: every concrete override reachable from the
    /// declaring class of `method`
    fn cha_targets(&self, method: &MethodRef) -> Vec<MethodId>;

    fn is_serializable(&self, ty: &JavaType) -> bool;

    /// Subtype in either direction
    fn compatible(&self, a: &JavaType, b: &JavaType) -> bool {
        self.is_subtype(a, b) || self.is_subtype(b, a)
    }

    /// Pairwise [`compatible`](Self::compatible) over equal-length lists
    fn all_compatible(&self, passed: &[JavaType], formals: &[JavaType]) -> bool {
        passed.len() == formals.len()
            && passed
                .iter()
                .zip(formals)
                .all(|(a, b)| self.compatible(a, b))
    }
}
