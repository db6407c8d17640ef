//! Candidate filtering for dispatch and reflective jumps

use crate::features::program::domain::{JavaType, MethodId};
use crate::features::program::{Program, TypeOracle};
use regex::Regex;

/// Method-name matcher derived from a controllability regex.
///
/// Patterns without a `*` are plain names and compared exactly; anything else
/// is a regex searched anywhere in the name. A pattern that fails to compile
/// matches nothing.
#[derive(Debug, Clone)]
pub enum NamePattern {
    Exact(String),
    Regex(Option<Regex>),
}

impl NamePattern {
    pub fn new(pattern: &str) -> Self {
        if pattern.contains('*') {
            NamePattern::Regex(Regex::new(pattern).ok())
        } else {
            NamePattern::Exact(pattern.to_string())
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            NamePattern::Exact(n) => n == name,
            NamePattern::Regex(Some(re)) => re.is_match(name),
            NamePattern::Regex(None) => false,
        }
    }
}

/// Declared methods a value of `receiver` type may reach by name.
///
/// A candidate must match `pattern`, be concrete and non-private, be declared
/// on `receiver` or one of its subtypes (an override the runtime value may
/// carry), and, with `arg_types` given, take exactly
/// that many parameters of compatible types. With `require_serializable` its
/// declaring class must be serializable. Results are in method-id order.
pub fn filter_methods(
    program: &Program,
    pattern: &NamePattern,
    receiver: &JavaType,
    arg_types: Option<&[JavaType]>,
    require_serializable: bool,
) -> Vec<MethodId> {
    program
        .methods()
        .filter(|m| pattern.matches(&m.name))
        .filter(|m| !m.is_abstract && !m.is_private)
        .filter(|m| {
            let declaring = program.class(m.class).class_type();
            program.is_subtype(&declaring, receiver)
                && (!require_serializable || program.is_serializable(&declaring))
        })
        .filter(|m| arg_types.map_or(true, |args| program.all_compatible(args, &m.param_types)))
        .map(|m| m.id)
        .collect()
}

/// Narrow class-hierarchy targets to those a receiver of `base` type can
/// actually dispatch to: the declaring class must be a supertype (inherited)
/// or a subtype (override) of `base`
pub fn filter_cha(
    program: &Program,
    candidates: &[MethodId],
    base: &JavaType,
    require_serializable: bool,
) -> Vec<MethodId> {
    candidates
        .iter()
        .copied()
        .filter(|&m| {
            let info = program.method(m);
            let declaring = program.class(info.class).class_type();
            (!require_serializable || program.is_serializable(&declaring))
                && program.compatible(base, &declaring)
                && !info.is_private
        })
        .collect()
}
