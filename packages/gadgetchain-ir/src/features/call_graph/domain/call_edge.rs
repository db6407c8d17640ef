//! Call edges annotated with call-site controllability

use crate::features::controllability::domain::ContrValue;
use crate::features::program::domain::{CallKind, JavaType, MethodId};
use crate::features::rules::domain::CallerFilter;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallEdgeId(pub u32);

impl CallEdgeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Statement `stmt` of `caller`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallSite {
    pub caller: MethodId,
    pub stmt: usize,
}

/// One resolved call.
///
/// `vector` is positional over `[receiver, arg0, arg1, ..]` and holds the
/// caller-relative controllability of each value; `int_vector` is its integer
/// encoding (`-3` not controllable, `-2` polluted, `-1` the caller's receiver,
/// `i` the caller's parameter `i`). Two calls from the same site to the same
/// callee with different encodings are distinct edges.
#[derive(Debug, Clone)]
pub struct CallEdge {
    pub kind: CallKind,
    pub call_site: CallSite,
    pub callee: MethodId,
    pub vector: Vec<ContrValue>,
    pub int_vector: Vec<i32>,
    pub line: u32,
    /// Runtime types of the passed values, same positions as `vector`
    pub arg_types: Vec<JavaType>,
    /// Name of the method the call site invokes (before dispatch)
    pub invoked_name: String,
    /// Reached through reflective dispatch or an imitated behavior; chain
    /// type checks stop here
    pub skips_type_check: bool,
    pub filter: Option<CallerFilter>,
}

impl CallEdge {
    pub fn new(
        kind: CallKind,
        call_site: CallSite,
        callee: MethodId,
        vector: Vec<ContrValue>,
        line: u32,
    ) -> Self {
        let int_vector = vector.iter().map(ContrValue::index).collect();
        Self {
            kind,
            call_site,
            callee,
            vector,
            int_vector,
            line,
            arg_types: Vec::new(),
            invoked_name: String::new(),
            skips_type_check: false,
            filter: None,
        }
    }

    pub fn with_arg_types(mut self, arg_types: Vec<JavaType>) -> Self {
        self.arg_types = arg_types;
        self
    }

    pub fn with_invoked_name(mut self, name: impl Into<String>) -> Self {
        self.invoked_name = name.into();
        self
    }

    pub fn with_filter(mut self, filter: Option<CallerFilter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn skipping_type_check(mut self, skip: bool) -> Self {
        self.skips_type_check = skip;
        self
    }

    #[inline]
    pub fn caller(&self) -> MethodId {
        self.call_site.caller
    }

    /// Encoded controllability at `slot` of the vector; missing slots are
    /// not controllable
    pub fn int_at(&self, slot: usize) -> i32 {
        self.int_vector
            .get(slot)
            .copied()
            .unwrap_or(crate::features::controllability::domain::NOT_POLLUTED)
    }
}

impl PartialEq for CallEdge {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.call_site == other.call_site
            && self.callee == other.callee
            && self.int_vector == other.int_vector
    }
}

impl Eq for CallEdge {}

impl std::hash::Hash for CallEdge {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.call_site.hash(state);
        self.callee.hash(state);
        self.int_vector.hash(state);
    }
}

impl fmt::Display for CallEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{} -> {} {:?}",
            self.call_site.caller, self.call_site.stmt, self.callee, self.int_vector
        )
    }
}
