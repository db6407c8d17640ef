//! Call-site index references used by rule entries
//!
//! `base` is the receiver, `result` the variable receiving the call's value
//! and `N` the N-th argument. Transfer rules may further select every element
//! of an array argument (`N[*]`) or a field of it (`N.field`).

use crate::features::program::domain::FieldId;
use std::fmt;

/// Receiver of the call
pub const BASE: i32 = -1;
/// Result variable of the call
pub const RESULT: i32 = -2;

const ARRAY_SUFFIX: &str = "[*]";

/// Parse `base`, `result`, `polluted` or a non-negative integer
pub fn parse_index(text: &str) -> Option<i32> {
    match text.trim().to_ascii_lowercase().as_str() {
        "base" => Some(BASE),
        "result" | "polluted" => Some(RESULT),
        other => other.parse::<u32>().ok().map(|i| i as i32),
    }
}

pub fn index_name(index: i32) -> String {
    match index {
        BASE => "base".to_string(),
        RESULT => "result".to_string(),
        i => i.to_string(),
    }
}

/// Unresolved shape of an index reference, as written in the rule file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexSelector {
    Var,
    Array,
    Field(String),
}

/// Split `N`, `N[*]` or `N.field` into index and selector
pub fn parse_index_ref(text: &str) -> Option<(i32, IndexSelector)> {
    let text = text.trim();
    if let Some(head) = text.strip_suffix(ARRAY_SUFFIX) {
        return parse_index(head).map(|i| (i, IndexSelector::Array));
    }
    if let Some((head, field)) = text.split_once('.') {
        if field.is_empty() {
            return None;
        }
        return parse_index(head).map(|i| (i, IndexSelector::Field(field.to_string())));
    }
    parse_index(text).map(|i| (i, IndexSelector::Var))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    Var,
    Array,
    Field(FieldId),
}

/// Resolved index reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexRef {
    pub index: i32,
    pub kind: IndexKind,
}

impl IndexRef {
    pub fn var(index: i32) -> Self {
        Self {
            index,
            kind: IndexKind::Var,
        }
    }
}

impl fmt::Display for IndexRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = index_name(self.index);
        match self.kind {
            IndexKind::Var => f.write_str(&base),
            IndexKind::Array => write!(f, "{}{}", base, ARRAY_SUFFIX),
            IndexKind::Field(field) => write!(f, "{}.{}", base, field),
        }
    }
}
