//! Controllability values
//!
//! A [`ContrValue`] answers "who controls this value?" relative to the method
//! being summarized: nobody, the attacker unconditionally, the i-th argument,
//! the receiver (or a field path below it), or a mix of literal text and
//! controllable pieces (reflective names such as `get+polluted`).
//!
//! The textual form (`null`, `polluted`, `param-0-name`, `this-next`,
//! `new java.util.HashMap`, `get+polluted`) is only used for reports, rule files
//! and debugging; the engine works on the enum.
//!
//! # Lattice
//! Values are ranked by [`Controllability`]:
//! `NotPolluted < Known < This < Param < Polluted`.
//! [`ContrValue::merge`] keeps the higher-ranked operand and the newer one on a
//! tie, so merging is commutative, associative and idempotent at the level of
//! the classification.

use crate::features::program::domain::JavaType;
use std::fmt;
use std::str::FromStr;

/// Field names below a controllable root, outermost first
pub type FieldPath = Vec<String>;

/// Classification used for merging and for chain bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Controllability {
    NotPolluted,
    /// Non-controllable but informative: a fresh allocation or literal text
    Known,
    This,
    Param,
    Polluted,
}

/// Integer code for "not controllable" in call-edge vectors
pub const NOT_POLLUTED: i32 = -3;
/// Integer code for "unconditionally controllable"
pub const POLLUTED: i32 = -2;
/// Integer code for "controllable iff the receiver is"
pub const THIS: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ContrValue {
    #[default]
    NotPolluted,
    Polluted,
    Param(u32, FieldPath),
    This(FieldPath),
    /// `new T`: freshly allocated, type known exactly
    Fresh(JavaType),
    Literal(String),
    /// Flattened; no nested `Concat`, no `NotPolluted` terms
    Concat(Vec<ContrValue>),
}

impl ContrValue {
    pub fn param(index: u32) -> Self {
        ContrValue::Param(index, Vec::new())
    }

    pub fn this() -> Self {
        ContrValue::This(Vec::new())
    }

    pub fn literal(text: impl Into<String>) -> Self {
        ContrValue::Literal(text.into())
    }

    pub fn kind(&self) -> Controllability {
        match self {
            ContrValue::NotPolluted => Controllability::NotPolluted,
            ContrValue::Polluted => Controllability::Polluted,
            ContrValue::Param(..) => Controllability::Param,
            ContrValue::This(_) => Controllability::This,
            ContrValue::Fresh(_) | ContrValue::Literal(_) => Controllability::Known,
            ContrValue::Concat(terms) => {
                let has = |k: Controllability| terms.iter().any(|t| t.kind() == k);
                if has(Controllability::Polluted) {
                    Controllability::Polluted
                } else if has(Controllability::This) {
                    Controllability::This
                } else if has(Controllability::Param) {
                    Controllability::Param
                } else {
                    Controllability::Known
                }
            }
        }
    }

    /// Integer encoding used in call-edge vectors: `-3` not controllable,
    /// `-2` polluted, `-1` this, `i >= 0` parameter `i`
    pub fn index(&self) -> i32 {
        match self.kind() {
            Controllability::NotPolluted | Controllability::Known => NOT_POLLUTED,
            Controllability::Polluted => POLLUTED,
            Controllability::This => THIS,
            Controllability::Param => self.param_index().map_or(POLLUTED, |i| i as i32),
        }
    }

    /// First parameter index mentioned by the value
    pub fn param_index(&self) -> Option<u32> {
        match self {
            ContrValue::Param(i, _) => Some(*i),
            ContrValue::Concat(terms) => terms.iter().find_map(ContrValue::param_index),
            _ => None,
        }
    }

    pub fn is_not_polluted(&self) -> bool {
        matches!(self, ContrValue::NotPolluted)
    }

    pub fn is_controllable(&self) -> bool {
        self.kind() >= Controllability::This
    }

    /// Controllable independently of the receiver: `param-i` or `polluted`
    pub fn is_controllable_param(&self) -> bool {
        matches!(
            self.kind(),
            Controllability::Param | Controllability::Polluted
        )
    }

    /// Expressed in terms of the caller's inputs (`this…` or `param-i…`)
    pub fn is_call_site(&self) -> bool {
        matches!(self.kind(), Controllability::This | Controllability::Param)
    }

    pub fn is_this_derived(&self) -> bool {
        self.kind() == Controllability::This
    }

    pub fn is_fresh(&self) -> bool {
        match self {
            ContrValue::Fresh(_) => true,
            ContrValue::Concat(terms) => terms.iter().any(ContrValue::is_fresh),
            _ => false,
        }
    }

    /// Carries at least one constant text piece
    pub fn has_constant(&self) -> bool {
        match self {
            ContrValue::Literal(_) => true,
            ContrValue::Concat(terms) => terms.iter().any(ContrValue::has_constant),
            _ => false,
        }
    }

    fn terms(&self) -> &[ContrValue] {
        match self {
            ContrValue::Concat(terms) => terms,
            other => std::slice::from_ref(other),
        }
    }

    fn is_legal(&self) -> bool {
        match self {
            ContrValue::Literal(s) => s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '$')),
            ContrValue::Concat(terms) => terms.iter().all(ContrValue::is_legal),
            _ => true,
        }
    }

    /// Join: keeps the strictly more controllable operand, `newer` on a tie
    pub fn merge(&self, newer: &ContrValue) -> ContrValue {
        if newer.kind() >= self.kind() {
            newer.clone()
        } else {
            self.clone()
        }
    }

    /// `newer` is strictly more controllable than `self`
    pub fn is_dominated_by(&self, newer: &ContrValue) -> bool {
        newer.kind() > self.kind()
    }

    /// Whether a summary slot holding `old` should be overwritten with
    /// `newer`. Only an uncontrollable slot is ever replaced, and an empty
    /// slot never receives `null`.
    pub fn upgrades(old: Option<&ContrValue>, newer: &ContrValue) -> bool {
        match old {
            None => !newer.is_not_polluted(),
            Some(old) => old.index() == NOT_POLLUTED && newer.index() != NOT_POLLUTED,
        }
    }

    /// Append `next` to `self`.
    ///
    /// Illegal literal text is dropped. An empty or freshly-allocated `self`,
    /// or an empty `next`, is replaced outright. Otherwise the result only
    /// grows when the controllability of the last piece differs from `next`.
    pub fn concat(&self, next: &ContrValue) -> ContrValue {
        if !next.is_legal() {
            return self.clone();
        }
        if self.is_not_polluted() || next.is_not_polluted() || self.is_fresh() {
            return next.clone();
        }
        let last = self.terms().last().unwrap_or(self);
        if last.is_controllable() == next.is_controllable() {
            return self.clone();
        }
        let mut terms = self.terms().to_vec();
        terms.extend(next.terms().iter().cloned());
        ContrValue::Concat(terms)
    }

    /// Value reached by reading `field` from a value classified as `self`
    pub fn with_field(&self, field: &str) -> ContrValue {
        match self {
            ContrValue::Param(i, path) => {
                let mut path = path.clone();
                path.push(field.to_string());
                ContrValue::Param(*i, path)
            }
            ContrValue::This(path) => {
                let mut path = path.clone();
                path.push(field.to_string());
                ContrValue::This(path)
            }
            ContrValue::Concat(terms) => match terms.split_last() {
                Some((last, rest)) if last.is_call_site() => {
                    let mut terms = rest.to_vec();
                    terms.push(last.with_field(field));
                    ContrValue::Concat(terms)
                }
                _ => self.clone(),
            },
            other => other.clone(),
        }
    }

    /// Regex over method names this value may spell.
    ///
    /// Controllable pieces become `.*` (never two in a row), literal pieces
    /// are matched verbatim and an empty value matches nothing useful (`""`).
    pub fn to_regex(&self) -> String {
        let mut out = String::new();
        for term in self.terms() {
            if term.is_controllable() {
                if !out.ends_with(".*") {
                    out.push_str(".*");
                }
            } else if !term.is_not_polluted() {
                out.push_str(&regex::escape(&term.to_string()));
            }
        }
        out
    }
}

/// `".*"`: the pattern admits any name
pub fn is_any_match(pattern: &str) -> bool {
    pattern == ".*"
}

impl fmt::Display for ContrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContrValue::NotPolluted => f.write_str("null"),
            ContrValue::Polluted => f.write_str("polluted"),
            ContrValue::Param(i, path) => {
                write!(f, "param-{}", i)?;
                path.iter().try_for_each(|p| write!(f, "-{}", p))
            }
            ContrValue::This(path) => {
                f.write_str("this")?;
                path.iter().try_for_each(|p| write!(f, "-{}", p))
            }
            ContrValue::Fresh(ty) => write!(f, "new {}", ty),
            ContrValue::Literal(s) => f.write_str(s),
            ContrValue::Concat(terms) => {
                for (i, t) in terms.iter().enumerate() {
                    if i > 0 {
                        f.write_str("+")?;
                    }
                    write!(f, "{}", t)?;
                }
                Ok(())
            }
        }
    }
}

fn parse_term(s: &str) -> ContrValue {
    if s.is_empty() || s == "null" {
        return ContrValue::NotPolluted;
    }
    if s == "polluted" || s.starts_with("polluted-") {
        return ContrValue::Polluted;
    }
    if s == "this" {
        return ContrValue::this();
    }
    if let Some(rest) = s.strip_prefix("this-") {
        return ContrValue::This(rest.split('-').map(str::to_string).collect());
    }
    if let Some(rest) = s.strip_prefix("param-") {
        let mut parts = rest.split('-');
        if let Some(Ok(i)) = parts.next().map(str::parse::<u32>) {
            return ContrValue::Param(i, parts.map(str::to_string).collect());
        }
    }
    if let Some(ty) = s.strip_prefix("new ") {
        return ContrValue::Fresh(JavaType::from(ty));
    }
    ContrValue::Literal(s.to_string())
}

impl FromStr for ContrValue {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let terms: Vec<ContrValue> = s
            .split('+')
            .map(|t| parse_term(t.trim()))
            .filter(|t| !t.is_not_polluted())
            .collect();
        Ok(match terms.len() {
            0 => ContrValue::NotPolluted,
            1 => terms.into_iter().next().unwrap_or_default(),
            _ => ContrValue::Concat(terms),
        })
    }
}

impl From<&str> for ContrValue {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(v) => v,
            Err(never) => match never {},
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn v(s: &str) -> ContrValue {
        ContrValue::from(s)
    }

    #[test]
    fn test_classification() {
        assert_eq!(v("null").index(), NOT_POLLUTED);
        assert_eq!(v("polluted").index(), POLLUTED);
        assert_eq!(v("this").index(), THIS);
        assert_eq!(v("this-name").index(), THIS);
        assert_eq!(v("param-2").index(), 2);
        assert_eq!(v("param-1-next").index(), 1);
        assert_eq!(v("new java.util.HashMap").index(), NOT_POLLUTED);
        assert_eq!(v("get+polluted").index(), POLLUTED);
        assert_eq!(v("get+this-name").index(), THIS);
    }

    #[test]
    fn test_controllable_param_excludes_this() {
        assert!(v("param-0").is_controllable_param());
        assert!(v("polluted").is_controllable_param());
        assert!(!v("this").is_controllable_param());
        assert!(v("this").is_controllable());
        assert!(v("this").is_call_site());
        assert!(!v("polluted").is_call_site());
    }

    #[test]
    fn test_merge_prefers_controllable() {
        assert_eq!(v("null").merge(&v("param-0")), v("param-0"));
        assert_eq!(v("param-0").merge(&v("null")), v("param-0"));
        assert_eq!(v("this").merge(&v("polluted")), v("polluted"));
        assert_eq!(v("new A").merge(&v("null")), v("new A"));
        // tie: newer wins
        assert_eq!(v("param-0").merge(&v("param-1")), v("param-1"));
    }

    #[test]
    fn test_concat_grows_on_status_change() {
        assert_eq!(v("get").concat(&v("polluted")).to_string(), "get+polluted");
        assert_eq!(v("get+polluted").concat(&v("param-0")).to_string(), "get+polluted");
        assert_eq!(v("get+polluted").concat(&v("Name")).to_string(), "get+polluted+Name");
        assert_eq!(v("null").concat(&v("this")), v("this"));
        assert_eq!(v("this").concat(&v("null")), v("null"));
        assert_eq!(v("new java.lang.StringBuilder").concat(&v("get")), v("get"));
    }

    #[test]
    fn test_concat_drops_illegal_text() {
        let weird = ContrValue::literal("a b(c)");
        assert_eq!(v("get").concat(&weird), v("get"));
    }

    #[test]
    fn test_with_field() {
        assert_eq!(v("this").with_field("name").to_string(), "this-name");
        assert_eq!(v("param-1").with_field("a").with_field("b").to_string(), "param-1-a-b");
        assert_eq!(v("polluted").with_field("x"), v("polluted"));
        assert_eq!(v("get+this").with_field("f").to_string(), "get+this-f");
    }

    #[test]
    fn test_to_regex() {
        assert_eq!(v("get+polluted").to_regex(), "get.*");
        assert_eq!(v("polluted+this").to_regex(), ".*");
        assert_eq!(v("param-0").to_regex(), ".*");
        assert!(is_any_match(&v("param-0").to_regex()));
        assert_eq!(v("null").to_regex(), "");
        assert_eq!(v("getOutputProperties").to_regex(), "getOutputProperties");
        assert_eq!(v("a.b").to_regex(), "a\\.b");
    }

    #[test]
    fn test_display_parse_roundtrip() {
        for text in [
            "null",
            "polluted",
            "this",
            "this-a-b",
            "param-3",
            "param-0-next",
            "new java.lang.Object",
            "get+polluted+Name",
        ] {
            assert_eq!(v(text).to_string(), text);
        }
    }

    #[test]
    fn test_summary_upgrade_rule() {
        assert!(!ContrValue::upgrades(None, &v("null")));
        assert!(ContrValue::upgrades(None, &v("new java.lang.Object")));
        assert!(ContrValue::upgrades(Some(&v("null")), &v("param-0")));
        assert!(ContrValue::upgrades(Some(&v("new java.lang.Object")), &v("this")));
        // a controllable slot is never replaced, even by a stronger value
        assert!(!ContrValue::upgrades(Some(&v("this")), &v("polluted")));
        assert!(!ContrValue::upgrades(Some(&v("null")), &v("Lit")));
    }

    // ========== PROPERTIES ==========

    fn field_name() -> impl Strategy<Value = String> {
        "[a-z][a-zA-Z0-9]{0,5}"
    }

    fn term() -> impl Strategy<Value = ContrValue> {
        prop_oneof![
            Just(ContrValue::Polluted),
            (0u32..4, prop::collection::vec(field_name(), 0..3))
                .prop_map(|(i, p)| ContrValue::Param(i, p)),
            prop::collection::vec(field_name(), 0..3).prop_map(ContrValue::This),
            "[A-Z][a-z]{0,5}".prop_map(ContrValue::Literal),
            Just(ContrValue::Fresh(JavaType::class("java.util.HashMap"))),
        ]
    }

    fn value() -> impl Strategy<Value = ContrValue> {
        prop_oneof![
            Just(ContrValue::NotPolluted),
            term(),
            prop::collection::vec(term(), 2..4).prop_map(ContrValue::Concat),
        ]
    }

    proptest! {
        #[test]
        fn merge_is_commutative_up_to_classification(a in value(), b in value()) {
            prop_assert_eq!(a.merge(&b).kind(), b.merge(&a).kind());
            prop_assert_eq!(a.merge(&b).kind(), a.kind().max(b.kind()));
        }

        #[test]
        fn merge_is_idempotent(a in value()) {
            prop_assert_eq!(a.merge(&a), a);
        }

        #[test]
        fn merge_is_associative_up_to_classification(a in value(), b in value(), c in value()) {
            let left = a.merge(&b).merge(&c);
            let right = a.merge(&b.merge(&c));
            prop_assert_eq!(left.kind(), right.kind());
        }

        #[test]
        fn merge_over_any_order_agrees(values in prop::collection::vec(value(), 1..6)) {
            let forward = values.iter().skip(1).fold(values[0].clone(), |acc, x| acc.merge(x));
            let backward = values
                .iter()
                .rev()
                .skip(1)
                .fold(values[values.len() - 1].clone(), |acc, x| acc.merge(x));
            prop_assert_eq!(forward.kind(), backward.kind());
        }

        #[test]
        fn concat_never_loses_controllability_of_next(a in value(), b in term()) {
            let joined = a.concat(&b);
            if b.is_controllable() {
                prop_assert!(joined.is_controllable());
            }
        }

        #[test]
        fn concat_has_no_adjacent_terms_of_equal_status(a in term(), b in term(), c in term()) {
            let joined = a.concat(&b).concat(&c);
            if let ContrValue::Concat(terms) = &joined {
                for pair in terms.windows(2) {
                    prop_assert_ne!(pair[0].is_controllable(), pair[1].is_controllable());
                }
            }
        }

        #[test]
        fn display_parses_back(a in value()) {
            prop_assume!(!matches!(&a, ContrValue::Concat(t) if t.iter().any(|x| matches!(x, ContrValue::Fresh(_)))));
            let text = a.to_string();
            prop_assert_eq!(ContrValue::from(text.as_str()).to_string(), text);
        }
    }
}
