//! Method summaries
//!
//! A summary maps call-site-relative keys to controllability values:
//! `return` (plus the most precise return type seen), `param-i` (the effect
//! on an argument object), `this` and `this-<field>` (the effect on the
//! receiver). Values are themselves relative to the callee's inputs, so the
//! caller rewrites them through its own call-site vector.

use crate::features::controllability::domain::ContrValue;
use crate::features::program::domain::JavaType;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SummaryKey {
    Return,
    Param(u32),
    This,
    ThisField(String),
}

impl SummaryKey {
    /// Key for an integer index: `-1` receiver, `-2` result, `i` argument
    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            -1 => Some(SummaryKey::This),
            -2 => Some(SummaryKey::Return),
            i if i >= 0 => Some(SummaryKey::Param(i as u32)),
            _ => None,
        }
    }

    /// Names a location at the call site (anything but `return`)
    pub fn is_call_site(&self) -> bool {
        !matches!(self, SummaryKey::Return)
    }

    /// The key spelled as the value it stands for
    pub fn as_value(&self) -> ContrValue {
        match self {
            SummaryKey::Return => ContrValue::NotPolluted,
            SummaryKey::Param(i) => ContrValue::param(*i),
            SummaryKey::This => ContrValue::this(),
            SummaryKey::ThisField(f) => ContrValue::This(vec![f.clone()]),
        }
    }
}

impl fmt::Display for SummaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryKey::Return => f.write_str("return"),
            SummaryKey::Param(i) => write!(f, "param-{}", i),
            SummaryKey::This => f.write_str("this"),
            SummaryKey::ThisField(field) => write!(f, "this-{}", field),
        }
    }
}

/// Write-once result of analyzing one method
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodSummary {
    entries: Vec<(SummaryKey, ContrValue)>,
    return_type: Option<JavaType>,
}

impl MethodSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &SummaryKey) -> Option<&ContrValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains(&self, key: &SummaryKey) -> bool {
        self.get(key).is_some()
    }

    /// Insert or replace
    pub fn set(&mut self, key: SummaryKey, value: ContrValue) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn set_return(&mut self, value: ContrValue, ty: Option<JavaType>) {
        self.set(SummaryKey::Return, value);
        self.return_type = ty;
    }

    pub fn return_type(&self) -> Option<&JavaType> {
        self.return_type.as_ref()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SummaryKey, &ContrValue)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for MethodSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        f.write_str("{")?;
        for (i, (k, v)) in entries.into_iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", k, v)?;
            if *k == SummaryKey::Return {
                if let Some(ty) = &self.return_type {
                    write!(f, " ({})", ty)?;
                }
            }
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_from_index() {
        assert_eq!(SummaryKey::from_index(-1), Some(SummaryKey::This));
        assert_eq!(SummaryKey::from_index(-2), Some(SummaryKey::Return));
        assert_eq!(SummaryKey::from_index(3), Some(SummaryKey::Param(3)));
        assert_eq!(SummaryKey::from_index(-3), None);
    }

    #[test]
    fn test_set_replaces() {
        let mut s = MethodSummary::new();
        s.set(SummaryKey::This, ContrValue::param(0));
        s.set(SummaryKey::This, ContrValue::Polluted);
        assert_eq!(s.len(), 1);
        assert_eq!(s.get(&SummaryKey::This), Some(&ContrValue::Polluted));
    }

    #[test]
    fn test_display_is_sorted() {
        let mut s = MethodSummary::new();
        s.set(SummaryKey::ThisField("name".into()), ContrValue::param(0));
        s.set_return(ContrValue::this(), Some(JavaType::string()));
        assert_eq!(
            s.to_string(),
            "{return: this (java.lang.String), this-name: param-0}"
        );
    }
}
