//! YAML schema of the rule file
//!
//! ```yaml
//! sources:
//!   - method: Serializable
//! sinks:
//!   - method: "<java.lang.Runtime: java.lang.Process exec(java.lang.String)>"
//!     index: [0]
//! transfers:
//!   - method: "<java.lang.String: char[] toCharArray()>"
//!     from: base
//!     to: result
//! imitates:
//!   - method: "<java.lang.Class: java.lang.Object newInstance()>"
//!     action: connect
//!     jump: constructor
//!   - method: "<java.lang.StringBuilder: java.lang.StringBuilder append(java.lang.String)>"
//!     action: summary
//!     append: [0, base]
//! ignores:
//!   - class: java.util.logging.Logger
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// An index written either as a number or as a keyword (`base`, `0[*]`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndexText {
    Number(i64),
    Text(String),
}

impl fmt::Display for IndexText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexText::Number(n) => write!(f, "{}", n),
            IndexText::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleFile {
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
    #[serde(default)]
    pub sinks: Vec<SinkEntry>,
    #[serde(default)]
    pub transfers: Vec<TransferEntry>,
    #[serde(default)]
    pub imitates: Vec<ImitateEntry>,
    #[serde(default)]
    pub ignores: Vec<IgnoreEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceEntry {
    /// Method signature or the keyword `Serializable`
    pub method: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SinkEntry {
    pub method: String,
    pub index: Vec<IndexText>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransferEntry {
    pub method: String,
    pub from: IndexText,
    pub to: IndexText,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
    #[serde(default, rename = "new")]
    pub is_new: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImitateEntry {
    pub method: String,
    /// `connect` or `summary`
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jump: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<IndexText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<IndexText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<IndexText>,
    #[serde(default)]
    pub pollute_receiver: bool,
    #[serde(default)]
    pub invoke: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// `[value, key]` of a seeded summary entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub append: Option<Vec<IndexText>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IgnoreEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
}
