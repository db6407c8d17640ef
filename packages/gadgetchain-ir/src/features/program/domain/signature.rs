//! Method and field references in Soot/Tai-e signature syntax
//!
//! `<java.lang.Runtime: java.lang.Process exec(java.lang.String)>` is the
//! signature; `java.lang.Process exec(java.lang.String)` the sub-signature used
//! for virtual dispatch.

use super::types::{JavaType, ParseTypeError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const INIT: &str = "<init>";
pub const CLINIT: &str = "<clinit>";

/// Symbolic reference to a method, resolved through the type oracle
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MethodRef {
    pub declaring_class: String,
    pub name: String,
    pub param_types: Vec<JavaType>,
    pub return_type: JavaType,
}

impl MethodRef {
    pub fn new(
        declaring_class: impl Into<String>,
        name: impl Into<String>,
        param_types: Vec<JavaType>,
        return_type: JavaType,
    ) -> Self {
        Self {
            declaring_class: declaring_class.into(),
            name: name.into(),
            param_types,
            return_type,
        }
    }

    pub fn subsignature(&self) -> String {
        subsignature(&self.name, &self.param_types, &self.return_type)
    }

    pub fn is_constructor(&self) -> bool {
        self.name == INIT
    }

    pub fn is_class_initializer(&self) -> bool {
        self.name == CLINIT
    }

    pub fn declaring_type(&self) -> JavaType {
        JavaType::class(self.declaring_class.clone())
    }
}

/// `ret name(p1,p2)`
pub fn subsignature(name: &str, params: &[JavaType], ret: &JavaType) -> String {
    let params: Vec<String> = params.iter().map(|t| t.to_string()).collect();
    format!("{} {}({})", ret, name, params.join(","))
}

/// `<cls: ret name(p1,p2)>`
pub fn signature(class: &str, name: &str, params: &[JavaType], ret: &JavaType) -> String {
    format!("<{}: {}>", class, subsignature(name, params, ret))
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&signature(
            &self.declaring_class,
            &self.name,
            &self.param_types,
            &self.return_type,
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    Shape(String),
    Type(ParseTypeError),
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureError::Shape(s) => write!(f, "malformed method signature '{}'", s),
            SignatureError::Type(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SignatureError {}

impl From<ParseTypeError> for SignatureError {
    fn from(e: ParseTypeError) -> Self {
        SignatureError::Type(e)
    }
}

impl FromStr for MethodRef {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let shape = || SignatureError::Shape(s.to_string());
        let inner = s
            .trim()
            .strip_prefix('<')
            .and_then(|r| r.strip_suffix('>'))
            .ok_or_else(shape)?;
        let (class, subsig) = inner.split_once(": ").ok_or_else(shape)?;
        let (ret, rest) = subsig.trim().split_once(' ').ok_or_else(shape)?;
        let (name, params) = rest.split_once('(').ok_or_else(shape)?;
        let params = params.strip_suffix(')').ok_or_else(shape)?;
        if class.trim().is_empty() || name.trim().is_empty() {
            return Err(shape());
        }

        let param_types = params
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(JavaType::from_str)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(MethodRef {
            declaring_class: class.trim().to_string(),
            name: name.trim().to_string(),
            param_types,
            return_type: ret.parse()?,
        })
    }
}

impl TryFrom<String> for MethodRef {
    type Error = SignatureError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MethodRef> for String {
    fn from(m: MethodRef) -> Self {
        m.to_string()
    }
}

/// Symbolic reference to a field; resolution walks superclasses
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRef {
    #[serde(rename = "class")]
    pub declaring_class: String,
    pub name: String,
}

impl FieldRef {
    pub fn new(declaring_class: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            declaring_class: declaring_class.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}: {}>", self.declaring_class, self.name)
    }
}
