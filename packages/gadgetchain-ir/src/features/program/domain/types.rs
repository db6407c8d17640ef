//! Java-like type model
//!
//! Types render and parse in source form: `int`, `java.lang.String`,
//! `java.lang.Object[][]`. The null type renders as `null`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const OBJECT: &str = "java.lang.Object";
pub const STRING: &str = "java.lang.String";
pub const CLASS: &str = "java.lang.Class";
pub const SERIALIZABLE: &str = "java.io.Serializable";
pub const CLONEABLE: &str = "java.lang.Cloneable";
pub const OBJECT_INPUT_STREAM: &str = "java.io.ObjectInputStream";
pub const INVOCATION_HANDLER: &str = "java.lang.reflect.InvocationHandler";
pub const REFLECT_METHOD: &str = "java.lang.reflect.Method";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Void,
}

impl PrimitiveType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::Char => "char",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Void => "void",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "boolean" => Self::Boolean,
            "byte" => Self::Byte,
            "char" => Self::Char,
            "short" => Self::Short,
            "int" => Self::Int,
            "long" => Self::Long,
            "float" => Self::Float,
            "double" => Self::Double,
            "void" => Self::Void,
            _ => return None,
        })
    }
}

/// A Java type as seen by the analysis
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum JavaType {
    Primitive(PrimitiveType),
    Class(String),
    Array(Box<JavaType>),
    Null,
}

impl JavaType {
    pub fn class(name: impl Into<String>) -> Self {
        JavaType::Class(name.into())
    }

    pub fn array_of(elem: JavaType) -> Self {
        JavaType::Array(Box::new(elem))
    }

    pub fn object() -> Self {
        JavaType::class(OBJECT)
    }

    pub fn string() -> Self {
        JavaType::class(STRING)
    }

    pub fn void() -> Self {
        JavaType::Primitive(PrimitiveType::Void)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, JavaType::Primitive(_))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, JavaType::Class(_) | JavaType::Array(_) | JavaType::Null)
    }

    /// Values of this type never carry attacker-controlled objects
    pub fn is_ignored(&self) -> bool {
        matches!(self, JavaType::Primitive(_) | JavaType::Null)
    }

    pub fn class_name(&self) -> Option<&str> {
        match self {
            JavaType::Class(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_class(&self, name: &str) -> bool {
        self.class_name() == Some(name)
    }

    pub fn element_type(&self) -> Option<&JavaType> {
        match self {
            JavaType::Array(elem) => Some(elem),
            _ => None,
        }
    }

    /// Innermost non-array type
    pub fn base_element_type(&self) -> &JavaType {
        let mut ty = self;
        while let JavaType::Array(elem) = ty {
            ty = elem;
        }
        ty
    }
}

impl fmt::Display for JavaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JavaType::Primitive(p) => f.write_str(p.name()),
            JavaType::Class(name) => f.write_str(name),
            JavaType::Array(elem) => write!(f, "{}[]", elem),
            JavaType::Null => f.write_str("null"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTypeError(pub String);

impl fmt::Display for ParseTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid type '{}'", self.0)
    }
}

impl std::error::Error for ParseTypeError {}

impl FromStr for JavaType {
    type Err = ParseTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(elem) = s.strip_suffix("[]") {
            return Ok(JavaType::array_of(elem.parse()?));
        }
        if s == "null" {
            return Ok(JavaType::Null);
        }
        if let Some(p) = PrimitiveType::parse(s) {
            return Ok(JavaType::Primitive(p));
        }
        let valid = !s.is_empty()
            && s
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '$'));
        if valid {
            Ok(JavaType::Class(s.to_string()))
        } else {
            Err(ParseTypeError(s.to_string()))
        }
    }
}

impl TryFrom<String> for JavaType {
    type Error = ParseTypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<JavaType> for String {
    fn from(ty: JavaType) -> Self {
        ty.to_string()
    }
}

impl From<&str> for JavaType {
    /// Lenient conversion for builders: unparseable text becomes a class name
    fn from(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| JavaType::Class(s.to_string()))
    }
}
