//! Imitated behaviors: rule-driven stand-ins for reflection idioms

use super::index_ref::{BASE, RESULT};
use std::fmt;
use std::str::FromStr;

/// Where a `connect` rule jumps to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Jump {
    /// `Class.newInstance`-style: every constructor of the class held by `from`
    Constructor,
    /// `Class.forName`-style: the `<clinit>` of the class named by `from`
    ClassInit,
    /// `Method.invoke`-style: methods whose name matches the value of `from`
    Inference,
    /// Bean getter: the result becomes `get+polluted`
    Get,
    /// Bean setter: the result becomes `set+polluted`
    Set,
    /// `toString` of the runtime type of `from`
    ToString,
}

impl Jump {
    pub const NAMES: &'static [&'static str] =
        &["constructor", "clinit", "inference", "get", "set", "toString"];
}

impl FromStr for Jump {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "constructor" => Ok(Jump::Constructor),
            "clinit" => Ok(Jump::ClassInit),
            "inference" => Ok(Jump::Inference),
            "get" => Ok(Jump::Get),
            "set" => Ok(Jump::Set),
            "toString" => Ok(Jump::ToString),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Jump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Jump::Constructor => "constructor",
            Jump::ClassInit => "clinit",
            Jump::Inference => "inference",
            Jump::Get => "get",
            Jump::Set => "set",
            Jump::ToString => "toString",
        };
        f.write_str(name)
    }
}

/// Condition on the calling context of an edge, checked while a chain is
/// assembled
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CallerFilter {
    /// The caller's call site must invoke a method with this name
    Name(String),
    /// Follow argument `i` up the chain until it becomes a known name, which
    /// must then match the callee's name
    Param(u32),
}

impl FromStr for CallerFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(name) = s.strip_prefix("name:") {
            if name.is_empty() {
                return Err("empty method name".to_string());
            }
            return Ok(CallerFilter::Name(name.to_string()));
        }
        if let Some(i) = s.strip_prefix("param-") {
            return i
                .parse()
                .map(CallerFilter::Param)
                .map_err(|_| format!("bad parameter index '{}'", i));
        }
        Err("expected 'name:<method>' or 'param-<i>'".to_string())
    }
}

impl fmt::Display for CallerFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallerFilter::Name(n) => write!(f, "name:{}", n),
            CallerFilter::Param(i) => write!(f, "param-{}", i),
        }
    }
}

/// Resolved `imitates` entry of action `connect`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImitatedBehavior {
    pub jump: Option<Jump>,
    /// Index whose value drives the jump (class, name, getter source)
    pub from: i32,
    /// Index of the reflective receiver (`Method.invoke(obj, ..)`)
    pub receiver: i32,
    /// Index of the reflective argument array
    pub params: i32,
    /// Receiver becomes `polluted` when every argument is controllable
    pub pollute_receiver: bool,
    /// Reflective dispatch call: bypasses chain type checks
    pub is_invoke: bool,
    pub filter: Option<CallerFilter>,
}

impl Default for ImitatedBehavior {
    fn default() -> Self {
        Self {
            jump: None,
            from: BASE,
            receiver: 0,
            params: 1,
            pollute_receiver: false,
            is_invoke: false,
            filter: None,
        }
    }
}

impl ImitatedBehavior {
    /// Position of `index` in a `[receiver, args..]` call-site vector
    pub fn slot(index: i32) -> Option<usize> {
        match index {
            RESULT => None,
            i => usize::try_from(i + 1).ok(),
        }
    }
}
