//! Discovered gadget chains and the report built from them

use serde::{Deserialize, Serialize};
use std::fmt;

/// One call in a chain: the calling method and the controllability vector
/// of the call edge it takes toward the sink
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainHop {
    pub caller: String,
    pub vector: Vec<i32>,
}

/// Source-to-sink call sequence.
///
/// `hops[0].caller` is the source; every following hop's caller is the
/// previous hop's callee; the last hop calls `sink`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GadgetChain {
    pub hops: Vec<ChainHop>,
    pub sink: String,
}

impl GadgetChain {
    /// Number of call edges
    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    pub fn source(&self) -> Option<&str> {
        self.hops.first().map(|h| h.caller.as_str())
    }

    /// Method signatures in call order, sink last
    pub fn signatures(&self) -> Vec<&str> {
        self.hops
            .iter()
            .map(|h| h.caller.as_str())
            .chain(std::iter::once(self.sink.as_str()))
            .collect()
    }
}

fn write_vector(f: &mut fmt::Formatter<'_>, vector: &[i32]) -> fmt::Result {
    f.write_str("[")?;
    for (i, v) in vector.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", v)?;
    }
    f.write_str("]")
}

/// Text block: one `caller->[v0, v1, ..]` line per hop, then the sink
impl fmt::Display for GadgetChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for hop in &self.hops {
            write!(f, "{}->", hop.caller)?;
            write_vector(f, &hop.vector)?;
            writeln!(f)?;
        }
        writeln!(f, "{}", self.sink)
    }
}

/// Everything a run discovered.
///
/// `truncated` is set when a chain budget (count or enumeration time) cut the
/// search short, so an empty report with `truncated == false` really means
/// no chain exists within `max_len`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainReport {
    pub chains: Vec<GadgetChain>,
    pub truncated: bool,
}

impl ChainReport {
    pub fn total(&self) -> usize {
        self.chains.len()
    }
}
