//! Demand-driven points-to answer

use crate::features::controllability::domain::{Contr, ContrValue};
use crate::features::pointer_flow::domain::PointerId;

/// Answer to one backward points-to query: a single descriptor plus the
/// location it was last taken from.
///
/// Contributions are folded as they arrive. A later contribution replaces the
/// current one only when the current one is uncontrollable and the newcomer
/// is not, so the first controllable answer sticks.
#[derive(Debug, Clone, Default)]
pub struct PointsTo {
    entry: Option<(PointerId, Contr)>,
}

impl PointsTo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in one contribution; returns whether it replaced the answer
    pub fn add(&mut self, pointer: PointerId, contr: Option<Contr>) -> bool {
        let Some(contr) = contr else {
            return false;
        };
        let replace = match &self.entry {
            None => true,
            Some((_, current)) => ContrValue::upgrades(Some(current.value()), contr.value()),
        };
        if replace {
            self.entry = Some((pointer, contr));
        }
        replace
    }

    pub fn add_all(&mut self, other: PointsTo) {
        if let Some((p, c)) = other.entry {
            self.add(p, Some(c));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }

    pub fn pointer(&self) -> Option<PointerId> {
        self.entry.as_ref().map(|(p, _)| *p)
    }

    pub fn merged(&self) -> Option<&Contr> {
        self.entry.as_ref().map(|(_, c)| c)
    }

    pub fn into_merged(self) -> Option<Contr> {
        self.entry.map(|(_, c)| c)
    }

    /// Overwrite the value of the current answer, if any
    pub fn set_value(&mut self, value: ContrValue) {
        if let Some((_, c)) = &mut self.entry {
            c.set_value(value);
        }
    }
}
