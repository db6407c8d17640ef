//! Dataflow fact: pointer → controllability descriptor

use super::contr::Contr;
use crate::features::pointer_flow::domain::PointerId;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContrFact {
    map: FxHashMap<PointerId, Contr>,
}

impl ContrFact {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, p: PointerId) -> Option<&Contr> {
        self.map.get(&p)
    }

    pub fn get_mut(&mut self, p: PointerId) -> Option<&mut Contr> {
        self.map.get_mut(&p)
    }

    pub fn contains(&self, p: PointerId) -> bool {
        self.map.contains_key(&p)
    }

    /// Returns whether the stored descriptor changed
    pub fn update(&mut self, p: PointerId, contr: Contr) -> bool {
        match self.map.get(&p) {
            Some(old) if *old == contr => false,
            _ => {
                self.map.insert(p, contr);
                true
            }
        }
    }

    pub fn remove(&mut self, p: PointerId) -> Option<Contr> {
        self.map.remove(&p)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PointerId, &Contr)> {
        self.map.iter().map(|(k, v)| (*k, v))
    }

    /// Pointwise join of `self` into `target`
    pub fn meet_into(&self, target: &mut ContrFact) {
        for (p, contr) in &self.map {
            match target.map.get_mut(p) {
                Some(existing) if existing != contr => existing.merge_from(contr),
                Some(_) => {}
                None => {
                    target.map.insert(*p, contr.clone());
                }
            }
        }
    }

    /// Replace `self` with `other`; returns whether anything changed
    pub fn copy_from(&mut self, other: &ContrFact) -> bool {
        if self == other {
            return false;
        }
        self.map = other.map.clone();
        true
    }
}
