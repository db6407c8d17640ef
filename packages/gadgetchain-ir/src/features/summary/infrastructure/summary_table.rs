//! Global method-summary table
//!
//! Write-once per method, read-many. The check-then-insert in
//! [`SummaryTable::insert_once`] is a single `DashMap` entry operation, so
//! concurrent writers for the same method see exactly one winner.

use crate::features::program::domain::MethodId;
use crate::features::summary::domain::MethodSummary;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct SummaryTable {
    summaries: DashMap<MethodId, Arc<MethodSummary>>,
}

impl SummaryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `summary` unless `method` already has one; returns whether this
    /// call stored it
    pub fn insert_once(&self, method: MethodId, summary: MethodSummary) -> bool {
        match self.summaries.entry(method) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(summary));
                true
            }
        }
    }

    pub fn get(&self, method: MethodId) -> Option<Arc<MethodSummary>> {
        self.summaries.get(&method).map(|s| Arc::clone(s.value()))
    }

    pub fn contains(&self, method: MethodId) -> bool {
        self.summaries.contains_key(&method)
    }

    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::controllability::domain::ContrValue;
    use crate::features::summary::domain::SummaryKey;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn summary(value: ContrValue) -> MethodSummary {
        let mut s = MethodSummary::new();
        s.set(SummaryKey::Return, value);
        s
    }

    #[test]
    fn test_second_write_is_ignored() {
        let table = SummaryTable::new();
        assert!(table.insert_once(MethodId(3), summary(ContrValue::param(0))));
        assert!(!table.insert_once(MethodId(3), summary(ContrValue::Polluted)));
        let stored = table.get(MethodId(3)).unwrap();
        assert_eq!(stored.get(&SummaryKey::Return), Some(&ContrValue::param(0)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_concurrent_writers_single_winner() {
        let table = Arc::new(SummaryTable::new());
        let winners = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let table = Arc::clone(&table);
                let winners = Arc::clone(&winners);
                std::thread::spawn(move || {
                    let value = if i % 2 == 0 { ContrValue::this() } else { ContrValue::param(i) };
                    if table.insert_once(MethodId(1), summary(value)) {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert!(table.contains(MethodId(1)));
    }

    // ========== EDGE CASES ==========

    #[test]
    fn test_missing_summary() {
        let table = SummaryTable::new();
        assert!(table.is_empty());
        assert!(table.get(MethodId(0)).is_none());
    }
}
