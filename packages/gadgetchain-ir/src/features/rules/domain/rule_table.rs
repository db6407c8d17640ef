//! Resolved rule table
//!
//! Every entry is keyed by [`MethodId`]; the table is built once against a
//! [`Program`] (see [`RuleLoader`](crate::features::rules::infrastructure::RuleLoader))
//! and read-only afterwards.

use super::behavior::ImitatedBehavior;
use super::index_ref::IndexRef;
use crate::features::program::domain::types::STRING;
use crate::features::program::domain::{ClassId, JavaType, MethodId};
use crate::features::program::{Program, TypeOracle};
use crate::features::summary::domain::MethodSummary;
use rustc_hash::{FxHashMap, FxHashSet};

/// Deserialization callbacks that make a serializable class reachable
pub const DESERIALIZATION_CALLBACKS: &[&str] = &[
    "void readObject(java.io.ObjectInputStream)",
    "void readObjectNoData()",
    "java.lang.Object readResolve()",
    "void readExternal(java.io.ObjectInput)",
];

/// Generic taint transfer: a call to the method moves `from` into `to`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRule {
    pub from: IndexRef,
    pub to: IndexRef,
    /// Type of the value arriving at `to`
    pub ty: JavaType,
    /// Reclassify the transferred value as a fresh allocation
    pub is_new: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RuleStats {
    pub sources: usize,
    pub sinks: usize,
    pub transfers: usize,
    pub imitates: usize,
    pub ignores: usize,
    /// Entries skipped because the method is absent (lenient mode)
    pub missing: usize,
}

#[derive(Debug, Default)]
pub struct RuleTable {
    sources: FxHashSet<MethodId>,
    entries: Vec<MethodId>,
    sinks: FxHashMap<MethodId, Vec<i32>>,
    transfers: FxHashMap<MethodId, Vec<TransferRule>>,
    behaviors: FxHashMap<MethodId, ImitatedBehavior>,
    seeded: FxHashMap<MethodId, MethodSummary>,
    ignored_methods: FxHashSet<MethodId>,
    ignored_classes: FxHashSet<ClassId>,
    pub stats: RuleStats,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Construction
    // ═══════════════════════════════════════════════════════════════════════

    /// Mark `method` as a chain source and a worklist entry
    pub fn add_source(&mut self, method: MethodId) {
        if self.sources.insert(method) {
            self.entries.push(method);
            self.stats.sources += 1;
        }
    }

    /// Mark every deserialization callback of every serializable class
    pub fn add_serializable_sources(&mut self, program: &Program) {
        for m in deserialization_entries(program) {
            self.add_source(m);
        }
    }

    pub fn add_sink(&mut self, method: MethodId, indices: Vec<i32>) {
        self.sinks.insert(method, indices);
        self.stats.sinks += 1;
    }

    pub fn add_transfer(&mut self, method: MethodId, rule: TransferRule) {
        self.transfers.entry(method).or_default().push(rule);
        self.stats.transfers += 1;
    }

    pub fn add_behavior(&mut self, method: MethodId, behavior: ImitatedBehavior) {
        self.behaviors.insert(method, behavior);
        self.stats.imitates += 1;
    }

    /// Pre-written summary entry; the method is never analyzed
    pub fn seed_summary(&mut self, method: MethodId, f: impl FnOnce(&mut MethodSummary)) {
        f(self.seeded.entry(method).or_default());
        self.stats.imitates += 1;
    }

    pub fn ignore_method(&mut self, method: MethodId) {
        self.ignored_methods.insert(method);
        self.stats.ignores += 1;
    }

    pub fn ignore_class(&mut self, class: ClassId) {
        self.ignored_classes.insert(class);
        self.stats.ignores += 1;
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════════

    pub fn is_source(&self, method: MethodId) -> bool {
        self.sources.contains(&method)
    }

    /// Sources in declaration order
    pub fn entries(&self) -> &[MethodId] {
        &self.entries
    }

    pub fn is_sink(&self, method: MethodId) -> bool {
        self.sinks.contains_key(&method)
    }

    /// Required-controllable indices of a sink
    pub fn sink_indices(&self, method: MethodId) -> Option<&[i32]> {
        self.sinks.get(&method).map(Vec::as_slice)
    }

    pub fn transfers(&self, method: MethodId) -> &[TransferRule] {
        self.transfers.get(&method).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn behavior(&self, method: MethodId) -> Option<&ImitatedBehavior> {
        self.behaviors.get(&method)
    }

    pub fn seeded_summaries(&self) -> impl Iterator<Item = (MethodId, &MethodSummary)> {
        self.seeded.iter().map(|(m, s)| (*m, s))
    }

    /// Ignored explicitly, through its class, or a `String` method returning
    /// a primitive
    pub fn is_ignored(&self, program: &Program, method: MethodId) -> bool {
        if self.ignored_methods.contains(&method) {
            return true;
        }
        let info = program.method(method);
        if self.ignored_classes.contains(&info.class) {
            return true;
        }
        program.class(info.class).name == STRING && info.return_type.is_primitive()
    }

    pub fn is_class_ignored(&self, class: ClassId) -> bool {
        self.ignored_classes.contains(&class)
    }
}

/// Deserialization callbacks declared by concrete serializable classes
pub fn deserialization_entries(program: &Program) -> Vec<MethodId> {
    program
        .classes()
        .filter(|c| c.is_concrete() && program.is_serializable(&c.class_type()))
        .flat_map(|c| {
            DESERIALIZATION_CALLBACKS
                .iter()
                .filter_map(move |subsig| program.declared_method(c.id, subsig))
        })
        .collect()
}
