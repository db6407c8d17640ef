//! Built-in analysis plugins

use crate::features::program::domain::{ClassId, MethodId};
use crate::features::program::Program;
use crate::features::rules::RuleTable;
use crate::features::summary::ports::AnalysisPlugin;
use rustc_hash::FxHashSet;
use std::time::Instant;
use tracing::{debug, info};

// ============================================================================
// Composite
// ============================================================================

/// Fans every hook out to its members in registration order
#[derive(Default)]
pub struct CompositePlugin {
    plugins: Vec<Box<dyn AnalysisPlugin>>,
}

impl CompositePlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, plugin: Box<dyn AnalysisPlugin>) {
        self.plugins.push(plugin);
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }
}

impl AnalysisPlugin for CompositePlugin {
    fn name(&self) -> &'static str {
        "composite"
    }

    fn on_start(&mut self) {
        for p in &mut self.plugins {
            p.on_start();
        }
    }

    fn on_finish(&mut self) {
        for p in &mut self.plugins {
            p.on_finish();
        }
    }

    fn on_new_method(&mut self, program: &Program, rules: &RuleTable, method: MethodId) -> Vec<MethodId> {
        let mut first = Vec::new();
        for p in &mut self.plugins {
            for m in p.on_new_method(program, rules, method) {
                if !first.contains(&m) {
                    first.push(m);
                }
            }
        }
        first
    }
}

// ============================================================================
// Timer
// ============================================================================

#[derive(Debug, Default)]
pub struct AnalysisTimer {
    started: Option<Instant>,
}

impl AnalysisTimer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AnalysisPlugin for AnalysisTimer {
    fn name(&self) -> &'static str {
        "timer"
    }

    fn on_start(&mut self) {
        self.started = Some(Instant::now());
    }

    fn on_finish(&mut self) {
        if let Some(start) = self.started.take() {
            info!("summary analysis finished in {:.2?}", start.elapsed());
        }
    }
}

// ============================================================================
// Class initializer
// ============================================================================

/// Runs static initializers and deserialization callbacks of a class before
/// anything else in it, the way the JVM would have by the time a gadget
/// method runs.
///
/// For the first method seen in a class: the class's first source method
/// (usually `readObject`) goes first, then the `<clinit>` of every class in
/// the superclass chain, root side first.
#[derive(Debug, Default)]
pub struct ClassInitializer {
    initialized: FxHashSet<ClassId>,
    read_object_seen: FxHashSet<ClassId>,
}

impl ClassInitializer {
    pub fn new() -> Self {
        Self::default()
    }

    fn initialize_read_object(
        &mut self,
        program: &Program,
        rules: &RuleTable,
        class: ClassId,
        first: &mut Vec<MethodId>,
    ) {
        if !self.read_object_seen.insert(class) {
            return;
        }
        if let Some(&source) = program
            .class(class)
            .methods
            .iter()
            .find(|&&m| rules.is_source(m))
        {
            first.push(source);
        }
    }

    fn initialize_class(&mut self, program: &Program, rules: &RuleTable, class: ClassId, first: &mut Vec<MethodId>) {
        if !self.initialized.insert(class) {
            return;
        }
        let parent = program
            .class(class)
            .super_class
            .as_deref()
            .and_then(|name| program.class_by_name(name));
        if let Some(parent) = parent {
            self.initialize_class(program, rules, parent, first);
        }
        if let Some(clinit) = program.class_initializer(class) {
            if !rules.is_ignored(program, clinit) {
                debug!("initializing {}", program.class(class).name);
                first.push(clinit);
            }
        }
    }
}

impl AnalysisPlugin for ClassInitializer {
    fn name(&self) -> &'static str {
        "class-initializer"
    }

    fn on_new_method(&mut self, program: &Program, rules: &RuleTable, method: MethodId) -> Vec<MethodId> {
        let info = program.method(method);
        let mut first = Vec::new();
        if rules.is_source(method) {
            self.read_object_seen.insert(info.class);
        }
        if !info.is_class_initializer() {
            self.initialize_read_object(program, rules, info.class, &mut first);
        }
        self.initialize_class(program, rules, info.class, &mut first);
        first
    }
}
