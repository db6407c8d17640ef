//! Rule file loading and resolution against the program
//!
//! Rules are trusted input: a malformed entry (bad signature, index reference
//! or type, unknown keyword) always aborts with a [`ConfigError`]. A rule
//! whose method is absent from the program aborts in strict mode and is
//! skipped with a warning otherwise. Ignore entries naming absent methods or
//! classes are always skipped, there is nothing to ignore.

use super::rule_file::{
    IgnoreEntry, ImitateEntry, IndexText, RuleFile, SinkEntry, SourceEntry, TransferEntry,
};
use crate::config::{ConfigError, ConfigResult};
use crate::features::controllability::domain::ContrValue;
use crate::features::program::domain::{JavaType, MethodId, MethodRef};
use crate::features::program::Program;
use crate::features::rules::domain::{
    parse_index, parse_index_ref, CallerFilter, ImitatedBehavior, IndexKind, IndexRef,
    IndexSelector, Jump, RuleTable, TransferRule, BASE, RESULT,
};
use crate::features::summary::domain::SummaryKey;
use std::path::Path;
use tracing::{debug, info, warn};

const SERIALIZABLE_KEYWORD: &str = "Serializable";
const ACTIONS: &[&str] = &["connect", "summary"];

pub struct RuleLoader<'p> {
    program: &'p Program,
    strict: bool,
}

impl<'p> RuleLoader<'p> {
    pub fn new(program: &'p Program, strict: bool) -> Self {
        Self { program, strict }
    }

    pub fn load(&self, path: impl AsRef<Path>) -> ConfigResult<RuleTable> {
        let path = path.as_ref();
        info!("Loading rules from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        self.load_str(&text)
    }

    pub fn load_str(&self, yaml: &str) -> ConfigResult<RuleTable> {
        let file: RuleFile = serde_yaml::from_str(yaml)?;
        self.resolve(file)
    }

    pub fn resolve(&self, file: RuleFile) -> ConfigResult<RuleTable> {
        let mut table = RuleTable::new();
        for entry in &file.sources {
            self.add_source(&mut table, entry)?;
        }
        for entry in &file.sinks {
            self.add_sink(&mut table, entry)?;
        }
        for entry in &file.transfers {
            self.add_transfer(&mut table, entry)?;
        }
        for entry in &file.imitates {
            self.add_imitate(&mut table, entry)?;
        }
        for entry in &file.ignores {
            self.add_ignore(&mut table, entry)?;
        }
        debug!(
            "Rules: {} sources, {} sinks, {} transfers, {} imitates, {} ignores, {} missing",
            table.stats.sources,
            table.stats.sinks,
            table.stats.transfers,
            table.stats.imitates,
            table.stats.ignores,
            table.stats.missing
        );
        Ok(table)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Sections
    // ═══════════════════════════════════════════════════════════════════════

    fn add_source(&self, table: &mut RuleTable, entry: &SourceEntry) -> ConfigResult<()> {
        if entry.method == SERIALIZABLE_KEYWORD {
            table.add_serializable_sources(self.program);
            return Ok(());
        }
        if let Some(m) = self.method(table, "sources", &entry.method)? {
            table.add_source(m);
        }
        Ok(())
    }

    fn add_sink(&self, table: &mut RuleTable, entry: &SinkEntry) -> ConfigResult<()> {
        let Some(m) = self.method(table, "sinks", &entry.method)? else {
            return Ok(());
        };
        if entry.index.is_empty() {
            return Err(ConfigError::malformed("sinks", &entry.method, "empty index list"));
        }
        let indices = entry
            .index
            .iter()
            .map(|text| self.index("sinks", &entry.method, text))
            .collect::<ConfigResult<Vec<_>>>()?;
        let arity = self.program.method(m).arity() as i32;
        if let Some(bad) = indices.iter().find(|i| **i >= arity) {
            return Err(ConfigError::malformed(
                "sinks",
                &entry.method,
                format!("index {} out of range for {} parameters", bad, arity),
            ));
        }
        table.add_sink(m, indices);
        Ok(())
    }

    fn add_transfer(&self, table: &mut RuleTable, entry: &TransferEntry) -> ConfigResult<()> {
        let Some(m) = self.method(table, "transfers", &entry.method)? else {
            return Ok(());
        };
        let from = self.index_ref(m, &entry.method, &entry.from)?;
        let to = self.index_ref(m, &entry.method, &entry.to)?;
        let ty = match &entry.ty {
            Some(text) => text.parse::<JavaType>().map_err(|e| {
                ConfigError::malformed("transfers", &entry.method, e.to_string())
            })?,
            None => self.ref_type(m, &to).ok_or_else(|| {
                ConfigError::malformed("transfers", &entry.method, format!("no type for '{}'", to))
            })?,
        };
        table.add_transfer(
            m,
            TransferRule {
                from,
                to,
                ty,
                is_new: entry.is_new,
            },
        );
        Ok(())
    }

    fn add_imitate(&self, table: &mut RuleTable, entry: &ImitateEntry) -> ConfigResult<()> {
        if !ACTIONS.contains(&entry.action.as_str()) {
            return Err(ConfigError::unknown_field_with_suggestion(
                entry.action.clone(),
                "imitates",
                ACTIONS,
            ));
        }
        let Some(m) = self.method(table, "imitates", &entry.method)? else {
            return Ok(());
        };
        match entry.action.as_str() {
            "summary" => self.add_summary_seed(table, m, entry),
            _ => self.add_behavior(table, m, entry),
        }
    }

    fn add_behavior(&self, table: &mut RuleTable, m: MethodId, entry: &ImitateEntry) -> ConfigResult<()> {
        let jump = match &entry.jump {
            Some(name) => Some(name.parse::<Jump>().map_err(|_| {
                ConfigError::unknown_field_with_suggestion(name.clone(), "imitates", Jump::NAMES)
            })?),
            None => None,
        };
        let mut behavior = ImitatedBehavior {
            jump,
            pollute_receiver: entry.pollute_receiver,
            is_invoke: entry.invoke,
            ..ImitatedBehavior::default()
        };
        if let Some(text) = &entry.from {
            behavior.from = self.index("imitates", &entry.method, text)?;
        }
        if let Some(text) = &entry.receiver {
            behavior.receiver = self.index("imitates", &entry.method, text)?;
        }
        if let Some(text) = &entry.params {
            behavior.params = self.index("imitates", &entry.method, text)?;
        }
        if let Some(text) = &entry.filter {
            let filter = text
                .parse::<CallerFilter>()
                .map_err(|reason| ConfigError::malformed("imitates", &entry.method, reason))?;
            behavior.filter = Some(filter);
        }
        if behavior.jump.is_none() && !behavior.pollute_receiver && !behavior.is_invoke {
            return Err(ConfigError::malformed(
                "imitates",
                &entry.method,
                "connect needs a jump, pollute_receiver or invoke",
            ));
        }
        table.add_behavior(m, behavior);
        Ok(())
    }

    fn add_summary_seed(&self, table: &mut RuleTable, m: MethodId, entry: &ImitateEntry) -> ConfigResult<()> {
        let append = match entry.append.as_deref() {
            Some(pair) if pair.len() == 2 => pair,
            _ => {
                return Err(ConfigError::malformed(
                    "imitates",
                    &entry.method,
                    "summary needs 'append: [value, key]'",
                ))
            }
        };
        let value = match self.index("imitates", &entry.method, &append[0])? {
            BASE => ContrValue::this(),
            RESULT => ContrValue::Polluted,
            i => ContrValue::param(i as u32),
        };
        let key_index = self.index("imitates", &entry.method, &append[1])?;
        let key = SummaryKey::from_index(key_index).ok_or_else(|| {
            ConfigError::malformed("imitates", &entry.method, "bad summary key")
        })?;
        table.seed_summary(m, |summary| summary.set(key, value));
        Ok(())
    }

    fn add_ignore(&self, table: &mut RuleTable, entry: &IgnoreEntry) -> ConfigResult<()> {
        match (&entry.method, &entry.class) {
            (Some(sig), None) => {
                let mref = sig
                    .parse::<MethodRef>()
                    .map_err(|e| ConfigError::malformed("ignores", sig, e.to_string()))?;
                match self.program.method_by_signature(&mref.to_string()) {
                    Some(m) => table.ignore_method(m),
                    None => warn!("Cannot find ignored method '{}'", sig),
                }
            }
            (None, Some(class)) => match self.program.class_by_name(class) {
                Some(c) => table.ignore_class(c),
                None => warn!("Cannot find ignored class '{}'", class),
            },
            _ => {
                return Err(ConfigError::malformed(
                    "ignores",
                    format!("{:?}", entry),
                    "exactly one of 'method' or 'class' is required",
                ))
            }
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Resolution helpers
    // ═══════════════════════════════════════════════════════════════════════

    fn method(&self, table: &mut RuleTable, section: &str, sig: &str) -> ConfigResult<Option<MethodId>> {
        let mref = sig
            .parse::<MethodRef>()
            .map_err(|e| ConfigError::malformed(section, sig, e.to_string()))?;
        match self.program.method_by_signature(&mref.to_string()) {
            Some(m) => Ok(Some(m)),
            None if self.strict => Err(ConfigError::MissingMethod {
                section: section.to_string(),
                signature: sig.to_string(),
            }),
            None => {
                warn!("Cannot find {} method '{}'", section, sig);
                table.stats.missing += 1;
                Ok(None)
            }
        }
    }

    fn index(&self, section: &str, entry: &str, text: &IndexText) -> ConfigResult<i32> {
        let parsed = match text {
            IndexText::Number(n) => u32::try_from(*n).ok().map(|n| n as i32),
            IndexText::Text(s) => parse_index(s),
        };
        parsed.ok_or_else(|| {
            ConfigError::malformed(section, entry, format!("bad index reference '{}'", text))
        })
    }

    fn index_ref(&self, m: MethodId, entry: &str, text: &IndexText) -> ConfigResult<IndexRef> {
        let text = text.to_string();
        let bad = |reason: String| ConfigError::malformed("transfers", entry, reason);
        let (index, selector) =
            parse_index_ref(&text).ok_or_else(|| bad(format!("bad index reference '{}'", text)))?;
        let ty = self
            .index_type(m, index)
            .ok_or_else(|| bad(format!("index '{}' out of range", text)))?;
        let kind = match selector {
            IndexSelector::Var => IndexKind::Var,
            IndexSelector::Array => {
                if ty.element_type().is_none() {
                    return Err(bad(format!("expected an array type at '{}', found {}", text, ty)));
                }
                IndexKind::Array
            }
            IndexSelector::Field(name) => match self.program.field_of_type(&ty, &name) {
                Some(f) => IndexKind::Field(f),
                None => return Err(bad(format!("cannot find field '{}' in type {}", name, ty))),
            },
        };
        Ok(IndexRef { index, kind })
    }

    /// Declared type at a call-site index of `m`
    fn index_type(&self, m: MethodId, index: i32) -> Option<JavaType> {
        let info = self.program.method(m);
        match index {
            BASE => Some(self.program.class(info.class).class_type()),
            RESULT => Some(info.return_type.clone()),
            i => info.param_types.get(usize::try_from(i).ok()?).cloned(),
        }
    }

    fn ref_type(&self, m: MethodId, r: &IndexRef) -> Option<JavaType> {
        let ty = self.index_type(m, r.index)?;
        match r.kind {
            IndexKind::Var => Some(ty),
            IndexKind::Array => ty.element_type().cloned(),
            IndexKind::Field(f) => Some(self.program.field(f).ty.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::program::{ClassBuilder, MethodBuilder};
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn program() -> Program {
        let mut ro = MethodBuilder::new("readObject");
        ro.this_var("Gadget");
        ro.param("in", "java.io.ObjectInputStream");
        ro.ret(None);
        let gadget = ClassBuilder::new("Gadget")
            .implements("java.io.Serializable")
            .field("name", "java.lang.String")
            .method(ro.build())
            .build();
        let runtime = ClassBuilder::new("java.lang.Runtime")
            .method(
                MethodBuilder::new("exec")
                    .param_type("java.lang.String")
                    .returns("java.lang.Process")
                    .native_()
                    .build(),
            )
            .build();
        let class = ClassBuilder::new("java.lang.Class")
            .method(MethodBuilder::new("newInstance").returns("java.lang.Object").native_().build())
            .build();
        let sb = ClassBuilder::new("java.lang.StringBuilder")
            .method(
                MethodBuilder::new("append")
                    .param_type("java.lang.String")
                    .returns("java.lang.StringBuilder")
                    .native_()
                    .build(),
            )
            .method(
                MethodBuilder::new("wrap")
                    .param_type("Gadget[]")
                    .param_type("Gadget")
                    .returns("java.lang.Object")
                    .native_()
                    .build(),
            )
            .build();
        Program::new(vec![gadget, runtime, class, sb]).unwrap()
    }

    const RULES: &str = r#"
sources:
  - method: Serializable
sinks:
  - method: "<java.lang.Runtime: java.lang.Process exec(java.lang.String)>"
    index: [0]
transfers:
  - method: "<java.lang.StringBuilder: java.lang.Object wrap(Gadget[],Gadget)>"
    from: "0[*]"
    to: "1.name"
imitates:
  - method: "<java.lang.Class: java.lang.Object newInstance()>"
    action: connect
    jump: constructor
    filter: "name:getOutputProperties"
  - method: "<java.lang.StringBuilder: java.lang.StringBuilder append(java.lang.String)>"
    action: summary
    append: [0, base]
ignores:
  - class: java.lang.Class
  - class: com.example.Missing
"#;

    #[test]
    fn test_full_rule_file() {
        let p = program();
        let rules = RuleLoader::new(&p, true).load_str(RULES).unwrap();

        let ro = p
            .method_by_signature("<Gadget: void readObject(java.io.ObjectInputStream)>")
            .unwrap();
        assert!(rules.is_source(ro));

        let exec = p
            .method_by_signature("<java.lang.Runtime: java.lang.Process exec(java.lang.String)>")
            .unwrap();
        assert_eq!(rules.sink_indices(exec), Some(&[0][..]));

        let wrap = p
            .method_by_signature("<java.lang.StringBuilder: java.lang.Object wrap(Gadget[],Gadget)>")
            .unwrap();
        let transfer = &rules.transfers(wrap)[0];
        assert_eq!(transfer.from.kind, IndexKind::Array);
        assert_eq!(transfer.ty, JavaType::string());

        let new_instance = p
            .method_by_signature("<java.lang.Class: java.lang.Object newInstance()>")
            .unwrap();
        let behavior = rules.behavior(new_instance).unwrap();
        assert_eq!(behavior.jump, Some(Jump::Constructor));
        assert_eq!(
            behavior.filter,
            Some(CallerFilter::Name("getOutputProperties".to_string()))
        );
        assert!(rules.is_ignored(&p, new_instance));

        let (seeded, summary) = rules.seeded_summaries().next().unwrap();
        assert_eq!(p.method(seeded).name, "append");
        assert_eq!(summary.get(&SummaryKey::This), Some(&ContrValue::param(0)));
    }

    #[test]
    fn test_load_from_file() {
        let p = program();
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(RULES.as_bytes()).unwrap();
        let rules = RuleLoader::new(&p, true).load(file.path()).unwrap();
        assert_eq!(rules.stats.sinks, 1);
    }

    // ========== EDGE CASES ==========

    #[test]
    fn test_missing_method_strict_vs_lenient() {
        let p = program();
        let yaml = r#"
sinks:
  - method: "<javax.naming.Context: java.lang.Object lookup(java.lang.String)>"
    index: [0]
"#;
        let err = RuleLoader::new(&p, true).load_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingMethod { .. }));

        let rules = RuleLoader::new(&p, false).load_str(yaml).unwrap();
        assert_eq!(rules.stats.missing, 1);
        assert_eq!(rules.stats.sinks, 0);
    }

    #[test]
    fn test_array_ref_on_non_array_rejected() {
        let p = program();
        let yaml = r#"
transfers:
  - method: "<java.lang.StringBuilder: java.lang.Object wrap(Gadget[],Gadget)>"
    from: "1[*]"
    to: result
"#;
        let err = RuleLoader::new(&p, false).load_str(yaml).unwrap_err();
        assert!(err.to_string().contains("expected an array type"));
    }

    #[test]
    fn test_unknown_field_ref_rejected() {
        let p = program();
        let yaml = r#"
transfers:
  - method: "<java.lang.StringBuilder: java.lang.Object wrap(Gadget[],Gadget)>"
    from: "1.nope"
    to: result
"#;
        let err = RuleLoader::new(&p, false).load_str(yaml).unwrap_err();
        assert!(err.to_string().contains("cannot find field 'nope'"));
    }

    #[test]
    fn test_unknown_jump_suggests() {
        let p = program();
        let yaml = r#"
imitates:
  - method: "<java.lang.Class: java.lang.Object newInstance()>"
    action: connect
    jump: constructr
"#;
        let err = RuleLoader::new(&p, true).load_str(yaml).unwrap_err();
        assert!(err.to_string().contains("Did you mean 'constructor'?"));
    }

    #[test]
    fn test_bad_signature_is_malformed() {
        let p = program();
        let yaml = "sources:\n  - method: \"exec(String)\"\n";
        let err = RuleLoader::new(&p, false).load_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedRule { .. }));
    }

    #[test]
    fn test_sink_index_out_of_range() {
        let p = program();
        let yaml = r#"
sinks:
  - method: "<java.lang.Runtime: java.lang.Process exec(java.lang.String)>"
    index: [3]
"#;
        let err = RuleLoader::new(&p, true).load_str(yaml).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }
}
