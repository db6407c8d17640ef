//! Rule table and options loading against real files

mod common;

use common::*;
use gadgetchain_ir::features::controllability::ContrValue;
use gadgetchain_ir::features::program::{ClassBuilder, MethodBuilder};
use gadgetchain_ir::features::summary::SummaryKey;
use gadgetchain_ir::{AnalysisOptions, ConfigError, GadgetChainPipeline, GadgetError, Preset, RuleLoader, SummaryEngine};
use pretty_assertions::assert_eq;

const STRING_BUILDER: &str = "java.lang.StringBuilder";

fn library_program() -> gadgetchain_ir::Program {
    let sb = ClassBuilder::new(STRING_BUILDER)
        .method(
            MethodBuilder::new("append")
                .param_type(STRING)
                .returns(STRING_BUILDER)
                .native_()
                .build(),
        )
        .method(MethodBuilder::new("toString").returns(STRING).native_().build())
        .build();
    let logger = ClassBuilder::new("java.util.logging.Logger")
        .method(MethodBuilder::new("info").param_type(STRING).native_().build())
        .build();
    program(vec![
        runtime_class(),
        sb,
        logger,
        GadgetBuilder::new("Gadget").wrappers(1).build(),
    ])
}

const FULL_RULES: &str = r#"
sources:
  - method: Serializable
sinks:
  - method: "<java.lang.Runtime: void exec(java.lang.String)>"
    index: [0]
transfers:
  - method: "<java.lang.StringBuilder: java.lang.String toString()>"
    from: base
    to: result
imitates:
  - method: "<java.lang.StringBuilder: java.lang.StringBuilder append(java.lang.String)>"
    action: summary
    append: [0, base]
ignores:
  - class: java.util.logging.Logger
"#;

// ============================================================================
// Rule table
// ============================================================================

#[test]
fn test_full_rule_file_resolves() {
    let p = library_program();
    let rules = RuleLoader::new(&p, true).load_str(FULL_RULES).unwrap();

    assert_eq!(rules.stats.sinks, 1);
    assert_eq!(rules.stats.transfers, 1);
    assert_eq!(rules.stats.ignores, 1);
    assert_eq!(rules.entries().len(), 1);
    let info = p
        .method_by_signature("<java.util.logging.Logger: void info(java.lang.String)>")
        .unwrap();
    assert!(rules.is_ignored(&p, info));
}

#[test]
fn test_seeded_summary_visible_after_run() {
    let p = library_program();
    let rules = RuleLoader::new(&p, true).load_str(FULL_RULES).unwrap();
    let options = AnalysisOptions::default();
    let mut engine = SummaryEngine::new(&p, &rules, &options);
    engine.run();

    let append = p
        .method_by_signature("<java.lang.StringBuilder: java.lang.StringBuilder append(java.lang.String)>")
        .unwrap();
    let summary = engine.summary(append).unwrap();
    assert_eq!(summary.get(&SummaryKey::This), Some(&ContrValue::param(0)));
}

#[test]
fn test_check_rules_from_files() {
    let classes = vec![runtime_class(), GadgetBuilder::new("Gadget").build()];
    let ws = Workspace::new(&classes, EXEC_RULES);
    let pipeline = GadgetChainPipeline::new(AnalysisOptions::default()).unwrap();
    let stats = pipeline.check_rules(&ws.program, &ws.rules).unwrap();
    assert_eq!(stats.sinks, 1);
    assert_eq!(stats.missing, 0);
}

// ========== EDGE CASES ==========

#[test]
fn test_missing_method_strict_vs_lenient() {
    let p = library_program();
    let yaml = r#"
sinks:
  - method: "<java.lang.ProcessBuilder: java.lang.Process start()>"
    index: [base]
"#;
    let err = RuleLoader::new(&p, true).load_str(yaml).unwrap_err();
    assert!(matches!(err, ConfigError::MissingMethod { ref section, .. } if section == "sinks"));

    let rules = RuleLoader::new(&p, false).load_str(yaml).unwrap();
    assert_eq!(rules.stats.missing, 1);
    assert_eq!(rules.stats.sinks, 0);
}

#[test]
fn test_malformed_signature_aborts() {
    let p = library_program();
    let yaml = r#"
sinks:
  - method: "java.lang.Runtime.exec"
    index: [0]
"#;
    let err = RuleLoader::new(&p, false).load_str(yaml).unwrap_err();
    assert!(matches!(err, ConfigError::MalformedRule { .. }));
}

#[test]
fn test_sink_index_out_of_range() {
    let p = library_program();
    let yaml = r#"
sinks:
  - method: "<java.lang.Runtime: void exec(java.lang.String)>"
    index: [3]
"#;
    let err = RuleLoader::new(&p, true).load_str(yaml).unwrap_err();
    assert!(err.to_string().contains("out of range"));
}

#[test]
fn test_unknown_action_suggests_valid_ones() {
    let p = library_program();
    let yaml = r#"
imitates:
  - method: "<java.lang.StringBuilder: java.lang.String toString()>"
    action: conect
    jump: toString
"#;
    let err = RuleLoader::new(&p, true).load_str(yaml).unwrap_err();
    assert!(matches!(err, ConfigError::UnknownField { .. }));
}

#[test]
fn test_unknown_yaml_key_is_rejected() {
    let p = library_program();
    let err = RuleLoader::new(&p, true).load_str("sinkz: []").unwrap_err();
    assert!(matches!(err, ConfigError::Yaml(_)));
}

#[test]
fn test_missing_rules_file_surfaces_through_pipeline() {
    let classes = vec![runtime_class()];
    let ws = Workspace::new(&classes, "");
    let pipeline = GadgetChainPipeline::new(AnalysisOptions::default()).unwrap();
    let err = pipeline.check_rules(&ws.program, ws.path("absent.yaml")).unwrap_err();
    assert!(matches!(err, GadgetError::Config(ConfigError::Io(_))));
}

// ============================================================================
// Options
// ============================================================================

#[test]
fn test_options_file_overrides_preset() {
    let ws = Workspace::new(&[], "");
    let path = ws.write(
        "options.yaml",
        "version: 1\npreset: fast\noverrides:\n  max_len: 5\n  filter_non_serializable: false\n",
    );
    let options = AnalysisOptions::from_yaml(&path).unwrap();
    let fast = AnalysisOptions::preset(Preset::Fast);
    assert_eq!(options.max_len, 5);
    assert!(!options.filter_non_serializable);
    assert_eq!(options.max_chains, fast.max_chains);
}

#[test]
fn test_options_out_of_range_rejected() {
    let ws = Workspace::new(&[], "");
    let path = ws.write("options.yaml", "version: 1\noverrides:\n  max_len: 100\n");
    let err = AnalysisOptions::from_yaml(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Range { .. }));
}

#[test]
fn test_options_without_version_rejected() {
    let ws = Workspace::new(&[], "");
    let path = ws.write("options.yaml", "preset: thorough\n");
    let err = AnalysisOptions::from_yaml(&path).unwrap_err();
    assert!(matches!(err, ConfigError::MissingVersion));
}

#[test]
fn test_options_yaml_round_trip() {
    let options = AnalysisOptions::preset(Preset::Thorough).max_len(9);
    let yaml = options.to_yaml().unwrap();
    let back = AnalysisOptions::from_yaml_str(&yaml).unwrap();
    assert_eq!(back, options);
}
