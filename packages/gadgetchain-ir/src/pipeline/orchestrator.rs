/*
 * Gadget Chain Pipeline
 *
 * Stages:
 * 1. load    - program dump (JSON) and rule table (YAML, resolved against it)
 * 2. analyze - summary engine from every entry; chains are found on the fly
 * 3. report  - finished report through a ChainSink
 *
 * Options are validated once at construction; every later failure is an
 * input problem (missing file, malformed rule), never an analysis error.
 */

use super::result::{PipelineMetadata, PipelineResult, StageMetrics};
use crate::config::AnalysisOptions;
use crate::errors::Result;
use crate::features::gadget_chain::{write_report, ChainSink};
use crate::features::program::Program;
use crate::features::rules::{RuleLoader, RuleStats, RuleTable};
use crate::features::summary::SummaryEngine;
use std::path::Path;
use std::time::Instant;
use tracing::info;

pub const STAGE_LOAD: &str = "load";
pub const STAGE_ANALYZE: &str = "analyze";
pub const STAGE_REPORT: &str = "report";

pub struct GadgetChainPipeline {
    options: AnalysisOptions,
}

impl GadgetChainPipeline {
    pub fn new(options: AnalysisOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Loading
    // ═══════════════════════════════════════════════════════════════════════

    pub fn load_program(&self, path: impl AsRef<Path>) -> Result<Program> {
        let path = path.as_ref();
        info!("Loading program from {}", path.display());
        let program = Program::from_json_file(path)?;
        info!(
            "Program: {} classes, {} methods",
            program.classes().count(),
            program.method_count()
        );
        Ok(program)
    }

    pub fn load_rules(&self, program: &Program, path: impl AsRef<Path>) -> Result<RuleTable> {
        let rules = RuleLoader::new(program, self.options.strict_rules).load(path)?;
        Ok(rules)
    }

    /// Resolve a rule file without analyzing anything
    pub fn check_rules(&self, program_path: impl AsRef<Path>, rules_path: impl AsRef<Path>) -> Result<RuleStats> {
        let program = self.load_program(program_path)?;
        let rules = self.load_rules(&program, rules_path)?;
        Ok(rules.stats)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Running
    // ═══════════════════════════════════════════════════════════════════════

    /// Load both inputs from disk, analyze, and feed the report to `sink`
    pub fn run_files(
        &self,
        program_path: impl AsRef<Path>,
        rules_path: impl AsRef<Path>,
        sink: &dyn ChainSink,
    ) -> Result<PipelineResult> {
        let start = Instant::now();
        let program = self.load_program(program_path)?;
        let rules = self.load_rules(&program, rules_path)?;
        let load = StageMetrics::new(STAGE_LOAD, start.elapsed(), program.method_count());

        let mut result = self.run_into(&program, &rules, sink)?;
        result.stage_metrics.insert(0, load);
        result.metadata.total_duration = start.elapsed();
        Ok(result)
    }

    /// Analyze an in-memory program and feed the report to `sink`
    pub fn run_into(&self, program: &Program, rules: &RuleTable, sink: &dyn ChainSink) -> Result<PipelineResult> {
        let mut result = self.run(program, rules);

        let start = Instant::now();
        write_report(&result.report, sink)?;
        result
            .stage_metrics
            .push(StageMetrics::new(STAGE_REPORT, start.elapsed(), result.report.total()));
        result.metadata.total_duration += start.elapsed();
        Ok(result)
    }

    /// Analyze an in-memory program
    pub fn run(&self, program: &Program, rules: &RuleTable) -> PipelineResult {
        let start = Instant::now();
        let mut engine = SummaryEngine::with_default_plugins(program, rules, &self.options);
        engine.run();
        let stats = engine.stats.clone();
        let report = engine.into_report();
        let elapsed = start.elapsed();

        let metadata = PipelineMetadata {
            total_duration: elapsed,
            classes: program.classes().count(),
            methods: program.method_count(),
            entries: rules.entries().len(),
            sinks: rules.stats.sinks,
            missing_rules: rules.stats.missing,
            methods_analyzed: stats.methods_analyzed,
            not_converged: stats.not_converged,
            call_edges: stats.call_edges,
            chains: report.total(),
            truncated: report.truncated,
        };
        let result = PipelineResult {
            stage_metrics: vec![StageMetrics::new(STAGE_ANALYZE, elapsed, stats.methods_analyzed)],
            report,
            metadata,
        };
        info!("Pipeline finished: {}", result.summary());
        result
    }
}
