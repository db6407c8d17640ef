//! Pipeline result container and run metadata

use crate::features::gadget_chain::domain::ChainReport;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════
// Stage Metrics
// ═══════════════════════════════════════════════════════════════════════════

/// Timing of one pipeline stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageMetrics {
    pub name: &'static str,
    pub duration: Duration,
    /// Items the stage produced (methods, rules, chains)
    pub items: usize,
}

impl StageMetrics {
    pub fn new(name: &'static str, duration: Duration, items: usize) -> Self {
        Self { name, duration, items }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Metadata
// ═══════════════════════════════════════════════════════════════════════════

/// Counters of one analysis run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineMetadata {
    pub total_duration: Duration,
    pub classes: usize,
    pub methods: usize,
    pub entries: usize,
    pub sinks: usize,
    /// Rule entries skipped because their method is absent
    pub missing_rules: usize,
    pub methods_analyzed: usize,
    /// Methods whose solver hit the iteration cap
    pub not_converged: usize,
    pub call_edges: usize,
    pub chains: usize,
    pub truncated: bool,
}

// ═══════════════════════════════════════════════════════════════════════════
// Result
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub report: ChainReport,
    pub metadata: PipelineMetadata,
    pub stage_metrics: Vec<StageMetrics>,
}

impl PipelineResult {
    /// Number of chains ending in each sink signature
    pub fn chains_by_sink(&self) -> AHashMap<String, usize> {
        let mut counts: AHashMap<String, usize> = AHashMap::new();
        for chain in &self.report.chains {
            *counts.entry(chain.sink.clone()).or_insert(0) += 1;
        }
        counts
    }

    pub fn stage(&self, name: &str) -> Option<&StageMetrics> {
        self.stage_metrics.iter().find(|s| s.name == name)
    }

    /// One-line human summary
    pub fn summary(&self) -> String {
        let m = &self.metadata;
        format!(
            "{} chains{} | {} methods analyzed ({} not converged) | {} call edges | {:.2?}",
            m.chains,
            if m.truncated { " (truncated)" } else { "" },
            m.methods_analyzed,
            m.not_converged,
            m.call_edges,
            m.total_duration
        )
    }
}
