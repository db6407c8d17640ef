//! Analysis lifecycle hooks
//!
//! Plugins observe a run without touching the solver: they are told when it
//! starts and ends, and may ask for other methods to be summarized before a
//! method is analyzed for the first time.

use crate::features::program::domain::MethodId;
use crate::features::program::Program;
use crate::features::rules::RuleTable;

pub trait AnalysisPlugin {
    fn name(&self) -> &'static str;

    fn on_start(&mut self) {}

    fn on_finish(&mut self) {}

    /// Called before `method` is analyzed. Returned methods are analyzed
    /// first, in order.
    fn on_new_method(&mut self, _program: &Program, _rules: &RuleTable, _method: MethodId) -> Vec<MethodId> {
        Vec::new()
    }
}
