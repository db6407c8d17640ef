//! Output port for discovered chains

use crate::errors::Result;
use crate::features::gadget_chain::domain::{ChainReport, GadgetChain};

/// Destination for a run's chains.
///
/// `accept` sees each chain in discovery order, `finish` the complete report
/// once. Implementations take `&self` so one sink can be shared by
/// concurrently running analyses.
pub trait ChainSink: Send + Sync {
    fn accept(&self, chain: &GadgetChain) -> Result<()>;

    fn finish(&self, report: &ChainReport) -> Result<()>;
}

/// Feed a finished report through `sink`
pub fn write_report(report: &ChainReport, sink: &dyn ChainSink) -> Result<()> {
    for chain in &report.chains {
        sink.accept(chain)?;
    }
    sink.finish(report)
}
