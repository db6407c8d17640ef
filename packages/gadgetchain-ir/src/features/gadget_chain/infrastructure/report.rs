//! Chain sinks: text report, JSON report, in-memory collector

use crate::errors::Result;
use crate::features::gadget_chain::domain::{ChainReport, GadgetChain};
use crate::features::gadget_chain::ports::ChainSink;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Plain-text report: one block per chain followed by a blank line, then
/// `total GC count: N` and, when a budget cut the search, `truncated: true`
pub struct TextReportWriter<W: Write + Send> {
    out: Mutex<W>,
}

impl TextReportWriter<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write + Send> TextReportWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write + Send> ChainSink for TextReportWriter<W> {
    fn accept(&self, chain: &GadgetChain) -> Result<()> {
        let mut out = self.out.lock();
        write!(out, "{}", chain)?;
        writeln!(out)?;
        Ok(())
    }

    fn finish(&self, report: &ChainReport) -> Result<()> {
        let mut out = self.out.lock();
        writeln!(out, "total GC count: {}", report.total())?;
        if report.truncated {
            writeln!(out, "truncated: true")?;
        }
        out.flush()?;
        Ok(())
    }
}

/// Whole report as pretty-printed JSON, written on `finish`
pub struct JsonReportWriter<W: Write + Send> {
    out: Mutex<W>,
}

impl JsonReportWriter<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write + Send> JsonReportWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write + Send> ChainSink for JsonReportWriter<W> {
    fn accept(&self, _chain: &GadgetChain) -> Result<()> {
        Ok(())
    }

    fn finish(&self, report: &ChainReport) -> Result<()> {
        let mut out = self.out.lock();
        serde_json::to_writer_pretty(&mut *out, report)?;
        writeln!(out)?;
        out.flush()?;
        Ok(())
    }
}

/// Keeps chains in memory
#[derive(Debug, Default)]
pub struct ChainCollector {
    chains: Mutex<Vec<GadgetChain>>,
    truncated: Mutex<Option<bool>>,
}

impl ChainCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chains(&self) -> Vec<GadgetChain> {
        self.chains.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.chains.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.lock().is_empty()
    }

    /// `None` until the report was finished
    pub fn truncated(&self) -> Option<bool> {
        *self.truncated.lock()
    }
}

impl ChainSink for ChainCollector {
    fn accept(&self, chain: &GadgetChain) -> Result<()> {
        self.chains.lock().push(chain.clone());
        Ok(())
    }

    fn finish(&self, report: &ChainReport) -> Result<()> {
        *self.truncated.lock() = Some(report.truncated);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::gadget_chain::domain::ChainHop;
    use crate::features::gadget_chain::ports::write_report;
    use pretty_assertions::assert_eq;

    fn report(truncated: bool) -> ChainReport {
        ChainReport {
            chains: vec![GadgetChain {
                hops: vec![ChainHop {
                    caller: "<A: void readObject(java.io.ObjectInputStream)>".to_string(),
                    vector: vec![-1, -3],
                }],
                sink: "<B: void exec(java.lang.String)>".to_string(),
            }],
            truncated,
        }
    }

    #[test]
    fn test_text_report_layout() {
        let writer = TextReportWriter::new(Vec::new());
        write_report(&report(false), &writer).unwrap();
        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(
            text,
            "<A: void readObject(java.io.ObjectInputStream)>->[-1, -3]\n\
             <B: void exec(java.lang.String)>\n\
             \n\
             total GC count: 1\n"
        );
    }

    #[test]
    fn test_truncated_marker() {
        let writer = TextReportWriter::new(Vec::new());
        write_report(&report(true), &writer).unwrap();
        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert!(text.ends_with("total GC count: 1\ntruncated: true\n"));
    }

    #[test]
    fn test_json_report_parses_back() {
        let writer = JsonReportWriter::new(Vec::new());
        write_report(&report(true), &writer).unwrap();
        let parsed: ChainReport = serde_json::from_slice(&writer.into_inner()).unwrap();
        assert_eq!(parsed, report(true));
    }

    #[test]
    fn test_collector() {
        let collector = ChainCollector::new();
        assert_eq!(collector.truncated(), None);
        write_report(&report(false), &collector).unwrap();
        assert_eq!(collector.len(), 1);
        assert_eq!(collector.truncated(), Some(false));
    }

    // ========== EDGE CASES ==========

    #[test]
    fn test_empty_report_is_not_truncated() {
        let writer = TextReportWriter::new(Vec::new());
        write_report(&ChainReport::default(), &writer).unwrap();
        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(text, "total GC count: 0\n");
    }

    #[test]
    fn test_text_report_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chains.txt");
        let writer = TextReportWriter::create(&path).unwrap();
        write_report(&report(false), &writer).unwrap();
        drop(writer);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("total GC count: 1"));
    }
}
