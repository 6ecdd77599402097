// ============================================================
// Layer 6 - JSONL Hypothesis Report
// ============================================================
// Writes one JSON object per decoded source sequence:
//
//   {"sample":0,"source":[4,17,9,2],"hypotheses":[{"tokens":[3,1],"score":-1.2}, ...]}
//
// The file is truncated when the report is created.

use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::PathBuf,
};

use crate::domain::hypothesis::Hypothesis;
use crate::domain::sequence::SourceSequence;
use crate::domain::traits::HypothesisSink;

/// One line of the report, borrowed from the sink arguments.
#[derive(Serialize)]
struct ReportLine<'a> {
    sample:     usize,
    source:     &'a [u32],
    hypotheses: &'a [Hypothesis],
}

// ─── JsonlReport ──────────────────────────────────────────────────────────────
/// A HypothesisSink that writes every decoded sample to a .jsonl file.
pub struct JsonlReport {
    /// Where the report is written
    path:   PathBuf,
    /// Buffered; flushed by `finish`
    writer: BufWriter<File>,
    /// Lines written so far
    lines:  usize,
}

impl JsonlReport {
    /// Create (or truncate) the report file, creating parent
    /// directories as needed.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&path)
            .with_context(|| format!("Cannot create report '{}'", path.display()))?;
        Ok(Self { path, writer: BufWriter::new(file), lines: 0 })
    }

    /// Path of the report file
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl HypothesisSink for JsonlReport {
    /// Append one JSON line for sample `index`.
    fn accept(&mut self, index: usize, source: &SourceSequence, hypotheses: &[Hypothesis]) -> Result<()> {
        let line = ReportLine { sample: index, source: &source.tokens, hypotheses };
        serde_json::to_writer(&mut self.writer, &line)?;
        writeln!(self.writer)?;
        self.lines += 1;
        Ok(())
    }

    /// Flush the buffered lines to disk.
    fn finish(&mut self) -> Result<()> {
        self.writer.flush()
            .with_context(|| format!("Cannot flush report '{}'", self.path.display()))?;
        tracing::info!("Wrote {} lines to '{}'", self.lines, self.path.display());
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_one_line_per_sample() {
        let path = std::env::temp_dir()
            .join(format!("attention-decoder-report-{}.jsonl", std::process::id()));

        let mut report = JsonlReport::create(&path).unwrap();
        assert_eq!(report.path(), &path);
        let hyps = vec![
            Hypothesis { tokens: vec![3, 1], score: -0.5 },
            Hypothesis { tokens: vec![2, 2], score: -1.5 },
        ];
        report.accept(0, &SourceSequence::new(vec![4, 5]), &hyps).unwrap();
        report.accept(1, &SourceSequence::new(vec![6]), &hyps[..1]).unwrap();
        report.finish().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        fs::remove_file(&path).ok();

        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["source"], serde_json::json!([4, 5]));
        assert_eq!(lines[0]["hypotheses"][1]["tokens"], serde_json::json!([2, 2]));
        assert_eq!(lines[1]["sample"], 1);
    }
}
