// ============================================================
// Layer 4 - Token File Loader
// ============================================================
// Reads source sequences from a plain text file, one sequence
// per line, token ids separated by whitespace:
//
//   # greetings
//   4 17 9 2
//   4 11 2
//
// Blank lines and lines starting with '#' are skipped.
// A malformed line is an error naming its line number.

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};

use crate::domain::sequence::SourceSequence;
use crate::domain::traits::SequenceSource;

/// Reads every sequence of one token-id file.
pub struct TokenFileLoader {
    /// Path to the source file
    path: PathBuf,
}

impl TokenFileLoader {
    /// Create a loader for `path`; the file is read by `load_all`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SequenceSource for TokenFileLoader {
    /// Parse the whole file in order.
    /// Fails on the first line that is not a list of token ids.
    fn load_all(&self) -> Result<Vec<SourceSequence>> {
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read source file '{}'", self.path.display()))?;

        let sequences = parse_lines(&text)
            .with_context(|| format!("Invalid source file '{}'", self.path.display()))?;

        tracing::debug!("Loaded {} sequences from '{}'", sequences.len(), self.path.display());
        Ok(sequences)
    }
}

/// Line numbers are 1-based and count skipped lines too.
fn parse_lines(text: &str) -> Result<Vec<SourceSequence>> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(number, line)| {
            SourceSequence::parse(line).with_context(|| format!("line {number}"))
        })
        .collect()
}
