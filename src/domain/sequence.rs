// ============================================================
// Layer 3 - SourceSequence Domain Type
// ============================================================
// One input sentence, already mapped to token ids.
// Text form: token ids separated by whitespace, e.g. "4 17 9 2".

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSequence {
    pub tokens: Vec<u32>,
}

impl SourceSequence {
    pub fn new(tokens: Vec<u32>) -> Self {
        Self { tokens }
    }

    /// Parse a whitespace separated list of token ids.
    pub fn parse(line: &str) -> Result<Self> {
        let tokens = line
            .split_whitespace()
            .map(|t| {
                t.parse::<u32>()
                    .with_context(|| format!("'{t}' is not a token id"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { tokens })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Largest token id, if any.
    pub fn max_token(&self) -> Option<u32> {
        self.tokens.iter().copied().max()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let seq = SourceSequence::parse("  4 17\t9 2 ").unwrap();
        assert_eq!(seq.tokens, vec![4, 17, 9, 2]);
        assert_eq!(seq.max_token(), Some(17));
    }

    #[test]
    fn test_parse_rejects_words() {
        let err = SourceSequence::parse("4 cat 2").unwrap_err();
        assert!(err.to_string().contains("cat"));
    }

    #[test]
    fn test_empty_line() {
        let seq = SourceSequence::parse("").unwrap();
        assert!(seq.is_empty());
        assert_eq!(seq.max_token(), None);
    }
}
