// ============================================================
// Layer 3 - Core Traits (Abstractions)
// ============================================================
// The decode workflow reads source sequences from somewhere
// and hands decoded hypotheses to something. Both ends are
// traits so the application layer does not depend on files.
//
// Implementations:
//   SequenceSource  - data::loader::TokenFileLoader
//   HypothesisSink  - infra::report::JsonlReport
//                     application::decode_use_case::CollectSink

use anyhow::Result;

use crate::domain::hypothesis::Hypothesis;
use crate::domain::sequence::SourceSequence;

/// Anything that can produce source sequences to decode.
pub trait SequenceSource {
    fn load_all(&self) -> Result<Vec<SourceSequence>>;
}

/// Anything that accepts the ranked hypotheses of one source sequence.
pub trait HypothesisSink {
    /// `index` is the position of the source sequence in its input.
    fn accept(&mut self, index: usize, source: &SourceSequence, hypotheses: &[Hypothesis]) -> Result<()>;

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}
