// ============================================================
// Layer 2 - DecodeUseCase
// ============================================================
// Runs beam search over every sequence of a source file:
//
//   Step 1: Load checkpoint                (Layer 6 - infra)
//   Step 2: Apply search overrides + check (Layer 5 - ml)
//   Step 3: Load source sequences          (Layer 4 - data)
//   Step 4: For each batch:
//             pad into a tensor            (Layer 4 - data)
//             encode + beam search         (Layer 5 - ml)
//             backtrace hypotheses         (Layer 3 - domain)
//             hand them to every sink

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::data::{batcher::SourceBatcher, loader::TokenFileLoader};
use crate::domain::{
    hypothesis::Hypothesis,
    sequence::SourceSequence,
    traits::{HypothesisSink, SequenceSource},
};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::InferBackend;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodeConfig {
    pub checkpoint_dir:    String,
    pub source_file:       String,
    pub start_token:       u32,
    pub batch_size:        usize,
    /// Overrides the beam size stored in the checkpoint
    pub beam_size:         Option<usize>,
    /// Overrides the output length stored in the checkpoint
    pub max_output_length: Option<usize>,
}

/// The ranked hypotheses of one source sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedSample {
    pub index:      usize,
    pub source:     SourceSequence,
    pub hypotheses: Vec<Hypothesis>,
}

/// Keeps everything it is given, in order.
#[derive(Debug, Default)]
pub struct CollectSink {
    pub samples: Vec<DecodedSample>,
}

impl HypothesisSink for CollectSink {
    fn accept(&mut self, index: usize, source: &SourceSequence, hypotheses: &[Hypothesis]) -> Result<()> {
        self.samples.push(DecodedSample {
            index,
            source: source.clone(),
            hypotheses: hypotheses.to_vec(),
        });
        Ok(())
    }
}

pub struct DecodeUseCase {
    config: DecodeConfig,
}

impl DecodeUseCase {
    pub fn new(config: DecodeConfig) -> Self {
        Self { config }
    }

    /// Decode everything and return the collected results; `report`, when
    /// given, receives the same hypotheses.
    pub fn execute(&self, report: Option<&mut dyn HypothesisSink>) -> Result<Vec<DecodedSample>> {
        let mut collect = CollectSink::default();
        match report {
            Some(report) => self.decode_into(&mut [&mut collect, report])?,
            None         => self.decode_into(&mut [&mut collect])?,
        };
        Ok(collect.samples)
    }

    /// Decode every source sequence, feeding each sink; returns the count.
    pub fn decode_into(&self, sinks: &mut [&mut dyn HypothesisSink]) -> Result<usize> {
        let cfg = &self.config;
        ensure!(cfg.batch_size > 0, "batch_size must be positive");

        // ── Step 1: Load checkpoint ───────────────────────────────────────────
        let device = Default::default();
        let ckpt   = CheckpointManager::new(&cfg.checkpoint_dir);
        let (mut model_cfg, model) = ckpt.load::<InferBackend>(&device)?;

        // ── Step 2: Search overrides ──────────────────────────────────────────
        if let Some(beam) = cfg.beam_size {
            model_cfg.decoder.beam_size = beam;
        }
        if let Some(len) = cfg.max_output_length {
            model_cfg.decoder.max_output_length = len;
        }
        model_cfg.validate()?;
        ensure!(
            (cfg.start_token as usize) < model_cfg.decoder.core.vocab_size,
            "start token {} is outside the target vocabulary of {}",
            cfg.start_token, model_cfg.decoder.core.vocab_size,
        );
        let model = model.with_search(cfg.beam_size, cfg.max_output_length);

        // ── Step 3: Load sources ──────────────────────────────────────────────
        let sources = TokenFileLoader::new(&cfg.source_file).load_all()?;
        let src_vocab = model_cfg.encoder.vocab_size;
        for (i, seq) in sources.iter().enumerate() {
            ensure!(!seq.is_empty(), "source sequence {i} is empty");
            if let Some(max) = seq.max_token() {
                ensure!(
                    (max as usize) < src_vocab,
                    "source sequence {i} uses token {max}, outside the source vocabulary of {src_vocab}",
                );
            }
        }
        tracing::info!(
            "Decoding {} sequences (beam={}, max_len={})",
            sources.len(), model_cfg.decoder.beam_size, model_cfg.decoder.max_output_length,
        );

        // ── Step 4: Decode batch by batch ─────────────────────────────────────
        let batcher = SourceBatcher::<InferBackend>::new(device);
        for (b, chunk) in sources.chunks(cfg.batch_size).enumerate() {
            let batch   = batcher.batch(chunk)?;
            let lattice = model
                .decode(batch.tokens, Some(batch.padding_mask), cfg.start_token)
                .into_lattice()?;

            for (offset, source) in chunk.iter().enumerate() {
                let index      = b * cfg.batch_size + offset;
                let hypotheses = lattice.hypotheses(offset);
                for sink in sinks.iter_mut() {
                    sink.accept(index, source, &hypotheses)?;
                }
            }
            tracing::debug!("Batch {} done ({} sequences)", b + 1, chunk.len());
        }

        for sink in sinks.iter_mut() {
            sink.finish()?;
        }
        Ok(sources.len())
    }
}
