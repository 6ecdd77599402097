// ============================================================
// Layer 5 - Sequence-to-Sequence Model
// ============================================================
// Bidirectional encoder + beam search decoder. This is the
// model the checkpoint manager saves and the decode workflow
// runs. A padding mask keeps padded source steps out of both the
// backward encoder pass and the attention, so a sequence decodes
// the same no matter what it is batched with.

use anyhow::{ensure, Result};
use burn::{prelude::*, tensor::TensorData};

use crate::ml::beam_search::{BeamSearchDecoder, BeamSearchDecoderConfig, BeamSearchOutput};
use crate::ml::encoder::{BiRnnEncoder, BiRnnEncoderConfig};

/// Encoder and decoder configs, saved together as the checkpoint's
/// `model_config.json`.
#[derive(Config, Debug)]
pub struct Seq2SeqConfig {
    pub encoder: BiRnnEncoderConfig,
    pub decoder: BeamSearchDecoderConfig,
}

impl Seq2SeqConfig {
    /// Check both halves and that the decoder attends over exactly the
    /// width the encoder produces.
    pub fn validate(&self) -> Result<()> {
        self.decoder.validate()?;
        ensure!(
            self.encoder.vocab_size > 0 && self.encoder.embedding_dim > 0 && self.encoder.hidden_size > 0,
            "encoder dimensions must be positive: {:?}",
            self.encoder,
        );
        ensure!(
            self.encoder.context_dim() == self.decoder.core.context_dim,
            "encoder produces {}-wide contexts but the decoder attends over {}",
            self.encoder.context_dim(), self.decoder.core.context_dim,
        );
        Ok(())
    }

    /// Fresh weights for both halves.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Seq2SeqModel<B> {
        Seq2SeqModel {
            encoder: self.encoder.init(device),
            decoder: self.decoder.init(device),
        }
    }
}

/// The full model: encode once, then beam search over the context.
#[derive(Module, Debug)]
pub struct Seq2SeqModel<B: Backend> {
    pub encoder: BiRnnEncoder<B>,
    pub decoder: BeamSearchDecoder<B>,
}

impl<B: Backend> Seq2SeqModel<B> {
    /// source: [batch, time], padding_mask: [batch, time] (true = padding)
    /// → beam search over the target vocabulary, every sample starting
    /// from `start_token`.
    pub fn decode(
        &self,
        source:       Tensor<B, 2, Int>,
        padding_mask: Option<Tensor<B, 2, Bool>>,
        start_token:  u32,
    ) -> BeamSearchOutput<B> {
        let [batch, _] = source.dims();
        let device     = source.device();
        let context    = self.encoder.forward(source, padding_mask.clone());
        let initial    = Tensor::<B, 2, Int>::from_data(
            TensorData::new(vec![start_token as i64; batch], [batch, 1]),
            &device,
        );
        self.decoder.forward(initial, context, padding_mask)
    }

    /// Override the search width and output length without touching the weights.
    pub fn with_search(mut self, beam_size: Option<usize>, max_output_length: Option<usize>) -> Self {
        if let Some(beam) = beam_size {
            self.decoder.beam_size = beam;
        }
        if let Some(len) = max_output_length {
            self.decoder.max_output_length = len;
        }
        self
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::decoder::DecoderCoreConfig;
    use crate::ml::mlp::{Activation, MlpClassifierConfig};
    use crate::ml::test_util::TestBackend;

    fn small_config() -> Seq2SeqConfig {
        Seq2SeqConfig::new(
            BiRnnEncoderConfig::new(6, 4, 3),
            BeamSearchDecoderConfig::new(
                DecoderCoreConfig::new(5, 4, 6, 3, 2),
                MlpClassifierConfig::new(3, 5, vec![4], vec![Activation::Tanh]),
            )
            .with_beam_size(2)
            .with_max_output_length(3),
        )
    }

    #[test]
    fn test_validate_context_width() {
        assert!(small_config().validate().is_ok());
        let mut cfg = small_config();
        cfg.encoder.hidden_size = 4;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_decode_shapes() {
        let device = Default::default();
        let model: Seq2SeqModel<TestBackend> = small_config().init(&device);
        let source = Tensor::<TestBackend, 2, Int>::from_ints([[1, 2, 3, 0], [5, 4, 3, 2], [1, 1, 1, 1]], &device);
        let out = model.decode(source, None, 0);
        assert_eq!(out.output_label_id.dims(), [3, 3, 2]);
    }

    #[test]
    fn test_with_search_overrides() {
        let device = Default::default();
        let model: Seq2SeqModel<TestBackend> = small_config().init(&device);
        let model  = model.with_search(Some(3), Some(1));
        let source = Tensor::<TestBackend, 2, Int>::from_ints([[1, 2]], &device);
        assert_eq!(model.decode(source, None, 1).output_score.dims(), [1, 1, 3]);
    }

    #[test]
    fn test_decode_ignores_batch_neighbours() {
        let device = Default::default();
        let model: Seq2SeqModel<TestBackend> = small_config()
            .init::<TestBackend>(&device)
            .with_search(Some(3), Some(4));

        let alone = model.decode(Tensor::<TestBackend, 2, Int>::from_ints([[1, 2]], &device), None, 1);
        let mask  = Tensor::<TestBackend, 2, Bool>::from_data(
            TensorData::new(
                vec![false, false, true, true, true, true, false, false, false, false, false, false],
                [2, 6],
            ),
            &device,
        );
        let mixed = model.decode(
            Tensor::<TestBackend, 2, Int>::from_ints([[1, 2, 0, 0, 0, 0], [3, 4, 5, 1, 2, 3]], &device),
            Some(mask),
            1,
        );

        let alone = alone.into_lattice().unwrap();
        let mixed = mixed.into_lattice().unwrap();
        let (a, m) = (alone.hypotheses(0), mixed.hypotheses(0));
        assert_eq!(a.len(), m.len());
        for (a, m) in a.iter().zip(&m) {
            assert_eq!(a.tokens, m.tokens);
            assert!((a.score - m.score).abs() < 1e-4, "{} vs {}", a.score, m.score);
        }
    }
}
