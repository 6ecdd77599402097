// ============================================================
// Layer 5 - Attention RNN Decoder
// ============================================================
// DecoderCore holds the three building blocks every decoder
// shares and knows how to advance one time step:
//
//   x_step ──────────────────────────┐
//                                    ▼
//   state_{t-1} ─► Attention(h) ─► [x_step | c_t] ─► Cell ─► state_t
//
// The attended context c_t is computed from the previous
// hidden state, concatenated with the embedded input and fed
// to the recurrent cell. The step output is the new hidden state.
// Padded encoder steps (mask true) are never attended to.
//
// RnnDecoder runs the core over a known target sequence
// (teacher forcing) and returns every step's output.

use anyhow::{ensure, Result};
use burn::{
    nn::{Embedding, EmbeddingConfig},
    prelude::*,
};

use crate::ml::attention::{Attention, AttentionConfig};
use crate::ml::cell::{CellKind, CellState, RecurrentCell, RecurrentCellConfig};

#[derive(Config, Debug)]
pub struct DecoderCoreConfig {
    /// Number of output labels (rows of the embedding table)
    pub vocab_size:    usize,
    pub embedding_dim: usize,
    /// Width of each encoder output the decoder attends over
    pub context_dim:   usize,
    pub hidden_size:   usize,
    pub attention_context_dim: usize,
    #[config(default = "CellKind::Gru")]
    pub cell: CellKind,
}

impl DecoderCoreConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.vocab_size > 0, "decoder vocabulary must not be empty");
        ensure!(
            self.embedding_dim > 0 && self.context_dim > 0
                && self.hidden_size > 0 && self.attention_context_dim > 0,
            "decoder dimensions must be positive: {self:?}",
        );
        Ok(())
    }

    pub fn attention(&self) -> AttentionConfig {
        AttentionConfig::new(self.hidden_size, self.context_dim, self.attention_context_dim)
    }

    pub fn cell_config(&self) -> RecurrentCellConfig {
        RecurrentCellConfig::new(self.cell, self.embedding_dim + self.context_dim, self.hidden_size)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> DecoderCore<B> {
        DecoderCore {
            embedding: EmbeddingConfig::new(self.vocab_size, self.embedding_dim).init(device),
            attention: self.attention().init(device),
            cell:      self.cell_config().init(device),
        }
    }

    pub fn init_decoder<B: Backend>(&self, device: &B::Device) -> RnnDecoder<B> {
        RnnDecoder { core: self.init(device) }
    }
}

#[derive(Module, Debug)]
pub struct DecoderCore<B: Backend> {
    pub embedding: Embedding<B>,
    pub attention: Attention<B>,
    pub cell:      RecurrentCell<B>,
}

impl<B: Backend> DecoderCore<B> {
    pub fn embedding_dim(&self) -> usize {
        self.embedding.weight.dims()[1]
    }

    /// tokens: [n, len] → [n, len, embedding_dim]
    pub fn embed(&self, tokens: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        self.embedding.forward(tokens)
    }

    /// x_step: [n, embedding_dim], context: [n, time, context_dim],
    /// padding_mask: [n, time] → (output [n, hidden_size], next state)
    pub fn step(
        &self,
        x_step:       Tensor<B, 2>,
        state:        CellState<B>,
        context:      Tensor<B, 3>,
        padding_mask: Option<Tensor<B, 2, Bool>>,
    ) -> (Tensor<B, 2>, CellState<B>) {
        let attended = self.attention.forward(state.hidden.clone(), context, padding_mask);
        let input    = Tensor::cat(vec![x_step, attended], 1);
        let next     = self.cell.step(input, state);
        (next.hidden.clone(), next)
    }
}

#[derive(Module, Debug)]
pub struct RnnDecoder<B: Backend> {
    pub core: DecoderCore<B>,
}

impl<B: Backend> RnnDecoder<B> {
    /// x: [batch, len] label ids, context: [batch, time, context_dim]
    /// → [batch, len, hidden_size]
    pub fn forward(&self, x: Tensor<B, 2, Int>, context: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch, _] = x.dims();
        let state = self.core.cell.initial_state(batch, &context.device());
        self.forward_with_state(x, context, None, state).0
    }

    /// Same as `forward`, over a padded context, starting from `state`
    /// and also returning the final state.
    pub fn forward_with_state(
        &self,
        x:            Tensor<B, 2, Int>,
        context:      Tensor<B, 3>,
        padding_mask: Option<Tensor<B, 2, Bool>>,
        state:        CellState<B>,
    ) -> (Tensor<B, 3>, CellState<B>) {
        let [batch, len] = x.dims();
        let embedded = self.core.embed(x);
        let emb_dim  = self.core.embedding_dim();

        let mut state   = state;
        let mut outputs = Vec::with_capacity(len);
        for t in 0..len {
            let x_t = embedded.clone()
                .slice([0..batch, t..t + 1, 0..emb_dim])
                .reshape([batch, emb_dim]);
            let (output, next) = self.core.step(x_t, state, context.clone(), padding_mask.clone());
            outputs.push(output);
            state = next;
        }
        (Tensor::stack(outputs, 1), state)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::module::Param;
    use crate::ml::test_util::{to_vec, TestBackend};

    fn reference_config() -> DecoderCoreConfig {
        // GRU with 3 units, attention width 2, 5 x 4 embedding over 4-wide contexts
        DecoderCoreConfig::new(5, 4, 4, 3, 2)
    }

    fn reference_context(device: &<TestBackend as Backend>::Device) -> Tensor<TestBackend, 3> {
        Tensor::from_floats(
            [
                [[0.1, 0.2, 0.3, 0.4], [0.3, 0.5, 0.7, 0.2]],
                [[0.2, 0.1, 0.5, 0.6], [0.4, 0.3, 0.8, 0.1]],
            ],
            device,
        )
    }

    #[test]
    fn test_config_round_trip() {
        let cfg  = reference_config().with_cell(CellKind::Lstm);
        let json = serde_json::to_value(&cfg).unwrap();
        let restored: DecoderCoreConfig = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(serde_json::to_value(&restored).unwrap(), json);
        assert_eq!(restored.cell, CellKind::Lstm);
    }

    #[test]
    fn test_step_shape() {
        let device = Default::default();
        let core: DecoderCore<TestBackend> = reference_config().init(&device);

        let x_step = Tensor::<TestBackend, 2>::from_floats(
            [[1.0, 2.0, 3.0, 4.0], [5.0, 6.0, 7.0, 8.0]], &device,
        );
        let state = CellState {
            hidden: Tensor::from_floats([[1.0, 2.0, 3.0], [0.1, 0.2, 0.3]], &device),
            memory: None,
        };

        let (output, next) = core.step(x_step, state, reference_context(&device), None);
        assert_eq!(output.dims(), [2, 3]);
        assert_eq!(to_vec(output), to_vec(next.hidden));
    }

    #[test]
    fn test_teacher_forced_decode_shape() {
        let device = Default::default();
        let mut decoder: RnnDecoder<TestBackend> = reference_config().init_decoder(&device);
        decoder.core.embedding.weight = Param::from_tensor(Tensor::from_floats(
            [
                [0.0, 0.0, 0.0, 0.0],
                [1.0, 2.0, 3.0, 4.0],
                [5.0, 6.0, 7.0, 8.0],
                [9.0, 1.0, 3.0, 4.0],
                [8.0, 7.0, 4.0, 2.0],
            ],
            &device,
        ));

        let x = Tensor::<TestBackend, 2, Int>::from_ints([[1, 1, 3, 4], [1, 2, 4, 0]], &device);
        let output = decoder.forward(x, reference_context(&device));
        assert_eq!(output.dims(), [2, 4, 3]);
        assert!(to_vec(output).iter().all(|v| v.is_finite() && v.abs() <= 1.0));
    }

    #[test]
    fn test_forward_matches_manual_steps() {
        let device = Default::default();
        let decoder: RnnDecoder<TestBackend> =
            reference_config().with_cell(CellKind::Lstm).init_decoder(&device);
        let context = reference_context(&device);
        let x = Tensor::<TestBackend, 2, Int>::from_ints([[2, 3], [4, 1]], &device);

        let outputs = decoder.forward(x.clone(), context.clone());

        let embedded  = decoder.core.embed(x);
        let mut state = decoder.core.cell.initial_state(2, &device);
        for t in 0..2 {
            let x_t = embedded.clone().slice([0..2, t..t + 1, 0..4]).reshape([2, 4]);
            let (out, next) = decoder.core.step(x_t, state, context.clone(), None);
            let expected = outputs.clone().slice([0..2, t..t + 1, 0..3]).reshape([2, 3]);
            let diff: f32 = to_vec(out).iter().zip(to_vec(expected))
                .map(|(a, b)| (a - b).abs())
                .sum();
            assert!(diff < 1e-5, "step {t} differs by {diff}");
            state = next;
        }
    }

    #[test]
    fn test_padded_context_matches_truncated() {
        let device = Default::default();
        let decoder: RnnDecoder<TestBackend> = reference_config().init_decoder(&device);
        let context = reference_context(&device);
        let x = Tensor::<TestBackend, 2, Int>::from_ints([[2, 3, 1]], &device);

        // The second encoder step of sample 0 is padding
        let padded = context.clone().slice([0..1, 0..2, 0..4]);
        let mask = Tensor::<TestBackend, 2, Bool>::from_data(
            burn::tensor::TensorData::new(vec![false, true], [1, 2]),
            &device,
        );
        let state = decoder.core.cell.initial_state(1, &device);
        let (masked, _) = decoder.forward_with_state(x.clone(), padded.clone(), Some(mask), state);

        let truncated = decoder.forward(x, padded.slice([0..1, 0..1, 0..4]));
        let diff: f32 = to_vec(masked).iter().zip(to_vec(truncated))
            .map(|(a, b)| (a - b).abs())
            .sum();
        assert!(diff < 1e-5, "masked decode differs by {diff}");
    }

    #[test]
    fn test_validate_rejects_empty_vocab() {
        assert!(DecoderCoreConfig::new(0, 4, 4, 3, 2).validate().is_err());
        assert!(reference_config().validate().is_ok());
    }
}
