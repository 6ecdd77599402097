// ============================================================
// Layer 5 - Bidirectional RNN Encoder
// ============================================================
// Produces the context the decoder attends over:
//
//   tokens ─► Embedding ─┬─► forward cell ──────────────────────┐
//                        └─► reverse ─► backward cell ─────────┤
//                                                  BiDirectional ─► [b, t, 2H]
//
// The backward cell reads the reversed sequence, so its
// outputs are in reversed order; BiDirectional flips them back
// before concatenating.
//
// With a padding mask each row is reversed over its real prefix
// only, so the backward cell starts on the last real token:
//
//   tokens [4 11 2 0 0]  →  backward input [2 11 4 0 0]

use burn::{
    nn::{Embedding, EmbeddingConfig},
    prelude::*,
};

use crate::ml::bidirectional::{reverse_along, BiDirectional, BiDirectionalConfig};
use crate::ml::cell::{CellKind, RecurrentCell, RecurrentCellConfig};

#[derive(Config, Debug)]
pub struct BiRnnEncoderConfig {
    pub vocab_size:    usize,
    pub embedding_dim: usize,
    /// Hidden size of each direction; the context is twice as wide
    pub hidden_size:   usize,
    #[config(default = "CellKind::Gru")]
    pub cell: CellKind,
}

impl BiRnnEncoderConfig {
    pub fn context_dim(&self) -> usize {
        2 * self.hidden_size
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> BiRnnEncoder<B> {
        let cell = RecurrentCellConfig::new(self.cell, self.embedding_dim, self.hidden_size);
        BiRnnEncoder {
            embedding:     EmbeddingConfig::new(self.vocab_size, self.embedding_dim).init(device),
            forward_cell:  cell.init(device),
            backward_cell: cell.init(device),
            merge:         BiDirectionalConfig::new().init(),
        }
    }
}

#[derive(Module, Debug)]
pub struct BiRnnEncoder<B: Backend> {
    pub embedding:     Embedding<B>,
    pub forward_cell:  RecurrentCell<B>,
    pub backward_cell: RecurrentCell<B>,
    pub merge:         BiDirectional,
}

impl<B: Backend> BiRnnEncoder<B> {
    /// tokens: [batch, time], padding_mask: [batch, time] (true = padding)
    /// → context [batch, time, 2 * hidden_size]
    pub fn forward(&self, tokens: Tensor<B, 2, Int>, padding_mask: Option<Tensor<B, 2, Bool>>) -> Tensor<B, 3> {
        let embedded = self.embedding.forward(tokens);
        let left_to_right = self.forward_cell.forward_sequence(embedded.clone(), None);

        let right_to_left = match padding_mask {
            None => self.backward_cell
                .forward_sequence(reverse_along(embedded, self.merge.time_step_axis), None),
            Some(mask) => {
                let index    = prefix_reverse_index(mask);
                let backward = self.backward_cell
                    .forward_sequence(reverse_prefix(embedded, index.clone()), None);
                // Undo the prefix reversal, then hand BiDirectional the
                // fully reversed order it expects
                reverse_along(reverse_prefix(backward, index), self.merge.time_step_axis)
            }
        };
        self.merge.forward(left_to_right, right_to_left)
    }
}

/// [batch, time] gather index that reverses each row over its unpadded
/// prefix and leaves the padded tail in place.
pub fn prefix_reverse_index<B: Backend>(padding_mask: Tensor<B, 2, Bool>) -> Tensor<B, 2, Int> {
    let [batch, time] = padding_mask.dims();
    let device  = padding_mask.device();
    let lengths = padding_mask.clone().bool_not().int().sum_dim(1).expand([batch, time]);
    let steps   = Tensor::<B, 1, Int>::arange(0..time as i64, &device)
        .reshape([1, time])
        .expand([batch, time]);

    (lengths.sub_scalar(1) - steps.clone()).mask_where(padding_mask, steps)
}

/// Reorder x: [batch, time, d] along time with a `prefix_reverse_index`.
/// The index is its own inverse.
fn reverse_prefix<B: Backend>(x: Tensor<B, 3>, index: Tensor<B, 2, Int>) -> Tensor<B, 3> {
    let [batch, time, d] = x.dims();
    x.gather(1, index.reshape([batch, time, 1]).expand([batch, time, d]))
}
