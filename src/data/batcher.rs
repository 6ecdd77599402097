// ============================================================
// Layer 4 - Source Batcher
// ============================================================
// Stacks variable-length source sequences into one Int tensor.
//
//   Input:  N sequences, longest of length T
//   Output: tokens [N, T], shorter rows right-padded with PAD_ID
//
//   [4 17 9 2]        [[4 17 9 2]
//   [4 11 2]     →     [4 11 2 0]
//   [7]                [7  0 0 0]]
//
// The original lengths are kept alongside the tensor, together
// with a padding mask (true = padding) the encoder and attention
// use to skip the padded tail:
//
//   [[f f f f]
//    [f f f t]
//    [f t t t]]
//
// Reference: Burn Book §4 (Batcher)

use anyhow::{ensure, Result};
use burn::{prelude::*, tensor::TensorData};

use crate::domain::sequence::SourceSequence;

/// Token id used to pad short sequences.
pub const PAD_ID: u32 = 0;

// ─── SourceBatch ──────────────────────────────────────────────────────────────
/// A batch of source sequences ready for `Seq2SeqModel::decode`.
/// Every tensor has the batch size as its first dimension.
#[derive(Debug, Clone)]
pub struct SourceBatch<B: Backend> {
    /// Token ids, right-padded with PAD_ID - shape: [batch, max_len]
    pub tokens: Tensor<B, 2, Int>,

    /// Padding mask - shape: [batch, max_len]
    /// true = padding, false = real token
    pub padding_mask: Tensor<B, 2, Bool>,

    /// Unpadded length of every row
    pub lengths: Vec<usize>,
}

// ─── SourceBatcher ────────────────────────────────────────────────────────────
/// Holds the target device so batch tensors are created on it.
#[derive(Clone, Debug)]
pub struct SourceBatcher<B: Backend> {
    /// The device to create tensors on
    pub device: B::Device,
}

impl<B: Backend> SourceBatcher<B> {
    /// Create a new batcher for the given device
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// Pad `items` to the longest one and stack them.
    ///
    /// Fails when `items` is empty or every sequence in it is empty.
    pub fn batch(&self, items: &[SourceSequence]) -> Result<SourceBatch<B>> {
        ensure!(!items.is_empty(), "cannot batch zero sequences");
        let max_len = items.iter().map(SourceSequence::len).max().unwrap_or(0);
        ensure!(max_len > 0, "every sequence in the batch is empty");

        let flat: Vec<i64> = items
            .iter()
            .flat_map(|s| {
                s.tokens.iter()
                    .map(|&t| t as i64)
                    .chain(std::iter::repeat(PAD_ID as i64).take(max_len - s.len()))
            })
            .collect();

        let tokens = Tensor::<B, 2, Int>::from_data(
            TensorData::new(flat, [items.len(), max_len]),
            &self.device,
        );
        let lengths: Vec<usize> = items.iter().map(SourceSequence::len).collect();

        let padding: Vec<bool> = lengths
            .iter()
            .flat_map(|&len| (0..max_len).map(move |t| t >= len))
            .collect();
        let padding_mask = Tensor::<B, 2, Bool>::from_data(
            TensorData::new(padding, [items.len(), max_len]),
            &self.device,
        );

        Ok(SourceBatch { tokens, padding_mask, lengths })
    }
}
