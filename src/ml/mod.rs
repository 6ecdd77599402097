// ============================================================
// Layer 5 - ML / Model Layer (Burn)
// ============================================================
// All burn framework code lives in this layer. The domain,
// data and application layers only see the types re-exported
// by the modules below.
//
//   bidirectional.rs - merges forward and backward RNN passes
//   mlp.rs           - dense stack + softmax classifier head
//   attention.rs     - Bahdanau additive attention
//   cell.rs          - GRU / LSTM cells with a per-step API
//   decoder.rs       - attention decoder core + teacher-forced decoder
//   beam_search.rs   - decoder that searches K hypotheses per sample
//   encoder.rs       - bidirectional RNN encoder
//   seq2seq.rs       - encoder + beam search decoder
//
// Reference: Burn Book §3 (Building Blocks)
//            Bahdanau et al. (2015) Neural Machine Translation
//            by Jointly Learning to Align and Translate

pub mod bidirectional;
pub mod mlp;
pub mod attention;
pub mod cell;
pub mod decoder;
pub mod beam_search;
pub mod encoder;
pub mod seq2seq;

/// Backend used by the command line workflows.
#[cfg(feature = "wgpu")]
pub type InferBackend = burn::backend::Wgpu;

/// Backend used by the command line workflows.
#[cfg(not(feature = "wgpu"))]
pub type InferBackend = burn::backend::NdArray;
