// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// From a text file of token ids to a padded Int tensor:
//
//   tokens.txt
//       │
//       ▼
//   TokenFileLoader   → Vec<SourceSequence>
//       │
//       ▼
//   SourceBatcher     → SourceBatch { tokens [N, T], lengths }
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads whitespace separated token-id lines
pub mod loader;

/// Pads sequences into a batch tensor
pub mod batcher;
