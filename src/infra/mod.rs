// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// File-system concerns shared by the workflows:
//
//   checkpoint.rs - model config (JSON) + weights (CompactRecorder)
//   report.rs     - decoded hypotheses as JSON lines
//
// Reference: Burn Book §5 (Checkpointing)
//            Rust Book §9 (Error Handling with anyhow)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// JSONL writer for decoded hypotheses
pub mod report;
