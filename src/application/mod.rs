// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// Orchestrates the other layers for one workflow each.
// No tensor math and no printing here.
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Build a model and write its first checkpoint
pub mod init_use_case;

// Load a checkpoint and beam search a file of source sequences
pub mod decode_use_case;
