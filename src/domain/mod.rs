// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Plain Rust types for the decoding problem. No burn types,
// no file I/O: sequences go in, hypotheses come out.
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// A tokenised source sentence
pub mod sequence;

// Beam search lattice and the hypotheses read back from it
pub mod hypothesis;

// Source / sink abstractions implemented by other layers
pub mod traits;
