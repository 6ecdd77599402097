#![recursion_limit = "256"]

//! Attention RNN decoder layers on burn: a bidirectional merge layer,
//! an MLP classifier head, Bahdanau attention, a teacher-forced decoder
//! and a beam search decoder, wired into a small encoder-decoder tool.

pub mod cli;
pub mod application;
pub mod domain;
pub mod data;
pub mod ml;
pub mod infra;
