// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// The three subcommands: `init`, `decode` and `show-config`,
// with all their flags. clap generates --help, error messages
// for missing args and the string → number conversions.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};

use crate::application::{decode_use_case::DecodeConfig, init_use_case::InitConfig};
use crate::ml::{cell::CellKind, mlp::Activation};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a model with fresh weights and save a checkpoint
    Init(InitArgs),

    /// Beam search every sequence of a token-id file
    Decode(DecodeArgs),

    /// Print the model config stored in a checkpoint
    ShowConfig(ShowConfigArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum CellArg {
    Gru,
    Lstm,
}

impl From<CellArg> for CellKind {
    fn from(c: CellArg) -> Self {
        match c {
            CellArg::Gru  => CellKind::Gru,
            CellArg::Lstm => CellKind::Lstm,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ActivationArg {
    Relu,
    Tanh,
    Sigmoid,
    Linear,
}

impl From<ActivationArg> for Activation {
    fn from(a: ActivationArg) -> Self {
        match a {
            ActivationArg::Relu    => Activation::Relu,
            ActivationArg::Tanh    => Activation::Tanh,
            ActivationArg::Sigmoid => Activation::Sigmoid,
            ActivationArg::Linear  => Activation::Linear,
        }
    }
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory to write model_config.json and the weights to
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Number of distinct source token ids
    #[arg(long, default_value_t = 100)]
    pub src_vocab_size: usize,

    /// Number of distinct target labels
    #[arg(long, default_value_t = 100)]
    pub tgt_vocab_size: usize,

    /// Embedding width, shared by encoder and decoder
    #[arg(long, default_value_t = 32)]
    pub embedding_dim: usize,

    /// Hidden size of each encoder direction
    #[arg(long, default_value_t = 32)]
    pub encoder_hidden: usize,

    #[arg(long, default_value_t = 64)]
    pub decoder_hidden: usize,

    /// Width of the attention alignment space
    #[arg(long, default_value_t = 32)]
    pub attention_dim: usize,

    #[arg(long, value_enum, default_value_t = CellArg::Gru)]
    pub cell: CellArg,

    /// Hidden layer widths of the classifier head, e.g. 64,32
    #[arg(long, value_delimiter = ',', default_value = "64")]
    pub hidden_units: Vec<usize>,

    /// Activation of every classifier hidden layer
    #[arg(long, value_enum, default_value_t = ActivationArg::Relu)]
    pub hidden_activation: ActivationArg,

    /// Hypotheses kept per sample
    #[arg(long, default_value_t = 4)]
    pub beam_size: usize,

    /// Labels generated per hypothesis
    #[arg(long, default_value_t = 10)]
    pub max_output_length: usize,
}

impl From<InitArgs> for InitConfig {
    fn from(a: InitArgs) -> Self {
        InitConfig {
            checkpoint_dir:    a.checkpoint_dir,
            src_vocab_size:    a.src_vocab_size,
            tgt_vocab_size:    a.tgt_vocab_size,
            embedding_dim:     a.embedding_dim,
            encoder_hidden:    a.encoder_hidden,
            decoder_hidden:    a.decoder_hidden,
            attention_dim:     a.attention_dim,
            cell:              a.cell.into(),
            hidden_units:      a.hidden_units,
            hidden_activation: a.hidden_activation.into(),
            beam_size:         a.beam_size,
            max_output_length: a.max_output_length,
        }
    }
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Text file with one sequence of token ids per line
    #[arg(long)]
    pub source_file: String,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Label every hypothesis starts from
    #[arg(long, default_value_t = 0)]
    pub start_token: u32,

    /// Sequences decoded together
    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    /// Override the checkpoint's beam size
    #[arg(long)]
    pub beam_size: Option<usize>,

    /// Override the checkpoint's output length
    #[arg(long)]
    pub max_output_length: Option<usize>,

    /// How many hypotheses to print per sequence
    #[arg(long, default_value_t = 1)]
    pub top: usize,

    /// Also write all hypotheses as JSON lines to this file
    #[arg(long)]
    pub report: Option<String>,
}

impl From<&DecodeArgs> for DecodeConfig {
    fn from(a: &DecodeArgs) -> Self {
        DecodeConfig {
            checkpoint_dir:    a.checkpoint_dir.clone(),
            source_file:       a.source_file.clone(),
            start_token:       a.start_token,
            batch_size:        a.batch_size,
            beam_size:         a.beam_size,
            max_output_length: a.max_output_length,
        }
    }
}

#[derive(Args, Debug)]
pub struct ShowConfigArgs {
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,
}
