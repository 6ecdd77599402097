// ============================================================
// Layer 2 - InitUseCase
// ============================================================
// Builds a model from hyperparameters and writes a checkpoint:
//
//   Step 1: Hyperparameters → Seq2SeqConfig
//   Step 2: Validate the config            (Layer 5 - ml)
//   Step 3: Initialise fresh weights       (Layer 5 - ml)
//   Step 4: Save config + weights          (Layer 6 - infra)

use anyhow::Result;
use burn::module::Module;
use serde::{Deserialize, Serialize};

use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    beam_search::BeamSearchDecoderConfig,
    cell::CellKind,
    decoder::DecoderCoreConfig,
    encoder::BiRnnEncoderConfig,
    mlp::{Activation, MlpClassifierConfig},
    seq2seq::{Seq2SeqConfig, Seq2SeqModel},
    InferBackend,
};

// ─── Model Hyperparameters ───────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitConfig {
    pub checkpoint_dir:    String,
    pub src_vocab_size:    usize,
    pub tgt_vocab_size:    usize,
    pub embedding_dim:     usize,
    /// Per direction; the decoder attends over 2x this width
    pub encoder_hidden:    usize,
    pub decoder_hidden:    usize,
    pub attention_dim:     usize,
    pub cell:              CellKind,
    pub hidden_units:      Vec<usize>,
    pub hidden_activation: Activation,
    pub beam_size:         usize,
    pub max_output_length: usize,
}

impl Default for InitConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir:    "checkpoints".to_string(),
            src_vocab_size:    100,
            tgt_vocab_size:    100,
            embedding_dim:     32,
            encoder_hidden:    32,
            decoder_hidden:    64,
            attention_dim:     32,
            cell:              CellKind::Gru,
            hidden_units:      vec![64],
            hidden_activation: Activation::Relu,
            beam_size:         4,
            max_output_length: 10,
        }
    }
}

impl InitConfig {
    pub fn model_config(&self) -> Seq2SeqConfig {
        let encoder = BiRnnEncoderConfig::new(self.src_vocab_size, self.embedding_dim, self.encoder_hidden)
            .with_cell(self.cell);

        let core = DecoderCoreConfig::new(
            self.tgt_vocab_size,
            self.embedding_dim,
            encoder.context_dim(),
            self.decoder_hidden,
            self.attention_dim,
        )
        .with_cell(self.cell);

        let classifier = MlpClassifierConfig::new(
            self.decoder_hidden,
            self.tgt_vocab_size,
            self.hidden_units.clone(),
            vec![self.hidden_activation; self.hidden_units.len()],
        );

        let decoder = BeamSearchDecoderConfig::new(core, classifier)
            .with_beam_size(self.beam_size)
            .with_max_output_length(self.max_output_length);

        Seq2SeqConfig::new(encoder, decoder)
    }
}

// ─── InitUseCase ─────────────────────────────────────────────────────────────
pub struct InitUseCase {
    config: InitConfig,
}

impl InitUseCase {
    pub fn new(config: InitConfig) -> Self {
        Self { config }
    }

    /// Returns the config that was written.
    pub fn execute(&self) -> Result<Seq2SeqConfig> {
        let cfg = &self.config;

        // ── Step 1 + 2: Build and check the architecture ──────────────────────
        let model_cfg = cfg.model_config();
        model_cfg.validate()?;

        // ── Step 3: Fresh weights ─────────────────────────────────────────────
        let device = Default::default();
        let model: Seq2SeqModel<InferBackend> = model_cfg.init(&device);
        tracing::info!(
            "Model ready: {:?} cells, src_vocab={}, tgt_vocab={}, {} parameters",
            cfg.cell, cfg.src_vocab_size, cfg.tgt_vocab_size, model.num_params(),
        );

        // ── Step 4: Save checkpoint ───────────────────────────────────────────
        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir);
        ckpt.save(&model_cfg, &model)?;
        tracing::info!("Checkpoint written to '{}'", cfg.checkpoint_dir);

        Ok(model_cfg)
    }
}
