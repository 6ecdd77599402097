// ============================================================
// Layer 5 - Beam Search Decoder
// ============================================================
// Keeps `beam_size` hypotheses per sample and grows them one
// label per step for `max_output_length` steps.
//
// Rows are laid out as [batch * beam]; row (i, j) is hypothesis
// j of sample i. One step:
//
//   1. embed each hypothesis' last label          [n, E]
//   2. DecoderCore::step with the attended context [n, H]
//   3. classifier → label probabilities            [n, V]
//   4. candidate score = score_j + ln p(label)     [batch, beam * V]
//   5. top-k over the beam * V candidates          [batch, beam]
//        parent = index / V,  label = index % V
//   6. reorder cell state rows to follow the parents
//
// Before the first step only slot 0 is live (the others start
// at a very low score), so step 0 expands the start token alone
// and every step-0 parent index is 0.
//
// Output per step (stacked on axis 0):
//   output_label_id   [len, batch, beam]  label chosen
//   prev_output_index [len, batch, beam]  slot it extends
//   output_score      [len, batch, beam]  cumulative log-prob
//
// Reference: Sutskever et al. (2014) §3.2 (left-to-right beam search)

use anyhow::{anyhow, ensure, Result};
use burn::{prelude::*, tensor::TensorData};

use crate::domain::hypothesis::BeamLattice;
use crate::ml::decoder::{DecoderCore, DecoderCoreConfig};
use crate::ml::mlp::{Activation, MlpClassifier, MlpClassifierConfig};

/// Starting score of the inactive slots before the first step.
const DEAD_BEAM_SCORE: f32 = -1.0e9;
/// Probabilities are clamped here before ln() so a zero never yields -inf.
const MIN_PROBABILITY: f32 = 1.0e-12;

#[derive(Config, Debug)]
pub struct BeamSearchDecoderConfig {
    pub core:       DecoderCoreConfig,
    pub classifier: MlpClassifierConfig,
    #[config(default = 10)]
    pub max_output_length: usize,
    #[config(default = 3)]
    pub beam_size: usize,
}

impl BeamSearchDecoderConfig {
    pub fn validate(&self) -> Result<()> {
        self.core.validate()?;
        self.classifier.validate()?;
        ensure!(self.beam_size >= 1, "beam_size must be at least 1");
        ensure!(self.max_output_length >= 1, "max_output_length must be at least 1");
        ensure!(
            self.classifier.d_input == self.core.hidden_size,
            "classifier input width {} does not match decoder hidden size {}",
            self.classifier.d_input, self.core.hidden_size,
        );
        ensure!(
            self.classifier.output_dim == self.core.vocab_size,
            "classifier scores {} labels but the decoder embeds {}",
            self.classifier.output_dim, self.core.vocab_size,
        );
        ensure!(
            self.classifier.output_activation == Activation::Softmax,
            "beam scores need label probabilities, but the classifier ends in {:?}",
            self.classifier.output_activation,
        );
        ensure!(
            self.beam_size <= self.core.vocab_size,
            "beam_size {} exceeds the vocabulary size {}",
            self.beam_size, self.core.vocab_size,
        );
        Ok(())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> BeamSearchDecoder<B> {
        BeamSearchDecoder {
            core:              self.core.init(device),
            classifier:        self.classifier.init(device),
            max_output_length: self.max_output_length,
            beam_size:         self.beam_size,
        }
    }
}

#[derive(Module, Debug)]
pub struct BeamSearchDecoder<B: Backend> {
    pub core:              DecoderCore<B>,
    pub classifier:        MlpClassifier<B>,
    pub max_output_length: usize,
    pub beam_size:         usize,
}

/// Per-step beam bookkeeping, each shaped [max_output_length, batch, beam_size].
#[derive(Debug, Clone)]
pub struct BeamSearchOutput<B: Backend> {
    pub output_label_id:   Tensor<B, 3, Int>,
    pub prev_output_index: Tensor<B, 3, Int>,
    pub output_score:      Tensor<B, 3>,
}

impl<B: Backend> BeamSearchOutput<B> {
    /// Copy the three tensors to the host for backtracking.
    pub fn into_lattice(self) -> Result<BeamLattice> {
        let dims = self.output_score.dims();

        let labels = self.output_label_id.into_data().convert::<i64>().to_vec::<i64>()
            .map_err(|e| anyhow!("reading output_label_id: {e:?}"))?;
        let parents = self.prev_output_index.into_data().convert::<i64>().to_vec::<i64>()
            .map_err(|e| anyhow!("reading prev_output_index: {e:?}"))?;
        let scores = self.output_score.into_data().convert::<f32>().to_vec::<f32>()
            .map_err(|e| anyhow!("reading output_score: {e:?}"))?;

        BeamLattice::new(
            dims,
            labels.into_iter().map(|l| l as u32).collect(),
            parents.into_iter().map(|p| p as usize).collect(),
            scores,
        )
    }
}

impl<B: Backend> BeamSearchDecoder<B> {
    /// initial_input: [batch, 1] start label per sample
    /// context:       [batch, time, context_dim]
    /// padding_mask:  [batch, time], true where the context is padding
    pub fn forward(
        &self,
        initial_input: Tensor<B, 2, Int>,
        context:       Tensor<B, 3>,
        padding_mask:  Option<Tensor<B, 2, Bool>>,
    ) -> BeamSearchOutput<B> {
        let [batch, _]            = initial_input.dims();
        let [_, time, context_dim] = context.dims();
        let beam    = self.beam_size;
        let vocab   = self.classifier.output_dim();
        let emb_dim = self.core.embedding_dim();
        let rows    = batch * beam;
        let device  = context.device();

        // Every hypothesis attends over its own sample's context
        let context = context
            .reshape([batch, 1, time, context_dim])
            .expand([batch, beam, time, context_dim])
            .reshape([rows, time, context_dim]);
        let padding_mask = padding_mask.map(|mask| {
            mask.reshape([batch, 1, time])
                .expand([batch, beam, time])
                .reshape([rows, time])
        });

        let mut labels = initial_input.slice([0..batch, 0..1]).expand([batch, beam]);
        let mut scores = initial_scores::<B>(batch, beam, &device);
        let mut state  = self.core.cell.initial_state(batch, &device).repeat_beams(beam);

        let mut step_labels  = Vec::with_capacity(self.max_output_length);
        let mut step_parents = Vec::with_capacity(self.max_output_length);
        let mut step_scores  = Vec::with_capacity(self.max_output_length);

        for step in 0..self.max_output_length {
            let x_step = self.core
                .embed(labels.reshape([rows, 1]))
                .reshape([rows, emb_dim]);
            let (output, next_state) = self.core.step(x_step, state, context.clone(), padding_mask.clone());

            let log_probs = self.classifier
                .forward(output)
                .clamp_min(MIN_PROBABILITY)
                .log()
                .reshape([batch, beam, vocab]);

            let candidates = (scores.reshape([batch, beam, 1]).expand([batch, beam, vocab]) + log_probs)
                .reshape([batch, beam * vocab]);
            let (top_scores, top_index) = candidates.topk_with_indices(beam, 1);

            let parents = top_index.clone().div_scalar(vocab as i64);
            let chosen  = top_index - parents.clone().mul_scalar(vocab as i64);

            tracing::trace!("beam step {}/{}", step + 1, self.max_output_length);

            state  = next_state.reorder_beams(parents.clone());
            labels = chosen.clone();
            scores = top_scores.clone();

            step_labels.push(chosen);
            step_parents.push(parents);
            step_scores.push(top_scores);
        }

        BeamSearchOutput {
            output_label_id:   Tensor::stack(step_labels, 0),
            prev_output_index: Tensor::stack(step_parents, 0),
            output_score:      Tensor::stack(step_scores, 0),
        }
    }
}

/// [batch, beam] with 0 in slot 0 and DEAD_BEAM_SCORE elsewhere.
fn initial_scores<B: Backend>(batch: usize, beam: usize, device: &B::Device) -> Tensor<B, 2> {
    let values: Vec<f32> = (0..batch * beam)
        .map(|i| if i % beam == 0 { 0.0 } else { DEAD_BEAM_SCORE })
        .collect();
    Tensor::from_data(TensorData::new(values, [batch, beam]), device)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::cell::CellKind;
    use crate::ml::mlp::Activation;
    use crate::ml::test_util::{to_ints, to_vec, TestBackend};

    const VOCAB: usize = 5;

    fn reference_config(max_output_length: usize, beam_size: usize) -> BeamSearchDecoderConfig {
        BeamSearchDecoderConfig::new(
            DecoderCoreConfig::new(VOCAB, 4, 4, 3, 2),
            MlpClassifierConfig::new(
                3,
                VOCAB,
                vec![2, 3, 4],
                vec![Activation::Relu, Activation::Relu, Activation::Relu],
            ),
        )
        .with_max_output_length(max_output_length)
        .with_beam_size(beam_size)
    }

    fn reference_context(device: &<TestBackend as Backend>::Device) -> Tensor<TestBackend, 3> {
        Tensor::from_floats(
            [
                [[0.1, 0.2, 0.3, 0.4], [0.3, 0.5, 0.7, 0.2]],
                [[0.2, 0.1, 0.5, 0.6], [0.4, 0.3, 0.8, 0.1]],
            ],
            device,
        )
    }

    fn run(cfg: &BeamSearchDecoderConfig) -> BeamSearchOutput<TestBackend> {
        let device = Default::default();
        let decoder: BeamSearchDecoder<TestBackend> = cfg.init(&device);
        let initial_input = Tensor::<TestBackend, 2, Int>::from_ints([[0], [0]], &device);
        decoder.forward(initial_input, reference_context(&device), None)
    }

    #[test]
    fn test_config_round_trip() {
        let cfg  = reference_config(2, 3);
        let json = serde_json::to_value(&cfg).unwrap();
        let restored: BeamSearchDecoderConfig = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(serde_json::to_value(&restored).unwrap(), json);
        assert_eq!(restored.beam_size, 3);
        assert_eq!(restored.max_output_length, 2);
    }

    #[test]
    fn test_output_shapes() {
        let out = run(&reference_config(2, 3));
        assert_eq!(out.output_label_id.dims(), [2, 2, 3]);
        assert_eq!(out.prev_output_index.dims(), [2, 2, 3]);
        assert_eq!(out.output_score.dims(), [2, 2, 3]);
    }

    #[test]
    fn test_first_step_expands_start_hypothesis_only() {
        let out = run(&reference_config(1, 3));
        assert!(to_ints(out.prev_output_index).iter().all(|&p| p == 0));

        // All three labels of a sample come from one distribution: distinct ids
        let labels = to_ints(out.output_label_id);
        for sample in labels.chunks(3) {
            let mut ids = sample.to_vec();
            ids.sort_unstable();
            ids.dedup();
            assert_eq!(ids.len(), 3, "duplicate labels in {sample:?}");
        }
    }

    #[test]
    fn test_scores_sorted_and_non_increasing() {
        let out    = run(&reference_config(3, 3));
        let scores = to_vec(out.output_score);

        // [step][sample][beam]: sorted descending within a step
        for row in scores.chunks(3) {
            assert!(row.windows(2).all(|w| w[0] >= w[1]), "unsorted beam {row:?}");
            assert!(row.iter().all(|&s| s <= 0.0 && s > DEAD_BEAM_SCORE / 2.0));
        }
        // log-probs are <= 0, so the best score can only go down
        let best_per_step: Vec<f32> = scores.chunks(3).map(|row| row[0]).collect();
        for sample in 0..2 {
            for step in 1..3 {
                assert!(best_per_step[step * 2 + sample] <= best_per_step[(step - 1) * 2 + sample] + 1e-6);
            }
        }
    }

    #[test]
    fn test_indices_in_range() {
        let out = run(&reference_config(3, 2));
        assert!(to_ints(out.output_label_id).iter().all(|&l| (0..VOCAB as i64).contains(&l)));
        assert!(to_ints(out.prev_output_index).iter().all(|&p| (0..2).contains(&p)));
    }

    #[test]
    fn test_single_beam_is_greedy() {
        let device = Default::default();
        let cfg = reference_config(3, 1);
        let decoder: BeamSearchDecoder<TestBackend> = cfg.init(&device);
        let context = reference_context(&device);
        let out = decoder.forward(
            Tensor::<TestBackend, 2, Int>::from_ints([[0], [0]], &device),
            context.clone(),
            None,
        );
        let labels = to_ints(out.output_label_id);

        // Re-run greedily by hand with argmax over the classifier output
        let mut state = decoder.core.cell.initial_state(2, &device);
        let mut last  = Tensor::<TestBackend, 2, Int>::from_ints([[0], [0]], &device);
        for step in 0..3 {
            let x = decoder.core.embed(last).reshape([2, 4]);
            let (output, next) = decoder.core.step(x, state, context.clone(), None);
            let argmax = decoder.classifier.forward(output).argmax(1);
            let expected = to_ints(argmax.clone());
            assert_eq!(&labels[step * 2..step * 2 + 2], expected.as_slice(), "step {step}");
            last  = argmax;
            state = next;
        }
    }

    #[test]
    fn test_into_lattice_backtraces_best_beam() {
        let out    = run(&reference_config(3, 3));
        let scores = to_vec(out.output_score.clone());
        let lattice = out.into_lattice().unwrap();
        assert_eq!((lattice.steps(), lattice.batch(), lattice.beam()), (3, 2, 3));

        for sample in 0..2 {
            let best = lattice.best(sample);
            assert_eq!(best.tokens.len(), 3);
            assert!(best.tokens.iter().all(|&t| (t as usize) < VOCAB));
            // last step, slot 0 holds the highest score
            assert_eq!(best.score, scores[(2 * 2 + sample) * 3]);
        }
    }

    #[test]
    fn test_lstm_cell_decodes() {
        let mut cfg = reference_config(2, 2);
        cfg.core.cell = CellKind::Lstm;
        let out = run(&cfg);
        assert_eq!(out.output_score.dims(), [2, 2, 2]);
    }

    #[test]
    fn test_validate() {
        assert!(reference_config(2, 3).validate().is_ok());
        assert!(reference_config(2, VOCAB + 1).validate().is_err());
        assert!(reference_config(0, 3).validate().is_err());
        assert!(reference_config(2, 0).validate().is_err());

        let mut cfg = reference_config(2, 3);
        cfg.classifier.output_dim = VOCAB + 1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_requires_softmax_head() {
        for activation in [Activation::Relu, Activation::Sigmoid, Activation::Tanh, Activation::Linear] {
            let mut cfg = reference_config(2, 3);
            cfg.classifier.output_activation = activation;
            let err = cfg.validate().unwrap_err();
            assert!(err.to_string().contains("probabilities"), "{err}");
        }
    }

    #[test]
    fn test_first_step_scores_are_log_probabilities() {
        let device = Default::default();
        let cfg = reference_config(1, 3);
        let decoder: BeamSearchDecoder<TestBackend> = cfg.init(&device);
        let context = reference_context(&device);
        let start   = Tensor::<TestBackend, 2, Int>::from_ints([[0], [0]], &device);
        let out = decoder.forward(start.clone(), context.clone(), None);
        let labels = to_ints(out.output_label_id);
        let scores = to_vec(out.output_score);

        // One step by hand: embed → step → classifier → ln → top-k
        let x = decoder.core.embed(start).reshape([2, 4]);
        let state = decoder.core.cell.initial_state(2, &device);
        let (output, _) = decoder.core.step(x, state, context, None);
        let (top, index) = decoder.classifier
            .forward(output)
            .clamp_min(MIN_PROBABILITY)
            .log()
            .topk_with_indices(3, 1);

        assert_eq!(labels, to_ints(index));
        let expected = to_vec(top);
        for (got, want) in scores.iter().zip(&expected) {
            assert!((got - want).abs() < 1e-5, "scores {scores:?} vs {expected:?}");
        }
    }

    #[test]
    fn test_scores_extend_parent_by_label_log_probability() {
        let device = Default::default();
        let cfg = reference_config(2, 3);
        let decoder: BeamSearchDecoder<TestBackend> = cfg.init(&device);
        let context = reference_context(&device);
        let start   = Tensor::<TestBackend, 2, Int>::from_ints([[0], [0]], &device);
        let out     = decoder.forward(start.clone(), context.clone(), None);
        let labels  = to_ints(out.output_label_id);
        let parents = to_ints(out.prev_output_index);
        let scores  = to_vec(out.output_score);

        // Replay step 0 then step 1 for the three step-0 hypotheses of each sample
        let x = decoder.core.embed(start).reshape([2, 4]);
        let (_, state) = decoder.core.step(x, decoder.core.cell.initial_state(2, &device), context.clone(), None);
        let state = state.repeat_beams(3);
        let step0 = Tensor::<TestBackend, 1, Int>::from_data(
            TensorData::new(labels[..6].to_vec(), [6]),
            &device,
        );
        let beams_context = context
            .reshape([2, 1, 2, 4])
            .expand([2, 3, 2, 4])
            .reshape([6, 2, 4]);
        let x = decoder.core.embed(step0.reshape([6, 1])).reshape([6, 4]);
        let (output, _) = decoder.core.step(x, state, beams_context, None);
        let log_probs = to_vec(decoder.classifier.forward(output).clamp_min(MIN_PROBABILITY).log());

        for sample in 0..2 {
            for slot in 0..3 {
                let at     = (2 + sample) * 3 + slot;
                let parent = parents[at] as usize;
                let label  = labels[at] as usize;
                let expected = scores[sample * 3 + parent] + log_probs[(sample * 3 + parent) * VOCAB + label];
                assert!(
                    (scores[at] - expected).abs() < 1e-4,
                    "sample {sample} slot {slot}: {} vs {expected}", scores[at],
                );
            }
        }
    }

    #[test]
    fn test_full_width_beam_ignores_inactive_slots() {
        let out     = run(&reference_config(2, VOCAB));
        let parents = to_ints(out.prev_output_index);
        let scores  = to_vec(out.output_score);

        // Step 0 has one live slot, so all VOCAB candidates extend it
        assert!(parents[..2 * VOCAB].iter().all(|&p| p == 0), "{parents:?}");
        assert!(scores[..2 * VOCAB].iter().all(|&s| s.is_finite() && s > DEAD_BEAM_SCORE / 2.0));
        let labels = to_ints(out.output_label_id);
        for sample in labels[..2 * VOCAB].chunks(VOCAB) {
            let mut ids = sample.to_vec();
            ids.sort_unstable();
            assert_eq!(ids, (0..VOCAB as i64).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_padding_mask_matches_unpadded_context() {
        let device = Default::default();
        let decoder: BeamSearchDecoder<TestBackend> = reference_config(3, 2).init(&device);
        let start = Tensor::<TestBackend, 2, Int>::from_ints([[0]], &device);

        // Sample 0 of the reference context with its second step marked as padding
        let padded = reference_context(&device).slice([0..1, 0..2, 0..4]);
        let mask = Tensor::<TestBackend, 2, Bool>::from_data(
            TensorData::new(vec![false, true], [1, 2]),
            &device,
        );
        let masked = decoder.forward(start.clone(), padded.clone(), Some(mask));
        let alone  = decoder.forward(start, padded.slice([0..1, 0..1, 0..4]), None);

        assert_eq!(to_ints(masked.output_label_id), to_ints(alone.output_label_id));
        assert_eq!(to_ints(masked.prev_output_index), to_ints(alone.prev_output_index));
        let diff: f32 = to_vec(masked.output_score).iter().zip(to_vec(alone.output_score))
            .map(|(a, b)| (a - b).abs())
            .sum();
        assert!(diff < 1e-4, "scores differ by {diff}");
    }
}
