// ============================================================
// Layer 3 - Beam Lattice and Hypotheses
// ============================================================
// Beam search does not return finished sequences. Each step
// records, per (sample, slot):
//
//   label  - the label appended at this step
//   parent - the slot of the previous step it extends
//   score  - the cumulative score after appending it
//
// A hypothesis is read back by starting from a slot at the
// last step and following the parents to step 0:
//
//   step:     0      1      2
//   slot 0:  a(0)   c(1)   e(0)     slot 0 at step 2 → e, then
//   slot 1:  b(0)   d(0)   f(1)     parent 0 → c, parent 1 → b
//                                   = [b, c, e]

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// One decoded label sequence and its cumulative score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    pub tokens: Vec<u32>,
    pub score:  f32,
}

/// Host copy of the three beam search outputs, all laid out
/// [step][sample][slot] in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct BeamLattice {
    steps:   usize,
    batch:   usize,
    beam:    usize,
    labels:  Vec<u32>,
    parents: Vec<usize>,
    scores:  Vec<f32>,
}

impl BeamLattice {
    pub fn new(
        [steps, batch, beam]: [usize; 3],
        labels:  Vec<u32>,
        parents: Vec<usize>,
        scores:  Vec<f32>,
    ) -> Result<Self> {
        ensure!(beam > 0, "a lattice needs at least one beam slot");
        let cells = steps * batch * beam;
        ensure!(
            labels.len() == cells && parents.len() == cells && scores.len() == cells,
            "lattice [{steps}, {batch}, {beam}] needs {cells} entries, got {} labels, {} parents, {} scores",
            labels.len(), parents.len(), scores.len(),
        );
        ensure!(
            parents.iter().all(|&p| p < beam),
            "parent index out of range for beam size {beam}",
        );
        Ok(Self { steps, batch, beam, labels, parents, scores })
    }

    pub fn steps(&self) -> usize { self.steps }

    pub fn batch(&self) -> usize { self.batch }

    pub fn beam(&self) -> usize { self.beam }

    fn at(&self, step: usize, sample: usize, slot: usize) -> usize {
        (step * self.batch + sample) * self.beam + slot
    }

    /// Follow the parents back from `slot` at the last step.
    pub fn backtrace(&self, sample: usize, slot: usize) -> Hypothesis {
        assert!(sample < self.batch && slot < self.beam, "({sample}, {slot}) outside the lattice");
        if self.steps == 0 {
            return Hypothesis { tokens: Vec::new(), score: 0.0 };
        }

        let score = self.scores[self.at(self.steps - 1, sample, slot)];
        let mut tokens = Vec::with_capacity(self.steps);
        let mut slot   = slot;
        for step in (0..self.steps).rev() {
            let i = self.at(step, sample, slot);
            tokens.push(self.labels[i]);
            slot = self.parents[i];
        }
        tokens.reverse();
        Hypothesis { tokens, score }
    }

    /// Every final hypothesis of `sample`, best score first.
    pub fn hypotheses(&self, sample: usize) -> Vec<Hypothesis> {
        let mut all: Vec<Hypothesis> = (0..self.beam)
            .map(|slot| self.backtrace(sample, slot))
            .collect();
        all.sort_by(|a, b| b.score.total_cmp(&a.score));
        all
    }

    pub fn best(&self, sample: usize) -> Hypothesis {
        self.hypotheses(sample).swap_remove(0)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    /// The lattice from the header comment, one sample, labels a..f = 1..6.
    fn header_lattice() -> BeamLattice {
        BeamLattice::new(
            [3, 1, 2],
            vec![1, 2, 3, 4, 5, 6],
            vec![0, 0, 1, 0, 0, 1],
            vec![-0.1, -0.5, -0.7, -0.9, -1.0, -1.2],
        )
        .unwrap()
    }

    #[test]
    fn test_backtrace_follows_parents() {
        let lattice = header_lattice();
        assert_eq!(lattice.backtrace(0, 0), Hypothesis { tokens: vec![2, 3, 5], score: -1.0 });
        assert_eq!(lattice.backtrace(0, 1), Hypothesis { tokens: vec![1, 4, 6], score: -1.2 });
    }

    #[test]
    fn test_hypotheses_sorted_by_score() {
        let lattice = BeamLattice::new(
            [1, 2, 2],
            vec![7, 8, 9, 10],
            vec![0, 0, 0, 0],
            vec![-2.0, -1.0, -0.3, -0.4],
        )
        .unwrap();

        let first = lattice.hypotheses(0);
        assert_eq!(first[0].tokens, vec![8]);
        assert_eq!(first[1].tokens, vec![7]);
        assert_eq!(lattice.best(1), Hypothesis { tokens: vec![9], score: -0.3 });
    }

    #[test]
    fn test_rejects_inconsistent_sizes() {
        assert!(BeamLattice::new([2, 1, 2], vec![1, 2, 3], vec![0; 4], vec![0.0; 4]).is_err());
        assert!(BeamLattice::new([1, 1, 2], vec![1, 2], vec![0, 2], vec![0.0; 2]).is_err());
    }

    #[test]
    fn test_empty_search() {
        let lattice = BeamLattice::new([0, 1, 1], vec![], vec![], vec![]).unwrap();
        assert!(lattice.backtrace(0, 0).tokens.is_empty());
    }
}
