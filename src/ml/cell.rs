// ============================================================
// Layer 5 - Recurrent Cells
// ============================================================
// Wraps burn's GRU and LSTM behind one interface with two
// entry points:
//
//   forward_sequence - run over a whole [batch, time, d] input
//   step             - advance exactly one time step
//
// The decoders need `step` because their input at time t
// depends on what happened at t-1 (attention over the previous
// state, or the label picked by beam search).
//
// CellState carries the hidden state h and, for LSTM, the
// memory cell c. Beam search reshuffles states between
// hypotheses with `repeat_beams` / `reorder_beams`.

use burn::{
    nn::{
        gru::{Gru, GruConfig},
        lstm::{Lstm, LstmConfig, LstmState},
    },
    prelude::*,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    Gru,
    Lstm,
}

#[derive(Config, Debug)]
pub struct RecurrentCellConfig {
    pub kind:     CellKind,
    pub d_input:  usize,
    pub d_hidden: usize,
}

impl RecurrentCellConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> RecurrentCell<B> {
        match self.kind {
            CellKind::Gru => RecurrentCell::Gru(
                GruConfig::new(self.d_input, self.d_hidden, true).init(device),
            ),
            CellKind::Lstm => RecurrentCell::Lstm(
                LstmConfig::new(self.d_input, self.d_hidden, true).init(device),
            ),
        }
    }
}

#[derive(Module, Debug)]
pub enum RecurrentCell<B: Backend> {
    Gru(Gru<B>),
    Lstm(Lstm<B>),
}

/// Recurrent state for `n` independent rows.
#[derive(Debug, Clone)]
pub struct CellState<B: Backend> {
    /// h : [n, d_hidden]
    pub hidden: Tensor<B, 2>,
    /// c : [n, d_hidden], LSTM only
    pub memory: Option<Tensor<B, 2>>,
}

impl<B: Backend> CellState<B> {
    /// Repeat every row `beam` times: row i becomes rows i*beam .. i*beam+beam.
    pub fn repeat_beams(self, beam: usize) -> Self {
        Self {
            hidden: repeat_rows(self.hidden, beam),
            memory: self.memory.map(|m| repeat_rows(m, beam)),
        }
    }

    /// Rows are laid out as [batch * beam]. For every (sample, slot) pick the
    /// row of hypothesis `parents[sample, slot]` of the same sample.
    pub fn reorder_beams(self, parents: Tensor<B, 2, Int>) -> Self {
        Self {
            hidden: gather_beams(self.hidden, parents.clone()),
            memory: self.memory.map(|m| gather_beams(m, parents)),
        }
    }
}

fn repeat_rows<B: Backend>(x: Tensor<B, 2>, beam: usize) -> Tensor<B, 2> {
    let [n, d] = x.dims();
    x.reshape([n, 1, d])
        .expand([n, beam, d])
        .reshape([n * beam, d])
}

fn gather_beams<B: Backend>(x: Tensor<B, 2>, parents: Tensor<B, 2, Int>) -> Tensor<B, 2> {
    let [batch, beam] = parents.dims();
    let [_, d] = x.dims();
    let index = parents.reshape([batch, beam, 1]).expand([batch, beam, d]);
    x.reshape([batch, beam, d])
        .gather(1, index)
        .reshape([batch * beam, d])
}

impl<B: Backend> RecurrentCell<B> {
    pub fn d_hidden(&self) -> usize {
        match self {
            RecurrentCell::Gru(gru)   => gru.d_hidden,
            RecurrentCell::Lstm(lstm) => lstm.d_hidden,
        }
    }

    /// Zero state for `n` rows.
    pub fn initial_state(&self, n: usize, device: &B::Device) -> CellState<B> {
        let zeros = Tensor::zeros([n, self.d_hidden()], device);
        match self {
            RecurrentCell::Gru(_)  => CellState { hidden: zeros, memory: None },
            RecurrentCell::Lstm(_) => CellState { hidden: zeros.clone(), memory: Some(zeros) },
        }
    }

    /// x: [batch, time, d_input] → hidden states [batch, time, d_hidden]
    pub fn forward_sequence(&self, x: Tensor<B, 3>, state: Option<CellState<B>>) -> Tensor<B, 3> {
        self.run(x, state).0
    }

    /// x: [n, d_input] → state after one step
    pub fn step(&self, x: Tensor<B, 2>, state: CellState<B>) -> CellState<B> {
        let [n, d_input] = x.dims();
        self.run(x.reshape([n, 1, d_input]), Some(state)).1
    }

    fn run(&self, x: Tensor<B, 3>, state: Option<CellState<B>>) -> (Tensor<B, 3>, CellState<B>) {
        let [batch, time, _] = x.dims();
        let d_hidden = self.d_hidden();
        match self {
            RecurrentCell::Gru(gru) => {
                let outputs = gru.forward(x, state.map(|s| s.hidden));
                let hidden  = outputs.clone()
                    .slice([0..batch, time - 1..time, 0..d_hidden])
                    .reshape([batch, d_hidden]);
                (outputs, CellState { hidden, memory: None })
            }
            RecurrentCell::Lstm(lstm) => {
                let device = x.device();
                let state  = state.map(|s| {
                    let memory = s.memory
                        .unwrap_or_else(|| Tensor::zeros([batch, d_hidden], &device));
                    LstmState::new(memory, s.hidden)
                });
                let (outputs, last) = lstm.forward(x, state);
                (outputs, CellState { hidden: last.hidden, memory: Some(last.cell) })
            }
        }
    }
}
