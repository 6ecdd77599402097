// ============================================================
// Layer 5 - MLP Classifier Head
// ============================================================
// A stack of dense hidden layers followed by a dense output
// layer, each with its own activation:
//
//   x ─► Dense(h1, act1) ─► Dense(h2, act2) ─► ... ─► Dense(out, softmax)
//
// With the default softmax output the result is a probability
// distribution over `output_dim` classes on the last axis.
// The beam search decoder uses it to score the vocabulary.

use anyhow::{ensure, Result};
use burn::{
    module::Ignored,
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation,
};
use serde::{Deserialize, Serialize};

/// Element-wise (or last-axis for softmax) activation after a dense layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Tanh,
    Sigmoid,
    Linear,
    Softmax,
}

impl Activation {
    pub fn apply<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Activation::Relu    => activation::relu(x),
            Activation::Tanh    => activation::tanh(x),
            Activation::Sigmoid => activation::sigmoid(x),
            Activation::Linear  => x,
            Activation::Softmax => activation::softmax(x, D - 1),
        }
    }
}

#[derive(Config, Debug)]
pub struct MlpClassifierConfig {
    pub d_input:    usize,
    pub output_dim: usize,
    /// Width of each hidden layer, in order
    pub hidden_unit_numbers: Vec<usize>,
    /// One activation per hidden layer
    pub hidden_unit_activation_functions: Vec<Activation>,
    #[config(default = "Activation::Softmax")]
    pub output_activation: Activation,
}

impl MlpClassifierConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.hidden_unit_numbers.len() == self.hidden_unit_activation_functions.len(),
            "{} hidden layer sizes but {} hidden activations",
            self.hidden_unit_numbers.len(),
            self.hidden_unit_activation_functions.len(),
        );
        ensure!(self.d_input > 0, "classifier input width must be positive");
        ensure!(self.output_dim > 0, "classifier output width must be positive");
        ensure!(
            self.hidden_unit_numbers.iter().all(|&n| n > 0),
            "hidden layer sizes must be positive: {:?}",
            self.hidden_unit_numbers,
        );
        Ok(())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> MlpClassifier<B> {
        let mut d_in = self.d_input;
        let mut hidden = Vec::with_capacity(self.hidden_unit_numbers.len());
        for (&units, &act) in self.hidden_unit_numbers.iter()
            .zip(&self.hidden_unit_activation_functions)
        {
            hidden.push(Dense {
                linear:     LinearConfig::new(d_in, units).init(device),
                activation: Ignored(act),
            });
            d_in = units;
        }
        let output = Dense {
            linear:     LinearConfig::new(d_in, self.output_dim).init(device),
            activation: Ignored(self.output_activation),
        };
        MlpClassifier { hidden, output }
    }
}

/// A linear projection followed by an activation.
#[derive(Module, Debug)]
pub struct Dense<B: Backend> {
    pub linear:     Linear<B>,
    pub activation: Ignored<Activation>,
}

impl<B: Backend> Dense<B> {
    pub fn forward<const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        self.activation.apply(self.linear.forward(x))
    }
}

#[derive(Module, Debug)]
pub struct MlpClassifier<B: Backend> {
    pub hidden: Vec<Dense<B>>,
    pub output: Dense<B>,
}

impl<B: Backend> MlpClassifier<B> {
    /// x: [.., d_input] → [.., output_dim]
    pub fn forward<const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        let x = self.hidden.iter().fold(x, |x, layer| layer.forward(x));
        self.output.forward(x)
    }

    pub fn output_dim(&self) -> usize {
        self.output.linear.weight.dims()[1]
    }
}
