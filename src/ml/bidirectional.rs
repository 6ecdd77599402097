// ============================================================
// Layer 5 - Bidirectional Merge
// ============================================================
// Joins the outputs of a left-to-right and a right-to-left
// recurrent pass into one sequence of features.
//
// The right-to-left pass consumes the sequence back to front,
// so its outputs come out in reversed time order:
//
//   left_to_right:  h1  h2  h3
//   right_to_left:  g3  g2  g1
//
// Before concatenating, the right-to-left outputs are flipped
// along the time axis so that step i of both passes lines up:
//
//   output:  [h1|g1]  [h2|g2]  [h3|g3]
//
// The layer owns no parameters; only the time axis is configured.
//
// Reference: Schuster & Paliwal (1997) Bidirectional RNNs

use burn::prelude::*;
use burn::tensor::TensorData;

#[derive(Config, Debug)]
pub struct BiDirectionalConfig {
    /// Axis holding the time steps (1 for [batch, time, features])
    #[config(default = 1)]
    pub time_step_axis: usize,
}

impl BiDirectionalConfig {
    pub fn init(&self) -> BiDirectional {
        BiDirectional { time_step_axis: self.time_step_axis }
    }
}

#[derive(Module, Clone, Debug)]
pub struct BiDirectional {
    pub time_step_axis: usize,
}

impl BiDirectional {
    /// left_to_right: [.., time, d1], right_to_left: [.., time, d2]
    /// → [.., time, d1 + d2]
    pub fn forward<B: Backend, const D: usize>(
        &self,
        left_to_right: Tensor<B, D>,
        right_to_left: Tensor<B, D>,
    ) -> Tensor<B, D> {
        assert!(
            self.time_step_axis < D - 1,
            "time_step_axis {} must come before the feature axis of a rank {} tensor",
            self.time_step_axis, D,
        );
        let l_dims = left_to_right.dims();
        let r_dims = right_to_left.dims();
        assert_eq!(
            l_dims[..D - 1], r_dims[..D - 1],
            "both directions must agree on every axis except the last",
        );

        let realigned = reverse_along(right_to_left, self.time_step_axis);
        Tensor::cat(vec![left_to_right, realigned], D - 1)
    }
}

/// Reverse `tensor` along `axis` by selecting indices n-1, n-2, ..., 0.
pub fn reverse_along<B: Backend, const D: usize>(tensor: Tensor<B, D>, axis: usize) -> Tensor<B, D> {
    let len = tensor.dims()[axis];
    let reversed: Vec<i64> = (0..len as i64).rev().collect();
    let indices = Tensor::<B, 1, Int>::from_data(
        TensorData::new(reversed, [len]),
        &tensor.device(),
    );
    tensor.select(axis, indices)
}
