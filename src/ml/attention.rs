// ============================================================
// Layer 5 - Additive (Bahdanau) Attention
// ============================================================
// Given the decoder state s and the encoder outputs h_1..h_T:
//
//   e_t     = v_a · tanh(s W_a + h_t U_a)     energy per time step
//   alpha_t = softmax_t(e_t)                  alignment weights
//   c       = Σ_t alpha_t h_t                 attended context
//
// Shapes:
//   s   : [batch, state_dim]
//   h   : [batch, time, context_dim]
//   W_a : [state_dim, A]     U_a : [context_dim, A]     v_a : [A]
//   c   : [batch, context_dim]
//
// An optional padding mask [batch, time] (true = padding) sets
// the energies of padded steps to -inf, so they get zero weight.
//
// Reference: Bahdanau et al. (2015) §3.1 and Appendix A.1.2

use burn::{
    module::Param,
    nn::Initializer,
    prelude::*,
    tensor::activation,
};

#[derive(Config, Debug)]
pub struct AttentionConfig {
    /// Width of the decoder state s
    pub state_dim: usize,
    /// Width of each encoder output h_t
    pub context_dim: usize,
    /// Width A of the hidden alignment space
    pub attention_context_dim: usize,
    #[config(default = "Initializer::XavierUniform { gain: 1.0 }")]
    pub initializer: Initializer,
}

impl AttentionConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Attention<B> {
        let a = self.attention_context_dim;
        Attention {
            w_a: self.initializer.init_with(
                [self.state_dim, a], Some(self.state_dim), Some(a), device,
            ),
            u_a: self.initializer.init_with(
                [self.context_dim, a], Some(self.context_dim), Some(a), device,
            ),
            v_a: self.initializer.init_with([a], Some(a), Some(1), device),
        }
    }
}

#[derive(Module, Debug)]
pub struct Attention<B: Backend> {
    pub w_a: Param<Tensor<B, 2>>,
    pub u_a: Param<Tensor<B, 2>>,
    pub v_a: Param<Tensor<B, 1>>,
}

/// Every intermediate of one attention pass, for inspection.
#[derive(Debug, Clone)]
pub struct AttentionTrace<B: Backend> {
    /// s W_a + h U_a : [batch, time, A]
    pub projected_sum: Tensor<B, 3>,
    /// e : [batch, time]
    pub energies: Tensor<B, 2>,
    /// alpha : [batch, time]
    pub weights: Tensor<B, 2>,
    /// c : [batch, context_dim]
    pub context: Tensor<B, 2>,
}

impl<B: Backend> Attention<B> {
    /// Build the layer from explicit parameter values.
    pub fn with_weights(w_a: Tensor<B, 2>, u_a: Tensor<B, 2>, v_a: Tensor<B, 1>) -> Self {
        let [state_dim, a] = w_a.dims();
        let [context_dim, a_u] = u_a.dims();
        let [a_v] = v_a.dims();
        assert!(
            a == a_u && a == a_v,
            "W_a [{state_dim}, {a}], U_a [{context_dim}, {a_u}] and v_a [{a_v}] disagree on the attention width",
        );
        Self {
            w_a: Param::from_tensor(w_a),
            u_a: Param::from_tensor(u_a),
            v_a: Param::from_tensor(v_a),
        }
    }

    pub fn state_dim(&self) -> usize { self.w_a.dims()[0] }

    pub fn context_dim(&self) -> usize { self.u_a.dims()[0] }

    /// s: [batch, state_dim], h: [batch, time, context_dim] → [batch, context_dim]
    pub fn forward(
        &self,
        s: Tensor<B, 2>,
        h: Tensor<B, 3>,
        padding_mask: Option<Tensor<B, 2, Bool>>,
    ) -> Tensor<B, 2> {
        self.forward_traced(s, h, padding_mask).context
    }

    /// `energies` are reported before masking.
    pub fn forward_traced(
        &self,
        s: Tensor<B, 2>,
        h: Tensor<B, 3>,
        padding_mask: Option<Tensor<B, 2, Bool>>,
    ) -> AttentionTrace<B> {
        let [batch, time, context_dim] = h.dims();
        let a = self.v_a.dims()[0];

        // s W_a : [batch, A] → [batch, 1, A] so it broadcasts over time
        let s_proj = s.matmul(self.w_a.val()).reshape([batch, 1, a]);

        // h U_a computed as one 2D matmul over all (batch, time) rows
        let h_proj = h.clone()
            .reshape([batch * time, context_dim])
            .matmul(self.u_a.val())
            .reshape([batch, time, a]);

        let projected_sum = h_proj + s_proj.expand([batch, time, a]);

        // v_a · tanh(..) : [batch * time, A] x [A, 1] → [batch, time]
        let energies = activation::tanh(projected_sum.clone())
            .reshape([batch * time, a])
            .matmul(self.v_a.val().reshape([a, 1]))
            .reshape([batch, time]);

        // Every row keeps at least one real step, so the softmax stays finite
        let masked = match padding_mask {
            Some(mask) => energies.clone().mask_fill(mask, f32::NEG_INFINITY),
            None       => energies.clone(),
        };
        let weights = activation::softmax(masked, 1);

        // Σ_t alpha_t h_t
        let context = (h * weights.clone().reshape([batch, time, 1]).expand([batch, time, context_dim]))
            .sum_dim(1)
            .reshape([batch, context_dim]);

        AttentionTrace { projected_sum, energies, weights, context }
    }
}
