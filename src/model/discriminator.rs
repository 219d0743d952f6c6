use burn::config::Config;
use burn::module::Module;
use burn::nn::pool::{AdaptiveAvgPool1d, AdaptiveAvgPool1dConfig};
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig, Sigmoid};
use burn::tensor::Tensor;
use burn::tensor::backend::Backend;

use super::POINT_DIM;
use super::activation::Selu;

/// Per-point stack: 3 -> 16 -> 32 -> 64 -> 256 -> 64 -> 32 -> 16 -> 1
const POINT_WIDTHS: [usize; 9] = [POINT_DIM, 16, 32, 64, 256, 64, 32, 16, 1];
/// Pooled stack: 256 -> 64 -> 32 -> 16 -> 1
const POOLED_WIDTHS: [usize; 5] = [256, 64, 32, 16, 1];

#[derive(Config, Debug)]
pub struct DiscriminatorConfig {
    #[config(default = 0.2)]
    pub dropout: f64,
}

impl DiscriminatorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Discriminator<B> {
        let stack = |widths: &[usize]| -> Vec<Linear<B>> {
            widths
                .windows(2)
                .map(|pair| LinearConfig::new(pair[0], pair[1]).init(device))
                .collect()
        };

        Discriminator {
            point_layers: stack(&POINT_WIDTHS),
            pooled_layers: stack(&POOLED_WIDTHS),
            pool: AdaptiveAvgPool1dConfig::new(POOLED_WIDTHS[0]).init(),
            dropout: DropoutConfig::new(self.dropout).init(),
            activation: Selu::new(),
            sigmoid: Sigmoid::new(),
        }
    }
}

/// Realism score of point clouds.
///
/// Every point is scored on its own, the per-point scores are average-pooled
/// to 256 values along the points, and a second MLP turns those into one
/// score per cloud.
#[derive(Module, Debug)]
pub struct Discriminator<B: Backend> {
    point_layers: Vec<Linear<B>>,
    pooled_layers: Vec<Linear<B>>,
    pool: AdaptiveAvgPool1d,
    dropout: Dropout,
    activation: Selu,
    sigmoid: Sigmoid,
}

impl<B: Backend> Discriminator<B> {
    /// points: [B, N, 3] -> per-point scores: [B, N, 1]
    fn score_points(&self, points: Tensor<B, 3>) -> Tensor<B, 3> {
        let l = &self.point_layers;
        let x = self.activation.forward(l[0].forward(points));
        let x = self.activation.forward(l[1].forward(x));
        let x = self.dropout.forward(l[2].forward(x));
        let x = self.activation.forward(l[3].forward(x));
        let x = self.activation.forward(self.dropout.forward(l[4].forward(x)));
        let x = self.activation.forward(l[5].forward(x));
        let x = self.activation.forward(l[6].forward(x));
        self.sigmoid.forward(l[7].forward(x))
    }

    /// pooled: [B, 1, 256] -> [B, 1, 1]
    fn score_pooled(&self, pooled: Tensor<B, 3>) -> Tensor<B, 3> {
        let l = &self.pooled_layers;
        let x = self.activation.forward(self.dropout.forward(l[0].forward(pooled)));
        let x = self.activation.forward(l[1].forward(x));
        let x = self.activation.forward(l[2].forward(x));
        self.sigmoid.forward(l[3].forward(x))
    }

    /// points: [B, N, 3] -> score: [B, 1], in (0, 1)
    pub fn forward(&self, points: Tensor<B, 3>) -> Tensor<B, 2> {
        let [batch_size, _, _] = points.dims();
        let scores = self.score_points(points); // [B, N, 1]
        let pooled = self.pool.forward(scores.swap_dims(1, 2)); // [B, 1, 256]
        self.score_pooled(pooled).reshape([batch_size, 1])
    }
}
