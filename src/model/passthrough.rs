use burn::module::Module;
use burn::tensor::Tensor;
use burn::tensor::backend::Backend;

use super::PointCloudAutoencoder;
use crate::data::NeighborGraph;
use crate::error::Result;

/// Identity network: the "codeword" is the cloud itself and decoding returns it
/// unchanged, whatever `num_nodes` is requested.
#[derive(Module, Clone, Debug, Default)]
pub struct Passthrough;

impl Passthrough {
    pub fn new() -> Self {
        Self
    }

    pub fn forward<B: Backend, const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        input
    }
}

impl<B: Backend> PointCloudAutoencoder<B> for Passthrough {
    fn encode(&self, points: Tensor<B, 3>, _graph: Option<&NeighborGraph>) -> Result<Tensor<B, 3>> {
        Ok(points)
    }

    fn decode(&self, codeword: Tensor<B, 3>, _num_nodes: usize) -> Result<Tensor<B, 3>> {
        Ok(codeword)
    }
}
