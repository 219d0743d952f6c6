use burn::module::{Module, Param};
use burn::nn::{Initializer, Linear, LinearConfig};
use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor, TensorData};

use crate::data::NeighborGraph;
use crate::error::{ModelError, Result};

/// Graph convolution with symmetric normalisation (Kipf & Welling):
/// `D^-1/2 (A + I) D^-1/2 X W + b`.
#[derive(Module, Debug)]
pub struct GraphConv<B: Backend> {
    linear: Linear<B>,
    bias: Param<Tensor<B, 1>>,
}

impl<B: Backend> GraphConv<B> {
    pub fn new(in_dim: usize, out_dim: usize, device: &B::Device) -> Self {
        let linear = LinearConfig::new(in_dim, out_dim)
            .with_bias(false)
            .with_initializer(Initializer::XavierUniform { gain: 1.0 })
            .init(device);
        let bias = Param::from_tensor(Tensor::zeros([out_dim], device));
        Self { linear, bias }
    }

    /// nodes: [M, C_in] -> [M, C_out], with M = graph.num_nodes()
    pub fn forward(&self, nodes: Tensor<B, 2>, graph: &NeighborGraph) -> Result<Tensor<B, 2>> {
        let [num_nodes, _] = nodes.dims();
        if graph.num_nodes() != num_nodes {
            return Err(ModelError::GraphSize {
                expected: num_nodes,
                got: graph.num_nodes(),
            });
        }
        let device = nodes.device();
        let edges = graph.normalized_edges();
        let num_edges = edges.weights.len();

        let sources = index_tensor::<B>(&edges.sources, &device);
        let targets = index_tensor::<B>(&edges.targets, &device);
        let weights = Tensor::<B, 1>::from_data(TensorData::new(edges.weights, [num_edges]), &device)
            .unsqueeze_dim::<2>(1); // [E, 1]

        let features = self.linear.forward(nodes); // [M, C_out]
        let [_, out_dim] = features.dims();
        let messages = features.select(0, sources) * weights; // [E, C_out]

        // select_assign accumulates messages sharing a target
        let aggregated = Tensor::<B, 2>::zeros([num_nodes, out_dim], &device)
            .select_assign(0, targets, messages);

        Ok(aggregated + self.bias.val().unsqueeze_dim::<2>(0))
    }
}

fn index_tensor<B: Backend>(indices: &[usize], device: &B::Device) -> Tensor<B, 1, Int> {
    let data = indices.iter().map(|&i| i as i64).collect::<Vec<_>>();
    Tensor::from_data(TensorData::new(data, [indices.len()]), device)
}
