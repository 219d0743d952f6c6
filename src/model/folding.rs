use burn::config::Config;
use burn::module::Module;
use burn::tensor::Tensor;
use burn::tensor::backend::Backend;

use super::activation::Selu;
use super::covariance::local_covariances;
use super::decoder::fold;
use super::graph_conv::GraphConv;
use super::pool::max_over_points;
use super::registry::{ArchitectureSearch, InitialState, LayerRegistry, Stage, StageShape};
use super::{POINT_DIM, PointCloudAutoencoder, check_points, check_widths};
use crate::data::NeighborGraph;
use crate::error::ModelError;

// Defaulted error param so `#[derive(Config)]`, which emits `Result<_, E>`, still resolves.
type Result<T, E = ModelError> = std::result::Result<T, E>;

/// Raw coordinates followed by the flattened local covariance.
const INPUT_DIM: usize = POINT_DIM + POINT_DIM * POINT_DIM;

#[derive(Config, Debug)]
pub struct FoldingNetConfig {
    /// Codeword width, also the cap for resized layers.
    pub h1: usize,
    /// Width of the per-point features fed to the graph convolutions.
    pub h3: usize,
    #[config(default = 4)]
    pub max_depth: usize,
    #[config(default = 24)]
    pub covariance_window: usize,
    #[config(default = "None")]
    pub initial_state: Option<InitialState>,
}

impl FoldingNetConfig {
    pub fn default_state(&self) -> InitialState {
        InitialState::new(
            vec![(INPUT_DIM, self.h3)],
            vec![(self.h1, self.h1)],
            vec![(self.h1 + 2, POINT_DIM)],
            vec![(self.h1 + POINT_DIM, POINT_DIM)],
        )
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<FoldingNet<B>> {
        check_widths(self.h1, self.h3)?;
        if self.covariance_window < 2 {
            return Err(ModelError::WindowTooSmall {
                window: self.covariance_window,
            });
        }

        let state = self
            .initial_state
            .clone()
            .unwrap_or_else(|| self.default_state());
        let (h1, h3) = (self.h1, self.h3);
        let layers = LayerRegistry::new(
            &state,
            |stage| stage_shape(h1, h3, stage),
            self.max_depth,
            h1,
            device,
        )?;
        log::debug!("folding net: h1 = {h1}, h3 = {h3}, max_depth = {}", self.max_depth);

        Ok(FoldingNet {
            layers,
            graph_encoder1: GraphConv::new(h3, h3 * 2, device),
            graph_encoder2: GraphConv::new(h3 * 2, h1, device),
            activation: Selu::new(),
            h1,
            h3,
            covariance_window: self.covariance_window,
        })
    }
}

fn stage_shape(h1: usize, h3: usize, stage: Stage) -> StageShape {
    match stage {
        Stage::Encoder1 => StageShape::new(INPUT_DIM, h3),
        Stage::Encoder2 => StageShape::new(h1, h1),
        Stage::Decoder1 => StageShape::new(h1 + 2, POINT_DIM),
        Stage::Decoder2 => StageShape::new(h1 + POINT_DIM, POINT_DIM),
    }
}

/// Graph-convolution autoencoder.
///
/// Encoder: points || local covariance -> MLP -> GCN(h3 -> 2*h3) -> GCN(2*h3 -> h1)
/// -> max over points -> MLP. Decoder: grid folding.
#[derive(Module, Debug)]
pub struct FoldingNet<B: Backend> {
    layers: LayerRegistry<B>,
    graph_encoder1: GraphConv<B>,
    graph_encoder2: GraphConv<B>,
    activation: Selu,
    h1: usize,
    h3: usize,
    covariance_window: usize,
}

impl<B: Backend> FoldingNet<B> {
    pub fn codeword_width(&self) -> usize {
        self.h1
    }

    /// points: [B, N, 3] -> codeword: [B, 1, h1]
    ///
    /// `graph` connects the `B * N` flattened points.
    pub fn encode(&self, points: Tensor<B, 3>, graph: &NeighborGraph) -> Result<Tensor<B, 3>> {
        let [batch_size, num_points, _] = check_points(&points)?;

        let covariances = local_covariances(points.clone(), self.covariance_window)?; // [B, N, 9]
        let x = Tensor::cat(vec![points, covariances], 2); // [B, N, 12]
        let x = self.layers.forward(Stage::Encoder1, x); // [B, N, h3]

        let x = x.reshape([batch_size * num_points, self.h3]);
        let x = self
            .activation
            .forward(self.graph_encoder1.forward(x, graph)?); // [B*N, 2*h3]
        let x = self
            .activation
            .forward(self.graph_encoder2.forward(x, graph)?); // [B*N, h1]
        let x = x.reshape([batch_size, num_points, self.h1]);

        let pooled = max_over_points(x); // [B, 1, h1]
        Ok(self.layers.forward(Stage::Encoder2, pooled))
    }

    /// codeword: [B, 1, h1] -> point cloud: [B, num_nodes, 3]
    pub fn decode(&self, codeword: Tensor<B, 3>, num_nodes: usize) -> Result<Tensor<B, 3>> {
        fold(&self.layers, codeword, num_nodes, |x| x)
    }

    /// points: [B, N, 3] -> reconstructed: [B, N, 3]
    pub fn forward(&self, points: Tensor<B, 3>, graph: &NeighborGraph) -> Result<Tensor<B, 3>> {
        let [_, num_points, _] = points.dims();
        let codeword = self.encode(points, graph)?;
        self.decode(codeword, num_points)
    }
}

impl<B: Backend> PointCloudAutoencoder<B> for FoldingNet<B> {
    fn encode(&self, points: Tensor<B, 3>, graph: Option<&NeighborGraph>) -> Result<Tensor<B, 3>> {
        let graph = graph.ok_or(ModelError::MissingGraph)?;
        FoldingNet::encode(self, points, graph)
    }

    fn decode(&self, codeword: Tensor<B, 3>, num_nodes: usize) -> Result<Tensor<B, 3>> {
        FoldingNet::decode(self, codeword, num_nodes)
    }

    fn requires_graph(&self) -> bool {
        true
    }
}

impl<B: Backend> ArchitectureSearch<B> for FoldingNet<B> {
    fn registry(&self) -> &LayerRegistry<B> {
        &self.layers
    }

    fn registry_mut(&mut self) -> &mut LayerRegistry<B> {
        &mut self.layers
    }

    fn stage_shape(&self, stage: Stage) -> StageShape {
        stage_shape(self.h1, self.h3, stage)
    }
}
