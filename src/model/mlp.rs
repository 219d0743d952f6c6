use burn::config::Config;
use burn::module::Module;
use burn::tensor::Tensor;
use burn::tensor::backend::Backend;

use super::decoder::fold;
use super::pool::max_over_points;
use super::registry::{ArchitectureSearch, InitialState, LayerRegistry, Stage, StageShape};
use super::{POINT_DIM, PointCloudAutoencoder, check_points, check_widths};
use crate::data::NeighborGraph;
use crate::error::ModelError;

// Defaulted error param so `#[derive(Config)]`, which emits `Result<_, E>`, still resolves.
type Result<T, E = ModelError> = std::result::Result<T, E>;

#[derive(Config, Debug)]
pub struct MlpNetConfig {
    /// Codeword width.
    pub h1: usize,
    /// Width of the per-point features before pooling.
    pub h3: usize,
    #[config(default = 8)]
    pub max_depth: usize,
    #[config(default = 1024)]
    pub max_width: usize,
    #[config(default = "None")]
    pub initial_state: Option<InitialState>,
}

impl MlpNetConfig {
    pub fn default_state(&self) -> InitialState {
        InitialState::new(
            vec![(POINT_DIM, self.h3)],
            vec![(self.h3, self.h1)],
            vec![(self.h1 + 2, POINT_DIM)],
            vec![(self.h1 + POINT_DIM, POINT_DIM)],
        )
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<MlpNet<B>> {
        check_widths(self.h1, self.h3)?;
        let state = self
            .initial_state
            .clone()
            .unwrap_or_else(|| self.default_state());
        let (h1, h3) = (self.h1, self.h3);
        let layers = LayerRegistry::new(
            &state,
            |stage| stage_shape(h1, h3, stage),
            self.max_depth,
            self.max_width,
            device,
        )?;

        Ok(MlpNet { layers, h1, h3 })
    }
}

fn stage_shape(h1: usize, h3: usize, stage: Stage) -> StageShape {
    match stage {
        Stage::Encoder1 => StageShape::new(POINT_DIM, h3),
        Stage::Encoder2 => StageShape::new(h3, h1),
        Stage::Decoder1 => StageShape::new(h1 + 2, POINT_DIM),
        Stage::Decoder2 => StageShape::new(h1 + POINT_DIM, POINT_DIM),
    }
}

/// Plain MLP autoencoder: per-point MLP, max over points, MLP; grid folding decoder.
#[derive(Module, Debug)]
pub struct MlpNet<B: Backend> {
    layers: LayerRegistry<B>,
    h1: usize,
    h3: usize,
}

impl<B: Backend> MlpNet<B> {
    pub fn codeword_width(&self) -> usize {
        self.h1
    }

    /// points: [B, N, 3] -> codeword: [B, 1, h1]
    pub fn encode(&self, points: Tensor<B, 3>) -> Result<Tensor<B, 3>> {
        check_points(&points)?;
        let features = self.layers.forward(Stage::Encoder1, points); // [B, N, h3]
        let pooled = max_over_points(features); // [B, 1, h3]
        Ok(self.layers.forward(Stage::Encoder2, pooled))
    }

    pub fn decode(&self, codeword: Tensor<B, 3>, num_nodes: usize) -> Result<Tensor<B, 3>> {
        fold(&self.layers, codeword, num_nodes, |x| x)
    }

    /// points: [B, N, 3] -> reconstructed: [B, N, 3]
    pub fn forward(&self, points: Tensor<B, 3>) -> Result<Tensor<B, 3>> {
        let [_, num_points, _] = points.dims();
        let codeword = self.encode(points)?;
        self.decode(codeword, num_points)
    }
}

impl<B: Backend> PointCloudAutoencoder<B> for MlpNet<B> {
    fn encode(&self, points: Tensor<B, 3>, _graph: Option<&NeighborGraph>) -> Result<Tensor<B, 3>> {
        MlpNet::encode(self, points)
    }

    fn decode(&self, codeword: Tensor<B, 3>, num_nodes: usize) -> Result<Tensor<B, 3>> {
        MlpNet::decode(self, codeword, num_nodes)
    }
}

impl<B: Backend> ArchitectureSearch<B> for MlpNet<B> {
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
