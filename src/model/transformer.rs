use burn::config::Config;
use burn::module::Module;
use burn::nn::transformer::{
    TransformerDecoder, TransformerDecoderConfig, TransformerDecoderInput, TransformerEncoder,
    TransformerEncoderConfig, TransformerEncoderInput,
};
use burn::tensor::Tensor;
use burn::tensor::backend::Backend;

use super::decoder::fold;
use super::pool::adaptive_max_pool1d;
use super::registry::{ArchitectureSearch, InitialState, LayerRegistry, Stage, StageShape};
use super::{POINT_DIM, PointCloudAutoencoder, check_points};
use crate::data::NeighborGraph;
use crate::error::ModelError;

// Defaulted error param so `#[derive(Config)]`, which emits `Result<_, E>`, still resolves.
type Result<T, E = ModelError> = std::result::Result<T, E>;

/// Width of one attention head.
pub const HEAD_DIM: usize = 16;

#[derive(Config, Debug)]
pub struct TrsNetConfig {
    /// Requested codeword width, rounded up to a multiple of [`HEAD_DIM`].
    pub h1: usize,
    #[config(default = 8)]
    pub max_depth: usize,
    /// Feed-forward width of the transformer layers.
    #[config(default = 2048)]
    pub d_ff: usize,
    #[config(default = 0.1)]
    pub dropout: f64,
    #[config(default = "None")]
    pub initial_state: Option<InitialState>,
}

impl TrsNetConfig {
    /// Codeword width actually used: `h1` rounded up to a multiple of 16.
    pub fn effective_h1(&self) -> usize {
        self.h1.next_multiple_of(HEAD_DIM)
    }

    pub fn num_heads(&self) -> usize {
        self.effective_h1() / HEAD_DIM
    }

    pub fn default_state(&self) -> InitialState {
        let h1 = self.effective_h1();
        let hidden = self.num_heads().max(1);
        InitialState::new(
            vec![(POINT_DIM, hidden), (hidden, POINT_DIM)],
            vec![(POINT_DIM * 2, h1)],
            vec![(h1 + 2, POINT_DIM)],
            vec![(h1 + POINT_DIM, POINT_DIM)],
        )
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<TrsNet<B>> {
        if self.h1 == 0 {
            return Err(ModelError::InvalidConfig {
                message: "h1 must be positive".to_string(),
            });
        }
        let h1 = self.effective_h1();
        if h1 != self.h1 {
            log::warn!("changing h1 from {} to {h1}", self.h1);
        }

        let state = self
            .initial_state
            .clone()
            .unwrap_or_else(|| self.default_state());
        let layers = LayerRegistry::new(
            &state,
            |stage| stage_shape(h1, stage),
            self.max_depth,
            h1,
            device,
        )?;
        let encoder = TransformerEncoderConfig::new(h1, self.d_ff, self.num_heads(), 1)
            .with_dropout(self.dropout)
            .init(device);
        let decoder = TransformerDecoderConfig::new(h1, self.d_ff, self.num_heads(), 1)
            .with_dropout(self.dropout)
            .init(device);

        Ok(TrsNet {
            layers,
            encoder,
            decoder,
            h1,
        })
    }
}

fn stage_shape(h1: usize, stage: Stage) -> StageShape {
    match stage {
        Stage::Encoder1 => StageShape::new(POINT_DIM, POINT_DIM),
        Stage::Encoder2 => StageShape::new(POINT_DIM * 2, h1),
        Stage::Decoder1 => StageShape::new(h1 + 2, POINT_DIM),
        Stage::Decoder2 => StageShape::new(h1 + POINT_DIM, POINT_DIM),
    }
}

/// Transformer autoencoder.
///
/// The per-point features `[B, N, h1]` are max-pooled along the points to a
/// sequence of `h1` channel tokens of width `h1`, run through one transformer
/// encoder layer and max-pooled into the codeword. The decoder refines the
/// repeated codeword with one transformer decoder layer (self-attending, with
/// itself as memory) before the second fold.
#[derive(Module, Debug)]
pub struct TrsNet<B: Backend> {
    layers: LayerRegistry<B>,
    encoder: TransformerEncoder<B>,
    decoder: TransformerDecoder<B>,
    h1: usize,
}

impl<B: Backend> TrsNet<B> {
    pub fn codeword_width(&self) -> usize {
        self.h1
    }

    /// points: [B, N, 3] -> codeword: [B, 1, h1]
    pub fn encode(&self, points: Tensor<B, 3>) -> Result<Tensor<B, 3>> {
        check_points(&points)?;
        let features = self.layers.forward(Stage::Encoder1, points.clone()); // [B, N, 3]
        let x = Tensor::cat(vec![points, features], 2); // [B, N, 6]
        let x = self.layers.forward(Stage::Encoder2, x); // [B, N, h1]

        let tokens = adaptive_max_pool1d(x.swap_dims(1, 2), self.h1); // [B, h1, h1]
        let tokens = self.encoder.forward(TransformerEncoderInput::new(tokens)); // [B, h1, h1]

        Ok(tokens.max_dim(2).swap_dims(1, 2)) // [B, 1, h1]
    }

    pub fn decode(&self, codeword: Tensor<B, 3>, num_nodes: usize) -> Result<Tensor<B, 3>> {
        fold(&self.layers, codeword, num_nodes, |x| {
            self.decoder
                .forward(TransformerDecoderInput::new(x.clone(), x))
        })
    }

    /// points: [B, N, 3] -> reconstructed: [B, N, 3]
    pub fn forward(&self, points: Tensor<B, 3>) -> Result<Tensor<B, 3>> {
        let [_, num_points, _] = points.dims();
        let codeword = self.encode(points)?;
        self.decode(codeword, num_points)
    }
}

impl<B: Backend> PointCloudAutoencoder<B> for TrsNet<B> {
    fn encode(&self, points: Tensor<B, 3>, _graph: Option<&NeighborGraph>) -> Result<Tensor<B, 3>> {
        TrsNet::encode(self, points)
    }

    fn decode(&self, codeword: Tensor<B, 3>, num_nodes: usize) -> Result<Tensor<B, 3>> {
        TrsNet::decode(self, codeword, num_nodes)
    }
}

impl<B: Backend> ArchitectureSearch<B> for TrsNet<B> {
    fn registry(&self) -> &LayerRegistry<B> {
        &self.layers
    }

    fn registry_mut(&mut self) -> &mut LayerRegistry<B> {
        &mut self.layers
    }

    fn stage_shape(&self, stage: Stage) -> StageShape {
        stage_shape(self.h1, stage)
    }
}
