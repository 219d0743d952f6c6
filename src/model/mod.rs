mod activation;
mod covariance;
mod decoder;
mod discriminator;
mod folding;
mod graph_conv;
mod grid;
mod mlp;
mod passthrough;
mod pool;
mod registry;
mod transformer;

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;

pub use activation::{Selu, selu};
pub use covariance::{local_covariances, neighborhood_window};
pub use discriminator::{Discriminator, DiscriminatorConfig};
pub use folding::{FoldingNet, FoldingNetConfig};
pub use graph_conv::GraphConv;
pub use grid::{GRID_HEIGHT, GRID_WIDTH, grid_template, grid_tensor};
pub use mlp::{MlpNet, MlpNetConfig};
pub use passthrough::Passthrough;
pub use pool::{adaptive_max_pool1d, max_over_points};
pub use registry::{
    ArchitectureSearch, ArchitectureSummary, InitialState, LayerRegistry, Mutation, Stage,
    StageShape, StageSummary, layer_widths,
};
pub use transformer::{TrsNet, TrsNetConfig};

use crate::data::NeighborGraph;
use crate::error::{ModelError, Result};

/// Coordinates per point.
pub const POINT_DIM: usize = 3;

#[macro_export]
macro_rules! debug_assert_not_nan {
    ($tensor:expr) => {
        debug_assert!(
            !$tensor.clone().is_nan().any().into_scalar().to_bool(),
            "Tensor contains NaN"
        );
        debug_assert!(
            !$tensor.clone().is_inf().any().into_scalar().to_bool(),
            "Tensor contains inf"
        );
    };
}

/// Encoder/decoder pair over batches of point clouds.
pub trait PointCloudAutoencoder<B: Backend> {
    /// points: [B, N, 3] -> codeword: [B, 1, C]
    fn encode(&self, points: Tensor<B, 3>, graph: Option<&NeighborGraph>) -> Result<Tensor<B, 3>>;

    /// codeword: [B, 1, C] -> point cloud: [B, num_nodes, 3]
    fn decode(&self, codeword: Tensor<B, 3>, num_nodes: usize) -> Result<Tensor<B, 3>>;

    /// Whether `encode` needs a neighbour graph.
    fn requires_graph(&self) -> bool {
        false
    }

    fn reconstruct(
        &self,
        points: Tensor<B, 3>,
        graph: Option<&NeighborGraph>,
        num_nodes: usize,
    ) -> Result<Tensor<B, 3>> {
        let codeword = self.encode(points, graph)?;
        self.decode(codeword, num_nodes)
    }
}

/// Checks a [B, N, 3] cloud with at least one point.
fn check_points<B: Backend>(points: &Tensor<B, 3>) -> Result<[usize; 3]> {
    let dims = points.dims();
    let [batch_size, num_points, dim] = dims;
    if dim != POINT_DIM || num_points == 0 || batch_size == 0 {
        return Err(ModelError::ShapeMismatch {
            expected: vec![batch_size.max(1), num_points.max(1), POINT_DIM],
            got: dims.to_vec(),
        });
    }
    Ok(dims)
}

fn check_widths(h1: usize, h3: usize) -> Result<()> {
    if h1 == 0 || h3 == 0 {
        return Err(ModelError::InvalidConfig {
            message: format!("h1 ({h1}) and h3 ({h3}) must be positive"),
        });
    }
    Ok(())
}
