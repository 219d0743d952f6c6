//! Point cloud autoencoders built on burn.
//!
//! Three encoder/decoder pairs compress a `[B, N, 3]` point cloud into a
//! `[B, 1, h1]` codeword and fold a fixed 2D grid back into 3D space:
//!
//! - [`FoldingNet`]: covariance-augmented points, two graph convolutions over a
//!   supplied [`NeighborGraph`], max-pool.
//! - [`TrsNet`]: per-point MLPs feeding a single transformer encoder layer.
//! - [`MlpNet`]: stacked MLPs and a max-pool.
//!
//! A [`Discriminator`] scores point clouds in `(0, 1)`. Every autoencoder keeps
//! its four MLP stages in a [`LayerRegistry`] that can be grown and resized at
//! runtime through [`ArchitectureSearch`].

pub mod data;
pub mod error;
pub mod inference;
pub mod model;

pub use data::NeighborGraph;
pub use error::{ModelError, Result};
pub use model::{
    ArchitectureSearch, Discriminator, DiscriminatorConfig, FoldingNet, FoldingNetConfig,
    InitialState, LayerRegistry, MlpNet, MlpNetConfig, Mutation, Passthrough,
    PointCloudAutoencoder, Stage, StageShape, TrsNet, TrsNetConfig,
};
