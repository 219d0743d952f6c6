mod graph;
mod preprocess;

use std::fs::File;
use std::path::Path;

use burn::prelude::Backend;
use burn::tensor::{Tensor, TensorData};

pub use graph::{NeighborGraph, NormalizedEdges};
pub use preprocess::{normalize, sample_surface};

use crate::error::Result;

/// Sample an STL mesh into a single normalised point cloud.
///
/// returns: [1, n_points, 3]
pub fn load_point_cloud<B: Backend, P: AsRef<Path>>(
    path: P,
    n_points: usize,
    device: &B::Device,
) -> Result<Tensor<B, 3>> {
    let path = path.as_ref();
    log::info!("sampling {n_points} points from {}", path.display());

    let mut file = File::open(path)?;
    let mesh = stl_io::read_stl(&mut file)?;
    let points = sample_surface(&mesh, n_points, &mut rand::rng())?;

    Ok(points_to_tensor(points, n_points, device))
}

/// Flattened coordinates `[n_points * 3]` -> [1, n_points, 3]
pub fn points_to_tensor<B: Backend>(
    points: Vec<f32>,
    n_points: usize,
    device: &B::Device,
) -> Tensor<B, 3> {
    Tensor::from_data(TensorData::new(points, [1, n_points, 3]), device)
}
