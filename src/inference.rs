use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use burn::prelude::*;
use burn::tensor::cast::ToElement;

use crate::data::NeighborGraph;
use crate::debug_assert_not_nan;
use crate::error::{ModelError, Result};
use crate::model::PointCloudAutoencoder;

/// Encode and decode `points` ([B, N, 3]) into `num_nodes` points per cloud.
///
/// A k-nearest-neighbour graph is built when the model needs one.
pub fn reconstruct<B: Backend>(
    model: &dyn PointCloudAutoencoder<B>,
    points: Tensor<B, 3>,
    neighbors: usize,
    num_nodes: usize,
) -> Result<Tensor<B, 3>> {
    let graph = if model.requires_graph() {
        Some(NeighborGraph::knn(points.clone(), neighbors)?)
    } else {
        None
    };
    let reconstructed = model.reconstruct(points, graph.as_ref(), num_nodes)?;
    debug_assert_not_nan!(reconstructed);

    Ok(reconstructed)
}

/// [B, N, 3] -> B * N points
pub fn tensor_to_points<B: Backend>(cloud: Tensor<B, 3>) -> Result<Vec<[f32; 3]>> {
    let data = cloud
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|err| ModelError::Data {
            message: format!("{err:?}"),
        })?;

    Ok(data
        .chunks_exact(3)
        .map(|c| [c[0], c[1], c[2]])
        .collect::<Vec<_>>())
}

pub fn write_vtk_legacy(points: &[[f32; 3]], path: &Path) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);

    // --- VTK header ---
    writeln!(w, "# vtk DataFile Version 3.0")?;
    writeln!(w, "pointfold reconstruction")?;
    writeln!(w, "ASCII")?;
    writeln!(w, "DATASET UNSTRUCTURED_GRID")?;

    // --- Points ---
    writeln!(w, "POINTS {} float", points.len())?;
    for &[x, y, z] in points {
        writeln!(w, "{x} {y} {z}")?;
    }

    // --- Cells (one vertex per cell) ---
    writeln!(w, "CELLS {} {}", points.len(), points.len() * 2)?;
    for i in 0..points.len() {
        writeln!(w, "1 {i}")?;
    }

    // --- Cell types (all are VTK_VERTEX = 1) ---
    writeln!(w, "CELL_TYPES {}", points.len())?;
    for _ in 0..points.len() {
        writeln!(w, "1")?;
    }

    w.flush()
}
