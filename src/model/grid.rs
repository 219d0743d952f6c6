use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};

/// Extent of the folding lattice along x.
pub const GRID_WIDTH: f32 = 120.0;
/// Extent of the folding lattice along y.
pub const GRID_HEIGHT: f32 = 60.0;

/// Deterministic 2:1 lattice of `num_nodes` points in `[1, 120] x [1, 60]`.
///
/// The lattice has `floor(1 + sqrt(2n))` columns and `floor(1 + sqrt(n/2))` rows,
/// enumerated column by column, and is truncated to the first `num_nodes`
/// points.
pub fn grid_template(num_nodes: usize) -> Vec<[f32; 2]> {
    let n = num_nodes as f64;
    let columns = (1.0 + (n * GRID_WIDTH as f64 / GRID_HEIGHT as f64).sqrt()) as usize;
    let rows = (1.0 + (n * GRID_HEIGHT as f64 / GRID_WIDTH as f64).sqrt()) as usize;

    let xs = linspace(1.0, GRID_WIDTH, columns);
    let ys = linspace(1.0, GRID_HEIGHT, rows);

    xs.iter()
        .flat_map(|&x| ys.iter().map(move |&y| [x, y]))
        .take(num_nodes)
        .collect()
}

/// grid: [num_nodes, 2]
pub fn grid_tensor<B: Backend>(num_nodes: usize, device: &B::Device) -> Tensor<B, 2> {
    let points = grid_template(num_nodes);
    let len = points.len();
    let flat = points.into_iter().flatten().collect::<Vec<f32>>();
    Tensor::from_data(TensorData::new(flat, [len, 2]), device)
}

fn linspace(start: f32, end: f32, steps: usize) -> Vec<f32> {
    match steps {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (steps - 1) as f32;
            (0..steps).map(|i| start + step * i as f32).collect()
        }
    }
}
