use std::ops::Range;

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;

use crate::error::{ModelError, Result};

/// Contiguous neighbourhood of point `index`: `[index - window/2, index + window/2]`
/// clipped to the cloud. Windows at the boundaries are shorter, never wrapped.
pub fn neighborhood_window(index: usize, num_points: usize, window: usize) -> Range<usize> {
    let half = window / 2;
    let start = index.saturating_sub(half);
    let end = (index + half + 1).min(num_points);
    start..end
}

/// Flattened local covariance of every point.
///
/// points: [B, N, D] -> covariances: [B, N, D*D]
///
/// The centred scatter matrix is divided by `window - 1` for every point,
/// including the clipped windows at both ends of the cloud.
pub fn local_covariances<B: Backend>(points: Tensor<B, 3>, window: usize) -> Result<Tensor<B, 3>> {
    let [batch_size, num_points, dim] = points.dims();
    if window < 2 {
        return Err(ModelError::WindowTooSmall { window });
    }
    if num_points < 2 {
        return Err(ModelError::TooFewPoints {
            required: 2,
            got: num_points,
        });
    }
    let divisor = (window - 1) as f32;

    let covariances = (0..num_points)
        .map(|index| {
            let range = neighborhood_window(index, num_points, window);
            let neighborhood = points.clone().slice([0..batch_size, range, 0..dim]); // [B, W, D]
            let centered = neighborhood.clone() - neighborhood.mean_dim(1); // [B, W, D]
            let covariance = centered.clone().swap_dims(1, 2).matmul(centered) / divisor; // [B, D, D]
            covariance.reshape([batch_size, 1, dim * dim])
        })
        .collect::<Vec<_>>();

    Ok(Tensor::cat(covariances, 1))
}
