use burn::tensor::Tensor;
use burn::tensor::backend::Backend;

/// Adaptive max pooling over the last dimension.
///
/// input: [B, C, L] -> [B, C, output_size]
///
/// Window `i` covers `[floor(i*L/O), ceil((i+1)*L/O))`, so windows overlap
/// when `L` is not a multiple of `O` and repeat when `L < O`.
pub fn adaptive_max_pool1d<B: Backend>(input: Tensor<B, 3>, output_size: usize) -> Tensor<B, 3> {
    let [batch_size, channels, length] = input.dims();
    if output_size == 1 {
        return input.max_dim(2);
    }

    let windows = (0..output_size)
        .map(|i| {
            let start = i * length / output_size;
            let end = ((i + 1) * length).div_ceil(output_size);
            input
                .clone()
                .slice([0..batch_size, 0..channels, start..end])
                .max_dim(2)
        })
        .collect::<Vec<_>>();

    Tensor::cat(windows, 2)
}

/// Permutation-invariant max over the point dimension.
///
/// features: [B, N, C] -> [B, 1, C]
pub fn max_over_points<B: Backend>(features: Tensor<B, 3>) -> Tensor<B, 3> {
    features.max_dim(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::TensorData;

    type TestBackend = NdArray;

    #[test]
    fn test_adaptive_max_pool_windows() {
        let device = Default::default();
        let data: Vec<f32> = vec![1.0, 5.0, 2.0, 0.0, 3.0];
        let input = Tensor::<TestBackend, 3>::from_data(TensorData::new(data, [1, 1, 5]), &device);

        // L = 5, O = 2: windows [0, 3) and [2, 5)
        let pooled: Vec<f32> = adaptive_max_pool1d(input, 2).into_data().to_vec().unwrap();
        assert_eq!(pooled, vec![5.0, 3.0]);
    }

    #[test]
    fn test_adaptive_max_pool_upsamples_short_input() {
        let device = Default::default();
        let data: Vec<f32> = vec![4.0, 7.0];
        let input = Tensor::<TestBackend, 3>::from_data(TensorData::new(data, [1, 1, 2]), &device);

        let pooled = adaptive_max_pool1d(input, 4);
        assert_eq!(pooled.dims(), [1, 1, 4]);
        let pooled: Vec<f32> = pooled.into_data().to_vec().unwrap();
        assert_eq!(pooled, vec![4.0, 4.0, 7.0, 7.0]);
    }

    #[test]
    fn test_max_over_points_is_permutation_invariant() {
        let device = Default::default();
        let data: Vec<f32> = vec![1.0, -2.0, 0.5, 3.0, -1.0, 2.0];
        let permuted: Vec<f32> = vec![-1.0, 2.0, 1.0, -2.0, 0.5, 3.0];
        let a = Tensor::<TestBackend, 3>::from_data(TensorData::new(data, [1, 3, 2]), &device);
        let b = Tensor::<TestBackend, 3>::from_data(TensorData::new(permuted, [1, 3, 2]), &device);

        let diff: f32 = (max_over_points(a) - max_over_points(b))
            .abs()
            .max()
            .into_scalar();
        assert!(diff < 1e-6);
    }
}
