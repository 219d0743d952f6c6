use burn::module::Module;
use burn::tensor::Tensor;
use burn::tensor::backend::Backend;

const SELU_ALPHA: f32 = 1.673_263_2;
const SELU_SCALE: f32 = 1.050_701;

/// Scaled exponential linear unit, shared by every MLP stage.
#[derive(Module, Clone, Debug, Default)]
pub struct Selu;

impl Selu {
    pub fn new() -> Self {
        Self
    }

    pub fn forward<B: Backend, const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        selu(input)
    }
}

/// `scale * (max(0, x) + min(0, alpha * (exp(x) - 1)))`
pub fn selu<B: Backend, const D: usize>(x: Tensor<B, D>) -> Tensor<B, D> {
    let positive = x.clone().clamp_min(0.0);
    let negative = (x.clamp_max(0.0).exp() - 1.0) * SELU_ALPHA;
    (positive + negative) * SELU_SCALE
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::TensorData;

    type TestBackend = NdArray;

    #[test]
    fn test_selu_values() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 1>::from_data(
            TensorData::new(vec![-2.0f32, 0.0, 1.5], [3]),
            &device,
        );
        let y: Vec<f32> = Selu::new().forward(x).into_data().to_vec().unwrap();

        let expected_negative = SELU_SCALE * SELU_ALPHA * ((-2.0f32).exp() - 1.0);
        assert!((y[0] - expected_negative).abs() < 1e-5, "got {}", y[0]);
        assert!(y[1].abs() < 1e-6);
        assert!((y[2] - 1.5 * SELU_SCALE).abs() < 1e-5);
    }

    #[test]
    fn test_selu_lower_bound() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 1>::from_data(
            TensorData::new(vec![-50.0f32, -10.0], [2]),
            &device,
        );
        let y: Vec<f32> = selu(x).into_data().to_vec().unwrap();

        for value in y {
            assert!(value >= -SELU_SCALE * SELU_ALPHA - 1e-5);
        }
    }
}
