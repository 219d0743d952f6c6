use burn::tensor::Tensor;
use burn::tensor::backend::Backend;

use super::grid::grid_tensor;
use super::registry::{LayerRegistry, Stage};
use crate::error::{ModelError, Result};

/// Grid-folding decoder shared by every autoencoder.
///
/// codeword: [B, 1, C] -> point cloud: [B, num_nodes, 3]
///
/// `refine` transforms the repeated codeword before the second fold; the
/// transformer variant runs its decoder block there.
pub fn fold<B: Backend>(
    registry: &LayerRegistry<B>,
    codeword: Tensor<B, 3>,
    num_nodes: usize,
    refine: impl FnOnce(Tensor<B, 3>) -> Tensor<B, 3>,
) -> Result<Tensor<B, 3>> {
    if num_nodes == 0 {
        return Err(ModelError::EmptyTarget);
    }
    let [batch_size, _, _] = codeword.dims();
    let device = codeword.device();

    let grid = grid_tensor::<B>(num_nodes, &device)
        .unsqueeze_dim::<3>(0)
        .repeat_dim(0, batch_size); // [B, n, 2]
    let repeated = codeword.repeat_dim(1, num_nodes); // [B, n, C]

    let folded = Tensor::cat(vec![repeated.clone(), grid], 2); // [B, n, C + 2]
    let folded = registry.forward(Stage::Decoder1, folded); // [B, n, 3]

    let context = refine(repeated); // [B, n, C]
    let x = Tensor::cat(vec![context, folded], 2); // [B, n, C + 3]

    Ok(registry.forward(Stage::Decoder2, x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::registry::{InitialState, StageShape};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn registry(h1: usize) -> LayerRegistry<TestBackend> {
        let device = Default::default();
        let state = InitialState::new(
            vec![(3, h1)],
            vec![(h1, h1)],
            vec![(h1 + 2, 3)],
            vec![(h1 + 3, 3)],
        );
        let shape = |stage| match stage {
            Stage::Encoder1 => StageShape::new(3, h1),
            Stage::Encoder2 => StageShape::new(h1, h1),
            Stage::Decoder1 => StageShape::new(h1 + 2, 3),
            Stage::Decoder2 => StageShape::new(h1 + 3, 3),
        };
        LayerRegistry::new(&state, shape, 4, h1, &device).unwrap()
    }

    #[test]
    fn test_fold_output_shape() {
        let device = Default::default();
        let registry = registry(8);
        let codeword = Tensor::<TestBackend, 3>::ones([2, 1, 8], &device);

        let cloud = fold(&registry, codeword, 37, |x| x).unwrap();
        assert_eq!(cloud.dims(), [2, 37, 3]);
    }

    #[test]
    fn test_fold_rejects_empty_target() {
        let device = Default::default();
        let registry = registry(8);
        let codeword = Tensor::<TestBackend, 3>::ones([1, 1, 8], &device);

        assert!(matches!(
            fold(&registry, codeword, 0, |x| x),
            Err(ModelError::EmptyTarget)
        ));
    }
}
