//! Runtime-mutable MLP stages shared by the autoencoders.
//!
//! Every autoencoder owns four ordered stacks of linear layers. The stacks can
//! be deepened with [`ArchitectureSearch::add_layer`] and have hidden widths
//! changed with [`ArchitectureSearch::change_width`]; both operations keep the
//! chain of widths consistent so the next forward pass stays well-shaped.

use std::fmt;

use burn::module::{Module, Param};
use burn::nn::{Initializer, Linear, LinearConfig};
use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};

use super::activation::Selu;
use crate::error::{ModelError, Result};

/// One of the four MLP stages of an autoencoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Per-point MLP applied before pooling / graph convolution.
    Encoder1,
    /// MLP producing the codeword.
    Encoder2,
    /// MLP folding `codeword || grid` into an intermediate cloud.
    Decoder1,
    /// MLP folding `codeword || intermediate` into the final cloud.
    Decoder2,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Encoder1,
        Stage::Encoder2,
        Stage::Decoder1,
        Stage::Decoder2,
    ];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Encoder1 => "encoder stage 1",
            Stage::Encoder2 => "encoder stage 2",
            Stage::Decoder1 => "decoder stage 1",
            Stage::Decoder2 => "decoder stage 2",
        };
        f.write_str(name)
    }
}

/// Widths a stage consumes and produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageShape {
    pub input: usize,
    pub output: usize,
}

impl StageShape {
    pub fn new(input: usize, output: usize) -> Self {
        Self { input, output }
    }
}

/// Outcome of [`ArchitectureSearch::add_layer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mutation {
    Applied,
    /// The stage already holds `max_depth` layers; nothing changed.
    DepthLimitReached,
}

/// `(in, out)` widths of every layer, per stage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialState {
    pub encoder1: Vec<(usize, usize)>,
    pub encoder2: Vec<(usize, usize)>,
    pub decoder1: Vec<(usize, usize)>,
    pub decoder2: Vec<(usize, usize)>,
}

impl InitialState {
    pub fn new(
        encoder1: Vec<(usize, usize)>,
        encoder2: Vec<(usize, usize)>,
        decoder1: Vec<(usize, usize)>,
        decoder2: Vec<(usize, usize)>,
    ) -> Self {
        Self {
            encoder1,
            encoder2,
            decoder1,
            decoder2,
        }
    }

    pub fn stage(&self, stage: Stage) -> &[(usize, usize)] {
        match stage {
            Stage::Encoder1 => &self.encoder1,
            Stage::Encoder2 => &self.encoder2,
            Stage::Decoder1 => &self.decoder1,
            Stage::Decoder2 => &self.decoder2,
        }
    }
}

/// Serializable snapshot of a registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ArchitectureSummary {
    pub max_depth: usize,
    pub max_width: usize,
    pub stages: Vec<StageSummary>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StageSummary {
    pub stage: Stage,
    pub widths: Vec<(usize, usize)>,
}

/// The four MLP stages of an autoencoder, bounded by `max_depth` layers per
/// stage and `max_width` units per resized layer.
#[derive(Module, Debug)]
pub struct LayerRegistry<B: Backend> {
    encoder1: Vec<Linear<B>>,
    encoder2: Vec<Linear<B>>,
    decoder1: Vec<Linear<B>>,
    decoder2: Vec<Linear<B>>,
    activation: Selu,
    max_depth: usize,
    max_width: usize,
}

impl<B: Backend> LayerRegistry<B> {
    /// Build the stages from `state`, checking every stage against `shape`.
    pub fn new(
        state: &InitialState,
        shape: impl Fn(Stage) -> StageShape,
        max_depth: usize,
        max_width: usize,
        device: &B::Device,
    ) -> Result<Self> {
        if max_depth == 0 || max_width == 0 {
            return Err(ModelError::InvalidConfig {
                message: format!("max_depth ({max_depth}) and max_width ({max_width}) must be positive"),
            });
        }
        for stage in Stage::ALL {
            validate_plan(stage, state.stage(stage), shape(stage), max_depth)?;
        }

        let build = |plan: &[(usize, usize)]| -> Vec<Linear<B>> {
            plan.iter()
                .map(|&(d_input, d_output)| LinearConfig::new(d_input, d_output).init(device))
                .collect()
        };

        Ok(Self {
            encoder1: build(&state.encoder1),
            encoder2: build(&state.encoder2),
            decoder1: build(&state.decoder1),
            decoder2: build(&state.decoder2),
            activation: Selu::new(),
            max_depth,
            max_width,
        })
    }

    pub fn layers(&self, stage: Stage) -> &[Linear<B>] {
        match stage {
            Stage::Encoder1 => &self.encoder1,
            Stage::Encoder2 => &self.encoder2,
            Stage::Decoder1 => &self.decoder1,
            Stage::Decoder2 => &self.decoder2,
        }
    }

    fn layers_mut(&mut self, stage: Stage) -> &mut Vec<Linear<B>> {
        match stage {
            Stage::Encoder1 => &mut self.encoder1,
            Stage::Encoder2 => &mut self.encoder2,
            Stage::Decoder1 => &mut self.decoder1,
            Stage::Decoder2 => &mut self.decoder2,
        }
    }

    pub fn depth(&self, stage: Stage) -> usize {
        self.layers(stage).len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn max_width(&self) -> usize {
        self.max_width
    }

    pub fn widths(&self, stage: Stage) -> Vec<(usize, usize)> {
        self.layers(stage).iter().map(layer_widths).collect()
    }

    /// Apply every layer of `stage`, each followed by SELU.
    pub fn forward<const D: usize>(&self, stage: Stage, input: Tensor<B, D>) -> Tensor<B, D> {
        self.layers(stage)
            .iter()
            .fold(input, |x, layer| self.activation.forward(layer.forward(x)))
    }

    /// Insert a square layer at `index`. Its width is the stage input at index 0,
    /// the predecessor's output otherwise.
    pub fn insert_layer(
        &mut self,
        stage: Stage,
        index: usize,
        shape: StageShape,
        device: &B::Device,
    ) -> Result<Mutation> {
        let max_depth = self.max_depth;
        let layers = self.layers_mut(stage);

        if layers.len() >= max_depth {
            log::warn!("maxed layer depth for {stage} ({max_depth} layers)");
            return Ok(Mutation::DepthLimitReached);
        }
        if index > layers.len() {
            return Err(ModelError::IndexOutOfRange {
                stage,
                index,
                len: layers.len(),
            });
        }

        let width = match index {
            0 => shape.input,
            _ => layer_widths(&layers[index - 1]).1,
        };
        layers.insert(index, square_layer(width, device));
        log::debug!("inserted {width}x{width} layer into {stage} at {index}");

        Ok(Mutation::Applied)
    }

    /// Rebuild the hidden layer at `index` with `width` outputs (clamped to
    /// `max_width`) and resize its successor's input to match. Returns the width
    /// actually applied.
    pub fn resize_layer(
        &mut self,
        stage: Stage,
        index: usize,
        width: usize,
        shape: StageShape,
        device: &B::Device,
    ) -> Result<usize> {
        if width == 0 {
            return Err(ModelError::InvalidConfig {
                message: format!("cannot resize a layer of {stage} to zero units"),
            });
        }
        let width = width.min(self.max_width);
        let layers = self.layers_mut(stage);
        let len = layers.len();

        if index >= len {
            return Err(ModelError::IndexOutOfRange { stage, index, len });
        }
        if index == len - 1 {
            return Err(ModelError::OutputLayerLocked { stage });
        }

        let d_input = match index {
            0 => shape.input,
            _ => layer_widths(&layers[index - 1]).1,
        };
        let (_, next_output) = layer_widths(&layers[index + 1]);
        layers[index] = LinearConfig::new(d_input, width).init(device);
        layers[index + 1] = LinearConfig::new(width, next_output).init(device);
        log::debug!("resized layer {index} of {stage} to {d_input}x{width}");

        Ok(width)
    }

    pub fn summary(&self) -> ArchitectureSummary {
        ArchitectureSummary {
            max_depth: self.max_depth,
            max_width: self.max_width,
            stages: Stage::ALL
                .iter()
                .map(|&stage| StageSummary {
                    stage,
                    widths: self.widths(stage),
                })
                .collect(),
        }
    }
}

/// Online architecture search over the four stages of a network.
pub trait ArchitectureSearch<B: Backend> {
    fn registry(&self) -> &LayerRegistry<B>;

    fn registry_mut(&mut self) -> &mut LayerRegistry<B>;

    /// Boundary widths of `stage` for this network.
    fn stage_shape(&self, stage: Stage) -> StageShape;

    /// Deepen `stage` with a square Xavier-initialised layer at `index`.
    fn add_layer(&mut self, stage: Stage, index: usize, device: &B::Device) -> Result<Mutation> {
        let shape = self.stage_shape(stage);
        self.registry_mut().insert_layer(stage, index, shape, device)
    }

    /// Change the output width of the hidden layer at `index`.
    fn change_width(
        &mut self,
        stage: Stage,
        index: usize,
        width: usize,
        device: &B::Device,
    ) -> Result<usize> {
        let shape = self.stage_shape(stage);
        self.registry_mut()
            .resize_layer(stage, index, width, shape, device)
    }
}

/// `(d_input, d_output)` of a linear layer.
pub fn layer_widths<B: Backend>(layer: &Linear<B>) -> (usize, usize) {
    let [d_input, d_output] = layer.weight.dims();
    (d_input, d_output)
}

fn square_layer<B: Backend>(width: usize, device: &B::Device) -> Linear<B> {
    let mut layer = LinearConfig::new(width, width)
        .with_initializer(Initializer::XavierUniform { gain: 1.0 })
        .init(device);
    layer.bias = Some(Param::from_tensor(Tensor::zeros([width], device)));
    layer
}

fn validate_plan(
    stage: Stage,
    plan: &[(usize, usize)],
    shape: StageShape,
    max_depth: usize,
) -> Result<()> {
    if plan.is_empty() {
        return Err(ModelError::InvalidConfig {
            message: format!("{stage} needs at least one layer"),
        });
    }
    if plan.len() > max_depth {
        return Err(ModelError::InvalidConfig {
            message: format!(
                "{stage} has {} layers, more than max_depth {max_depth}",
                plan.len()
            ),
        });
    }

    let mut expected = shape.input;
    for (index, &(d_input, d_output)) in plan.iter().enumerate() {
        if d_input != expected {
            return Err(ModelError::WidthMismatch {
                stage,
                index,
                expected,
                got: d_input,
            });
        }
        if d_output == 0 {
            return Err(ModelError::InvalidConfig {
                message: format!("layer {index} of {stage} has no outputs"),
            });
        }
        expected = d_output;
    }
    if expected != shape.output {
        return Err(ModelError::WidthMismatch {
            stage,
            index: plan.len() - 1,
            expected: shape.output,
            got: expected,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn shape(stage: Stage) -> StageShape {
        match stage {
            Stage::Encoder1 => StageShape::new(3, 8),
            Stage::Encoder2 => StageShape::new(8, 16),
            Stage::Decoder1 => StageShape::new(18, 3),
            Stage::Decoder2 => StageShape::new(19, 3),
        }
    }

    fn state() -> InitialState {
        InitialState::new(
            vec![(3, 4), (4, 8)],
            vec![(8, 16)],
            vec![(18, 3)],
            vec![(19, 3)],
        )
    }

    fn registry(max_depth: usize, max_width: usize) -> LayerRegistry<TestBackend> {
        let device = Default::default();
        LayerRegistry::new(&state(), shape, max_depth, max_width, &device).unwrap()
    }

    fn assert_chained(registry: &LayerRegistry<TestBackend>, stage: Stage) {
        let widths = registry.widths(stage);
        assert_eq!(widths[0].0, shape(stage).input);
        assert_eq!(widths[widths.len() - 1].1, shape(stage).output);
        for pair in widths.windows(2) {
            assert_eq!(pair[0].1, pair[1].0, "broken chain in {stage}: {widths:?}");
        }
    }

    #[test]
    fn test_new_builds_initial_widths() {
        let registry = registry(4, 32);
        assert_eq!(registry.widths(Stage::Encoder1), vec![(3, 4), (4, 8)]);
        assert_eq!(registry.widths(Stage::Decoder2), vec![(19, 3)]);
        assert_eq!(registry.depth(Stage::Encoder2), 1);
    }

    #[test]
    fn test_new_rejects_broken_chain() {
        let device = Default::default();
        let mut bad = state();
        bad.encoder1 = vec![(3, 4), (5, 8)];

        let err = LayerRegistry::<TestBackend>::new(&bad, shape, 4, 32, &device).unwrap_err();
        assert!(matches!(
            err,
            ModelError::WidthMismatch {
                stage: Stage::Encoder1,
                index: 1,
                expected: 4,
                got: 5
            }
        ));
    }

    #[test]
    fn test_new_rejects_wrong_stage_output() {
        let device = Default::default();
        let mut bad = state();
        bad.encoder2 = vec![(8, 12)];

        let err = LayerRegistry::<TestBackend>::new(&bad, shape, 4, 32, &device).unwrap_err();
        assert!(matches!(err, ModelError::WidthMismatch { stage: Stage::Encoder2, .. }));
    }

    #[test]
    fn test_new_rejects_too_deep_state() {
        let device = Default::default();
        let err = LayerRegistry::<TestBackend>::new(&state(), shape, 1, 32, &device).unwrap_err();
        assert!(matches!(err, ModelError::InvalidConfig { .. }));
    }

    #[test]
    fn test_insert_layer_at_front_uses_stage_input() {
        let device = Default::default();
        let mut registry = registry(4, 32);

        let outcome = registry
            .insert_layer(Stage::Encoder1, 0, shape(Stage::Encoder1), &device)
            .unwrap();

        assert_eq!(outcome, Mutation::Applied);
        assert_eq!(registry.widths(Stage::Encoder1), vec![(3, 3), (3, 4), (4, 8)]);
        assert_chained(&registry, Stage::Encoder1);
    }

    #[test]
    fn test_insert_layer_after_predecessor() {
        let device = Default::default();
        let mut registry = registry(4, 32);

        registry
            .insert_layer(Stage::Encoder1, 1, shape(Stage::Encoder1), &device)
            .unwrap();
        registry
            .insert_layer(Stage::Encoder1, 3, shape(Stage::Encoder1), &device)
            .unwrap();

        assert_eq!(
            registry.widths(Stage::Encoder1),
            vec![(3, 4), (4, 4), (4, 8), (8, 8)]
        );
        assert_chained(&registry, Stage::Encoder1);
    }

    #[test]
    fn test_inserted_layer_has_zero_bias() {
        let device = Default::default();
        let mut registry = registry(4, 32);
        registry
            .insert_layer(Stage::Encoder2, 1, shape(Stage::Encoder2), &device)
            .unwrap();

        let layer = &registry.layers(Stage::Encoder2)[1];
        let bias = layer.bias.as_ref().unwrap().val();
        let total: f32 = bias.abs().sum().into_scalar();
        assert_eq!(total, 0.0);

        let weights: f32 = layer.weight.val().abs().sum().into_scalar();
        assert!(weights > 0.0);
    }

    #[test]
    fn test_insert_layer_is_bounded_by_max_depth() {
        let device = Default::default();
        let mut registry = registry(3, 32);

        let first = registry
            .insert_layer(Stage::Encoder1, 0, shape(Stage::Encoder1), &device)
            .unwrap();
        assert_eq!(first, Mutation::Applied);

        for _ in 0..5 {
            let outcome = registry
                .insert_layer(Stage::Encoder1, 0, shape(Stage::Encoder1), &device)
                .unwrap();
            assert_eq!(outcome, Mutation::DepthLimitReached);
            assert_eq!(registry.depth(Stage::Encoder1), 3);
        }
    }

    #[test]
    fn test_insert_layer_rejects_index_past_end() {
        let device = Default::default();
        let mut registry = registry(4, 32);

        let err = registry
            .insert_layer(Stage::Decoder1, 2, shape(Stage::Decoder1), &device)
            .unwrap_err();
        assert!(matches!(err, ModelError::IndexOutOfRange { index: 2, len: 1, .. }));
    }

    #[test]
    fn test_resize_layer_resynchronises_neighbours() {
        let device = Default::default();
        let mut registry = registry(4, 32);

        let width = registry
            .resize_layer(Stage::Encoder1, 0, 10, shape(Stage::Encoder1), &device)
            .unwrap();

        assert_eq!(width, 10);
        assert_eq!(registry.widths(Stage::Encoder1), vec![(3, 10), (10, 8)]);
        assert_chained(&registry, Stage::Encoder1);
    }

    #[test]
    fn test_resize_layer_clamps_to_max_width() {
        let device = Default::default();
        let mut registry = registry(4, 32);

        let width = registry
            .resize_layer(Stage::Encoder1, 0, 500, shape(Stage::Encoder1), &device)
            .unwrap();

        assert_eq!(width, 32);
        assert_eq!(registry.widths(Stage::Encoder1)[0], (3, 32));
        assert_chained(&registry, Stage::Encoder1);
    }

    #[test]
    fn test_resize_layer_follows_predecessor_output() {
        let device = Default::default();
        let mut registry = registry(4, 32);
        registry
            .insert_layer(Stage::Encoder1, 2, shape(Stage::Encoder1), &device)
            .unwrap();
        registry
            .resize_layer(Stage::Encoder1, 0, 6, shape(Stage::Encoder1), &device)
            .unwrap();
        registry
            .resize_layer(Stage::Encoder1, 1, 12, shape(Stage::Encoder1), &device)
            .unwrap();

        assert_eq!(
            registry.widths(Stage::Encoder1),
            vec![(3, 6), (6, 12), (12, 8)]
        );
    }

    #[test]
    fn test_resize_output_layer_is_locked() {
        let device = Default::default();
        let mut registry = registry(4, 32);

        let err = registry
            .resize_layer(Stage::Encoder1, 1, 6, shape(Stage::Encoder1), &device)
            .unwrap_err();
        assert!(matches!(err, ModelError::OutputLayerLocked { stage: Stage::Encoder1 }));

        let err = registry
            .resize_layer(Stage::Encoder1, 7, 6, shape(Stage::Encoder1), &device)
            .unwrap_err();
        assert!(matches!(err, ModelError::IndexOutOfRange { .. }));
    }

    #[test]
    fn test_forward_keeps_stage_shape() {
        let device = Default::default();
        let registry = registry(4, 32);

        let x = Tensor::<TestBackend, 3>::ones([2, 5, 3], &device);
        let y = registry.forward(Stage::Encoder1, x);
        assert_eq!(y.dims(), [2, 5, 8]);
    }

    #[test]
    fn test_summary_serializes() {
        let registry = registry(4, 32);
        let summary = registry.summary();

        assert_eq!(summary.stages.len(), 4);
        assert_eq!(summary.stages[0].stage, Stage::Encoder1);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["max_depth"], 4);
        assert_eq!(json["stages"][1]["stage"], "encoder2");
    }
}
