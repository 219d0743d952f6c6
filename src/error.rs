//! Error types for pointfold.

use thiserror::Error;

use crate::model::Stage;

/// Errors raised while building, mutating or running the networks.
#[derive(Error, Debug)]
pub enum ModelError {
    /// Invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// Two neighbouring layers of a stage do not agree on a width.
    #[error("width mismatch in {stage} at layer {index}: expected {expected}, got {got}")]
    WidthMismatch {
        /// Stage holding the layer.
        stage: Stage,
        /// Position of the offending layer.
        index: usize,
        /// Width required by the neighbouring layer or the stage boundary.
        expected: usize,
        /// Width found.
        got: usize,
    },

    /// Layer index outside of the stage.
    #[error("layer index {index} out of range for {stage} with {len} layers")]
    IndexOutOfRange {
        /// Stage addressed.
        stage: Stage,
        /// Requested index.
        index: usize,
        /// Current number of layers.
        len: usize,
    },

    /// The last layer of a stage produces the stage output and cannot be resized.
    #[error("the output layer of {stage} has a fixed width")]
    OutputLayerLocked {
        /// Stage addressed.
        stage: Stage,
    },

    /// Tensor shape mismatch.
    #[error("tensor shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected shape.
        expected: Vec<usize>,
        /// Actual shape.
        got: Vec<usize>,
    },

    /// Covariance neighbourhoods need at least two points.
    #[error("covariance window must be at least 2, got {window}")]
    WindowTooSmall {
        /// Requested window size.
        window: usize,
    },

    /// Not enough points in the cloud.
    #[error("point cloud needs at least {required} points, got {got}")]
    TooFewPoints {
        /// Minimum number of points.
        required: usize,
        /// Number of points supplied.
        got: usize,
    },

    /// The graph variant was called without a neighbour graph.
    #[error("a neighbour graph is required by this network")]
    MissingGraph,

    /// Neighbour graph does not cover the flattened batch.
    #[error("neighbour graph has {got} nodes but the batch holds {expected} points")]
    GraphSize {
        /// Number of points in the flattened batch.
        expected: usize,
        /// Number of nodes in the graph.
        got: usize,
    },

    /// Edge referencing a node outside the graph.
    #[error("edge ({source_node}, {target_node}) is out of range for {num_nodes} nodes")]
    InvalidEdge {
        /// Source node.
        source_node: usize,
        /// Target node.
        target_node: usize,
        /// Number of nodes in the graph.
        num_nodes: usize,
    },

    /// Decoding to an empty point cloud.
    #[error("cannot decode to zero points")]
    EmptyTarget,

    /// Failure while sampling a mesh surface.
    #[error("mesh sampling failed: {message}")]
    Sampling {
        /// Description of the failure.
        message: String,
    },

    /// Tensor data could not be read back.
    #[error("tensor data error: {message}")]
    Data {
        /// Description of the failure.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for pointfold operations.
pub type Result<T> = std::result::Result<T, ModelError>;
