use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};

use crate::error::{ModelError, Result};

/// Directed neighbour graph over the points of a flattened batch.
///
/// Node `b * N + i` is point `i` of cloud `b`. An edge `(source, target)` sends
/// the features of `source` to `target` during graph convolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NeighborGraph {
    num_nodes: usize,
    sources: Vec<usize>,
    targets: Vec<usize>,
}

/// Edges with self loops and symmetric GCN normalisation
/// `1 / sqrt(deg(source) * deg(target))`.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedEdges {
    pub sources: Vec<usize>,
    pub targets: Vec<usize>,
    pub weights: Vec<f32>,
}

impl NeighborGraph {
    pub fn from_edges(
        num_nodes: usize,
        edges: impl IntoIterator<Item = (usize, usize)>,
    ) -> Result<Self> {
        let (sources, targets): (Vec<usize>, Vec<usize>) = edges.into_iter().unzip();
        for (&source_node, &target_node) in sources.iter().zip(&targets) {
            if source_node >= num_nodes || target_node >= num_nodes {
                return Err(ModelError::InvalidEdge {
                    source_node,
                    target_node,
                    num_nodes,
                });
            }
        }
        Ok(Self {
            num_nodes,
            sources,
            targets,
        })
    }

    /// edge_index: [2, E], row 0 holds sources and row 1 targets.
    pub fn from_edge_index<B: Backend>(
        num_nodes: usize,
        edge_index: Tensor<B, 2, Int>,
    ) -> Result<Self> {
        let [rows, num_edges] = edge_index.dims();
        if rows != 2 {
            return Err(ModelError::ShapeMismatch {
                expected: vec![2, num_edges],
                got: vec![rows, num_edges],
            });
        }
        let flat = int_data(edge_index)?;
        let (sources, targets) = flat.split_at(num_edges);
        let edges = sources
            .iter()
            .zip(targets)
            .map(|(&s, &t)| Ok((to_index(s)?, to_index(t)?)))
            .collect::<Result<Vec<_>>>()?;

        Self::from_edges(num_nodes, edges)
    }

    /// k-nearest-neighbour graph of every cloud in the batch (self excluded).
    ///
    /// points: [B, N, D]
    pub fn knn<B: Backend>(points: Tensor<B, 3>, k: usize) -> Result<Self> {
        let [batch_size, num_points, _] = points.dims();
        if k == 0 || k >= num_points {
            return Err(ModelError::InvalidConfig {
                message: format!("k = {k} needs 0 < k < {num_points}"),
            });
        }
        let device = points.device();

        // Pairwise squared distances [B, N, N]
        let points_i = points.clone().unsqueeze_dim::<4>(2); // [B, N, 1, D]
        let points_j = points.unsqueeze_dim::<4>(1); // [B, 1, N, D]
        let distances = (points_i - points_j)
            .powi_scalar(2)
            .sum_dim(3)
            .squeeze::<3>(3);

        // Push the diagonal out of reach
        let eye = Tensor::<B, 2>::eye(num_points, &device).unsqueeze_dim::<3>(0);
        let distances = distances + eye * 1.0e10;

        // topk returns the largest values, so rank negated distances
        let (_, indices) = distances.neg().topk_with_indices(k, 2); // [B, N, k]
        let neighbours = int_data(indices)?;

        let mut edges = Vec::with_capacity(batch_size * num_points * k);
        for (position, &neighbour) in neighbours.iter().enumerate() {
            let node = position / k; // b * N + i
            let offset = node - node % num_points; // b * N
            edges.push((offset + to_index(neighbour)?, node));
        }

        Self::from_edges(batch_size * num_points, edges)
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn num_edges(&self) -> usize {
        self.sources.len()
    }

    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.sources.iter().copied().zip(self.targets.iter().copied())
    }

    /// Drop explicit self loops, add one per node, weight each edge by the
    /// inverse square root of both endpoint in-degrees.
    pub fn normalized_edges(&self) -> NormalizedEdges {
        let (mut sources, mut targets): (Vec<usize>, Vec<usize>) =
            self.edges().filter(|(s, t)| s != t).unzip();
        sources.extend(0..self.num_nodes);
        targets.extend(0..self.num_nodes);

        let mut degree = vec![0.0f32; self.num_nodes];
        for &target in &targets {
            degree[target] += 1.0;
        }
        let weights = sources
            .iter()
            .zip(&targets)
            .map(|(&s, &t)| 1.0 / (degree[s] * degree[t]).sqrt())
            .collect();

        NormalizedEdges {
            sources,
            targets,
            weights,
        }
    }
}

fn int_data<B: Backend, const D: usize>(tensor: Tensor<B, D, Int>) -> Result<Vec<i64>> {
    tensor
        .into_data()
        .convert::<i64>()
        .to_vec::<i64>()
        .map_err(|err| ModelError::Data {
            message: format!("{err:?}"),
        })
}

fn to_index(value: i64) -> Result<usize> {
    usize::try_from(value).map_err(|_| ModelError::Data {
        message: format!("negative node index {value}"),
    })
}
