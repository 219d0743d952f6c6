use nalgebra::VectorView3;
use rand::distr::Uniform;
use rand::distr::weighted::WeightedIndex;
use rand::prelude::*;
use stl_io::{IndexedMesh, IndexedTriangle};

use crate::error::{ModelError, Result};

/// Sample `n_points` points uniformly over the mesh surface, centred and
/// scaled into the unit sphere.
///
/// Returns `[n_points * 3]` flattened coordinates.
pub fn sample_surface<R: Rng + ?Sized>(
    mesh: &IndexedMesh,
    n_points: usize,
    rng: &mut R,
) -> Result<Vec<f32>> {
    if mesh.faces.is_empty() {
        return Err(sampling_error("mesh has no faces"));
    }
    // Triangles are drawn proportionally to their area
    let areas = mesh
        .faces
        .iter()
        .map(|face| {
            let (v0, v1, v2) = corners(mesh, face);
            (v1 - v0).cross(&(v2 - v0)).norm() * 0.5
        })
        .collect::<Vec<f32>>();
    let faces = WeightedIndex::new(&areas).map_err(sampling_error)?;
    let uniform = Uniform::new(0.0f32, 1.0).map_err(sampling_error)?;

    let mut points = Vec::with_capacity(n_points * 3);
    for _ in 0..n_points {
        let (v0, v1, v2) = corners(mesh, &mesh.faces[faces.sample(rng)]);

        let r1 = uniform.sample(rng);
        let r2 = uniform.sample(rng);
        let (r1, r2) = if r1 + r2 > 1.0 {
            (1.0 - r1, 1.0 - r2)
        } else {
            (r1, r2)
        };
        let p = v0 + (v1 - v0) * r1 + (v2 - v0) * r2;
        points.extend_from_slice(p.data.as_slice());
    }

    normalize(points, n_points)
}

/// Center on the centroid and scale the farthest point to unit distance.
pub fn normalize(points: Vec<f32>, n_points: usize) -> Result<Vec<f32>> {
    let mut cloud = ndarray::Array2::from_shape_vec((n_points, 3), points).map_err(sampling_error)?;
    let Some(centroid) = cloud.mean_axis(ndarray::Axis(0)) else {
        return Ok(cloud.into_raw_vec_and_offset().0);
    };
    cloud -= &centroid;
    let max_norm = cloud
        .rows()
        .into_iter()
        .map(|r| (r[0].powi(2) + r[1].powi(2) + r[2].powi(2)).sqrt())
        .fold(0.0f32, f32::max);
    if max_norm > 0.0 {
        cloud /= max_norm;
    }

    Ok(cloud.into_raw_vec_and_offset().0)
}

fn corners<'a>(
    mesh: &'a IndexedMesh,
    face: &IndexedTriangle,
) -> (VectorView3<'a, f32>, VectorView3<'a, f32>, VectorView3<'a, f32>) {
    let v0 = VectorView3::from_slice(&mesh.vertices[face.vertices[0]].0);
    let v1 = VectorView3::from_slice(&mesh.vertices[face.vertices[1]].0);
    let v2 = VectorView3::from_slice(&mesh.vertices[face.vertices[2]].0);
    (v0, v1, v2)
}

fn sampling_error(err: impl std::fmt::Display) -> ModelError {
    ModelError::Sampling {
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use stl_io::{Normal, Vertex};

    fn square() -> IndexedMesh {
        IndexedMesh {
            vertices: vec![
                Vertex::new([0.0, 0.0, 0.0]),
                Vertex::new([2.0, 0.0, 0.0]),
                Vertex::new([2.0, 2.0, 0.0]),
                Vertex::new([0.0, 2.0, 0.0]),
            ],
            faces: vec![
                IndexedTriangle {
                    normal: Normal::new([0.0, 0.0, 1.0]),
                    vertices: [0, 1, 2],
                },
                IndexedTriangle {
                    normal: Normal::new([0.0, 0.0, 1.0]),
                    vertices: [0, 2, 3],
                },
            ],
        }
    }

    #[test]
    fn test_sample_surface_is_normalized() {
        let mut rng = StdRng::seed_from_u64(42);
        let points = sample_surface(&square(), 200, &mut rng).unwrap();
        assert_eq!(points.len(), 600);

        let mut max_norm = 0.0f32;
        for p in points.chunks_exact(3) {
            assert!(p[2].abs() < 1e-6, "points stay on the plane");
            max_norm = max_norm.max((p[0] * p[0] + p[1] * p[1]).sqrt());
        }
        assert!((max_norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_mesh_is_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let mesh = IndexedMesh {
            vertices: Vec::new(),
            faces: Vec::new(),
        };
        assert!(matches!(
            sample_surface(&mesh, 10, &mut rng),
            Err(ModelError::Sampling { .. })
        ));
    }

    #[test]
    fn test_normalize_centers_cloud() {
        let points = vec![1.0, 1.0, 1.0, 3.0, 1.0, 1.0];
        let normalized = normalize(points, 2).unwrap();
        assert_eq!(normalized, vec![-1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
    }
}
