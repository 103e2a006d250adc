//! 3D Registration Module
//!
//! - Global registration: SAC-IA over descriptor correspondences
//! - Local refinement: point-to-point ICP

pub mod global;
pub mod icp;


use nalgebra::{Matrix3, Point3, Vector3};

use objrec_core::{transform_from_parts, Transform};
use objrec_point_cloud::PointIndex;

/// Least-squares rigid transform mapping `source[i]` onto `target[i]`
/// (Kabsch/SVD).
///
/// Returns `None` for fewer than three pairs, mismatched lengths, or a
/// failed decomposition.
pub fn estimate_rigid_transform(source: &[Point3<f32>], target: &[Point3<f32>]) -> Option<Transform> {
    if source.len() != target.len() || source.len() < 3 {
        return None;
    }

    let n = source.len() as f32;
    let source_centroid = source.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords) / n;
    let target_centroid = target.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords) / n;

    let mut covariance = Matrix3::<f32>::zeros();
    for (s, t) in source.iter().zip(target.iter()) {
        covariance += (t.coords - target_centroid) * (s.coords - source_centroid).transpose();
    }

    let svd = covariance.svd(true, true);
    let u = svd.u?;
    let vt = svd.v_t?;

    let mut rotation = u * vt;
    // reflection: flip the axis of the smallest singular value
    if rotation.determinant() < 0.0 {
        let mut u_corrected = u;
        u_corrected.set_column(2, &(u.column(2) * -1.0));
        rotation = u_corrected * vt;
    }
    if !rotation.iter().all(|v| v.is_finite()) {
        return None;
    }

    let translation = target_centroid - rotation * source_centroid;
    Some(transform_from_parts(&rotation, &translation))
}

/// Mean over all source points of the squared nearest-target distance,
/// each term capped at `max_squared_distance`.
///
/// `None` when either side is empty.
pub fn capped_fitness(
    source: &[Point3<f32>],
    target_index: &PointIndex,
    transform: &Transform,
    max_squared_distance: f32,
) -> Option<f32> {
    if source.is_empty() || target_index.is_empty() {
        return None;
    }
    let total: f32 = source
        .iter()
        .filter_map(|p| target_index.nearest(&transform.transform_point(p)))
        .map(|(_, d2)| d2.min(max_squared_distance))
        .sum();
    Some(total / source.len() as f32)
}

/// Mean squared nearest-target distance over the source points whose
/// squared distance is at most `max_range`; infinity when none qualify.
pub fn fitness_score(
    source: &[Point3<f32>],
    target_index: &PointIndex,
    transform: &Transform,
    max_range: f32,
) -> f32 {
    let (sum, count) = source
        .iter()
        .filter_map(|p| target_index.nearest(&transform.transform_point(p)))
        .filter(|&(_, d2)| d2 <= max_range)
        .fold((0.0f32, 0usize), |(sum, count), (_, d2)| (sum + d2, count + 1));
    if count == 0 {
        f32::INFINITY
    } else {
        sum / count as f32
    }
}
