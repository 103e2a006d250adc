//! Point-to-point ICP
//!
//! Iteratively pairs every transformed source point with its nearest target
//! point (within the correspondence distance), solves the incremental rigid
//! motion by SVD, and composes it onto the running estimate.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use objrec_core::{PointCloud, Transform};
use objrec_point_cloud::PointIndex;

use super::{estimate_rigid_transform, fitness_score};

/// Convergence below this mean squared error is absolute.
const ABSOLUTE_MSE_EPSILON: f32 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IcpConfig {
    pub max_iterations: usize,
    /// Pairs farther apart than this are not correspondences.
    pub max_correspondence_distance: f32,
    /// Converged when the incremental translation is at most this long...
    pub translation_tolerance: f32,
    /// ...and `1 - cos(angle)` of the incremental rotation is at most this.
    pub rotation_tolerance: f32,
    /// Also converged when the correspondence MSE changes by less than this
    /// fraction between iterations.
    pub relative_mse_tolerance: f32,
}

impl Default for IcpConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            max_correspondence_distance: 5.0,
            translation_tolerance: 3e-4,
            rotation_tolerance: 1e-5,
            relative_mse_tolerance: 1e-5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IcpResult {
    pub transformation: Transform,
    /// Mean squared nearest-target distance over all source points.
    pub fitness: f32,
    pub num_iterations: usize,
    pub converged: bool,
}

pub fn registration_icp_point_to_point(
    source: &PointCloud,
    target: &PointCloud,
    init_transformation: &Transform,
    config: &IcpConfig,
) -> IcpResult {
    let index = PointIndex::new(&target.points);
    registration_icp_point_to_point_with_index(source, target, &index, init_transformation, config)
}

/// ICP with a prebuilt index over `target.points`.
pub fn registration_icp_point_to_point_with_index(
    source: &PointCloud,
    target: &PointCloud,
    target_index: &PointIndex,
    init_transformation: &Transform,
    config: &IcpConfig,
) -> IcpResult {
    let max_sq = config.max_correspondence_distance * config.max_correspondence_distance;
    let mut transformation = *init_transformation;
    let mut previous_mse: Option<f32> = None;
    let mut converged = false;
    let mut iterations = 0;

    let mut src: Vec<Point3<f32>> = Vec::with_capacity(source.len());
    let mut dst: Vec<Point3<f32>> = Vec::with_capacity(source.len());

    while iterations < config.max_iterations {
        iterations += 1;

        src.clear();
        dst.clear();
        let mut sum_sq = 0.0f32;
        for p in &source.points {
            let moved = transformation.transform_point(p);
            if let Some((j, d2)) = target_index.nearest(&moved) {
                if d2 <= max_sq {
                    src.push(moved);
                    dst.push(target.points[j]);
                    sum_sq += d2;
                }
            }
        }

        if src.len() < 3 {
            debug!(iteration = iterations, correspondences = src.len(), "icp lost correspondences");
            break;
        }
        let mse = sum_sq / src.len() as f32;

        let Some(delta) = estimate_rigid_transform(&src, &dst) else {
            debug!(iteration = iterations, "icp transform estimation failed");
            break;
        };
        transformation = delta * transformation;

        let cos_angle = delta.rotation.angle().cos();
        let step = delta.translation.vector.norm();
        trace!(iteration = iterations, mse, step, cos_angle, "icp step");

        let small_step = 1.0 - cos_angle <= config.rotation_tolerance
            && step <= config.translation_tolerance;
        let stalled = previous_mse
            .map(|prev| (prev - mse).abs() <= config.relative_mse_tolerance * prev)
            .unwrap_or(false);
        if small_step || stalled || mse <= ABSOLUTE_MSE_EPSILON {
            converged = true;
            break;
        }
        previous_mse = Some(mse);
    }

    let fitness = fitness_score(&source.points, target_index, &transformation, f32::INFINITY);
    debug!(converged, iterations, fitness, "icp finished");

    IcpResult {
        transformation,
        fitness,
        num_iterations: iterations,
        converged,
    }
}
