//! Pass-through filtering on a single coordinate axis.

use objrec_core::PointCloud;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    #[default]
    Z,
}

impl Axis {
    fn value(self, p: &nalgebra::Point3<f32>) -> f32 {
        match self {
            Axis::X => p.x,
            Axis::Y => p.y,
            Axis::Z => p.z,
        }
    }
}

/// Indices of the finite points whose `axis` coordinate lies in `[min, max]`.
pub fn pass_through_indices(cloud: &PointCloud, axis: Axis, min: f32, max: f32) -> Vec<usize> {
    cloud
        .points
        .iter()
        .enumerate()
        .filter(|(_, p)| p.x.is_finite() && p.y.is_finite() && p.z.is_finite())
        .filter(|(_, p)| {
            let v = axis.value(p);
            v >= min && v <= max
        })
        .map(|(i, _)| i)
        .collect()
}

/// Keep the finite points whose `axis` coordinate lies in `[min, max]`.
pub fn pass_through(cloud: &PointCloud, axis: Axis, min: f32, max: f32) -> PointCloud {
    cloud.select(&pass_through_indices(cloud, axis, min, max))
}
