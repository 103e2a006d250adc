//! FPFH (Fast Point Feature Histogram) descriptors
//!
//! Default `FeatureEstimator`: normals from kNN PCA, a 33-bin simplified
//! point feature histogram per point, then the distance-weighted sum over
//! the neighbourhood.

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

use objrec_core::{Descriptor, FeatureCloud, FeatureEstimator, PointCloud};

use crate::normals::estimate_normals;
use crate::spatial::PointIndex;

pub const FPFH_BINS: usize = 33;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FpfhEstimator {
    /// Neighbours used for normal estimation.
    pub normal_k: usize,
    /// Neighbourhood radius for the histograms.
    pub search_radius: f32,
    /// Normals are flipped towards this point.
    pub viewpoint: [f32; 3],
}

impl Default for FpfhEstimator {
    fn default() -> Self {
        Self {
            normal_k: 10,
            search_radius: 0.025,
            viewpoint: [0.0, 0.0, 0.0],
        }
    }
}

impl FpfhEstimator {
    pub fn new(search_radius: f32) -> Self {
        Self {
            search_radius,
            ..Self::default()
        }
    }
}

impl FeatureEstimator for FpfhEstimator {
    fn compute_feature_cloud(&self, cloud: PointCloud) -> objrec_core::Result<FeatureCloud> {
        if self.search_radius <= 0.0 || self.normal_k < 3 {
            return Err(objrec_core::Error::invalid_input(format!(
                "FPFH needs search_radius > 0 and normal_k >= 3, got {} and {}",
                self.search_radius, self.normal_k
            )));
        }

        let cloud = if cloud.is_dense {
            cloud
        } else {
            cloud.remove_non_finite()
        };
        if cloud.is_empty() {
            return FeatureCloud::new(cloud, Vec::new());
        }

        let index = PointIndex::new(&cloud.points);
        let viewpoint = Point3::from(self.viewpoint);
        if cloud.normals.is_some() && cloud.valid_normals().is_none() {
            warn!(points = cloud.len(), "normal count does not match point count, re-estimating");
        }
        let normals = match cloud.valid_normals() {
            Some(ns) => ns.iter().copied().map(Some).collect(),
            None => estimate_normals(&cloud.points, &index, self.normal_k, &viewpoint),
        };

        let histograms = compute_fpfh(&cloud.points, &normals, &index, self.search_radius);

        let (retained, descriptors): (Vec<usize>, Vec<Descriptor>) = histograms
            .into_iter()
            .enumerate()
            .filter_map(|(i, h)| h.map(|h| (i, Descriptor::new(h.to_vec()))))
            .unzip();

        let mut kept = cloud.select(&retained);
        kept.normals = Some(
            retained
                .iter()
                .map(|&i| normals[i].unwrap_or_else(Vector3::zeros))
                .collect(),
        );
        FeatureCloud::new(kept, descriptors)
    }
}

/// FPFH per point; `None` where the point has no normal or no neighbour
/// inside `radius`.
pub fn compute_fpfh(
    points: &[Point3<f32>],
    normals: &[Option<Vector3<f32>>],
    index: &PointIndex,
    radius: f32,
) -> Vec<Option<[f32; FPFH_BINS]>> {
    let neighborhoods: Vec<Vec<usize>> = points
        .par_iter()
        .enumerate()
        .map(|(i, p)| {
            index
                .within_radius(p, radius)
                .into_iter()
                .filter(|&j| j != i && normals[j].is_some())
                .collect()
        })
        .collect();

    let spfh: Vec<Option<[f32; FPFH_BINS]>> = (0..points.len())
        .into_par_iter()
        .map(|i| {
            let n = normals[i]?;
            let neighbors = &neighborhoods[i];
            if neighbors.is_empty() {
                return None;
            }

            let mut hist = [0.0f32; FPFH_BINS];
            let mut count = 0;
            for &j in neighbors {
                let Some(nj) = normals[j] else { continue };
                let Some((alpha, phi, theta)) = pair_features(&points[i], &n, &points[j], &nj)
                else {
                    continue;
                };

                let bin_alpha = ((alpha + 1.0) * 5.5).floor().clamp(0.0, 10.0) as usize;
                let bin_phi = ((phi + 1.0) * 5.5).floor().clamp(0.0, 10.0) as usize;
                let bin_theta = ((theta + std::f32::consts::PI) * (11.0 / (2.0 * std::f32::consts::PI)))
                    .floor()
                    .clamp(0.0, 10.0) as usize;

                hist[bin_alpha] += 1.0;
                hist[11 + bin_phi] += 1.0;
                hist[22 + bin_theta] += 1.0;
                count += 1;
            }

            if count == 0 {
                return None;
            }
            let inv = 1.0 / count as f32;
            hist.iter_mut().for_each(|v| *v *= inv);
            Some(hist)
        })
        .collect();

    (0..points.len())
        .into_par_iter()
        .map(|i| {
            let own = spfh[i]?;
            let neighbors = &neighborhoods[i];
            let weight = 1.0 / neighbors.len() as f32;

            let mut hist = own;
            for &j in neighbors {
                let Some(other) = spfh[j] else { continue };
                let dist = (points[i] - points[j]).norm();
                if dist < 1e-6 {
                    continue;
                }
                let w = weight / dist;
                for (h, o) in hist.iter_mut().zip(other.iter()) {
                    *h += o * w;
                }
            }

            let sum: f32 = hist.iter().sum();
            if sum > 1e-6 {
                let scale = 100.0 / sum;
                hist.iter_mut().for_each(|v| *v *= scale);
            }
            Some(hist)
        })
        .collect()
}

/// Darboux frame angles between two oriented points.
fn pair_features(
    p1: &Point3<f32>,
    n1: &Vector3<f32>,
    p2: &Point3<f32>,
    n2: &Vector3<f32>,
) -> Option<(f32, f32, f32)> {
    let delta = p2 - p1;
    let dist = delta.norm();
    if dist < 1e-6 {
        return None;
    }

    let u = n1;
    let v = delta.cross(u);
    let v_norm = v.norm();
    if v_norm < 1e-6 {
        return None;
    }
    let v = v / v_norm;
    let w = u.cross(&v);

    let alpha = v.dot(n2);
    let phi = u.dot(&delta) / dist;
    let theta = w.dot(n2).atan2(u.dot(n2));
    Some((alpha, phi, theta))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere(n: usize, radius: f32) -> Vec<Point3<f32>> {
        let golden = std::f32::consts::PI * (3.0 - 5.0f32.sqrt());
        (0..n)
            .map(|i| {
                let y = 1.0 - 2.0 * (i as f32 + 0.5) / n as f32;
                let r = (1.0 - y * y).sqrt();
                let t = golden * i as f32;
                Point3::new(r * t.cos() * radius, y * radius, r * t.sin() * radius + 1.0)
            })
            .collect()
    }

    #[test]
    fn one_descriptor_per_retained_point() {
        let cloud = PointCloud::new(sphere(400, 0.1));
        let fc = FpfhEstimator::new(0.03).compute_feature_cloud(cloud).unwrap();
        assert!(!fc.is_empty());
        assert_eq!(fc.cloud().len(), fc.descriptors().len());
        assert_eq!(fc.descriptor_len(), Some(FPFH_BINS));
        for d in fc.descriptors() {
            let sum: f32 = d.data.iter().sum();
            assert!((sum - 100.0).abs() < 1e-2);
        }
    }

    #[test]
    fn isolated_points_are_dropped() {
        let mut points = sphere(300, 0.1);
        points.push(Point3::new(5.0, 5.0, 5.0));
        let fc = FpfhEstimator::new(0.03)
            .compute_feature_cloud(PointCloud::new(points))
            .unwrap();
        assert!(fc.len() <= 300);
        assert!(fc.cloud().points.iter().all(|p| p.x < 1.0));
    }

    #[test]
    fn short_normals_are_re_estimated() {
        let mut cloud = PointCloud::new(sphere(400, 0.1));
        cloud.normals = Some(vec![Vector3::z(); 10]);
        let fc = FpfhEstimator::new(0.03).compute_feature_cloud(cloud).unwrap();
        assert!(!fc.is_empty());
        assert_eq!(fc.cloud().normals.as_ref().map(Vec::len), Some(fc.len()));
    }

    #[test]
    fn empty_cloud_gives_empty_feature_cloud() {
        let fc = FpfhEstimator::default()
            .compute_feature_cloud(PointCloud::default())
            .unwrap();
        assert!(fc.is_empty());
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let est = FpfhEstimator {
            search_radius: 0.0,
            ..FpfhEstimator::default()
        };
        assert!(est.compute_feature_cloud(PointCloud::default()).is_err());
    }
}
