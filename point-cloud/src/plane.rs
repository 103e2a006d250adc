//! Supporting plane extraction
//!
//! Clip the scene to the sensing volume, fit the dominant plane with RANSAC,
//! refine it by least squares, and keep the points standing inside the
//! prism spanned by the plane's convex hull and a height band.

use geo::{Area, ConvexHull, Intersects, MultiPoint, Point as GeoPoint, Polygon};
use nalgebra::Point3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use objrec_core::{Plane, PointCloud, Ransac, RobustConfig, RobustModel};

use crate::filtering::{pass_through, Axis};

/// Hulls with a smaller area (in squared scene units) are treated as
/// degenerate.
const MIN_HULL_AREA: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaneConfig {
    /// Axis used to clip the scene to the sensing volume.
    pub clip_axis: Axis,
    /// Inclusive `[min, max]` range kept along `clip_axis`.
    pub depth_range: [f32; 2],
    /// RANSAC inlier distance.
    pub distance_threshold: f32,
    pub max_iterations: usize,
    /// Fewer inliers than this means there is no supporting plane.
    pub min_inliers: usize,
    /// Inclusive `[min, max]` height above the plane of object points.
    pub height_range: [f32; 2],
    /// The plane normal is flipped to face this point (the sensor origin).
    pub viewpoint: [f32; 3],
}

impl Default for PlaneConfig {
    fn default() -> Self {
        Self {
            clip_axis: Axis::Z,
            depth_range: [0.0, 2.0],
            distance_threshold: 0.005,
            max_iterations: 100,
            min_inliers: 500,
            height_range: [0.01, 0.2],
            viewpoint: [0.0, 0.0, 0.0],
        }
    }
}

struct PlaneEstimator;

impl RobustModel<Point3<f32>> for PlaneEstimator {
    type Model = Plane;

    fn min_sample_size(&self) -> usize {
        3
    }

    fn estimate(&self, data: &[&Point3<f32>]) -> Option<Plane> {
        Plane::from_points(data[0], data[1], data[2])
    }

    fn compute_error(&self, model: &Plane, data: &Point3<f32>) -> f64 {
        model.signed_distance(data).abs() as f64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaneOutcome {
    Found { plane: Plane, inliers: usize },
    /// No plane reached `min_inliers`.
    NotFound { best_inliers: usize },
    /// The plane's inliers do not span a 2D region.
    DegenerateHull { plane: Plane, inliers: usize },
}

#[derive(Debug, Clone)]
pub struct PlaneExtraction {
    pub outcome: PlaneOutcome,
    /// Scene after the depth clip; the fallback object set when no plane is
    /// found.
    pub clipped: PointCloud,
    /// Points inside the prism above the plane; empty unless found.
    pub objects: PointCloud,
}

impl PlaneExtraction {
    pub fn found(&self) -> bool {
        matches!(self.outcome, PlaneOutcome::Found { .. })
    }
}

pub struct PlaneExtractor {
    config: PlaneConfig,
}

impl PlaneExtractor {
    pub fn new(config: PlaneConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlaneConfig {
        &self.config
    }

    pub fn extract_objects_above_plane<R: Rng + ?Sized>(
        &self,
        scene: &PointCloud,
        rng: &mut R,
    ) -> PlaneExtraction {
        let cfg = &self.config;
        let clipped = pass_through(scene, cfg.clip_axis, cfg.depth_range[0], cfg.depth_range[1]);
        debug!(scene = scene.len(), clipped = clipped.len(), "depth clip");

        let not_found = |clipped: PointCloud, best_inliers: usize| PlaneExtraction {
            outcome: PlaneOutcome::NotFound { best_inliers },
            clipped,
            objects: PointCloud::default(),
        };

        let ransac = Ransac::new(RobustConfig {
            threshold: cfg.distance_threshold as f64,
            max_iterations: cfg.max_iterations,
            confidence: 0.99,
        });
        let res = ransac.run(&PlaneEstimator, &clipped.points, rng);
        let min_inliers = cfg.min_inliers.max(3);
        let Some(model) = res.model.filter(|_| res.num_inliers >= min_inliers) else {
            debug!(best_inliers = res.num_inliers, min_inliers, "no supporting plane");
            return not_found(clipped, res.num_inliers);
        };

        let (plane, inliers) = refine_plane(&clipped, model, res.inlier_indices(), cfg.distance_threshold);
        if inliers.len() < min_inliers {
            return not_found(clipped, inliers.len());
        }
        let plane = plane.oriented_towards(&Point3::from(cfg.viewpoint));
        debug!(inliers = inliers.len(), normal = ?plane.normal, offset = plane.offset, "plane fitted");

        let basis = plane.basis();
        let Some(hull) = planar_hull(inliers.iter().map(|&i| plane.project_2d(&clipped.points[i], &basis)))
        else {
            debug!(inliers = inliers.len(), "plane inliers do not span a 2D hull");
            return PlaneExtraction {
                outcome: PlaneOutcome::DegenerateHull { plane, inliers: inliers.len() },
                clipped,
                objects: PointCloud::default(),
            };
        };

        let [min_h, max_h] = cfg.height_range;
        let object_indices: Vec<usize> = clipped
            .points
            .iter()
            .enumerate()
            .filter(|(_, p)| {
                let h = plane.signed_distance(p);
                h >= min_h && h <= max_h
            })
            .filter(|(_, p)| {
                let (u, v) = plane.project_2d(p, &basis);
                hull.intersects(&GeoPoint::new(u, v))
            })
            .map(|(i, _)| i)
            .collect();
        debug!(objects = object_indices.len(), "points above plane");

        let objects = clipped.select(&object_indices);
        PlaneExtraction {
            outcome: PlaneOutcome::Found { plane, inliers: inliers.len() },
            clipped,
            objects,
        }
    }
}

/// Least-squares refit over the RANSAC inliers, then re-select inliers
/// against the refined plane. Falls back to the sampled plane if the refit
/// loses support.
fn refine_plane(
    cloud: &PointCloud,
    model: Plane,
    inliers: Vec<usize>,
    threshold: f32,
) -> (Plane, Vec<usize>) {
    let Some(refined) = Plane::fit(inliers.iter().map(|&i| &cloud.points[i])) else {
        return (model, inliers);
    };
    let refined_inliers: Vec<usize> = (0..cloud.len())
        .filter(|&i| refined.signed_distance(&cloud.points[i]).abs() < threshold)
        .collect();
    if refined_inliers.len() >= inliers.len() {
        (refined, refined_inliers)
    } else {
        (model, inliers)
    }
}

/// 2D convex hull, `None` when the points are collinear or coincident.
fn planar_hull(points: impl Iterator<Item = (f64, f64)>) -> Option<Polygon<f64>> {
    let points: Vec<(f64, f64)> = points.collect();
    if points.len() < 3 {
        return None;
    }
    let hull = MultiPoint::from(points).convex_hull();
    if hull.exterior().0.len() < 4 || hull.unsigned_area() < MIN_HULL_AREA {
        return None;
    }
    Some(hull)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Horizontal table at depth `z` seen from the origin, plus a box of
    /// points standing `gap..gap+height` in front of it.
    fn table_scene(z: f32, gap: f32) -> (Vec<Point3<f32>>, Vec<Point3<f32>>) {
        let table: Vec<Point3<f32>> = (0..40)
            .flat_map(|i| (0..40).map(move |j| (i, j)))
            .map(|(i, j)| Point3::new(-0.4 + i as f32 * 0.02, -0.4 + j as f32 * 0.02, z))
            .collect();
        let object: Vec<Point3<f32>> = (0..5)
            .flat_map(|i| (0..5).flat_map(move |j| (0..5).map(move |k| (i, j, k))))
            .map(|(i, j, k)| {
                Point3::new(i as f32 * 0.01, j as f32 * 0.01, z - gap - k as f32 * 0.01)
            })
            .collect();
        (table, object)
    }

    #[test]
    fn finds_table_and_objects_on_it() {
        let (table, object) = table_scene(1.0, 0.02);
        let mut points = table.clone();
        points.extend(object.iter().copied());
        // far-field clutter beyond the sensing volume
        points.push(Point3::new(0.0, 0.0, 3.5));

        let extractor = PlaneExtractor::new(PlaneConfig::default());
        let res = extractor.extract_objects_above_plane(
            &PointCloud::new(points),
            &mut StdRng::seed_from_u64(11),
        );

        assert!(res.found());
        match res.outcome {
            PlaneOutcome::Found { plane, inliers } => {
                assert_eq!(inliers, table.len());
                assert!((plane.normal.z + 1.0).abs() < 1e-3, "normal faces the sensor");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(res.clipped.len(), table.len() + object.len());
        assert_eq!(res.objects.len(), object.len());
    }

    #[test]
    fn height_band_excludes_points_touching_the_plane() {
        let (table, _) = table_scene(1.0, 0.0);
        let mut points = table;
        points.push(Point3::new(0.0, 0.0, 0.996)); // 4 mm, below clearance
        points.push(Point3::new(0.0, 0.0, 0.95)); // 5 cm, kept
        points.push(Point3::new(0.0, 0.0, 0.5)); // 50 cm, too tall
        points.push(Point3::new(2.0, 2.0, 0.95)); // outside the hull

        let res = PlaneExtractor::new(PlaneConfig::default())
            .extract_objects_above_plane(&PointCloud::new(points), &mut StdRng::seed_from_u64(2));
        assert!(res.found());
        assert_eq!(res.objects.points, vec![Point3::new(0.0, 0.0, 0.95)]);
    }

    #[test]
    fn sparse_scene_has_no_plane() {
        let points: Vec<Point3<f32>> = (0..50)
            .map(|i| Point3::new((i as f32 * 0.37).sin(), (i as f32 * 0.91).cos(), 1.0 + (i as f32 * 0.13).sin() * 0.5))
            .collect();
        let res = PlaneExtractor::new(PlaneConfig::default())
            .extract_objects_above_plane(&PointCloud::new(points), &mut StdRng::seed_from_u64(5));
        assert!(!res.found());
        assert!(matches!(res.outcome, PlaneOutcome::NotFound { .. }));
        assert!(res.objects.is_empty());
        assert_eq!(res.clipped.len(), 50);
    }

    #[test]
    fn empty_scene_has_no_plane() {
        let res = PlaneExtractor::new(PlaneConfig::default())
            .extract_objects_above_plane(&PointCloud::default(), &mut StdRng::seed_from_u64(0));
        assert!(!res.found());
        assert!(res.clipped.is_empty());
    }

    #[test]
    fn collinear_scene_has_no_plane() {
        let points: Vec<Point3<f32>> = (0..600)
            .map(|i| Point3::new(i as f32 * 0.001, 0.0, 1.0))
            .collect();
        let res = PlaneExtractor::new(PlaneConfig::default())
            .extract_objects_above_plane(&PointCloud::new(points), &mut StdRng::seed_from_u64(9));
        assert!(!res.found());
    }

    #[test]
    fn collinear_projection_has_no_hull() {
        assert!(planar_hull((0..10).map(|i| (i as f64, 2.0 * i as f64))).is_none());
        assert!(planar_hull([(0.0, 0.0), (1.0, 1.0)].into_iter()).is_none());
        let hull = planar_hull([(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (0.2, 0.2)].into_iter()).unwrap();
        assert!((hull.unsigned_area() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn found_plane_always_has_inliers() {
        let config = PlaneConfig {
            min_inliers: 0,
            ..PlaneConfig::default()
        };
        let (table, _) = table_scene(1.2, 0.0);
        let res = PlaneExtractor::new(config)
            .extract_objects_above_plane(&PointCloud::new(table), &mut StdRng::seed_from_u64(4));
        if let PlaneOutcome::Found { inliers, .. } = res.outcome {
            assert!(inliers > 0);
        } else {
            panic!("table should be found");
        }
    }
}
