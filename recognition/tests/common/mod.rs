#![allow(dead_code)]

use nalgebra::{Point3, Translation3, UnitQuaternion, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use objrec_core::{Descriptor, FeatureCloud, FeatureEstimator, PointCloud, Result, Transform};
use objrec_point_cloud::PointIndex;
use objrec_recognition::{RecognitionConfig, TemplateLibrary};

pub const TABLE_Z: f32 = 1.0;

fn jittered(points: Vec<Point3<f32>>, seed: u64) -> PointCloud {
    let mut rng = StdRng::seed_from_u64(seed);
    let points = points
        .into_iter()
        .map(|p| {
            p + Vector3::new(
                rng.gen_range(-0.002..0.002),
                rng.gen_range(-0.002..0.002),
                rng.gen_range(-0.002..0.002),
            )
        })
        .collect();
    PointCloud::new(points)
}

/// 12x4 foot plus a raised 4x8 upright, 10 mm pitch. 112 points.
pub fn ell(seed: u64) -> PointCloud {
    let mut points = Vec::new();
    for i in 0..12 {
        for j in 0..4 {
            points.push(Point3::new(i as f32 * 0.01, j as f32 * 0.01, 0.0));
        }
    }
    for i in 0..4 {
        for j in 4..20 {
            points.push(Point3::new(i as f32 * 0.01, j as f32 * 0.01, 0.01));
        }
    }
    jittered(points, seed)
}

/// 14x4 bar plus a centred 4x12 stem, 10 mm pitch. 104 points.
pub fn tee(seed: u64) -> PointCloud {
    let mut points = Vec::new();
    for i in 0..14 {
        for j in 0..4 {
            points.push(Point3::new(i as f32 * 0.01, j as f32 * 0.01, 0.01));
        }
    }
    for i in 5..9 {
        for j in 4..16 {
            points.push(Point3::new(i as f32 * 0.01, j as f32 * 0.01, 0.0));
        }
    }
    jittered(points, seed)
}

/// Square grid in the plane z = `z`, 10 mm pitch.
pub fn table(half_extent: f32, z: f32) -> PointCloud {
    let steps = (half_extent / 0.01).round() as i32;
    let mut points = Vec::new();
    for i in -steps..=steps {
        for j in -steps..=steps {
            points.push(Point3::new(i as f32 * 0.01, j as f32 * 0.01, z));
        }
    }
    PointCloud::new(points)
}

pub fn yaw_pose(angle: f32, x: f32, y: f32, z: f32) -> Transform {
    Transform::from_parts(
        Translation3::new(x, y, z),
        UnitQuaternion::from_axis_angle(&Vector3::z_axis(), angle),
    )
}

pub fn merge(clouds: &[PointCloud]) -> PointCloud {
    PointCloud::new(clouds.iter().flat_map(|c| c.points.iter().copied()).collect())
}

/// Exact pose-invariant descriptor: distance to the centroid followed by
/// the three nearest neighbour distances.
pub struct InvariantEstimator;

impl FeatureEstimator for InvariantEstimator {
    fn compute_feature_cloud(&self, cloud: PointCloud) -> Result<FeatureCloud> {
        let centroid = cloud.centroid().unwrap_or_else(Point3::origin);
        let index = PointIndex::new(&cloud.points);
        let descriptors = cloud
            .points
            .iter()
            .map(|p| {
                let mut d = vec![(p - centroid).norm()];
                d.extend(index.k_nearest(p, 4).iter().skip(1).map(|&(_, sq)| sq.sqrt()));
                d.resize(4, 0.0);
                Descriptor::new(d)
            })
            .collect();
        FeatureCloud::new(cloud, descriptors)
    }
}

pub fn library() -> TemplateLibrary {
    let estimator = InvariantEstimator;
    TemplateLibrary::from_feature_clouds(vec![
        ("ell".to_string(), estimator.compute_feature_cloud(ell(1)).unwrap()),
        ("tee".to_string(), estimator.compute_feature_cloud(tee(2)).unwrap()),
    ])
}

/// Defaults, seeded, with one descriptor correspondence per sample since the
/// test descriptor is exact.
pub fn config() -> RecognitionConfig {
    let mut config = RecognitionConfig::default().with_seed(42);
    config.coarse.k_correspondences = 1;
    config.coarse.max_iterations = 100;
    config
}

pub fn assert_pose_close(actual: &Transform, expected: &Transform, tol: f32) {
    let dt = (actual.translation.vector - expected.translation.vector).norm();
    let dr = actual.rotation.angle_to(&expected.rotation);
    assert!(dt < tol && dr < tol * 10.0, "pose off by {dt} m / {dr} rad");
}
