/// Integration tests for point-cloud crate
/// Runs the segmentation stages end to end on a synthetic tabletop scene

use nalgebra::Point3;
use rand::rngs::StdRng;
use rand::SeedableRng;

use objrec_core::PointCloud;
use objrec_point_cloud::{
    ClusterConfig, ClusterSegmenter, FpfhEstimator, PlaneConfig, PlaneExtractor, PlaneOutcome, FPFH_BINS,
};

/// 0.6 m table at 1 m depth, three 6x6x3 blocks 3 cm in front of it, and a
/// far wall the depth clip must reject.
fn tabletop_scene() -> PointCloud {
    let mut points = Vec::new();
    for i in -30..=30 {
        for j in -30..=30 {
            points.push(Point3::new(i as f32 * 0.01, j as f32 * 0.01, 1.0));
            points.push(Point3::new(i as f32 * 0.01, j as f32 * 0.01, 3.0));
        }
    }
    for (cx, cy) in [(-0.2f32, -0.2f32), (0.0, 0.1), (0.2, -0.05)] {
        for i in 0..6 {
            for j in 0..6 {
                for k in 0..3 {
                    points.push(Point3::new(
                        cx + i as f32 * 0.01,
                        cy + j as f32 * 0.01,
                        0.97 - k as f32 * 0.01,
                    ));
                }
            }
        }
    }
    PointCloud::new(points)
}

fn small_clusters() -> ClusterConfig {
    ClusterConfig {
        min_size: 50,
        ..ClusterConfig::default()
    }
}

#[test]
fn test_plane_then_clusters() {
    let scene = tabletop_scene();
    let mut rng = StdRng::seed_from_u64(5);
    let extraction = PlaneExtractor::new(PlaneConfig::default()).extract_objects_above_plane(&scene, &mut rng);

    match &extraction.outcome {
        PlaneOutcome::Found { plane, inliers } => {
            assert_eq!(*inliers, 61 * 61);
            assert!(plane.normal.z < -0.99);
        }
        other => panic!("expected a plane, got {other:?}"),
    }
    // far wall clipped away
    assert_eq!(extraction.clipped.len(), 61 * 61 + 3 * 108);
    assert_eq!(extraction.objects.len(), 3 * 108);

    let clusters = ClusterSegmenter::new(small_clusters()).extract_clusters(&extraction.objects);
    assert_eq!(clusters.len(), 3);
    assert!(clusters.iter().all(|c| c.len() == 108));
}

#[test]
fn test_segment_with_fpfh() {
    let scene = tabletop_scene();
    let mut rng = StdRng::seed_from_u64(5);
    let extraction = PlaneExtractor::new(PlaneConfig::default()).extract_objects_above_plane(&scene, &mut rng);

    let features = ClusterSegmenter::new(small_clusters()).segment(&extraction.objects, &FpfhEstimator::default());
    assert_eq!(features.len(), 3);
    for fc in &features {
        assert!(!fc.is_empty());
        assert_eq!(fc.descriptor_len(), Some(FPFH_BINS));
        assert!(fc.cloud().normals.is_some());
    }
}

#[test]
fn test_sparse_organized_scene() {
    let mut points = tabletop_scene().points;
    points.truncate(64 * 64);
    points[10] = Point3::new(f32::NAN, f32::NAN, f32::NAN);
    let scene = PointCloud::organized(points, 64, 64).unwrap();

    let mut rng = StdRng::seed_from_u64(1);
    let extraction = PlaneExtractor::new(PlaneConfig::default()).extract_objects_above_plane(&scene, &mut rng);
    assert!(extraction.clipped.points.iter().all(|p| p.z.is_finite()));
    assert!(extraction.found());
}
