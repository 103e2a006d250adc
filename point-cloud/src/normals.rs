//! Normal estimation by PCA over k-nearest neighbourhoods.

use nalgebra::{Matrix3, Point3, SymmetricEigen, Vector3};
use rayon::prelude::*;

use crate::spatial::PointIndex;

/// Estimate one unit normal per point from its `k` nearest neighbours and
/// flip each towards `viewpoint`.
///
/// Points with fewer than three neighbours get `None`.
pub fn estimate_normals(
    points: &[Point3<f32>],
    index: &PointIndex,
    k: usize,
    viewpoint: &Point3<f32>,
) -> Vec<Option<Vector3<f32>>> {
    points
        .par_iter()
        .map(|p| {
            let neighbors = index.k_nearest(p, k);
            if neighbors.len() < 3 {
                return None;
            }

            let centroid = neighbors
                .iter()
                .fold(Vector3::zeros(), |acc, &(j, _)| acc + points[j].coords)
                / neighbors.len() as f32;

            let mut cov = Matrix3::zeros();
            for &(j, _) in &neighbors {
                let d = points[j].coords - centroid;
                cov += d * d.transpose();
            }
            cov /= neighbors.len() as f32;

            let eigen = SymmetricEigen::new(cov);
            let normal = eigen.eigenvectors.column(eigen.eigenvalues.imin()).into_owned();
            if !normal.iter().all(|v| v.is_finite()) {
                return None;
            }

            if normal.dot(&(viewpoint - p)) < 0.0 {
                Some(-normal)
            } else {
                Some(normal)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_grid_normals_point_at_viewpoint() {
        let points: Vec<Point3<f32>> = (0..10)
            .flat_map(|x| (0..10).map(move |y| Point3::new(x as f32 * 0.1, y as f32 * 0.1, 1.0)))
            .collect();
        let index = PointIndex::new(&points);
        let normals = estimate_normals(&points, &index, 8, &Point3::origin());
        assert_eq!(normals.len(), points.len());
        for n in normals {
            let n = n.unwrap();
            assert!((n - Vector3::new(0.0, 0.0, -1.0)).norm() < 1e-3);
        }
    }

    #[test]
    fn isolated_points_have_no_normal() {
        let points = vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
        let index = PointIndex::new(&points);
        let normals = estimate_normals(&points, &index, 8, &Point3::origin());
        assert!(normals.iter().all(Option::is_none));
    }
}
