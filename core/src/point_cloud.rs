use nalgebra::{Point3, Vector3};

use crate::geometry::Transform;

/// An ordered set of 3D points with optional per-point normals.
///
/// `width`/`height` describe the sensor layout: an organized cloud has
/// `height > 1` and `width * height == len()`, an unorganized cloud has
/// `height == 1`. `is_dense` is false when the cloud may contain non-finite
/// points.
#[derive(Debug, Clone)]
pub struct PointCloud {
    pub points: Vec<Point3<f32>>,
    pub normals: Option<Vec<Vector3<f32>>>,
    pub width: usize,
    pub height: usize,
    pub is_dense: bool,
}

impl Default for PointCloud {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl PointCloud {
    /// Unorganized, dense cloud.
    pub fn new(points: Vec<Point3<f32>>) -> Self {
        let width = points.len();
        Self {
            points,
            normals: None,
            width,
            height: 1,
            is_dense: true,
        }
    }

    /// Organized cloud as delivered by a depth sensor. Non-finite points are
    /// allowed and mark the cloud as sparse.
    pub fn organized(points: Vec<Point3<f32>>, width: usize, height: usize) -> crate::Result<Self> {
        if width.checked_mul(height) != Some(points.len()) {
            return Err(crate::Error::DimensionMismatch(format!(
                "Organized layout {}x{} does not match point count {}",
                width,
                height,
                points.len()
            )));
        }
        let is_dense = points.iter().all(is_finite);
        Ok(Self {
            points,
            normals: None,
            width,
            height,
            is_dense,
        })
    }

    pub fn with_normals(mut self, normals: Vec<Vector3<f32>>) -> crate::Result<Self> {
        if normals.len() == self.points.len() {
            self.normals = Some(normals);
            Ok(self)
        } else {
            Err(crate::Error::DimensionMismatch(format!(
                "Normal count {} does not match point count {}",
                normals.len(),
                self.points.len()
            )))
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_organized(&self) -> bool {
        self.height > 1
    }

    /// The normals, if present and one per point. `normals` is a public
    /// field, so a mismatched vector is treated as absent.
    pub fn valid_normals(&self) -> Option<&[Vector3<f32>]> {
        self.normals
            .as_deref()
            .filter(|ns| ns.len() == self.points.len())
    }

    /// Copy the points at `indices` into a new unorganized, dense cloud.
    /// Normals are carried along when present.
    pub fn select(&self, indices: &[usize]) -> Self {
        let points = indices.iter().map(|&i| self.points[i]).collect();
        let mut out = Self::new(points);
        if let Some(normals) = self.valid_normals() {
            out.normals = Some(indices.iter().map(|&i| normals[i]).collect());
        }
        out
    }

    /// Drop non-finite points. The result is always unorganized and dense.
    pub fn remove_non_finite(&self) -> Self {
        let indices: Vec<usize> = (0..self.len())
            .filter(|&i| is_finite(&self.points[i]))
            .collect();
        self.select(&indices)
    }

    /// Apply a rigid transform to every point (and rotate the normals).
    pub fn transformed(&self, transform: &Transform) -> Self {
        let points = self
            .points
            .iter()
            .map(|p| transform.transform_point(p))
            .collect();
        let normals = self.valid_normals().map(|ns| {
            ns.iter()
                .map(|n| transform.rotation.transform_vector(n))
                .collect()
        });
        Self {
            points,
            normals,
            width: self.width,
            height: self.height,
            is_dense: self.is_dense,
        }
    }

    pub fn centroid(&self) -> Option<Point3<f32>> {
        if self.is_empty() {
            return None;
        }
        let sum = self
            .points
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords);
        Some(Point3::from(sum / self.len() as f32))
    }

    /// Axis-aligned bounds as `(min, max)`.
    pub fn bounds(&self) -> Option<(Point3<f32>, Point3<f32>)> {
        let first = *self.points.first()?;
        Some(self.points.iter().fold((first, first), |(lo, hi), p| {
            (lo.inf(p), hi.sup(p))
        }))
    }
}

fn is_finite(p: &Point3<f32>) -> bool {
    p.x.is_finite() && p.y.is_finite() && p.z.is_finite()
}
