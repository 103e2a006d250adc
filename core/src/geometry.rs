use nalgebra::{Isometry3, Matrix3, Point3, Rotation3, SymmetricEigen, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Rigid motion mapping template space into scene space.
pub type Transform = Isometry3<f32>;

/// Build a rigid transform from a rotation matrix and translation.
///
/// The rotation is re-orthonormalized, so matrices from SVD with small
/// numeric drift are accepted.
pub fn transform_from_parts(rotation: &Matrix3<f32>, translation: &Vector3<f32>) -> Transform {
    let rotation = Rotation3::from_matrix(rotation);
    Isometry3::from_parts(
        Translation3::from(*translation),
        UnitQuaternion::from_rotation_matrix(&rotation),
    )
}

/// Rotation angle (radians) and translation length of a rigid motion.
pub fn transform_magnitude(transform: &Transform) -> (f32, f32) {
    (transform.rotation.angle(), transform.translation.vector.norm())
}

/// Infinite plane `normal · p + offset = 0` with a unit normal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub normal: Vector3<f32>,
    pub offset: f32,
}

impl Plane {
    /// Plane through three points, `None` when they are collinear.
    pub fn from_points(p1: &Point3<f32>, p2: &Point3<f32>, p3: &Point3<f32>) -> Option<Self> {
        let normal = (p2 - p1).cross(&(p3 - p1));
        let norm = normal.norm();
        if !norm.is_finite() || norm < 1e-12 {
            return None;
        }
        let normal = normal / norm;
        Some(Self {
            normal,
            offset: -normal.dot(&p1.coords),
        })
    }

    /// Total least squares fit: the normal is the eigenvector of the
    /// scatter matrix with the smallest eigenvalue.
    pub fn fit<'a>(points: impl IntoIterator<Item = &'a Point3<f32>>) -> Option<Self> {
        let points: Vec<&Point3<f32>> = points.into_iter().collect();
        if points.len() < 3 {
            return None;
        }
        let n = points.len() as f32;
        let centroid = points.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords) / n;

        let mut scatter = Matrix3::zeros();
        for p in &points {
            let d = p.coords - centroid;
            scatter += d * d.transpose();
        }

        let eigen = SymmetricEigen::new(scatter);
        let min_idx = eigen.eigenvalues.imin();
        let normal = eigen.eigenvectors.column(min_idx).into_owned();
        let norm = normal.norm();
        if !norm.is_finite() || norm < 1e-12 {
            return None;
        }
        let normal = normal / norm;
        Some(Self {
            normal,
            offset: -normal.dot(&centroid),
        })
    }

    pub fn signed_distance(&self, p: &Point3<f32>) -> f32 {
        self.normal.dot(&p.coords) + self.offset
    }

    /// Flip the plane so that `viewpoint` lies on its positive side.
    pub fn oriented_towards(self, viewpoint: &Point3<f32>) -> Self {
        if self.signed_distance(viewpoint) < 0.0 {
            Self {
                normal: -self.normal,
                offset: -self.offset,
            }
        } else {
            self
        }
    }

    /// Orthonormal in-plane basis `(u, v)`.
    pub fn basis(&self) -> (Vector3<f32>, Vector3<f32>) {
        let helper = if self.normal.x.abs() < 0.9 {
            Vector3::x()
        } else {
            Vector3::y()
        };
        let u = self.normal.cross(&helper).normalize();
        let v = self.normal.cross(&u);
        (u, v)
    }

    /// 2D coordinates of the orthogonal projection of `p` onto the plane.
    pub fn project_2d(&self, p: &Point3<f32>, basis: &(Vector3<f32>, Vector3<f32>)) -> (f64, f64) {
        let on_plane = p.coords - self.normal * self.signed_distance(p);
        (basis.0.dot(&on_plane) as f64, basis.1.dot(&on_plane) as f64)
    }
}
