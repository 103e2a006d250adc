//! Proximity index over a point set, backed by an R*-tree.

use nalgebra::Point3;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

struct IndexedPoint(usize, [f32; 3]);

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f32; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.1)
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f32; 3]) -> f32 {
        let dx = self.1[0] - point[0];
        let dy = self.1[1] - point[1];
        let dz = self.1[2] - point[2];
        dx * dx + dy * dy + dz * dz
    }
}

/// Nearest-neighbour and radius queries returning indices into the point
/// slice the index was built from.
pub struct PointIndex {
    tree: RTree<IndexedPoint>,
}

impl PointIndex {
    pub fn new(points: &[Point3<f32>]) -> Self {
        let wrappers = points
            .iter()
            .enumerate()
            .map(|(i, p)| IndexedPoint(i, [p.x, p.y, p.z]))
            .collect();
        Self {
            tree: RTree::bulk_load(wrappers),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Index of the closest point and its squared distance.
    pub fn nearest(&self, query: &Point3<f32>) -> Option<(usize, f32)> {
        let q = [query.x, query.y, query.z];
        self.tree
            .nearest_neighbor(&q)
            .map(|p| (p.0, p.distance_2(&q)))
    }

    /// Up to `k` closest points, nearest first, with squared distances.
    pub fn k_nearest(&self, query: &Point3<f32>, k: usize) -> Vec<(usize, f32)> {
        let q = [query.x, query.y, query.z];
        self.tree
            .nearest_neighbor_iter_with_distance_2(&q)
            .take(k)
            .map(|(p, d2)| (p.0, d2))
            .collect()
    }

    /// All points within `radius` (inclusive), in no particular order.
    pub fn within_radius(&self, query: &Point3<f32>, radius: f32) -> Vec<usize> {
        let q = [query.x, query.y, query.z];
        self.tree
            .locate_within_distance(q, radius * radius)
            .map(|p| p.0)
            .collect()
    }
}
