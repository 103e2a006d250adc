use crate::point_cloud::PointCloud;

/// A fixed-length local shape descriptor attached to one point.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    pub data: Vec<f32>,
}

impl Descriptor {
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn squared_distance(&self, other: &Descriptor) -> f32 {
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }
}

impl From<Vec<f32>> for Descriptor {
    fn from(data: Vec<f32>) -> Self {
        Self::new(data)
    }
}

/// A point cloud paired with one descriptor per point, indices aligned.
///
/// Immutable once built: the fields are private so the alignment invariant
/// cannot be broken after construction.
#[derive(Debug, Clone)]
pub struct FeatureCloud {
    cloud: PointCloud,
    descriptors: Vec<Descriptor>,
}

impl FeatureCloud {
    pub fn new(cloud: PointCloud, descriptors: Vec<Descriptor>) -> crate::Result<Self> {
        if cloud.len() != descriptors.len() {
            return Err(crate::Error::DimensionMismatch(format!(
                "Descriptor count {} does not match point count {}",
                descriptors.len(),
                cloud.len()
            )));
        }
        if let Some(first) = descriptors.first() {
            let dim = first.size();
            if let Some(bad) = descriptors.iter().find(|d| d.size() != dim) {
                return Err(crate::Error::DimensionMismatch(format!(
                    "Descriptor length {} differs from {}",
                    bad.size(),
                    dim
                )));
            }
        }
        Ok(Self { cloud, descriptors })
    }

    pub fn cloud(&self) -> &PointCloud {
        &self.cloud
    }

    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.cloud.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cloud.is_empty()
    }

    pub fn descriptor_len(&self) -> Option<usize> {
        self.descriptors.first().map(Descriptor::size)
    }
}

/// Computes local descriptors for a point cloud.
///
/// Implementations may drop points they cannot describe (too few
/// neighbours, non-finite input); the returned `FeatureCloud` holds exactly
/// the retained points.
pub trait FeatureEstimator: Send + Sync {
    fn compute_feature_cloud(&self, cloud: PointCloud) -> crate::Result<FeatureCloud>;
}

impl<F: FeatureEstimator + ?Sized> FeatureEstimator for std::sync::Arc<F> {
    fn compute_feature_cloud(&self, cloud: PointCloud) -> crate::Result<FeatureCloud> {
        (**self).compute_feature_cloud(cloud)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn cloud(n: usize) -> PointCloud {
        PointCloud::new((0..n).map(|i| Point3::new(i as f32, 0.0, 0.0)).collect())
    }

    #[test]
    fn descriptor_distance() {
        let a = Descriptor::new(vec![1.0, 2.0, 3.0]);
        let b = Descriptor::new(vec![1.0, 0.0, 3.0]);
        assert_eq!(a.squared_distance(&a), 0.0);
        assert_eq!(a.squared_distance(&b), 4.0);
        assert_eq!(a.size(), 3);
    }

    #[test]
    fn feature_cloud_requires_one_descriptor_per_point() {
        let ok = FeatureCloud::new(cloud(2), vec![vec![0.0; 4].into(), vec![1.0; 4].into()]);
        assert!(ok.is_ok());
        assert_eq!(ok.unwrap().descriptor_len(), Some(4));

        let err = FeatureCloud::new(cloud(3), vec![vec![0.0; 4].into()]).unwrap_err();
        assert!(err.to_string().contains("Descriptor count 1"));
    }

    #[test]
    fn feature_cloud_rejects_ragged_descriptors() {
        let err = FeatureCloud::new(cloud(2), vec![vec![0.0; 4].into(), vec![0.0; 3].into()])
            .unwrap_err();
        assert!(matches!(err, crate::Error::DimensionMismatch(_)));
    }

    #[test]
    fn empty_feature_cloud_is_valid() {
        let fc = FeatureCloud::new(PointCloud::default(), Vec::new()).unwrap();
        assert!(fc.is_empty());
        assert_eq!(fc.descriptor_len(), None);
    }
}
