//! Euclidean cluster extraction
//!
//! Two points are connected when they are within `tolerance` of each other;
//! clusters are the connected components, filtered by size.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use objrec_core::{FeatureCloud, FeatureEstimator, PointCloud};

use crate::spatial::PointIndex;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub tolerance: f32,
    pub min_size: usize,
    pub max_size: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.02,
            min_size: 100,
            max_size: 25000,
        }
    }
}

/// Connected components of the `tolerance`-neighbour graph whose size lies
/// in `[min_size, max_size]`.
///
/// Clusters are ordered largest first, ties by their lowest point index;
/// indices inside a cluster are ascending.
pub fn euclidean_clusters(cloud: &PointCloud, config: &ClusterConfig) -> Vec<Vec<usize>> {
    let n = cloud.len();
    if n == 0 {
        return Vec::new();
    }

    let index = PointIndex::new(&cloud.points);
    let mut visited = vec![false; n];
    let mut clusters = Vec::new();

    for seed in 0..n {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;

        let mut component = vec![seed];
        let mut head = 0;
        while head < component.len() {
            let current = component[head];
            head += 1;
            for j in index.within_radius(&cloud.points[current], config.tolerance) {
                if !visited[j] {
                    visited[j] = true;
                    component.push(j);
                }
            }
        }

        if component.len() >= config.min_size && component.len() <= config.max_size {
            component.sort_unstable();
            clusters.push(component);
        } else {
            debug!(size = component.len(), "discarding component outside size limits");
        }
    }

    // stable: equal sizes keep seed order
    clusters.sort_by(|a, b| b.len().cmp(&a.len()));
    clusters
}

pub struct ClusterSegmenter {
    config: ClusterConfig,
}

impl ClusterSegmenter {
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Candidate clusters as standalone point clouds.
    pub fn extract_clusters(&self, points: &PointCloud) -> Vec<PointCloud> {
        let clusters: Vec<PointCloud> = euclidean_clusters(points, &self.config)
            .iter()
            .map(|indices| points.select(indices))
            .collect();
        debug!(
            points = points.len(),
            clusters = clusters.len(),
            sizes = ?clusters.iter().map(PointCloud::len).collect::<Vec<_>>(),
            "euclidean clustering"
        );
        clusters
    }

    /// Candidate clusters with descriptors, for callers that want the whole
    /// segmentation step in one call.
    ///
    /// Equivalent to [`ClusterSegmenter::extract_clusters`] followed by the
    /// estimator on each cluster. Clusters whose descriptors cannot be
    /// computed are skipped; the warning names the cluster by its position in
    /// `extract_clusters`, the same index recognition diagnostics use.
    pub fn segment(&self, points: &PointCloud, estimator: &dyn FeatureEstimator) -> Vec<FeatureCloud> {
        self.extract_clusters(points)
            .into_iter()
            .enumerate()
            .filter_map(|(i, cluster)| match estimator.compute_feature_cloud(cluster) {
                Ok(fc) => Some(fc),
                Err(e) => {
                    warn!(cluster = i, error = %e, "feature estimation failed, skipping cluster");
                    None
                }
            })
            .collect()
    }
}
