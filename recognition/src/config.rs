//! Recognition parameters
//!
//! Defaults reproduce the reference tuning for tabletop scenes in metres:
//! 2 cm cluster tolerance, 5 mm plane threshold, objects 1-20 cm above the
//! plane, 500 SAC-IA iterations and 100 ICP iterations.

use std::path::Path;

use serde::{Deserialize, Serialize};

use objrec_core::{Error, Result};
use objrec_point_cloud::{ClusterConfig, PlaneConfig};
use objrec_registration::{CoarseAlignConfig, IcpConfig};

/// What to segment when the scene has no supporting plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoPlanePolicy {
    /// Cluster the whole depth-clipped scene.
    #[default]
    FallbackToScene,
    /// Report nothing.
    ReturnEmpty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    pub plane: PlaneConfig,
    pub cluster: ClusterConfig,
    pub coarse: CoarseAlignConfig,
    pub icp: IcpConfig,
    pub no_plane_policy: NoPlanePolicy,
    /// Seed for every randomized stage; `None` draws from OS entropy.
    pub seed: Option<u64>,
    /// Evaluate clusters on the rayon pool.
    pub parallel: bool,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            plane: PlaneConfig::default(),
            cluster: ClusterConfig::default(),
            coarse: CoarseAlignConfig::default(),
            icp: IcpConfig::default(),
            no_plane_policy: NoPlanePolicy::default(),
            seed: None,
            parallel: true,
        }
    }
}

impl RecognitionConfig {
    /// Parse JSON; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(format!("invalid JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        let p = &self.plane;
        if p.depth_range[0] > p.depth_range[1] {
            return Err(Error::Config(format!("plane.depth_range is inverted: {:?}", p.depth_range)));
        }
        if p.height_range[0] > p.height_range[1] {
            return Err(Error::Config(format!("plane.height_range is inverted: {:?}", p.height_range)));
        }
        if !(p.distance_threshold > 0.0) {
            return Err(Error::Config("plane.distance_threshold must be > 0".into()));
        }

        let c = &self.cluster;
        if !(c.tolerance > 0.0) {
            return Err(Error::Config("cluster.tolerance must be > 0".into()));
        }
        if c.min_size > c.max_size {
            return Err(Error::Config(format!(
                "cluster.min_size {} exceeds cluster.max_size {}",
                c.min_size, c.max_size
            )));
        }

        if !(self.coarse.max_correspondence_distance > 0.0) {
            return Err(Error::Config("coarse.max_correspondence_distance must be > 0".into()));
        }
        if self.coarse.num_samples < 3 {
            return Err(Error::Config("coarse.num_samples must be >= 3".into()));
        }
        if !(self.icp.max_correspondence_distance > 0.0) {
            return Err(Error::Config("icp.max_correspondence_distance must be > 0".into()));
        }
        Ok(())
    }
}
