//! Point Cloud Operations
//!
//! - `spatial`: R*-tree proximity index
//! - `filtering`: pass-through clipping
//! - `normals`, `features`: kNN normals and FPFH descriptors
//! - `plane`: supporting plane extraction (RANSAC + convex hull prism)
//! - `cluster`: euclidean cluster extraction

pub mod cluster;
pub mod features;
pub mod filtering;
pub mod normals;
pub mod plane;
pub mod spatial;

pub use cluster::{euclidean_clusters, ClusterConfig, ClusterSegmenter};
pub use features::{compute_fpfh, FpfhEstimator, FPFH_BINS};
pub use filtering::{pass_through, pass_through_indices, Axis};
pub use normals::estimate_normals;
pub use plane::{PlaneConfig, PlaneExtraction, PlaneExtractor, PlaneOutcome};
pub use spatial::PointIndex;
