//! Core types for template-based object recognition
//!
//! - `PointCloud`: ordered point set with sensor layout metadata
//! - `Descriptor`, `FeatureCloud`, `FeatureEstimator`: local shape features
//! - `Transform`, `Plane`: rigid motions and planar models
//! - `Ransac`: generic random sample consensus with an explicit random source

pub mod descriptor;
pub mod error;
pub mod geometry;
pub mod point_cloud;
pub mod robust;
pub mod runtime;

pub use descriptor::{Descriptor, FeatureCloud, FeatureEstimator};
pub use error::{Error, Result};
pub use geometry::{transform_from_parts, transform_magnitude, Plane, Transform};
pub use point_cloud::PointCloud;
pub use robust::{Ransac, RobustConfig, RobustModel, RobustResult};
pub use runtime::{current_cpu_threads, init_global_thread_pool};
