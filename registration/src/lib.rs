//! Point cloud registration algorithms
//!
//! This crate provides the rigid registration stages of template matching:
//! - SAC-IA (sample consensus initial alignment) driven by descriptors
//! - point-to-point ICP (Iterative Closest Point) refinement
//! - SVD rigid transform estimation and fitness metrics shared by both

pub mod registration;

pub use registration::{
    capped_fitness, estimate_rigid_transform, fitness_score,
};

pub use registration::global::{
    sample_consensus_initial_alignment, CoarseAlignConfig, CoarseAlignment,
};
pub use registration::icp::{
    registration_icp_point_to_point, registration_icp_point_to_point_with_index, IcpConfig,
    IcpResult,
};
