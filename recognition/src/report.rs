//! What the pipeline saw while recognizing a scene.

use thiserror::Error;

use objrec_core::Plane;

use crate::library::TemplateId;
use crate::matching::ObjectPose;

/// Recoverable conditions met during recognition. None of these abort the
/// pipeline; they explain why a cluster produced no pose or why a pose kept
/// its coarse estimate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Diagnostic {
    #[error("no supporting plane (best candidate had {best_inliers} inliers)")]
    NoPlaneFound { best_inliers: usize },

    #[error("supporting plane inliers do not span a 2D hull")]
    DegenerateHull,

    #[error("no clusters within the size limits")]
    NoClustersFound,

    #[error("cluster {cluster}: feature estimation failed: {reason}")]
    FeatureEstimationFailed { cluster: usize, reason: String },

    #[error("cluster {cluster}: no template aligned")]
    NoTemplateMatch { cluster: usize },

    #[error("cluster {cluster}: refinement against {template} did not converge, keeping coarse pose")]
    RefinementDidNotConverge { cluster: usize, template: TemplateId },
}

#[derive(Debug, Clone, Default)]
pub struct RecognitionReport {
    /// One pose per matched cluster, in cluster order.
    pub poses: Vec<ObjectPose>,
    /// Supporting plane, when one was found.
    pub plane: Option<Plane>,
    /// Clusters that passed the size filter.
    pub clusters: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl RecognitionReport {
    pub fn plane_found(&self) -> bool {
        self.plane.is_some()
    }
}
