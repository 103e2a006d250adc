//! Per-cluster matching: best template by SAC-IA, then ICP refinement.

use rand::Rng;
use tracing::{debug, trace, warn};

use objrec_core::{FeatureCloud, PointCloud, Transform};
use objrec_point_cloud::PointIndex;
use objrec_registration::{
    registration_icp_point_to_point_with_index, sample_consensus_initial_alignment,
    CoarseAlignConfig, IcpConfig,
};

use crate::library::{TemplateId, TemplateLibrary};

/// A recognized object instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectPose {
    /// Maps template coordinates into scene coordinates.
    pub transform: Transform,
    /// Mean squared registration residual; lower is better, always finite.
    pub score: f32,
    pub template: TemplateId,
}

pub struct CoarseAligner {
    config: CoarseAlignConfig,
}

impl CoarseAligner {
    pub fn new(config: CoarseAlignConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CoarseAlignConfig {
        &self.config
    }

    /// Align every template (source) onto `candidate` (target) and keep the
    /// lowest fitness. Ties keep the template seen first.
    ///
    /// `None` when the library is empty or no template produced a finite
    /// score.
    pub fn match_best<R: Rng + ?Sized>(
        &self,
        candidate: &FeatureCloud,
        library: &TemplateLibrary,
        rng: &mut R,
    ) -> Option<ObjectPose> {
        if candidate.is_empty() || library.is_empty() {
            return None;
        }
        let index = PointIndex::new(&candidate.cloud().points);

        library.iter().fold(None, |best: Option<ObjectPose>, template| {
            let alignment = sample_consensus_initial_alignment(
                template.features(),
                candidate,
                &index,
                &self.config,
                rng,
            );
            let Some(alignment) = alignment.filter(|a| a.fitness.is_finite()) else {
                trace!(template = %template.id(), "no alignment");
                return best;
            };
            debug!(template = %template.id(), fitness = alignment.fitness, "coarse alignment");
            match best {
                Some(b) if b.score <= alignment.fitness => Some(b),
                _ => Some(ObjectPose {
                    transform: alignment.transform,
                    score: alignment.fitness,
                    template: template.id().clone(),
                }),
            }
        })
    }
}

#[derive(Debug, Clone)]
pub struct Refinement {
    pub pose: ObjectPose,
    pub converged: bool,
    pub iterations: usize,
}

pub struct Refiner {
    config: IcpConfig,
}

impl Refiner {
    pub fn new(config: IcpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IcpConfig {
        &self.config
    }

    /// Refine `initial` by point-to-point ICP of `template` onto `candidate`.
    ///
    /// A converged run replaces the transform and score. Otherwise the
    /// coarse pose is returned untouched and a warning is logged.
    pub fn refine(&self, template: &PointCloud, candidate: &PointCloud, initial: ObjectPose) -> Refinement {
        let index = PointIndex::new(&candidate.points);
        let icp = registration_icp_point_to_point_with_index(
            template,
            candidate,
            &index,
            &initial.transform,
            &self.config,
        );

        if icp.converged && icp.fitness.is_finite() {
            debug!(
                template = %initial.template,
                coarse = initial.score,
                refined = icp.fitness,
                iterations = icp.num_iterations,
                "icp converged"
            );
            return Refinement {
                pose: ObjectPose {
                    transform: icp.transformation,
                    score: icp.fitness,
                    template: initial.template,
                },
                converged: true,
                iterations: icp.num_iterations,
            };
        }

        warn!(
            template = %initial.template,
            iterations = icp.num_iterations,
            "icp did not converge, keeping coarse pose"
        );
        Refinement {
            pose: initial,
            converged: false,
            iterations: icp.num_iterations,
        }
    }
}
