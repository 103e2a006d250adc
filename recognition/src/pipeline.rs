//! Scene → plane → clusters → coarse alignment → refinement.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use objrec_core::{FeatureEstimator, PointCloud, Result};
use objrec_point_cloud::{ClusterSegmenter, PlaneExtraction, PlaneExtractor, PlaneOutcome};

use crate::config::{NoPlanePolicy, RecognitionConfig};
use crate::library::{TemplateLibrary, TemplateSource};
use crate::matching::{CoarseAligner, ObjectPose, Refiner};
use crate::report::{Diagnostic, RecognitionReport};
use crate::viewer::CloudViewer;

type ClusterOutcome = (Option<ObjectPose>, Vec<Diagnostic>);

/// Recognizes library templates in scene point clouds.
///
/// The pipeline is immutable once built; `recognize` may be called from any
/// number of threads at once.
pub struct RecognitionPipeline {
    library: Arc<TemplateLibrary>,
    estimator: Arc<dyn FeatureEstimator>,
    config: RecognitionConfig,
    plane: PlaneExtractor,
    segmenter: ClusterSegmenter,
    aligner: CoarseAligner,
    refiner: Refiner,
    viewer: Option<Arc<dyn CloudViewer>>,
}

impl RecognitionPipeline {
    pub fn new(
        library: Arc<TemplateLibrary>,
        estimator: Arc<dyn FeatureEstimator>,
        config: RecognitionConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            plane: PlaneExtractor::new(config.plane.clone()),
            segmenter: ClusterSegmenter::new(config.cluster.clone()),
            aligner: CoarseAligner::new(config.coarse.clone()),
            refiner: Refiner::new(config.icp.clone()),
            library,
            estimator,
            config,
            viewer: None,
        })
    }

    /// Build the template library from `source` with the pipeline's own
    /// estimator. Fails with `Error::InputUnavailable` when the corpus cannot
    /// be read.
    pub fn from_source(
        source: &dyn TemplateSource,
        estimator: Arc<dyn FeatureEstimator>,
        config: RecognitionConfig,
    ) -> Result<Self> {
        let library = TemplateLibrary::load(source, estimator.as_ref())?;
        Self::new(Arc::new(library), estimator, config)
    }

    pub fn with_viewer(mut self, viewer: Arc<dyn CloudViewer>) -> Self {
        self.viewer = Some(viewer);
        self
    }

    pub fn library(&self) -> &TemplateLibrary {
        &self.library
    }

    pub fn config(&self) -> &RecognitionConfig {
        &self.config
    }

    /// One pose per recognized cluster, in cluster order (largest first).
    pub fn recognize(&self, scene: &PointCloud) -> Vec<ObjectPose> {
        self.recognize_with_report(scene).poses
    }

    pub fn recognize_with_report(&self, scene: &PointCloud) -> RecognitionReport {
        let mut report = RecognitionReport::default();
        if scene.normals.is_some() && scene.valid_normals().is_none() {
            warn!(points = scene.len(), "scene normal count does not match point count, ignoring normals");
        }

        let mut rng = self.stage_rng(0);
        let PlaneExtraction { outcome, clipped, objects } =
            self.plane.extract_objects_above_plane(scene, &mut rng);

        let objects = match outcome {
            PlaneOutcome::Found { plane, .. } => {
                report.plane = Some(plane);
                objects
            }
            PlaneOutcome::NotFound { best_inliers } => {
                warn!(best_inliers, policy = ?self.config.no_plane_policy, "no supporting plane");
                report.diagnostics.push(Diagnostic::NoPlaneFound { best_inliers });
                match self.config.no_plane_policy {
                    NoPlanePolicy::FallbackToScene => clipped,
                    NoPlanePolicy::ReturnEmpty => return report,
                }
            }
            PlaneOutcome::DegenerateHull { .. } => {
                warn!(policy = ?self.config.no_plane_policy, "degenerate plane hull");
                report.diagnostics.push(Diagnostic::DegenerateHull);
                match self.config.no_plane_policy {
                    NoPlanePolicy::FallbackToScene => clipped,
                    NoPlanePolicy::ReturnEmpty => return report,
                }
            }
        };
        self.show(&objects, "objects");

        let clusters = self.segmenter.extract_clusters(&objects);
        report.clusters = clusters.len();
        if clusters.is_empty() {
            debug!(points = objects.len(), "no clusters");
            report.diagnostics.push(Diagnostic::NoClustersFound);
            return report;
        }
        for (i, cluster) in clusters.iter().enumerate() {
            self.show(cluster, &format!("cluster {i}"));
        }

        let outcomes: Vec<ClusterOutcome> = if self.config.parallel {
            clusters
                .into_par_iter()
                .enumerate()
                .map(|(i, cluster)| self.process_cluster(i, cluster))
                .collect()
        } else {
            clusters
                .into_iter()
                .enumerate()
                .map(|(i, cluster)| self.process_cluster(i, cluster))
                .collect()
        };

        for (pose, diagnostics) in outcomes {
            report.poses.extend(pose.filter(|p| p.score.is_finite()));
            report.diagnostics.extend(diagnostics);
        }

        info!(
            scene = scene.len(),
            plane = report.plane_found(),
            clusters = report.clusters,
            recognized = report.poses.len(),
            "recognition finished"
        );
        report
    }

    /// Descriptors, coarse match and refinement for one cluster. Mirrors
    /// `ClusterSegmenter::segment` per cluster but keeps failures as
    /// diagnostics under the cluster's index.
    fn process_cluster(&self, index: usize, cluster: PointCloud) -> ClusterOutcome {
        let mut rng = self.stage_rng(index as u64 + 1);

        let features = match self.estimator.compute_feature_cloud(cluster) {
            Ok(features) => features,
            Err(e) => {
                warn!(cluster = index, error = %e, "feature estimation failed");
                let diagnostic = Diagnostic::FeatureEstimationFailed {
                    cluster: index,
                    reason: e.to_string(),
                };
                return (None, vec![diagnostic]);
            }
        };

        let Some(coarse) = self.aligner.match_best(&features, &self.library, &mut rng) else {
            debug!(cluster = index, "no template match");
            return (None, vec![Diagnostic::NoTemplateMatch { cluster: index }]);
        };
        let Some(template) = self.library.get(coarse.template.index) else {
            return (Some(coarse), Vec::new());
        };

        let refinement = self.refiner.refine(template.cloud(), features.cloud(), coarse);
        let mut diagnostics = Vec::new();
        if !refinement.converged {
            diagnostics.push(Diagnostic::RefinementDidNotConverge {
                cluster: index,
                template: refinement.pose.template.clone(),
            });
        }
        debug!(
            cluster = index,
            template = %refinement.pose.template,
            score = refinement.pose.score,
            "cluster recognized"
        );
        (Some(refinement.pose), diagnostics)
    }

    /// Stage 0 is the plane fit, stage `i + 1` is cluster `i`.
    fn stage_rng(&self, stage: u64) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(stage)),
            None => StdRng::from_entropy(),
        }
    }

    fn show(&self, cloud: &PointCloud, label: &str) {
        if let Some(viewer) = &self.viewer {
            viewer.show(cloud, label);
        }
    }
}
