//! Global Registration
//!
//! SAC-IA (sample consensus initial alignment): repeatedly sample a few
//! source points, pair each with one of its descriptor-nearest target
//! points, solve the rigid transform, and keep the hypothesis with the
//! lowest capped fitness. Needs no initial pose.

use nalgebra::Point3;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use objrec_core::{Descriptor, FeatureCloud, Transform};
use objrec_point_cloud::PointIndex;

use super::{capped_fitness, estimate_rigid_transform};

/// Attempts per sample slot before the minimum spacing is given up.
const MAX_SAMPLE_ATTEMPTS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoarseAlignConfig {
    /// Minimum distance between the source points of one hypothesis.
    pub min_sample_distance: f32,
    /// Cap on squared nearest-neighbour distances when scoring (1e-4 is 1 cm).
    pub max_correspondence_distance: f32,
    pub max_iterations: usize,
    /// Source points per hypothesis.
    pub num_samples: usize,
    /// Each sample is paired with a random one of this many
    /// descriptor-nearest target points.
    pub k_correspondences: usize,
}

impl Default for CoarseAlignConfig {
    fn default() -> Self {
        Self {
            min_sample_distance: 0.05,
            max_correspondence_distance: 1e-4,
            max_iterations: 500,
            num_samples: 3,
            k_correspondences: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CoarseAlignment {
    /// Maps source (template) space into target (scene) space.
    pub transform: Transform,
    /// Capped mean squared residual, lower is better.
    pub fitness: f32,
}

/// Align `source` onto `target`. `target_index` must be built over
/// `target.cloud().points`.
///
/// Returns `None` when no hypothesis could be formed: too few points,
/// incompatible descriptors, or every sample was degenerate.
pub fn sample_consensus_initial_alignment<R: Rng + ?Sized>(
    source: &FeatureCloud,
    target: &FeatureCloud,
    target_index: &PointIndex,
    config: &CoarseAlignConfig,
    rng: &mut R,
) -> Option<CoarseAlignment> {
    let num_samples = config.num_samples.max(3);
    if source.len() < num_samples || target.len() < 3 {
        return None;
    }
    if source.descriptor_len() != target.descriptor_len() {
        return None;
    }

    let source_points = &source.cloud().points;
    let target_points = &target.cloud().points;
    let k = config.k_correspondences.max(1);
    let mut matches: Vec<Option<Vec<usize>>> = vec![None; source.len()];

    let mut best: Option<CoarseAlignment> = None;
    let mut src = Vec::with_capacity(num_samples);
    let mut dst = Vec::with_capacity(num_samples);

    for iteration in 0..config.max_iterations {
        let samples = select_samples(source_points, num_samples, config.min_sample_distance, rng);

        src.clear();
        dst.clear();
        for &s in &samples {
            let candidates = matches[s].get_or_insert_with(|| {
                nearest_descriptors(&source.descriptors()[s], target.descriptors(), k)
            });
            let Some(&t) = candidates.choose(rng) else {
                continue;
            };
            src.push(source_points[s]);
            dst.push(target_points[t]);
        }

        let Some(transform) = estimate_rigid_transform(&src, &dst) else {
            continue;
        };
        let Some(fitness) = capped_fitness(
            source_points,
            target_index,
            &transform,
            config.max_correspondence_distance,
        ) else {
            continue;
        };

        if best.as_ref().map_or(true, |b| fitness < b.fitness) {
            trace!(iteration, fitness, "sac-ia improved");
            best = Some(CoarseAlignment { transform, fitness });
        }
    }

    best
}

/// Random distinct indices whose points are pairwise at least
/// `min_distance` apart, falling back to any distinct indices when the
/// cloud is too small to satisfy the spacing.
fn select_samples<R: Rng + ?Sized>(
    points: &[Point3<f32>],
    count: usize,
    min_distance: f32,
    rng: &mut R,
) -> Vec<usize> {
    let min_sq = min_distance * min_distance;
    let mut samples: Vec<usize> = Vec::with_capacity(count);
    let mut attempts = 0;

    while samples.len() < count {
        let candidate = rng.gen_range(0..points.len());
        if samples.contains(&candidate) {
            continue;
        }
        let spaced = samples
            .iter()
            .all(|&s| (points[s] - points[candidate]).norm_squared() >= min_sq);
        if spaced || attempts >= MAX_SAMPLE_ATTEMPTS {
            samples.push(candidate);
            attempts = 0;
        } else {
            attempts += 1;
        }
    }
    samples
}

/// Indices of the `k` target descriptors closest to `query`, nearest first.
fn nearest_descriptors(query: &Descriptor, targets: &[Descriptor], k: usize) -> Vec<usize> {
    let mut scored: Vec<(f32, usize)> = targets
        .iter()
        .enumerate()
        .map(|(i, d)| (query.squared_distance(d), i))
        .filter(|(d, _)| d.is_finite())
        .collect();
    let k = k.min(scored.len());
    if k == 0 {
        return Vec::new();
    }
    if k < scored.len() {
        scored.select_nth_unstable_by(k - 1, |a, b| a.0.total_cmp(&b.0));
        scored.truncate(k);
    }
    scored.sort_by(|a, b| a.0.total_cmp(&b.0));
    scored.into_iter().map(|(_, i)| i).collect()
}
