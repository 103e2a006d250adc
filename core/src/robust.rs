//! Robust Estimation Module
//!
//! Generic RANSAC engine used for model fitting under outliers. The random
//! source is passed in by the caller so runs are reproducible with a seeded
//! generator.

use rand::seq::index;
use rand::Rng;
use std::marker::PhantomData;

/// Configuration for robust estimation
#[derive(Debug, Clone)]
pub struct RobustConfig {
    pub threshold: f64,
    pub max_iterations: usize,
    /// Stop early once this fraction of the data are inliers.
    pub confidence: f64,
}

impl Default for RobustConfig {
    fn default() -> Self {
        Self {
            threshold: 1.0,
            max_iterations: 1000,
            confidence: 0.99,
        }
    }
}

/// Result of robust estimation
#[derive(Debug, Clone)]
pub struct RobustResult<M> {
    pub model: Option<M>,
    pub inliers: Vec<bool>,
    pub num_inliers: usize,
    pub residual: f64,
}

impl<M> RobustResult<M> {
    fn empty(n: usize) -> Self {
        Self {
            model: None,
            inliers: vec![false; n],
            num_inliers: 0,
            residual: f64::INFINITY,
        }
    }

    pub fn inlier_indices(&self) -> Vec<usize> {
        self.inliers
            .iter()
            .enumerate()
            .filter(|(_, &is_inlier)| is_inlier)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Trait for models that can be estimated robustly
pub trait RobustModel<D> {
    type Model: Clone;

    /// Minimum number of data points required to estimate the model
    fn min_sample_size(&self) -> usize;

    /// Estimate model from a minimal sample
    fn estimate(&self, data: &[&D]) -> Option<Self::Model>;

    /// Compute error for a single data point against the model
    fn compute_error(&self, model: &Self::Model, data: &D) -> f64;
}

/// Generic RANSAC engine
pub struct Ransac<D, M: RobustModel<D>> {
    config: RobustConfig,
    _phantom: PhantomData<(D, M)>,
}

impl<D, M: RobustModel<D>> Ransac<D, M> {
    pub fn new(config: RobustConfig) -> Self {
        Self {
            config,
            _phantom: PhantomData,
        }
    }

    /// Keep the hypothesis with the most inliers; ties go to the lower mean
    /// inlier error, then to the earlier hypothesis.
    pub fn run<R: Rng + ?Sized>(&self, estimator: &M, data: &[D], rng: &mut R) -> RobustResult<M::Model> {
        let n = data.len();
        let k = estimator.min_sample_size();

        if n < k || k == 0 {
            return RobustResult::empty(n);
        }

        let mut best = RobustResult::empty(n);

        for _ in 0..self.config.max_iterations {
            let sample: Vec<&D> = index::sample(rng, n, k).iter().map(|i| &data[i]).collect();

            let Some(model) = estimator.estimate(&sample) else {
                continue;
            };

            let mut inliers = vec![false; n];
            let mut num_inliers = 0;
            let mut total_error = 0.0;

            for (j, d) in data.iter().enumerate() {
                let err = estimator.compute_error(&model, d);
                if err < self.config.threshold {
                    inliers[j] = true;
                    num_inliers += 1;
                    total_error += err;
                }
            }

            let residual = if num_inliers > 0 {
                total_error / num_inliers as f64
            } else {
                f64::INFINITY
            };

            if num_inliers > best.num_inliers
                || (num_inliers == best.num_inliers && num_inliers > 0 && residual < best.residual)
            {
                best = RobustResult {
                    model: Some(model),
                    inliers,
                    num_inliers,
                    residual,
                };

                if num_inliers as f64 > n as f64 * self.config.confidence {
                    break;
                }
            }
        }

        best
    }
}
