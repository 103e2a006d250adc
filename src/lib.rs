pub use objrec_core as core;
pub use objrec_point_cloud as point_cloud;
pub use objrec_recognition as recognition;
pub use objrec_registration as registration;

pub use objrec_recognition::{
    ObjectPose, RecognitionConfig, RecognitionPipeline, RecognitionReport, TemplateLibrary,
};

/// Initialize a single global Rayon thread pool for cluster-parallel
/// recognition.
///
/// Call this once at application startup before the first `recognize`.
/// Repeated calls are idempotent and return the first initialization result.
///
/// Priority order:
/// 1. explicit `num_threads`
/// 2. `OBJREC_CPU_THREADS` env var
/// 3. Rayon default
pub fn init_thread_pool(num_threads: Option<usize>) -> objrec_core::Result<()> {
    objrec_core::init_global_thread_pool(num_threads)
}
