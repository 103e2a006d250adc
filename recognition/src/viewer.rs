//! Debug inspection of intermediate point sets.

use tracing::info;

use objrec_core::PointCloud;

/// Receives intermediate clouds for inspection. Interactive implementations
/// may block until the view is dismissed; the pipeline only calls a viewer
/// when one is attached.
pub trait CloudViewer: Send + Sync {
    fn show(&self, cloud: &PointCloud, label: &str);
}

/// Logs a one-line summary per cloud instead of rendering it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogViewer;

impl CloudViewer for LogViewer {
    fn show(&self, cloud: &PointCloud, label: &str) {
        match cloud.bounds() {
            Some((min, max)) => info!(
                label,
                points = cloud.len(),
                min = ?[min.x, min.y, min.z],
                max = ?[max.x, max.y, max.z],
                "cloud"
            ),
            None => info!(label, points = 0, "cloud"),
        }
    }
}
