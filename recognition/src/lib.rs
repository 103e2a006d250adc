//! Template-based object recognition
//!
//! - `RecognitionPipeline`: plane extraction, clustering, SAC-IA matching
//!   against a `TemplateLibrary` and ICP refinement
//! - `RecognitionConfig`: every tuning parameter, loadable from JSON
//! - `RecognitionReport`: poses plus the recoverable conditions met on the way

pub mod config;
pub mod library;
pub mod matching;
pub mod pipeline;
pub mod report;
pub mod viewer;

pub use config::{NoPlanePolicy, RecognitionConfig};
pub use library::{InMemorySource, Template, TemplateId, TemplateLibrary, TemplateSource};
pub use matching::{CoarseAligner, ObjectPose, Refinement, Refiner};
pub use pipeline::RecognitionPipeline;
pub use report::{Diagnostic, RecognitionReport};
pub use viewer::{CloudViewer, LogViewer};
