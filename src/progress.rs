//! Progress-callback trait for stage and per-image events.
//!
//! Inject an [`Arc<dyn RunProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as the run moves through its stages and renders each image.
//!
//! Callers can forward events to a terminal progress bar, a channel, or a
//! log without the library knowing how the host application reports
//! progress. Events are an observability hook only; the run's results never
//! depend on them.
//!
//! # Example
//!
//! ```rust
//! use blogclip::{PipelineConfig, RunProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     rendered: AtomicUsize,
//! }
//!
//! impl RunProgressCallback for CountingCallback {
//!     fn on_image_complete(&self, index: usize, total: usize) {
//!         let done = self.rendered.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("image {}/{} ready ({done} so far)", index + 1, total);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { rendered: AtomicUsize::new(0) });
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(counter as Arc<dyn RunProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::fmt;
use std::sync::Arc;

/// The four stages of a run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ExtractText,
    GenerateScript,
    ExtractPrompts,
    RenderImages,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::ExtractText => "extracting text",
            Stage::GenerateScript => "generating blog script",
            Stage::ExtractPrompts => "generating image prompts",
            Stage::RenderImages => "rendering images",
        })
    }
}

/// Called by the pipeline as it runs.
///
/// Implementations must be `Send + Sync`: with `image_concurrency > 1` the
/// per-image methods may be called from several tasks. All methods have
/// default no-op implementations so callers only override what they need.
pub trait RunProgressCallback: Send + Sync {
    /// Called when a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finishes, successfully or with a recovered failure.
    fn on_stage_complete(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called with a readable message whenever a failure was recovered
    /// (placeholder prompts, a failed image).
    fn on_notice(&self, stage: Stage, message: &str) {
        let _ = (stage, message);
    }

    /// Called just before image `index` (0-based) is requested.
    fn on_image_start(&self, index: usize, total: usize) {
        let _ = (index, total);
    }

    /// Called when image `index` rendered successfully.
    fn on_image_complete(&self, index: usize, total: usize) {
        let _ = (index, total);
    }

    /// Called when image `index` failed after all retries.
    fn on_image_error(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// Called once after the image stage with the number of successful images.
    fn on_run_complete(&self, total_images: usize, success_count: usize) {
        let _ = (total_images, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl RunProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn RunProgressCallback>;
