//! # blogclip
//!
//! Turn a PDF into a blog script, a handful of image prompts, and the images
//! to go with them.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    read local file or download from URL
//!  ├─ 2. Extract  page text via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 3. Script   one LLM call → "# 페이지 제목: / ## 페이지 스크립트:" units
//!  ├─ 4. Scenes   one LLM call → JSON array of ≤ 5 image prompts
//!  ├─ 5. Images   one image call per prompt, style suffix appended, paced
//!  └─ 6. Output   script + prompts + image URLs, exportable as files
//! ```
//!
//! Failures before the script is written end the run. After that nothing
//! is fatal: a failed prompt request degrades to a placeholder prompt and a
//! failed image leaves an empty slot in the results.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use blogclip::{run, PipelineConfig, StyleId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Text provider auto-detected from OPENAI_API_KEY / EDGEQUAKE_LLM_PROVIDER
//!     let config = PipelineConfig::builder()
//!         .target_length(1200)
//!         .style(StyleId::Watercolor)
//!         .build()?;
//!     let output = run("lecture.pdf", &config).await?;
//!     println!("{}", output.bundle.script);
//!     for image in &output.bundle.images {
//!         println!("{} -> {:?}", image.prompt, image.url);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `blogclip` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! blogclip = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod export;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod run;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ImageSize, ModelId, PipelineConfig, PipelineConfigBuilder, StyleId, MAX_SCENES};
pub use error::{BlogClipError, ExtractionError, GenerationError};
pub use export::{save_images, write_artifacts, ExportPaths};
pub use output::{
    DocumentText, ImagePrompt, ImageResult, PromptSource, RunBundle, RunOutput, RunStats, Script,
    ScriptPage,
};
pub use pipeline::extract::PdfTextSource;
pub use pipeline::imagegen::{ImageGenerator, ImageRequest, OpenAiImageClient};
pub use pipeline::llm::{Completion, LlmTextGenerator, TextGenerator};
pub use pipeline::pacing::{FixedInterval, NoPacing, Pacer};
pub use progress::{NoopProgressCallback, ProgressCallback, RunProgressCallback, Stage};
pub use run::{run, run_from_bytes, run_sync, run_to_dir};
pub use session::{RunState, Session};
