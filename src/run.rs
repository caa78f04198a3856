//! Run entry points: PDF → script → prompts → images.
//!
//! Stages run strictly in order. Extraction, empty-content and script
//! failures end the run with `Err` before any later (paid) call is made.
//! A prompt request that fails degrades to a placeholder prompt, but a reply
//! holding no prompts at all stops the run before any image is requested.
//! Image failures are recorded per slot.

use crate::config::PipelineConfig;
use crate::error::{BlogClipError, GenerationError};
use crate::export::{self, ExportPaths};
use crate::output::{ImagePrompt, ImageResult, RunBundle, RunOutput, RunStats};
use crate::pipeline::extract::{self, PdfTextSource, PdfiumTextSource};
use crate::pipeline::imagegen::{ImageGenerator, OpenAiImageClient};
use crate::pipeline::llm::{LlmTextGenerator, TextGenerator};
use crate::pipeline::pacing::{FixedInterval, Pacer};
use crate::pipeline::retry::RetryPolicy;
use crate::pipeline::{images, input, scenes, script};
use crate::progress::{NoopProgressCallback, ProgressCallback, Stage};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Run the whole pipeline on a local PDF path or an HTTP(S) URL.
///
/// # Errors
/// Returns `Err(BlogClipError)` only for fatal errors:
/// - File not found / permission denied / download failure
/// - Text could not be extracted from the PDF
/// - The document has no text
/// - The script request failed
/// - The prompt reply held no prompts
///
/// Failed images are reported inside the returned bundle; use
/// [`RunOutput::into_result`] to treat them as an error.
pub async fn run(
    input_str: impl AsRef<str>,
    config: &PipelineConfig,
) -> Result<RunOutput, BlogClipError> {
    let input_str = input_str.as_ref();
    info!("Starting run: {}", input_str);
    let bytes = input::resolve_input(input_str, config.download_timeout_secs).await?;
    run_from_bytes(bytes, config).await
}

/// Run the whole pipeline on PDF bytes already in memory.
///
/// # Example
/// ```rust,no_run
/// use blogclip::{run_from_bytes, PipelineConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("lecture.pdf")?;
/// let output = run_from_bytes(bytes, &PipelineConfig::default()).await?;
/// println!("{}", output.bundle.script);
/// # Ok(())
/// # }
/// ```
pub async fn run_from_bytes(
    bytes: impl Into<Vec<u8>>,
    config: &PipelineConfig,
) -> Result<RunOutput, BlogClipError> {
    let total_start = Instant::now();
    let progress: ProgressCallback = config
        .progress_callback
        .clone()
        .unwrap_or_else(|| Arc::new(NoopProgressCallback));
    let policy = RetryPolicy::from_config(config);
    let mut stats = RunStats::default();
    let mut notices = Vec::new();

    // ── Step 1: Extract text ─────────────────────────────────────────────
    progress.on_stage_start(Stage::ExtractText);
    let step_start = Instant::now();
    let source = pdf_source(config);
    let text = extract::extract_text(source, bytes.into()).await?;
    stats.pdf_pages = text.page_count();
    stats.text_chars = text.as_str().chars().count();
    stats.extract_duration_ms = step_start.elapsed().as_millis() as u64;
    progress.on_stage_complete(Stage::ExtractText);

    // ── Step 2: Generate script ──────────────────────────────────────────
    progress.on_stage_start(Stage::GenerateScript);
    let step_start = Instant::now();
    let text_generator = text_generator(config);
    let (script, usage) = script::generate_script(
        text_generator.as_ref(),
        text.as_str(),
        config.target_length,
        config.model,
        &policy,
    )
    .await?;
    stats.script_chars = script.as_str().chars().count();
    stats.script_pages = script.pages().len();
    stats.total_input_tokens += usage.input_tokens;
    stats.total_output_tokens += usage.output_tokens;
    stats.script_duration_ms = step_start.elapsed().as_millis() as u64;
    progress.on_stage_complete(Stage::GenerateScript);

    // ── Step 3: Extract image prompts ────────────────────────────────────
    progress.on_stage_start(Stage::ExtractPrompts);
    let step_start = Instant::now();
    let extraction =
        scenes::extract_prompts(text_generator.as_ref(), &script, config.model, &policy).await;
    if let Some(notice) = extraction.notice {
        progress.on_notice(Stage::ExtractPrompts, &notice);
        notices.push(notice);
    }
    stats.prompt_count = extraction.prompts.len();
    stats.prompt_source = extraction.source;
    stats.total_input_tokens += extraction.usage.input_tokens;
    stats.total_output_tokens += extraction.usage.output_tokens;
    stats.prompts_duration_ms = step_start.elapsed().as_millis() as u64;
    progress.on_stage_complete(Stage::ExtractPrompts);
    if extraction.prompts.is_empty() {
        warn!("No image prompts for a {}-char script", stats.script_chars);
        return Err(BlogClipError::PromptGenerationFailed);
    }

    // ── Step 4: Render images ────────────────────────────────────────────
    progress.on_stage_start(Stage::RenderImages);
    let step_start = Instant::now();
    let results = render_step(
        image_generator(config),
        &extraction.prompts,
        config,
        &progress,
        &mut notices,
    )
    .await;
    stats.images_duration_ms = step_start.elapsed().as_millis() as u64;
    progress.on_stage_complete(Stage::RenderImages);

    // ── Step 5: Assemble ─────────────────────────────────────────────────
    let bundle = RunBundle {
        script,
        prompts: extraction.prompts,
        images: results,
    };
    stats.images_rendered = bundle.rendered_count();
    stats.images_failed = bundle.failed_count();
    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    progress.on_run_complete(bundle.images.len(), stats.images_rendered);
    info!(
        "Run complete: {} script chars, {} prompts, {}/{} images in {}ms",
        stats.script_chars,
        stats.prompt_count,
        stats.images_rendered,
        bundle.images.len(),
        stats.total_duration_ms
    );

    Ok(RunOutput {
        bundle,
        stats,
        notices,
    })
}

/// Run the pipeline and write the artifacts into `dir`.
///
/// With `save_images` set, every rendered image is also stored as
/// `scene_<n>.png`.
pub async fn run_to_dir(
    input_str: impl AsRef<str>,
    dir: impl AsRef<Path>,
    save_images: bool,
    config: &PipelineConfig,
) -> Result<(RunOutput, ExportPaths), BlogClipError> {
    let output = run(input_str, config).await?;
    let dir = dir.as_ref();
    let paths = export::write_artifacts(dir, &output.bundle).await?;
    if save_images {
        export::save_images(dir, &output.bundle, config.download_timeout_secs).await?;
    }
    Ok((output, paths))
}

/// Synchronous wrapper around [`run`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_sync(
    input_str: impl AsRef<str>,
    config: &PipelineConfig,
) -> Result<RunOutput, BlogClipError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| BlogClipError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run(input_str, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn pdf_source(config: &PipelineConfig) -> Arc<dyn PdfTextSource> {
    config
        .pdf_source
        .clone()
        .unwrap_or_else(|| Arc::new(PdfiumTextSource))
}

/// Render every prompt, or fail every slot when there is no image client.
/// Per-slot failures add one notice each; a missing client adds one in total.
async fn render_step(
    generator: Result<Arc<dyn ImageGenerator>, GenerationError>,
    prompts: &[ImagePrompt],
    config: &PipelineConfig,
    progress: &ProgressCallback,
    notices: &mut Vec<String>,
) -> Vec<ImageResult> {
    match generator {
        Ok(generator) => {
            let pacer = pacer(config);
            let results =
                images::render_images(generator.as_ref(), pacer.as_ref(), prompts, config, progress)
                    .await;
            for (idx, result) in results.iter().enumerate() {
                if let Some(ref err) = result.error {
                    notices.push(format!("이미지 {} 생성 실패: {err}", idx + 1));
                }
            }
            results
        }
        Err(e) => {
            warn!("Image generation unavailable: {}", e);
            let notice = format!("이미지 생성 오류: {e}");
            progress.on_notice(Stage::RenderImages, &notice);
            notices.push(notice);
            prompts
                .iter()
                .map(|p| ImageResult::failed(p.as_str(), e.clone()))
                .collect()
        }
    }
}

fn text_generator(config: &PipelineConfig) -> Arc<dyn TextGenerator> {
    config
        .text_generator
        .clone()
        .unwrap_or_else(|| Arc::new(LlmTextGenerator::from_config(config)))
}

fn image_generator(
    config: &PipelineConfig,
) -> Result<Arc<dyn ImageGenerator>, GenerationError> {
    match config.image_generator {
        Some(ref generator) => Ok(Arc::clone(generator)),
        None => Ok(Arc::new(OpenAiImageClient::from_env(config)?)),
    }
}

fn pacer(config: &PipelineConfig) -> Arc<dyn Pacer> {
    config
        .pacer
        .clone()
        .unwrap_or_else(|| Arc::new(FixedInterval::from_millis(config.pace_ms)))
}
