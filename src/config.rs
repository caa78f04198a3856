//! Configuration types for a PDF-to-blog run.
//!
//! All run behaviour is controlled through [`PipelineConfig`], built via its
//! [`PipelineConfigBuilder`]. Every knob the presentation layer exposes
//! (script length, style, model) lives here next to the retry, pacing and
//! timeout policies, so a whole run can be described by one value.
//!
//! Remote capabilities can be injected (`text_generator`, `image_generator`,
//! `pdf_source`, `pacer`); when absent the run resolves the default
//! edgequake-llm / OpenAI Images / PDFium implementations.

use crate::error::BlogClipError;
use crate::pipeline::extract::PdfTextSource;
use crate::pipeline::imagegen::ImageGenerator;
use crate::pipeline::llm::TextGenerator;
use crate::pipeline::pacing::Pacer;
use crate::progress::ProgressCallback;
use crate::prompts;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Hard upper bound on scenes (prompts and images) per run.
pub const MAX_SCENES: usize = 5;

/// Inclusive bounds for the requested script length in characters.
pub const MIN_TARGET_LENGTH: usize = 100;
pub const MAX_TARGET_LENGTH: usize = 3000;

/// Configuration for one PDF-to-blog run.
///
/// Built via [`PipelineConfig::builder()`] or using
/// [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use blogclip::{ModelId, PipelineConfig, StyleId};
///
/// let config = PipelineConfig::builder()
///     .target_length(1500)
///     .model(ModelId::Gpt4)
///     .style(StyleId::Watercolor)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Approximate script length in characters. Range: 100–3000. Default: 1000.
    pub target_length: usize,

    /// Text model used for both the script and the image-prompt requests.
    pub model: ModelId,

    /// Visual style appended to every image prompt.
    pub style: StyleId,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None, resolved from the environment.
    pub provider_name: Option<String>,

    /// Image-generation model. Default: "dall-e-3".
    pub image_model: String,

    /// Requested image resolution. Default: 1024×1024.
    pub image_size: ImageSize,

    /// Number of image requests allowed in flight at once. Default: 1.
    ///
    /// Results stay in prompt order whatever this is set to; the pacer still
    /// spaces call starts, so raising it only overlaps slow responses.
    pub image_concurrency: usize,

    /// Minimum spacing between image-call starts in milliseconds. Default: 1000.
    pub pace_ms: u64,

    /// Sampling temperature for the text requests. Default: 0.7.
    pub temperature: f32,

    /// Maximum tokens the text model may generate per request. Default: 4096.
    pub max_tokens: usize,

    /// Retry attempts on a retryable remote failure. Default: 2.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-remote-call timeout in seconds. Default: 120.
    ///
    /// Image generation regularly takes 15–30 s; the default leaves room for
    /// a slow provider without hanging forever on a dead connection.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Pre-constructed text generator. Takes precedence over `provider_name`.
    pub text_generator: Option<Arc<dyn TextGenerator>>,

    /// Pre-constructed image generator. Default: OpenAI Images API.
    pub image_generator: Option<Arc<dyn ImageGenerator>>,

    /// Pre-constructed PDF text source. Default: PDFium.
    pub pdf_source: Option<Arc<dyn PdfTextSource>>,

    /// Pacer for image calls. Default: fixed interval of `pace_ms`.
    pub pacer: Option<Arc<dyn Pacer>>,

    /// Receives stage and per-image progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_length: 1000,
            model: ModelId::default(),
            style: StyleId::default(),
            provider_name: None,
            image_model: "dall-e-3".to_string(),
            image_size: ImageSize::default(),
            image_concurrency: 1,
            pace_ms: 1000,
            temperature: 0.7,
            max_tokens: 4096,
            max_retries: 2,
            retry_backoff_ms: 500,
            api_timeout_secs: 120,
            download_timeout_secs: 120,
            text_generator: None,
            image_generator: None,
            pdf_source: None,
            pacer: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("target_length", &self.target_length)
            .field("model", &self.model)
            .field("style", &self.style)
            .field("provider_name", &self.provider_name)
            .field("image_model", &self.image_model)
            .field("image_size", &self.image_size)
            .field("image_concurrency", &self.image_concurrency)
            .field("pace_ms", &self.pace_ms)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field(
                "text_generator",
                &self.text_generator.as_ref().map(|_| "<dyn TextGenerator>"),
            )
            .field(
                "image_generator",
                &self.image_generator.as_ref().map(|_| "<dyn ImageGenerator>"),
            )
            .field("pdf_source", &self.pdf_source.as_ref().map(|_| "<dyn PdfTextSource>"))
            .field("pacer", &self.pacer.as_ref().map(|_| "<dyn Pacer>"))
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn target_length(mut self, chars: usize) -> Self {
        self.config.target_length = chars.clamp(MIN_TARGET_LENGTH, MAX_TARGET_LENGTH);
        self
    }

    pub fn model(mut self, model: ModelId) -> Self {
        self.config.model = model;
        self
    }

    pub fn style(mut self, style: StyleId) -> Self {
        self.config.style = style;
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn image_model(mut self, model: impl Into<String>) -> Self {
        self.config.image_model = model.into();
        self
    }

    pub fn image_size(mut self, size: ImageSize) -> Self {
        self.config.image_size = size;
        self
    }

    pub fn image_concurrency(mut self, n: usize) -> Self {
        self.config.image_concurrency = n.clamp(1, MAX_SCENES);
        self
    }

    pub fn pace_ms(mut self, ms: u64) -> Self {
        self.config.pace_ms = ms;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn text_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.config.text_generator = Some(generator);
        self
    }

    pub fn image_generator(mut self, generator: Arc<dyn ImageGenerator>) -> Self {
        self.config.image_generator = Some(generator);
        self
    }

    pub fn pdf_source(mut self, source: Arc<dyn PdfTextSource>) -> Self {
        self.config.pdf_source = Some(source);
        self
    }

    pub fn pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.config.pacer = Some(pacer);
        self
    }

    pub fn progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.config.progress_callback = Some(callback);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, BlogClipError> {
        let c = &self.config;
        if !(MIN_TARGET_LENGTH..=MAX_TARGET_LENGTH).contains(&c.target_length) {
            return Err(BlogClipError::InvalidConfig(format!(
                "Script length must be {MIN_TARGET_LENGTH}–{MAX_TARGET_LENGTH} characters, got {}",
                c.target_length
            )));
        }
        if c.image_concurrency == 0 {
            return Err(BlogClipError::InvalidConfig(
                "Image concurrency must be ≥ 1".into(),
            ));
        }
        if c.image_model.trim().is_empty() {
            return Err(BlogClipError::InvalidConfig(
                "Image model must not be empty".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(BlogClipError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Text-generation model offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ModelId {
    #[serde(rename = "gpt-3.5-turbo")]
    Gpt35Turbo,
    #[serde(rename = "gpt-4")]
    Gpt4,
    /// Default.
    #[default]
    #[serde(rename = "gpt-4-turbo")]
    Gpt4Turbo,
}

impl ModelId {
    pub const ALL: [ModelId; 3] = [ModelId::Gpt35Turbo, ModelId::Gpt4, ModelId::Gpt4Turbo];

    /// Provider-facing model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::Gpt35Turbo => "gpt-3.5-turbo",
            ModelId::Gpt4 => "gpt-4",
            ModelId::Gpt4Turbo => "gpt-4-turbo",
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = BlogClipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ModelId::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                BlogClipError::InvalidConfig(format!(
                    "Unknown model '{wanted}' (expected gpt-3.5-turbo, gpt-4 or gpt-4-turbo)"
                ))
            })
    }
}

/// Visual style applied to every image prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StyleId {
    /// Hyper-realistic photograph. Default.
    #[default]
    Photorealistic,
    /// Soft, illustrated storybook look.
    Storybook,
    /// Delicate watercolor painting.
    Watercolor,
    /// Colorful 3D rendered scene.
    #[serde(rename = "3d-render")]
    Render3d,
    /// Clean, modern flat illustration.
    Illustration,
}

impl StyleId {
    pub const ALL: [StyleId; 5] = [
        StyleId::Photorealistic,
        StyleId::Storybook,
        StyleId::Watercolor,
        StyleId::Render3d,
        StyleId::Illustration,
    ];

    /// Stable identifier used on the command line and in JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            StyleId::Photorealistic => "photorealistic",
            StyleId::Storybook => "storybook",
            StyleId::Watercolor => "watercolor",
            StyleId::Render3d => "3d-render",
            StyleId::Illustration => "illustration",
        }
    }

    /// Korean label shown in the style picker.
    pub fn label(&self) -> &'static str {
        match self {
            StyleId::Photorealistic => "실사 스타일",
            StyleId::Storybook => "동화책 스타일",
            StyleId::Watercolor => "수채화 스타일",
            StyleId::Render3d => "3D 렌더링",
            StyleId::Illustration => "일러스트레이션",
        }
    }

    /// Instruction appended to each prompt before the image call.
    pub fn suffix(&self) -> &'static str {
        match self {
            StyleId::Photorealistic => prompts::STYLE_PHOTOREALISTIC,
            StyleId::Storybook => prompts::STYLE_STORYBOOK,
            StyleId::Watercolor => prompts::STYLE_WATERCOLOR,
            StyleId::Render3d => prompts::STYLE_3D_RENDER,
            StyleId::Illustration => prompts::STYLE_ILLUSTRATION,
        }
    }

    /// Resolve a user-facing style name, falling back to photorealistic.
    ///
    /// Accepts the identifiers from [`StyleId::as_str`], the Korean labels,
    /// and a few spelled-out English names.
    pub fn from_label(label: &str) -> StyleId {
        let wanted = label.trim();
        let lower = wanted.to_lowercase();
        StyleId::ALL
            .into_iter()
            .find(|s| s.as_str() == lower || s.label() == wanted)
            .unwrap_or(match lower.as_str() {
                "storybook illustration" => StyleId::Storybook,
                "watercolor painting" => StyleId::Watercolor,
                "3d render" | "3d" => StyleId::Render3d,
                "modern illustration" => StyleId::Illustration,
                _ => StyleId::Photorealistic,
            })
    }
}

impl fmt::Display for StyleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Image resolution requested from the image provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl Default for ImageSize {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
