//! Values produced by a run: text, script, prompts, image results, bundle.
//!
//! [`RunBundle`] is the unit offered for download. Its JSON form uses the
//! stable keys `script`, `image_prompts` and `image_urls`; the richer
//! in-memory shape (typed prompts, per-image errors) is converted through
//! [`BundleJson`] on the way in and out.

use crate::error::{BlogClipError, GenerationError};
use crate::prompts::{PAGE_SCRIPT_MARKER, PAGE_TITLE_MARKER};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// ── Document text ─────────────────────────────────────────────────────────

/// Text extracted from a PDF: page texts joined with `\n` in page order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentText {
    text: String,
    page_count: usize,
}

impl DocumentText {
    /// Join page texts in order with a single newline between pages.
    pub fn from_pages<S: AsRef<str>>(pages: &[S]) -> Self {
        let text = pages
            .iter()
            .map(|p| p.as_ref())
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            text,
            page_count: pages.len(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// True when there is nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

// ── Script ────────────────────────────────────────────────────────────────

/// A generated blog script.
///
/// Free text that *should* follow the `# 페이지 제목:` / `## 페이지 스크립트:`
/// markup; nothing is validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Script(String);

/// One `(title, body)` unit read from a script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptPage {
    pub title: String,
    pub body: String,
}

static RE_PAGE_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?m)^[ \t]*{}[ \t]*(.*)$",
        regex::escape(PAGE_TITLE_MARKER)
    ))
    .unwrap()
});

impl Script {
    pub fn new(text: impl Into<String>) -> Self {
        Script(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Best-effort split into page units.
    ///
    /// Each `# 페이지 제목:` line opens a page; the body is everything up to
    /// the next title with the `## 페이지 스크립트:` marker removed. Text
    /// before the first title is ignored. Returns an empty list when the model
    /// ignored the markup.
    pub fn pages(&self) -> Vec<ScriptPage> {
        let titles: Vec<_> = RE_PAGE_TITLE.captures_iter(&self.0).collect();
        let mut pages = Vec::with_capacity(titles.len());

        for (i, caps) in titles.iter().enumerate() {
            let (Some(whole), Some(title)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let end = titles
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(self.0.len(), |m| m.start());
            let body = self.0[whole.end()..end].trim();
            let body = body
                .strip_prefix(PAGE_SCRIPT_MARKER)
                .map(str::trim)
                .unwrap_or(body);

            pages.push(ScriptPage {
                title: title.as_str().trim().to_string(),
                body: body.to_string(),
            });
        }
        pages
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Image prompts ─────────────────────────────────────────────────────────

/// One plain-text image-generation prompt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImagePrompt(String);

impl ImagePrompt {
    pub fn new(text: impl Into<String>) -> Self {
        ImagePrompt(text.into())
    }

    /// Normalise one element of a model-produced JSON list.
    ///
    /// Strings are taken as-is, `{"prompt": "..."}` objects contribute their
    /// `prompt` field, and anything else is rendered as JSON text.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => ImagePrompt(s.clone()),
            Value::Object(map) => match map.get("prompt") {
                Some(Value::String(s)) => ImagePrompt(s.clone()),
                Some(other) => ImagePrompt(other.to_string()),
                None => ImagePrompt(value.to_string()),
            },
            other => ImagePrompt(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ImagePrompt {
    fn from(s: &str) -> Self {
        ImagePrompt(s.to_string())
    }
}

impl From<String> for ImagePrompt {
    fn from(s: String) -> Self {
        ImagePrompt(s)
    }
}

impl fmt::Display for ImagePrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which parsing rule produced a prompt list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptSource {
    /// A bracket-delimited JSON array in the response.
    Json,
    /// Non-marker lines of a response without a JSON array.
    Lines,
    /// Placeholder prompts; nothing usable was recovered.
    Fallback,
}

// ── Image results ─────────────────────────────────────────────────────────

/// Outcome of one image request, index-aligned with the prompt list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageResult {
    /// The prompt as produced by the prompt stage (without style suffix).
    pub prompt: String,
    /// Image reference; `None` when this slot failed.
    pub url: Option<String>,
    /// Why the slot failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<GenerationError>,
}

impl ImageResult {
    pub fn rendered(prompt: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            url: Some(url.into()),
            error: None,
        }
    }

    pub fn failed(prompt: impl Into<String>, error: GenerationError) -> Self {
        Self {
            prompt: prompt.into(),
            url: None,
            error: Some(error),
        }
    }

    pub fn is_rendered(&self) -> bool {
        self.url.is_some()
    }
}

// ── Run bundle ────────────────────────────────────────────────────────────

/// Script, prompts and image results of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "BundleJson", from = "BundleJson")]
pub struct RunBundle {
    pub script: Script,
    pub prompts: Vec<ImagePrompt>,
    pub images: Vec<ImageResult>,
}

/// Wire form of [`RunBundle`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleJson {
    pub script: String,
    pub image_prompts: Vec<String>,
    pub image_urls: Vec<Option<String>>,
}

impl From<RunBundle> for BundleJson {
    fn from(bundle: RunBundle) -> Self {
        BundleJson {
            script: bundle.script.into_string(),
            image_prompts: bundle.prompts.into_iter().map(|p| p.0).collect(),
            image_urls: bundle.images.into_iter().map(|i| i.url).collect(),
        }
    }
}

impl From<BundleJson> for RunBundle {
    fn from(json: BundleJson) -> Self {
        let images = json
            .image_urls
            .into_iter()
            .enumerate()
            .map(|(i, url)| ImageResult {
                prompt: json.image_prompts.get(i).cloned().unwrap_or_default(),
                url,
                error: None,
            })
            .collect();
        RunBundle {
            script: Script(json.script),
            prompts: json.image_prompts.into_iter().map(ImagePrompt).collect(),
            images,
        }
    }
}

impl RunBundle {
    /// Pretty JSON with non-ASCII text kept as-is.
    pub fn to_json_pretty(&self) -> Result<String, BlogClipError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| BlogClipError::Internal(format!("bundle serialisation: {e}")))
    }

    /// Parse a bundle previously produced by [`RunBundle::to_json_pretty`].
    pub fn from_json(json: &str) -> Result<Self, BlogClipError> {
        serde_json::from_str(json)
            .map_err(|e| BlogClipError::InvalidConfig(format!("not a run bundle: {e}")))
    }

    /// The prompt list alone, as a pretty JSON array of strings.
    pub fn prompts_json_pretty(&self) -> Result<String, BlogClipError> {
        serde_json::to_string_pretty(&self.prompts)
            .map_err(|e| BlogClipError::Internal(format!("prompt serialisation: {e}")))
    }

    pub fn rendered_count(&self) -> usize {
        self.images.iter().filter(|i| i.is_rendered()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.images.len() - self.rendered_count()
    }
}

// ── Run output ────────────────────────────────────────────────────────────

/// Aggregate statistics for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// Pages in the source PDF.
    pub pdf_pages: usize,
    /// Characters of extracted text.
    pub text_chars: usize,
    /// Characters of generated script.
    pub script_chars: usize,
    /// Page units recognised in the script.
    pub script_pages: usize,
    /// Prompts kept after truncation.
    pub prompt_count: usize,
    /// Which rule produced the prompts.
    pub prompt_source: Option<PromptSource>,
    pub images_rendered: usize,
    pub images_failed: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub extract_duration_ms: u64,
    pub script_duration_ms: u64,
    pub prompts_duration_ms: u64,
    pub images_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything a completed run returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    pub bundle: RunBundle,
    pub stats: RunStats,
    /// Readable messages for recovered failures, in the order they happened.
    pub notices: Vec<String>,
}

impl RunOutput {
    /// Treat any failed image as an error.
    pub fn into_result(self) -> Result<RunOutput, BlogClipError> {
        let failed = self.bundle.failed_count();
        if failed > 0 {
            let total = self.bundle.images.len();
            return Err(BlogClipError::PartialFailure {
                success: total - failed,
                failed,
                total,
            });
        }
        Ok(self)
    }
}
