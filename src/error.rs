//! Error types for the blogclip library.
//!
//! Three error types reflect three failure modes:
//!
//! * [`BlogClipError`]: **Fatal**: the run cannot continue (bad input file,
//!   unreadable PDF, no content, script generation failed, no image prompts). Returned as
//!   `Err(BlogClipError)` from the top-level `run*` functions.
//!
//! * [`ExtractionError`]: the PDF could not be turned into text. Always fatal
//!   and always raised before any paid API call; wrapped by
//!   [`BlogClipError::Extraction`].
//!
//! * [`GenerationError`]: **Non-fatal**: one remote text or image call failed.
//!   The prompt stage degrades to placeholder prompts and the image stage
//!   stores the error in [`crate::output::ImageResult`] so one bad image never
//!   costs the rest of the batch.

use std::path::PathBuf;
use thiserror::Error;

/// Message carried by [`BlogClipError::NoContent`].
pub const NO_CONTENT_MESSAGE: &str = "스크립트를 생성할 내용이 없습니다.";

/// Message carried by [`BlogClipError::PromptGenerationFailed`].
pub const PROMPT_FAILURE_MESSAGE: &str = "이미지 프롬프트 생성에 실패했습니다.";

/// All fatal errors returned by the blogclip library.
#[derive(Debug, Error)]
pub enum BlogClipError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Pipeline errors ───────────────────────────────────────────────────
    /// Text could not be extracted from the PDF.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// The script stage was given no text to work from.
    #[error("{}", NO_CONTENT_MESSAGE)]
    NoContent,

    /// The script request failed; nothing after it was attempted.
    #[error("Blog script generation failed: {0}")]
    ScriptGenerationFailed(#[source] GenerationError),

    /// The prompt request answered with no prompts at all; no image was
    /// requested.
    #[error("{}", PROMPT_FAILURE_MESSAGE)]
    PromptGenerationFailed,

    /// Some images were rendered but at least one failed.
    ///
    /// Returned by [`crate::output::RunOutput::into_result`] when the caller
    /// wants to treat any image failure as an error.
    #[error("{failed}/{total} images failed to render")]
    PartialFailure {
        success: usize,
        failed: usize,
        total: usize,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an exported artifact.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a PDF could not be turned into text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The bytes are not a PDF.
    #[error("Input is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { magic: Vec<u8> },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    Corrupt { detail: String },

    /// PDF requires a password.
    #[error("PDF is encrypted and requires a password.")]
    PasswordRequired,

    /// A single page could not be read.
    #[error("Text extraction failed for page {page}: {detail}")]
    PageFailed { page: usize, detail: String },

    /// The PDFium shared library could not be loaded.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, place the library in the working\n\
directory, or install it on the system library path.\n"
    )]
    EngineUnavailable(String),

    /// The document parsed but contains no extractable text (e.g. scanned images).
    #[error("PDF에서 텍스트를 추출할 수 없습니다. (no extractable text in {pages} pages)")]
    NoText { pages: usize },

    /// Unexpected failure inside the extraction task.
    #[error("Extraction task failed: {0}")]
    Internal(String),
}

/// A non-fatal error for a single remote text or image call.
#[derive(Debug, Clone, Error, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum GenerationError {
    /// The provider could not be constructed (missing API key etc.).
    #[error("Provider '{provider}' is not configured: {hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The provider returned an error response.
    #[error("API error{}: {message}", http_suffix(.status))]
    Api {
        status: Option<u16>,
        message: String,
    },

    /// HTTP 429 or provider-reported overload.
    #[error("Rate limit exceeded{}", retry_suffix(.retry_after_secs))]
    RateLimited { retry_after_secs: Option<u64> },

    /// HTTP 401/403; retrying will not help.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The call did not finish within the configured timeout.
    #[error("Call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Connection-level failure before a response arrived.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The provider answered but the payload held nothing usable.
    #[error("Provider returned an empty response")]
    EmptyResponse,
}

fn http_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

fn retry_suffix(secs: &Option<u64>) -> String {
    secs.map(|s| format!(", retry after {s}s")).unwrap_or_default()
}

impl GenerationError {
    /// Whether another attempt has a chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        match self {
            GenerationError::RateLimited { .. }
            | GenerationError::Timeout { .. }
            | GenerationError::Transport(_)
            | GenerationError::EmptyResponse => true,
            GenerationError::Api { status, .. } => status.map_or(true, |s| s >= 500),
            GenerationError::ProviderNotConfigured { .. } | GenerationError::Auth(_) => false,
        }
    }
}
