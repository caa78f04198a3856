//! Text extraction: PDF bytes → [`DocumentText`] via pdfium.
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which is not safe
//! to drive from async contexts. [`extract_text`] moves the work onto the
//! blocking pool with `tokio::task::spawn_blocking`.
//!
//! Extraction is all-or-nothing: a page that cannot be read fails the whole
//! document so no partial text ever reaches the paid stages.

use crate::error::ExtractionError;
use crate::output::DocumentText;
use pdfium_render::prelude::*;
use std::sync::Arc;
use tracing::{debug, info};

/// `extract(bytes) -> ordered page strings`.
pub trait PdfTextSource: Send + Sync {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractionError>;
}

/// [`PdfTextSource`] backed by the pdfium shared library.
pub struct PdfiumTextSource;

impl PdfTextSource for PdfiumTextSource {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        let pdfium = bind_pdfium()?;

        let document = pdfium.load_pdf_from_byte_slice(bytes, None).map_err(|e| {
            let detail = format!("{:?}", e);
            if detail.contains("Password") || detail.contains("password") {
                ExtractionError::PasswordRequired
            } else {
                ExtractionError::Corrupt { detail }
            }
        })?;

        let pages = document.pages();
        info!("PDF loaded: {} pages", pages.len());

        let mut texts = Vec::with_capacity(pages.len() as usize);
        for (idx, page) in pages.iter().enumerate() {
            let text = page.text().map_err(|e| ExtractionError::PageFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            })?;
            let content = text.all();
            debug!("Page {}: {} chars", idx + 1, content.chars().count());
            texts.push(content);
        }

        Ok(texts)
    }
}

/// Load the pdfium library.
///
/// Search order: `PDFIUM_LIB_PATH`, the working directory, the system
/// library path.
fn bind_pdfium() -> Result<Pdfium, ExtractionError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) if !path.is_empty() => Pdfium::bind_to_library(&path),
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| ExtractionError::EngineUnavailable(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// Check the `%PDF` magic before handing bytes to any parser.
pub fn check_pdf_magic(bytes: &[u8]) -> Result<(), ExtractionError> {
    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        return Err(ExtractionError::NotAPdf {
            magic: bytes.iter().take(4).copied().collect(),
        });
    }
    Ok(())
}

/// Extract the document text from raw PDF bytes.
///
/// Fails with [`ExtractionError::NoText`] when every page is blank (scanned
/// documents), since no later stage could do anything useful with it.
pub async fn extract_text(
    source: Arc<dyn PdfTextSource>,
    bytes: Vec<u8>,
) -> Result<DocumentText, ExtractionError> {
    check_pdf_magic(&bytes)?;

    let pages = tokio::task::spawn_blocking(move || source.extract_pages(&bytes))
        .await
        .map_err(|e| ExtractionError::Internal(format!("Extraction task panicked: {}", e)))??;

    let text = DocumentText::from_pages(&pages);
    if text.is_blank() {
        return Err(ExtractionError::NoText {
            pages: text.page_count(),
        });
    }

    info!(
        "Extracted {} chars from {} pages",
        text.as_str().chars().count(),
        text.page_count()
    );
    Ok(text)
}
