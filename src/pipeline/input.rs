//! Input resolution: read a user-supplied path or URL into PDF bytes.
//!
//! Text extraction works from a byte buffer, so URLs are downloaded straight
//! into memory and local files are read whole. The `%PDF` magic is checked
//! by [`crate::pipeline::extract::extract_text`], which every input path
//! goes through.

use crate::error::BlogClipError;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to the raw bytes of the PDF.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<Vec<u8>, BlogClipError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

async fn read_local(path_str: &str) -> Result<Vec<u8>, BlogClipError> {
    let path = PathBuf::from(path_str);

    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());
            Ok(bytes)
        }
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            Err(BlogClipError::PermissionDenied { path })
        }
        Err(_) => Err(BlogClipError::FileNotFound { path }),
    }
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<Vec<u8>, BlogClipError> {
    info!("Downloading PDF from: {}", url);

    let failed = |reason: String| BlogClipError::DownloadFailed {
        url: url.to_string(),
        reason,
    };
    let classify = |e: reqwest::Error| {
        if e.is_timeout() {
            BlogClipError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(classify)?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes().await.map_err(classify)?;
    info!("Downloaded {} bytes", bytes.len());
    Ok(bytes.to_vec())
}
