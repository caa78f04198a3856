//! Downloadable artifacts of a run.
//!
//! | File | Content |
//! |------|---------|
//! | `video_script.txt` | the script text |
//! | `image_prompts.json` | pretty JSON array of prompt strings |
//! | `video_creation_results.json` | the pretty [`RunBundle`] |
//! | `scene_<n>.png` | optional, one per rendered image (1-based) |
//!
//! Every file is written to a temp file in the target directory and then
//! renamed over the final name, so readers never see a half-written file.

use crate::error::BlogClipError;
use crate::output::RunBundle;
use base64::Engine;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

pub const SCRIPT_FILE: &str = "video_script.txt";
pub const PROMPTS_FILE: &str = "image_prompts.json";
pub const BUNDLE_FILE: &str = "video_creation_results.json";

/// Where [`write_artifacts`] put each file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub script: PathBuf,
    pub prompts: PathBuf,
    pub bundle: PathBuf,
}

/// Write the three text artifacts into `dir`, creating it if needed.
pub async fn write_artifacts(dir: &Path, bundle: &RunBundle) -> Result<ExportPaths, BlogClipError> {
    create_dir(dir).await?;

    let prompts_json = bundle.prompts_json_pretty()?;
    let bundle_json = bundle.to_json_pretty()?;

    let paths = ExportPaths {
        script: write_atomic(dir, SCRIPT_FILE, bundle.script.as_str().as_bytes())?,
        prompts: write_atomic(dir, PROMPTS_FILE, prompts_json.as_bytes())?,
        bundle: write_atomic(dir, BUNDLE_FILE, bundle_json.as_bytes())?,
    };
    info!("Artifacts written to {}", dir.display());
    Ok(paths)
}

/// Save every rendered image as `scene_<n>.png`.
///
/// Returns one entry per image slot. A slot that failed to render, or whose
/// image could not be fetched or decoded, is `None`; these are logged and do
/// not abort the others.
pub async fn save_images(
    dir: &Path,
    bundle: &RunBundle,
    timeout_secs: u64,
) -> Result<Vec<Option<PathBuf>>, BlogClipError> {
    create_dir(dir).await?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| BlogClipError::Internal(format!("http client: {e}")))?;

    let mut saved = Vec::with_capacity(bundle.images.len());
    for (idx, image) in bundle.images.iter().enumerate() {
        let Some(url) = image.url.as_deref() else {
            saved.push(None);
            continue;
        };
        let name = format!("scene_{}.png", idx + 1);

        let png = match fetch_image(&client, url).await.and_then(|b| reencode_png(&b)) {
            Ok(png) => png,
            Err(reason) => {
                warn!("Skipping {}: {}", name, reason);
                saved.push(None);
                continue;
            }
        };
        saved.push(Some(write_atomic(dir, &name, &png)?));
        debug!("Saved {}", name);
    }
    Ok(saved)
}

async fn create_dir(dir: &Path) -> Result<(), BlogClipError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| BlogClipError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source: e,
        })
}

/// Write `bytes` to `dir/name` via temp file + rename.
fn write_atomic(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf, BlogClipError> {
    let path = dir.join(name);
    let failed = |source: std::io::Error| BlogClipError::OutputWriteFailed {
        path: path.clone(),
        source,
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(failed)?;
    tmp.write_all(bytes).map_err(failed)?;
    tmp.flush().map_err(failed)?;
    tmp.persist(&path).map_err(|e| failed(e.error))?;
    Ok(path)
}

/// Bytes behind an image reference: a `data:` URL or an HTTP(S) URL.
async fn fetch_image(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, String> {
    if let Some(rest) = url.strip_prefix("data:") {
        return decode_data_url(rest);
    }

    let response = client.get(url).send().await.map_err(|e| e.to_string())?;
    if !response.status().is_success() {
        return Err(format!("HTTP {}", response.status()));
    }
    response
        .bytes()
        .await
        .map(|b| b.to_vec())
        .map_err(|e| e.to_string())
}

/// Decode the part of a data URL after `data:`.
fn decode_data_url(rest: &str) -> Result<Vec<u8>, String> {
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| "malformed data URL".to_string())?;
    if !header.ends_with(";base64") {
        return Err(format!("unsupported data URL encoding '{header}'"));
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| format!("base64: {e}"))
}

fn reencode_png(bytes: &[u8]) -> Result<Vec<u8>, String> {
    let img = image::load_from_memory(bytes).map_err(|e| format!("decode: {e}"))?;
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)
        .map_err(|e| format!("encode: {e}"))?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationError;
    use crate::output::{ImageResult, Script};

    fn tiny_png_data_url() -> String {
        let img = image::RgbImage::from_pixel(2, 2, image::Rgb([200, 10, 10]));
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(buf.into_inner())
        )
    }

    fn bundle(urls: Vec<Option<String>>) -> RunBundle {
        let images = urls
            .into_iter()
            .enumerate()
            .map(|(i, url)| match url {
                Some(u) => ImageResult::rendered(format!("p{i}"), u),
                None => ImageResult::failed(format!("p{i}"), GenerationError::EmptyResponse),
            })
            .collect::<Vec<_>>();
        RunBundle {
            script: Script::new("# 페이지 제목: Intro\n## 페이지 스크립트: Hello world"),
            prompts: images.iter().map(|i| i.prompt.as_str().into()).collect(),
            images,
        }
    }

    #[tokio::test]
    async fn artifacts_are_written_with_fixed_names() {
        let dir = tempfile::tempdir().unwrap();
        let b = bundle(vec![Some("http://img/1".into())]);
        let paths = write_artifacts(dir.path(), &b).await.unwrap();

        assert_eq!(paths.script.file_name().unwrap(), SCRIPT_FILE);
        assert_eq!(
            std::fs::read_to_string(&paths.script).unwrap(),
            b.script.as_str()
        );

        let prompts: Vec<String> =
            serde_json::from_str(&std::fs::read_to_string(&paths.prompts).unwrap()).unwrap();
        assert_eq!(prompts, vec!["p0"]);

        let back = RunBundle::from_json(&std::fs::read_to_string(&paths.bundle).unwrap()).unwrap();
        assert_eq!(back.images[0].url.as_deref(), Some("http://img/1"));

        // No temp files left behind.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 3);
    }

    #[tokio::test]
    async fn artifacts_create_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        write_artifacts(&nested, &bundle(vec![])).await.unwrap();
        assert!(nested.join(BUNDLE_FILE).exists());
    }

    #[tokio::test]
    async fn data_url_images_are_saved_as_png() {
        let dir = tempfile::tempdir().unwrap();
        let b = bundle(vec![Some(tiny_png_data_url()), None]);
        let saved = save_images(dir.path(), &b, 5).await.unwrap();

        assert_eq!(saved.len(), 2);
        let first = saved[0].as_ref().unwrap();
        assert_eq!(first.file_name().unwrap(), "scene_1.png");
        let img = image::open(first).unwrap();
        assert_eq!((img.width(), img.height()), (2, 2));
        assert!(saved[1].is_none());
    }

    #[tokio::test]
    async fn undecodable_image_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let b = bundle(vec![Some("data:image/png;base64,bm90IGFuIGltYWdl".into())]);
        let saved = save_images(dir.path(), &b, 5).await.unwrap();
        assert_eq!(saved, vec![None]);
    }

    #[test]
    fn data_url_requires_base64() {
        assert!(decode_data_url("text/plain,hello").is_err());
        assert_eq!(decode_data_url("image/png;base64,aGk=").unwrap(), b"hi");
    }
}
