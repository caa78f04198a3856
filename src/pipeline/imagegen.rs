//! Image generation: the capability behind the image stage.
//!
//! [`ImageGenerator`] takes one [`ImageRequest`] and returns image references.
//! [`OpenAiImageClient`] implements it against the OpenAI Images API
//! (`POST {base}/images/generations`). DALL·E 3 answers with hosted URLs;
//! models that answer with `b64_json` payloads are surfaced as
//! `data:image/png;base64,…` URLs so callers see one shape.

use crate::config::{ImageSize, PipelineConfig};
use crate::error::GenerationError;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// One image-generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRequest {
    pub model: String,
    pub prompt: String,
    #[serde(rename = "n")]
    pub count: u8,
    #[serde(serialize_with = "serialize_size")]
    pub size: ImageSize,
}

fn serialize_size<S: serde::Serializer>(size: &ImageSize, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(size)
}

/// `generate(model, prompt, count, resolution) -> image references`.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, request: &ImageRequest) -> Result<Vec<String>, GenerationError>;
}

/// OpenAI Images API client.
#[derive(Debug, Clone)]
pub struct OpenAiImageClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiImageClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, GenerationError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL, Duration::from_secs(120))
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Build from `OPENAI_API_KEY` / `OPENAI_BASE_URL`.
    pub fn from_env(config: &PipelineConfig) -> Result<Self, GenerationError> {
        let key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| GenerationError::ProviderNotConfigured {
                provider: "openai-images".into(),
                hint: "Set OPENAI_API_KEY to generate images.".into(),
            })?;
        let base = std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        Self::with_base_url(key, base, Duration::from_secs(config.api_timeout_secs))
    }
}

#[async_trait]
impl ImageGenerator for OpenAiImageClient {
    async fn generate(&self, request: &ImageRequest) -> Result<Vec<String>, GenerationError> {
        let url = format!("{}/images/generations", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Transport(format!("request timed out: {e}"))
                } else {
                    GenerationError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let retry_after = retry_after_secs(response.headers());
        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(error_from_status(status, retry_after, &body));
        }

        let urls = parse_images_response(&body)?;
        debug!("{} returned {} image(s)", request.model, urls.len());
        Ok(urls)
    }
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    url: Option<String>,
    b64_json: Option<String>,
}

/// Pull image references out of a successful response body.
fn parse_images_response(body: &str) -> Result<Vec<String>, GenerationError> {
    let parsed: ImagesResponse = serde_json::from_str(body).map_err(|e| GenerationError::Api {
        status: None,
        message: format!("unreadable images response: {e}"),
    })?;

    let urls: Vec<String> = parsed
        .data
        .into_iter()
        .filter_map(|d| match (d.url, d.b64_json) {
            (Some(url), _) if !url.is_empty() => Some(url),
            (_, Some(b64)) if !b64.is_empty() => Some(format!("data:image/png;base64,{b64}")),
            _ => None,
        })
        .collect();

    if urls.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    Ok(urls)
}

fn error_from_status(status: StatusCode, retry_after: Option<u64>, body: &str) -> GenerationError {
    let message = extract_api_error(body).unwrap_or_else(|| body.to_string());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GenerationError::Auth(message),
        StatusCode::TOO_MANY_REQUESTS => GenerationError::RateLimited {
            retry_after_secs: retry_after,
        },
        _ => GenerationError::Api {
            status: Some(status.as_u16()),
            message,
        },
    }
}

fn extract_api_error(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    headers
        .get("retry-after")?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
}
