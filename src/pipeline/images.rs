//! Image stage: prompts → one [`ImageResult`] per prompt.
//!
//! Each prompt gets the style suffix appended and is sent as a single-image
//! request. Every attempt, retries included, waits on the [`Pacer`] inside
//! [`with_paced_retries`]. A failed slot is recorded with `url: None`
//! and the batch moves on.
//!
//! With `image_concurrency > 1` up to that many requests are in flight;
//! `buffered` yields results in input order, so the output stays
//! index-aligned with the prompts whatever order responses arrive in.

use crate::config::{PipelineConfig, StyleId, MAX_SCENES};
use crate::error::GenerationError;
use crate::output::{ImagePrompt, ImageResult};
use crate::pipeline::imagegen::{ImageGenerator, ImageRequest};
use crate::pipeline::pacing::Pacer;
use crate::pipeline::retry::{with_paced_retries, RetryPolicy};
use crate::progress::{ProgressCallback, Stage};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

/// Append the style instruction to a prompt.
pub fn styled_prompt(prompt: &ImagePrompt, style: StyleId) -> String {
    format!("{}{}", prompt.as_str(), style.suffix())
}

/// Render up to [`MAX_SCENES`] prompts.
pub async fn render_images(
    generator: &dyn ImageGenerator,
    pacer: &dyn Pacer,
    prompts: &[ImagePrompt],
    config: &PipelineConfig,
    progress: &ProgressCallback,
) -> Vec<ImageResult> {
    let prompts = &prompts[..prompts.len().min(MAX_SCENES)];
    let total = prompts.len();
    let policy = RetryPolicy::from_config(config);
    let concurrency = config.image_concurrency.max(1);

    info!(
        "Rendering {} images with {} (style {}, concurrency {})",
        total, config.image_model, config.style, concurrency
    );

    let results: Vec<ImageResult> = stream::iter(prompts.iter().enumerate())
        .map(|(index, prompt)| {
            let request = ImageRequest {
                model: config.image_model.clone(),
                prompt: styled_prompt(prompt, config.style),
                count: 1,
                size: config.image_size,
            };
            render_one(generator, pacer, index, total, prompt, request, &policy, progress)
        })
        .buffered(concurrency)
        .collect()
        .await;

    let rendered = results.iter().filter(|r| r.is_rendered()).count();
    info!("Images rendered: {}/{}", rendered, total);
    results
}

#[allow(clippy::too_many_arguments)]
async fn render_one(
    generator: &dyn ImageGenerator,
    pacer: &dyn Pacer,
    index: usize,
    total: usize,
    prompt: &ImagePrompt,
    request: ImageRequest,
    policy: &RetryPolicy,
    progress: &ProgressCallback,
) -> ImageResult {
    progress.on_image_start(index, total);
    debug!("Image {}/{}: {}", index + 1, total, request.prompt);

    let request = &request;
    let label = format!("image {}/{}", index + 1, total);
    let outcome = with_paced_retries(&label, policy, pacer, || async move {
        generator.generate(request).await
    })
    .await;

    match outcome {
        Ok(urls) => match urls.into_iter().next() {
            Some(url) => {
                progress.on_image_complete(index, total);
                ImageResult::rendered(prompt.as_str(), url)
            }
            None => {
                let err = GenerationError::EmptyResponse;
                fail(index, total, prompt, err, progress)
            }
        },
        Err(err) => fail(index, total, prompt, err, progress),
    }
}

fn fail(
    index: usize,
    total: usize,
    prompt: &ImagePrompt,
    err: GenerationError,
    progress: &ProgressCallback,
) -> ImageResult {
    warn!("Image {}/{} failed: {}", index + 1, total, err);
    progress.on_image_error(index, total, &err.to_string());
    progress.on_notice(Stage::RenderImages, &format!("이미지 생성 오류: {err}"));
    ImageResult::failed(prompt.as_str(), err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pacing::NoPacing;
    use crate::progress::NoopProgressCallback;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Answers `http://img/<n>` and fails prompts containing "fail".
    #[derive(Default)]
    struct FakeImages {
        seen: Mutex<Vec<ImageRequest>>,
    }

    #[async_trait]
    impl ImageGenerator for FakeImages {
        async fn generate(&self, request: &ImageRequest) -> Result<Vec<String>, GenerationError> {
            let n = {
                let mut seen = self.seen.lock().unwrap();
                seen.push(request.clone());
                seen.len()
            };
            if request.prompt.contains("fail") {
                return Err(GenerationError::Api {
                    status: Some(400),
                    message: "content policy".into(),
                });
            }
            Ok(vec![format!("http://img/{n}")])
        }
    }

    fn config(concurrency: usize) -> PipelineConfig {
        PipelineConfig::builder()
            .style(StyleId::Watercolor)
            .image_concurrency(concurrency)
            .max_retries(0)
            .build()
            .unwrap()
    }

    fn noop() -> ProgressCallback {
        Arc::new(NoopProgressCallback)
    }

    fn prompts(texts: &[&str]) -> Vec<ImagePrompt> {
        texts.iter().map(|t| ImagePrompt::from(*t)).collect()
    }

    #[tokio::test]
    async fn only_first_five_prompts_are_rendered() {
        let images = FakeImages::default();
        let input = prompts(&["1", "2", "3", "4", "5", "6", "7"]);
        let out = render_images(&images, &NoPacing, &input, &config(1), &noop()).await;
        assert_eq!(out.len(), 5);
        for (i, r) in out.iter().enumerate() {
            assert_eq!(r.prompt, input[i].as_str());
        }
        assert_eq!(images.seen.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn style_suffix_and_request_shape() {
        let images = FakeImages::default();
        render_images(&images, &NoPacing, &prompts(&["a red apple"]), &config(1), &noop()).await;
        let seen = images.seen.lock().unwrap();
        assert_eq!(seen[0].prompt, format!("a red apple{}", StyleId::Watercolor.suffix()));
        assert_eq!(seen[0].model, "dall-e-3");
        assert_eq!(seen[0].count, 1);
        assert_eq!(seen[0].size.to_string(), "1024x1024");
    }

    #[tokio::test]
    async fn failure_is_isolated() {
        let images = FakeImages::default();
        let out = render_images(
            &images,
            &NoPacing,
            &prompts(&["ok one", "please fail", "ok two"]),
            &config(1),
            &noop(),
        )
        .await;
        assert!(out[0].is_rendered());
        assert_eq!(out[1].url, None);
        assert!(out[1].error.is_some());
        assert_eq!(out[1].prompt, "please fail");
        assert!(out[2].is_rendered());
    }

    /// Earlier prompts answer more slowly.
    struct SlowFirst;

    #[async_trait]
    impl ImageGenerator for SlowFirst {
        async fn generate(&self, request: &ImageRequest) -> Result<Vec<String>, GenerationError> {
            let idx: u64 = request
                .prompt
                .split_whitespace()
                .next()
                .and_then(|w| w.parse().ok())
                .unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(60 - idx * 15)).await;
            Ok(vec![format!("http://img/{idx}")])
        }
    }

    #[tokio::test]
    async fn concurrent_results_stay_in_prompt_order() {
        let out = render_images(
            &SlowFirst,
            &NoPacing,
            &prompts(&["0", "1", "2", "3"]),
            &config(4),
            &noop(),
        )
        .await;
        let urls: Vec<_> = out.iter().map(|r| r.url.clone().unwrap()).collect();
        assert_eq!(
            urls,
            vec!["http://img/0", "http://img/1", "http://img/2", "http://img/3"]
        );
    }

    /// Rate-limited on the first call, fine afterwards.
    #[derive(Default)]
    struct LimitedOnce {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ImageGenerator for LimitedOnce {
        async fn generate(&self, _request: &ImageRequest) -> Result<Vec<String>, GenerationError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(GenerationError::RateLimited {
                    retry_after_secs: None,
                });
            }
            Ok(vec!["http://img/retried".into()])
        }
    }

    #[derive(Default)]
    struct CountingPacer {
        waits: AtomicUsize,
    }

    #[async_trait]
    impl Pacer for CountingPacer {
        async fn wait(&self) {
            self.waits.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn retried_attempts_are_paced_too() {
        let images = LimitedOnce::default();
        let pacer = CountingPacer::default();
        let cfg = PipelineConfig::builder()
            .max_retries(2)
            .retry_backoff_ms(0)
            .build()
            .unwrap();

        let out = render_images(&images, &pacer, &prompts(&["a harbour"]), &cfg, &noop()).await;

        assert_eq!(out[0].url.as_deref(), Some("http://img/retried"));
        assert_eq!(images.calls.load(Ordering::SeqCst), 2);
        assert_eq!(pacer.waits.load(Ordering::SeqCst), 2);
    }
}
