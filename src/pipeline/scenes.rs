//! Prompt stage: script → at most [`MAX_SCENES`] image prompts.
//!
//! An API failure is reported as a notice and replaced by the placeholder
//! prompt so the image stage still has work. A reply that parses to no
//! prompts is passed on empty; the run stops there.

use crate::config::{ModelId, MAX_SCENES};
use crate::output::{ImagePrompt, PromptSource, Script};
use crate::pipeline::llm::{TextGenerator, TokenUsage};
use crate::pipeline::parse::{parse_prompt_response, truncate, ParsedPrompts};
use crate::pipeline::retry::{with_retries, RetryPolicy};
use crate::prompts::{image_prompt_request, IMAGE_PROMPT_SYSTEM_PROMPT};
use tracing::{info, warn};

/// Result of the prompt stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptExtraction {
    /// At most [`MAX_SCENES`] prompts.
    pub prompts: Vec<ImagePrompt>,
    /// `None` when the script was empty and no request was made.
    pub source: Option<PromptSource>,
    /// Set when the request failed and placeholders were substituted.
    pub notice: Option<String>,
    pub usage: TokenUsage,
}

impl PromptExtraction {
    fn empty() -> Self {
        Self {
            prompts: Vec::new(),
            source: None,
            notice: None,
            usage: TokenUsage::default(),
        }
    }
}

/// Ask the text model for scene prompts describing `script`.
pub async fn extract_prompts(
    generator: &dyn TextGenerator,
    script: &Script,
    model: ModelId,
    policy: &RetryPolicy,
) -> PromptExtraction {
    if script.is_empty() {
        return PromptExtraction::empty();
    }

    let user = image_prompt_request(script.as_str(), MAX_SCENES);
    let user = user.as_str();
    let result = with_retries("image prompts", policy, || async move {
        generator
            .generate(model, IMAGE_PROMPT_SYSTEM_PROMPT, user)
            .await
    })
    .await;

    let (parsed, notice, usage) = match result {
        Ok(completion) => (
            parse_prompt_response(&completion.content),
            None,
            completion.usage(),
        ),
        Err(e) => {
            warn!("Image prompt request failed, using placeholder: {}", e);
            (
                ParsedPrompts::fallback(),
                Some(format!("이미지 프롬프트 생성 중 오류가 발생했습니다: {e}")),
                TokenUsage::default(),
            )
        }
    };

    let prompts = truncate(parsed.prompts);
    info!("{} image prompts ({:?})", prompts.len(), parsed.source);

    PromptExtraction {
        prompts,
        source: Some(parsed.source),
        notice,
        usage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationError;
    use crate::pipeline::llm::Completion;
    use crate::prompts::FALLBACK_PROMPT;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Canned {
        reply: Result<String, GenerationError>,
        calls: AtomicUsize,
    }

    impl Canned {
        fn new(reply: Result<String, GenerationError>) -> Self {
            Self {
                reply,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for Canned {
        async fn generate(
            &self,
            _model: ModelId,
            _system: &str,
            _user: &str,
        ) -> Result<Completion, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone().map(Completion::text)
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 0,
            backoff_ms: 0,
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn empty_script_makes_no_call() {
        let generator = Canned::new(Ok("[]".into()));
        let out = extract_prompts(&generator, &Script::new(""), ModelId::Gpt4, &policy()).await;
        assert!(out.prompts.is_empty());
        assert_eq!(out.source, None);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn json_list_is_truncated_to_five() {
        let generator = Canned::new(Ok(r#"["a","b","c","d","e","f","g"]"#.into()));
        let out = extract_prompts(&generator, &Script::new("s"), ModelId::Gpt4, &policy()).await;
        let texts: Vec<_> = out.prompts.iter().map(ImagePrompt::as_str).collect();
        assert_eq!(texts, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(out.source, Some(PromptSource::Json));
        assert!(out.notice.is_none());
    }

    #[tokio::test]
    async fn api_failure_degrades_to_placeholder_with_notice() {
        let generator = Canned::new(Err(GenerationError::Api {
            status: Some(400),
            message: "bad request".into(),
        }));
        let out = extract_prompts(&generator, &Script::new("s"), ModelId::Gpt4, &policy()).await;
        assert_eq!(out.prompts, vec![ImagePrompt::from(FALLBACK_PROMPT)]);
        assert_eq!(out.source, Some(PromptSource::Fallback));
        assert!(out.notice.unwrap().contains("bad request"));
    }
}
