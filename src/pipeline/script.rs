//! Script stage: document text → blog script.

use crate::config::ModelId;
use crate::error::{BlogClipError, GenerationError};
use crate::output::Script;
use crate::pipeline::llm::{TextGenerator, TokenUsage};
use crate::pipeline::retry::{with_retries, RetryPolicy};
use crate::prompts::{script_request, SCRIPT_SYSTEM_PROMPT};
use tracing::{debug, info};

/// Ask the text model for a script of roughly `target_length` characters.
///
/// Empty `text` returns [`BlogClipError::NoContent`] without calling the
/// model. A failed or blank response is [`BlogClipError::ScriptGenerationFailed`].
pub async fn generate_script(
    generator: &dyn TextGenerator,
    text: &str,
    target_length: usize,
    model: ModelId,
    policy: &RetryPolicy,
) -> Result<(Script, TokenUsage), BlogClipError> {
    if text.trim().is_empty() {
        return Err(BlogClipError::NoContent);
    }
    if target_length == 0 {
        return Err(BlogClipError::InvalidConfig(
            "Script length must be greater than zero".into(),
        ));
    }

    let user = script_request(text, target_length);
    debug!(
        "Script request: {} chars of text, target {} chars, model {}",
        text.chars().count(),
        target_length,
        model
    );

    let user = user.as_str();
    let completion = with_retries("script", policy, || async move {
        let completion = generator.generate(model, SCRIPT_SYSTEM_PROMPT, user).await?;
        if completion.content.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(completion)
    })
    .await
    .map_err(BlogClipError::ScriptGenerationFailed)?;

    let script = Script::new(completion.content.trim());
    info!("Script generated: {} chars", script.as_str().chars().count());
    Ok((script, completion.usage()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::llm::Completion;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Scripted {
        reply: Result<&'static str, GenerationError>,
        calls: AtomicUsize,
        last_user: Mutex<String>,
    }

    impl Scripted {
        fn new(reply: Result<&'static str, GenerationError>) -> Self {
            Self {
                reply,
                calls: AtomicUsize::new(0),
                last_user: Mutex::new(String::new()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for Scripted {
        async fn generate(
            &self,
            _model: ModelId,
            _system: &str,
            user: &str,
        ) -> Result<Completion, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_user.lock().unwrap() = user.to_string();
            self.reply.clone().map(|text| Completion {
                content: text.to_string(),
                input_tokens: 10,
                output_tokens: 5,
            })
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 1,
            backoff_ms: 0,
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn empty_text_makes_no_call() {
        let generator = Scripted::new(Ok("unused"));
        let err = generate_script(&generator, "  \n", 1000, ModelId::Gpt4, &policy())
            .await
            .unwrap_err();
        assert!(matches!(err, BlogClipError::NoContent));
        assert_eq!(err.to_string(), crate::error::NO_CONTENT_MESSAGE);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn zero_length_is_invalid() {
        let generator = Scripted::new(Ok("unused"));
        let err = generate_script(&generator, "text", 0, ModelId::Gpt4, &policy())
            .await
            .unwrap_err();
        assert!(matches!(err, BlogClipError::InvalidConfig(_)));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn response_is_trimmed_and_request_carries_text() {
        let generator =
            Scripted::new(Ok("\n# 페이지 제목: Intro\n## 페이지 스크립트: Hello world\n\n"));
        let (script, usage) =
            generate_script(&generator, "문서 본문", 1500, ModelId::Gpt4Turbo, &policy())
                .await
                .unwrap();
        assert_eq!(
            script.as_str(),
            "# 페이지 제목: Intro\n## 페이지 스크립트: Hello world"
        );
        assert_eq!(usage.input_tokens, 10);
        let user = generator.last_user.lock().unwrap().clone();
        assert!(user.contains("1500"));
        assert!(user.ends_with("문서 본문"));
    }

    #[tokio::test]
    async fn api_failure_is_script_generation_failed() {
        let generator = Scripted::new(Err(GenerationError::Auth("bad key".into())));
        let err = generate_script(&generator, "text", 1000, ModelId::Gpt4, &policy())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BlogClipError::ScriptGenerationFailed(GenerationError::Auth(_))
        ));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn blank_response_is_retried_then_fails() {
        let generator = Scripted::new(Ok("   "));
        let err = generate_script(&generator, "text", 1000, ModelId::Gpt4, &policy())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BlogClipError::ScriptGenerationFailed(GenerationError::EmptyResponse)
        ));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    }
}
