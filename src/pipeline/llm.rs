//! Text generation: the capability behind the script and prompt stages.
//!
//! [`TextGenerator`] is the seam the pipeline talks to. The default
//! implementation, [`LlmTextGenerator`], sends a system + user chat through
//! an `edgequake-llm` provider. Providers are bound to a model when they are
//! created, so one provider is built lazily per [`ModelId`] and cached.
//!
//! Retries and timeouts are applied by the caller
//! ([`crate::pipeline::retry::with_retries`]), keeping this module a thin
//! translation layer.

use crate::config::{ModelId, PipelineConfig};
use crate::error::GenerationError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// `HTTP 429`, `status: 401`, `status code 503` and similar.
static STATUS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:http|status(?:\s+code)?)[\s:=]*(\d{3})\b").unwrap());

/// Text returned by one generation call, with token usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Completion {
    /// A completion with no usage figures.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn usage(&self) -> TokenUsage {
        TokenUsage {
            input_tokens: self.input_tokens,
            output_tokens: self.output_tokens,
        }
    }
}

/// Tokens spent by one stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// `generate(model, systemPrompt, userPrompt) -> text`.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        model: ModelId,
        system: &str,
        user: &str,
    ) -> Result<Completion, GenerationError>;
}

/// [`TextGenerator`] backed by `edgequake-llm` providers.
pub struct LlmTextGenerator {
    provider_name: Option<String>,
    providers: Mutex<HashMap<ModelId, Arc<dyn LLMProvider>>>,
    options: CompletionOptions,
}

impl LlmTextGenerator {
    /// Build a generator from the run configuration.
    ///
    /// No provider is created until the first call.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            provider_name: config.provider_name.clone(),
            providers: Mutex::new(HashMap::new()),
            options: build_options(config),
        }
    }

    fn provider_for(&self, model: ModelId) -> Result<Arc<dyn LLMProvider>, GenerationError> {
        let mut cache = self
            .providers
            .lock()
            .map_err(|_| GenerationError::ProviderNotConfigured {
                provider: "cache".into(),
                hint: "provider cache poisoned".into(),
            })?;
        if let Some(provider) = cache.get(&model) {
            return Ok(Arc::clone(provider));
        }

        let provider = resolve_provider(self.provider_name.as_deref(), model)?;
        cache.insert(model, Arc::clone(&provider));
        Ok(provider)
    }
}

#[async_trait]
impl TextGenerator for LlmTextGenerator {
    async fn generate(
        &self,
        model: ModelId,
        system: &str,
        user: &str,
    ) -> Result<Completion, GenerationError> {
        let provider = self.provider_for(model)?;
        let messages = vec![ChatMessage::system(system), ChatMessage::user(user)];

        let response = provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| classify_error(&e.to_string()))?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            model, response.prompt_tokens, response.completion_tokens
        );

        Ok(Completion {
            content: response.content,
            input_tokens: response.prompt_tokens as u64,
            output_tokens: response.completion_tokens as u64,
        })
    }
}

/// Build `CompletionOptions` from the run config.
fn build_options(config: &PipelineConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// Resolve a provider for `model`, from most-specific to least-specific:
///
/// 1. **Named provider** (`--provider` / `provider_name`).
/// 2. **`EDGEQUAKE_LLM_PROVIDER`** set in the environment.
/// 3. **`OPENAI_API_KEY`** present, since the model ids offered are OpenAI models.
/// 4. **Full auto-detection** (`ProviderFactory::from_env`).
fn resolve_provider(
    provider_name: Option<&str>,
    model: ModelId,
) -> Result<Arc<dyn LLMProvider>, GenerationError> {
    if let Some(name) = provider_name {
        return create_provider(name, model);
    }

    if let Ok(prov) = std::env::var("EDGEQUAKE_LLM_PROVIDER") {
        if !prov.is_empty() {
            return create_provider(&prov, model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| GenerationError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment. \
                Set OPENAI_API_KEY or EDGEQUAKE_LLM_PROVIDER. Error: {e}"
            ),
        })?;

    Ok(llm_provider)
}

fn create_provider(
    provider_name: &str,
    model: ModelId,
) -> Result<Arc<dyn LLMProvider>, GenerationError> {
    ProviderFactory::create_llm_provider(provider_name, model.as_str()).map_err(|e| {
        GenerationError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Map a provider error message onto a [`GenerationError`] variant.
///
/// `edgequake-llm` reports failures as text; a status-shaped code and the
/// wording are the only signal for whether a retry can help. Bare numbers
/// (request ids, token counts) are not read as statuses.
fn classify_error(message: &str) -> GenerationError {
    let status = status_code(message);
    let lower = message.to_lowercase();
    if matches!(status, Some(401 | 403))
        || lower.contains("unauthorized")
        || lower.contains("invalid api key")
        || lower.contains("incorrect api key")
    {
        GenerationError::Auth(message.to_string())
    } else if status == Some(429)
        || lower.contains("rate limit")
        || lower.contains("rate_limit")
        || lower.contains("too many requests")
    {
        GenerationError::RateLimited {
            retry_after_secs: None,
        }
    } else if lower.contains("timed out") || lower.contains("timeout") {
        GenerationError::Transport(message.to_string())
    } else {
        GenerationError::Api {
            status,
            message: message.to_string(),
        }
    }
}

fn status_code(message: &str) -> Option<u16> {
    STATUS_RE
        .captures(message)
        .and_then(|caps| caps[1].parse().ok())
}
