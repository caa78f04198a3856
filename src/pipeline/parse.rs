//! Parsing of the image-prompt response into a prompt list.
//!
//! Models asked for "a JSON array of strings" return that, or the array
//! wrapped in prose or code fences, or a plain numbered list, or garbage.
//! [`parse_prompt_response`] trims the response, then applies the rules
//! below in order:
//!
//! 1. **JSON slice**: from the first `[` to the last `]` inclusive. A JSON
//!    array yields its elements, normalised with [`ImagePrompt::from_value`].
//!    An empty array yields no prompts; the run stops on that.
//! 2. **Lines**: with no bracket pair, every non-blank line not starting with
//!    a code fence or a bracket/brace is a prompt (trimmed, at most
//!    [`MAX_SCENES`]). No survivors yields the single placeholder.
//! 3. **Undecodable slice** (or valid JSON that is not an array): the
//!    two-element placeholder list.
//!
//! The caller applies [`truncate`] afterwards; rule 1 may return more than
//! [`MAX_SCENES`] prompts.

use crate::config::MAX_SCENES;
use crate::output::{ImagePrompt, PromptSource};
use crate::prompts::{FALLBACK_PROMPT, FALLBACK_PROMPT_DETAILED};
use serde_json::Value;
use tracing::debug;

/// Prompts recovered from one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPrompts {
    pub prompts: Vec<ImagePrompt>,
    pub source: PromptSource,
}

impl ParsedPrompts {
    /// The one-element placeholder list.
    pub fn fallback() -> Self {
        Self {
            prompts: vec![ImagePrompt::from(FALLBACK_PROMPT)],
            source: PromptSource::Fallback,
        }
    }

    fn fallback_pair() -> Self {
        Self {
            prompts: vec![
                ImagePrompt::from(FALLBACK_PROMPT),
                ImagePrompt::from(FALLBACK_PROMPT_DETAILED),
            ],
            source: PromptSource::Fallback,
        }
    }
}

/// Turn a raw model response into a prompt list.
pub fn parse_prompt_response(response: &str) -> ParsedPrompts {
    let response = response.trim();
    match json_slice(response) {
        Some(slice) => parse_json_slice(slice),
        None => parse_lines(response),
    }
}

/// Keep at most [`MAX_SCENES`] prompts.
pub fn truncate(mut prompts: Vec<ImagePrompt>) -> Vec<ImagePrompt> {
    prompts.truncate(MAX_SCENES);
    prompts
}

fn json_slice(response: &str) -> Option<&str> {
    let start = response.find('[')?;
    let end = response.rfind(']')?;
    (start < end).then(|| &response[start..=end])
}

fn parse_json_slice(slice: &str) -> ParsedPrompts {
    match serde_json::from_str::<Value>(slice) {
        Ok(Value::Array(items)) => ParsedPrompts {
            prompts: items.iter().map(ImagePrompt::from_value).collect(),
            source: PromptSource::Json,
        },
        Ok(_) => {
            debug!("Prompt response slice is JSON but not an array");
            ParsedPrompts::fallback_pair()
        }
        Err(e) => {
            debug!("Prompt response slice is not valid JSON: {e}");
            ParsedPrompts::fallback_pair()
        }
    }
}

fn parse_lines(response: &str) -> ParsedPrompts {
    let prompts: Vec<ImagePrompt> = response
        .lines()
        .filter(|line| !line.trim().is_empty() && !is_marker_line(line))
        .map(|line| ImagePrompt::from(line.trim()))
        .take(MAX_SCENES)
        .collect();

    if prompts.is_empty() {
        return ParsedPrompts::fallback();
    }
    ParsedPrompts {
        prompts,
        source: PromptSource::Lines,
    }
}

/// Lines that are JSON or fence syntax rather than prompt text. Checked on
/// the untrimmed line, so indented markers past the first line count as
/// prompt text.
fn is_marker_line(line: &str) -> bool {
    ["```", "[", "]", "{", "}"]
        .iter()
        .any(|marker| line.starts_with(marker))
}
