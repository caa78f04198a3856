//! Pipeline stages for PDF-to-blog runs.
//!
//! Each submodule implements one step or one remote capability, so every
//! stage can be tested with injected fakes.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ script ──▶ scenes ──▶ images
//! (URL/path) (pdfium)   (LLM)     (LLM+parse) (image API)
//! ```
//!
//! 1. [`input`]: read the user-supplied path or download the URL
//! 2. [`extract`]: page texts via pdfium, in `spawn_blocking`
//! 3. [`script`]: blog script from the text; the last stage that can fail
//!    the run
//! 4. [`scenes`]: up to five image prompts, parsed by [`parse`]
//! 5. [`images`]: one image per prompt, paced by [`pacing`]
//!
//! [`llm`] and [`imagegen`] are the text and image capabilities; [`retry`]
//! wraps every remote call.

pub mod extract;
pub mod imagegen;
pub mod images;
pub mod input;
pub mod llm;
pub mod pacing;
pub mod parse;
pub mod retry;
pub mod scenes;
pub mod script;
