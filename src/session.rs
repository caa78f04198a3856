//! Per-user run context.
//!
//! A [`Session`] holds the state an interactive front end needs between
//! requests: whether a run is in progress and the last result offered for
//! download. Each front-end user owns one; nothing here is process-wide.

use crate::config::PipelineConfig;
use crate::error::BlogClipError;
use crate::output::RunOutput;
use crate::run::run_from_bytes;
use serde::Serialize;
use tracing::debug;

/// Lifecycle of the session's current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

/// The last run of one user, and what can be downloaded from it.
#[derive(Debug, Default)]
pub struct Session {
    state: RunState,
    last_output: Option<RunOutput>,
    last_error: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Output of the last successful run.
    pub fn last_output(&self) -> Option<&RunOutput> {
        self.last_output.as_ref()
    }

    /// Message of the last failed run.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Start a run on `bytes`, replacing any previous result.
    ///
    /// The session is `Running` for the duration of the call and ends in
    /// `Completed` or `Failed`. On failure the error is returned and its
    /// message kept for display.
    pub async fn run(
        &mut self,
        bytes: impl Into<Vec<u8>>,
        config: &PipelineConfig,
    ) -> Result<&RunOutput, BlogClipError> {
        self.begin();
        match run_from_bytes(bytes, config).await {
            Ok(output) => {
                self.state = RunState::Completed;
                debug!("Session run completed");
                Ok(&*self.last_output.insert(output))
            }
            Err(e) => {
                self.state = RunState::Failed;
                self.last_error = Some(e.to_string());
                debug!("Session run failed: {}", e);
                Err(e)
            }
        }
    }

    /// Drop the stored result and return to `Idle`.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn begin(&mut self) {
        self.state = RunState::Running;
        self.last_output = None;
        self.last_error = None;
    }
}
