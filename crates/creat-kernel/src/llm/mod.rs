//! Content generation for blocks.
//!
//! The kernel does not talk to any hosted model API itself. It builds a
//! [`GenerationRequest`] and hands it to whatever [`GenerationBackend`] the
//! caller injected; any backend that maps `{model, contents, instruction}` to
//! plain text is substitutable. [`CommandBackend`] is the one shipped
//! implementation: it pipes the request through an external program.

mod command;
mod generate;

pub use command::{CommandBackend, DEFAULT_TIMEOUT};
pub use generate::{
    ContentGenerator, DEFAULT_MODEL, compose_contents, strip_code_fences, system_instruction,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One outbound generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model identifier.
    pub model: String,
    /// Combined prompt text (`"Context: …\n\nTask: …"`).
    pub contents: String,
    /// System instruction (persona plus type-specific refinement).
    pub system_instruction: String,
}

/// Error type for backend calls.
///
/// These stay inside the adapter: callers only ever see
/// [`GenerationError::Failed`].
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Backend not configured or unavailable.
    #[error("backend not available: {0}")]
    Unavailable(String),

    /// Backend returned an error.
    #[error("api error: {0}")]
    ApiError(String),

    /// Transport failure.
    #[error("network error: {0}")]
    NetworkError(String),
}

/// Result type for backend calls.
pub type BackendResult<T> = Result<T, BackendError>;

/// What the caller of [`ContentGenerator::generate`] can observe.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// Prompt was blank; nothing was sent.
    #[error("prompt is empty")]
    EmptyPrompt,

    /// Any backend or transport failure. All-or-nothing: no partial result.
    #[error("failed to generate content, please try again")]
    Failed,
}

/// Trait for generation backends.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Backend name for logging (e.g. "command").
    fn name(&self) -> &str;

    /// Send one request and return the generated text.
    async fn generate(&self, request: GenerationRequest) -> BackendResult<String>;
}
