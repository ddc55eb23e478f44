//! Generator trait: the abstraction over the text generation backend.
//!
//! A Generator takes an assembled system prompt and user prompt and returns
//! the raw generated text. Impersonator never retries a failed call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::BackendError;

/// What gets sent to the backend for one impersonation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// The user prompt (transcript + trailing speaker line)
    pub prompt: String,

    /// The fully resolved system prompt
    pub system_prompt: String,

    /// Maximum response length; `None` means unbounded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_length: Option<u32>,
}

/// The core Generator trait.
///
/// Implementations return whatever text the backend produced, untrimmed.
/// Empty output is not an error at this layer.
#[async_trait]
pub trait Generator: Send + Sync {
    /// A human-readable name for this backend (e.g., "openai_compat").
    fn name(&self) -> &str;

    /// Run one generation.
    async fn generate(&self, request: GenerationRequest) -> std::result::Result<String, BackendError>;
}
