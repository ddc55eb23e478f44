//! Text generation backends for Impersonator.
//!
//! All backends implement the `impersonator_core::Generator` trait.
//! [`build_from_config`] picks one from the `[generator]` config section.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatGenerator;

use impersonator_config::GeneratorConfig;
use impersonator_core::{BackendError, Generator};
use std::sync::Arc;

/// Provider names served by the OpenAI-compatible backend.
pub const OPENAI_COMPATIBLE: [&str; 9] = [
    "openai_compat",
    "openrouter",
    "openai",
    "ollama",
    "deepseek",
    "groq",
    "together",
    "fireworks",
    "vllm",
];

/// Build the configured generator.
///
/// An empty `api_url` falls back to the well-known URL for the provider.
pub fn build_from_config(config: &GeneratorConfig) -> Result<Arc<dyn Generator>, BackendError> {
    if !OPENAI_COMPATIBLE.contains(&config.provider.as_str()) {
        return Err(BackendError::NotConfigured(format!(
            "unknown provider \"{}\" (expected one of: {})",
            config.provider,
            OPENAI_COMPATIBLE.join(", ")
        )));
    }

    let mut config = config.clone();
    if config.api_url.trim().is_empty() {
        config.api_url = default_base_url(&config.provider).into();
    }

    tracing::debug!(provider = %config.provider, url = %config.api_url, "Building generator");
    Ok(Arc::new(OpenAiCompatGenerator::from_config(&config)?))
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> &'static str {
    match provider_name {
        "openai" => "https://api.openai.com/v1",
        "ollama" => "http://localhost:11434/v1",
        "deepseek" => "https://api.deepseek.com/v1",
        "groq" => "https://api.groq.com/openai/v1",
        "together" => "https://api.together.xyz/v1",
        "fireworks" => "https://api.fireworks.ai/inference/v1",
        "vllm" => "http://localhost:8000/v1",
        _ => "https://openrouter.ai/api/v1",
    }
}
