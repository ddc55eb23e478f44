//! OpenAI-compatible generator implementation.
//!
//! Works with: OpenAI, OpenRouter, Ollama, vLLM, Together AI, Fireworks AI,
//! and any endpoint exposing `/chat/completions`.
//!
//! One impersonation is one non-streaming chat completion with a system
//! message and a user message.

use async_trait::async_trait;
use impersonator_config::GeneratorConfig;
use impersonator_core::{BackendError, GenerationRequest, Generator};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_TEMPERATURE: f32 = 0.9;
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// A generator backed by an OpenAI-compatible HTTP API.
pub struct OpenAiCompatGenerator {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

impl OpenAiCompatGenerator {
    /// Create a generator with the default timeout and temperature.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, BackendError> {
        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
            client: http_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?,
        })
    }

    /// Build from the `[generator]` config section.
    pub fn from_config(config: &GeneratorConfig) -> Result<Self, BackendError> {
        let api_key = match config.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            Some(key) => key.to_string(),
            // Ollama doesn't need a real key
            None if config.provider == "ollama" => "ollama".to_string(),
            None => {
                return Err(BackendError::NotConfigured(
                    "no API key (set generator.api_key or IMPERSONATOR_API_KEY)".into(),
                ));
            }
        };

        let mut generator = Self::new(&config.provider, &config.api_url, api_key, &config.model)?;
        generator.temperature = config.temperature;
        generator.client = http_client(Duration::from_secs(config.timeout_secs))?;
        Ok(generator)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// The JSON body for one completion. `max_tokens` is sent only when bounded.
    fn request_body(&self, request: &GenerationRequest) -> serde_json::Value {
        let mut messages = Vec::with_capacity(2);
        if !request.system_prompt.is_empty() {
            messages.push(ApiMessage::new("system", &request.system_prompt));
        }
        messages.push(ApiMessage::new("user", &request.prompt));

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "stream": false,
        });

        if let Some(max_tokens) = request.response_length {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        body
    }

    /// First choice's content; missing content is returned as `""`.
    fn extract_text(response: ApiResponse) -> Result<String, BackendError> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::ApiError {
                status_code: 200,
                message: "No choices in response".into(),
            })?;
        Ok(choice.message.content.unwrap_or_default())
    }
}

fn http_client(timeout: Duration) -> Result<reqwest::Client, BackendError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| BackendError::NotConfigured(format!("Failed to create HTTP client: {e}")))
}

fn transport_error(err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        BackendError::Timeout(err.to_string())
    } else {
        BackendError::Network(err.to_string())
    }
}

fn retry_after(response: &reqwest::Response) -> u64 {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

#[async_trait]
impl Generator for OpenAiCompatGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, BackendError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(&request);

        debug!(
            generator = %self.name,
            model = %self.model,
            max_tokens = ?request.response_length,
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(BackendError::RateLimited {
                retry_after_secs: retry_after(&response),
            });
        }

        if status == 401 || status == 403 {
            return Err(BackendError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Generator returned error");
            return Err(BackendError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse =
            response.json().await.map_err(|e| BackendError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        Self::extract_text(api_response)
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

impl ApiMessage {
    fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.into(),
            content: Some(content.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> OpenAiCompatGenerator {
        OpenAiCompatGenerator::new("openrouter", "https://openrouter.ai/api/v1/", "sk-test", "test-model")
            .unwrap()
    }

    fn request(response_length: Option<u32>) -> GenerationRequest {
        GenerationRequest {
            prompt: "### Recent Conversation:\n\nB: hi\n\nA:".into(),
            system_prompt: "You are A.".into(),
            response_length,
        }
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let g = generator();
        assert_eq!(g.name(), "openrouter");
        assert_eq!(g.base_url, "https://openrouter.ai/api/v1");
    }

    #[test]
    fn body_has_system_and_user_messages() {
        let body = generator().with_temperature(0.5).request_body(&request(None));
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["temperature"], 0.5);
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "You are A.");
        assert_eq!(body["messages"][1]["role"], "user");
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn bounded_requests_send_max_tokens() {
        let body = generator().request_body(&request(Some(200)));
        assert_eq!(body["max_tokens"], 200);
    }

    #[test]
    fn empty_system_prompt_is_omitted() {
        let mut req = request(None);
        req.system_prompt.clear();
        let body = generator().request_body(&req);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn extracts_first_choice() {
        let data = r#"{
            "id": "gen-1",
            "model": "test-model",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "I nod."}}]
        }"#;
        let parsed: ApiResponse = serde_json::from_str(data).unwrap();
        assert_eq!(OpenAiCompatGenerator::extract_text(parsed).unwrap(), "I nod.");
    }

    #[test]
    fn null_content_is_empty_text() {
        let data = r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#;
        let parsed: ApiResponse = serde_json::from_str(data).unwrap();
        assert_eq!(OpenAiCompatGenerator::extract_text(parsed).unwrap(), "");
    }

    #[test]
    fn no_choices_is_an_error() {
        let parsed: ApiResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(
            OpenAiCompatGenerator::extract_text(parsed),
            Err(BackendError::ApiError { status_code: 200, .. })
        ));
    }

    #[test]
    fn from_config_requires_key() {
        let config = GeneratorConfig::default();
        assert!(matches!(
            OpenAiCompatGenerator::from_config(&config),
            Err(BackendError::NotConfigured(_))
        ));

        let ollama = GeneratorConfig {
            provider: "ollama".into(),
            api_url: "http://localhost:11434/v1".into(),
            ..GeneratorConfig::default()
        };
        let g = OpenAiCompatGenerator::from_config(&ollama).unwrap();
        assert_eq!(g.name(), "ollama");
    }

    #[test]
    fn from_config_applies_settings() {
        let config = GeneratorConfig {
            api_key: Some("sk-live".into()),
            model: "other-model".into(),
            temperature: 1.2,
            ..GeneratorConfig::default()
        };
        let g = OpenAiCompatGenerator::from_config(&config).unwrap();
        assert_eq!(g.model(), "other-model");
        assert_eq!(g.temperature, 1.2);
        assert_eq!(g.api_key, "sk-live");
    }
}
