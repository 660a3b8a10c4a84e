//! LLM adapter for chat completions.
//!
//! Supports OpenAI and Anthropic APIs, selected via configuration or
//! environment variables. Retries are left to [`crate::RetryingInvoker`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AgentError, AgentResult};
use crate::roles::AgentRole;

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// LLM provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAI,
    Anthropic,
}

impl LlmProvider {
    /// Parse a provider name (`openai` or `anthropic`, case-insensitive).
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "openai" => Some(LlmProvider::OpenAI),
            "anthropic" | "claude" => Some(LlmProvider::Anthropic),
            _ => None,
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "gpt-4o-mini",
            LlmProvider::Anthropic => "claude-3-haiku-20240307",
        }
    }

    pub fn default_max_tokens(&self) -> u32 {
        match self {
            LlmProvider::OpenAI => 8192,
            LlmProvider::Anthropic => 4096,
        }
    }

    /// Environment variable holding the provider's API key.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "OPENAI_API_KEY",
            LlmProvider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmProvider::OpenAI => write!(f, "openai"),
            LlmProvider::Anthropic => write!(f, "anthropic"),
        }
    }
}

/// A model that completes one system + user prompt pair.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, role: AgentRole, system: &str, user: &str) -> AgentResult<String>;
}

/// LLM adapter that handles API calls
pub struct LlmAdapter {
    provider: LlmProvider,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    client: reqwest::Client,
}

impl LlmAdapter {
    /// Create a new LLM adapter with explicit configuration
    pub fn new(provider: LlmProvider, api_key: impl Into<String>, model: Option<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            model: model.unwrap_or_else(|| provider.default_model().to_string()),
            max_tokens: provider.default_max_tokens(),
            temperature: 0.5,
            client: reqwest::Client::new(),
        }
    }

    /// Create an LLM adapter from environment variables
    ///
    /// `AI_PROVIDER` selects the provider explicitly. Without it the first of
    /// `OPENAI_API_KEY`, `ANTHROPIC_API_KEY` that is set wins.
    pub fn from_env() -> AgentResult<Self> {
        let model = std::env::var("SITEFAB_LLM_MODEL").ok().filter(|m| !m.is_empty());

        if let Ok(name) = std::env::var("AI_PROVIDER") {
            let provider = LlmProvider::parse(&name).ok_or_else(|| {
                AgentError::NotConfigured(format!(
                    "unsupported AI_PROVIDER '{}', expected openai or anthropic",
                    name
                ))
            })?;
            let api_key = std::env::var(provider.api_key_var())
                .ok()
                .filter(|k| !k.is_empty())
                .ok_or_else(|| {
                    AgentError::NotConfigured(format!("{} is not set", provider.api_key_var()))
                })?;
            return Ok(Self::new(provider, api_key, model));
        }

        for provider in [LlmProvider::OpenAI, LlmProvider::Anthropic] {
            if let Ok(api_key) = std::env::var(provider.api_key_var()) {
                if !api_key.is_empty() {
                    return Ok(Self::new(provider, api_key, model));
                }
            }
        }

        Err(AgentError::NotConfigured(
            "set OPENAI_API_KEY or ANTHROPIC_API_KEY".to_string(),
        ))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Get the current provider
    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    /// Get the current model
    pub fn model(&self) -> &str {
        &self.model
    }

    // OpenAI chat completion
    async fn complete_openai(&self, role: AgentRole, system: &str, user: &str) -> AgentResult<String> {
        let request = OpenAIRequest {
            model: self.model.clone(),
            messages: vec![
                OpenAIMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                OpenAIMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            response_format: ResponseFormat {
                kind: "json_object".to_string(),
            },
        };

        let response = self
            .client
            .post(OPENAI_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::invocation(role, format!("Network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::invocation(
                role,
                format!("OpenAI API error {}: {}", status, body),
            ));
        }

        let result: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| AgentError::invocation(role, format!("Failed to parse response: {}", e)))?;

        result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AgentError::invocation(role, "No response from OpenAI"))
    }

    // Anthropic chat completion
    async fn complete_anthropic(
        &self,
        role: AgentRole,
        system: &str,
        user: &str,
    ) -> AgentResult<String> {
        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system: system.to_string(),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: user.to_string(),
            }],
        };

        let response = self
            .client
            .post(ANTHROPIC_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::invocation(role, format!("Network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::invocation(
                role,
                format!("Anthropic API error {}: {}", status, body),
            ));
        }

        let result: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| AgentError::invocation(role, format!("Failed to parse response: {}", e)))?;

        result
            .content
            .into_iter()
            .find_map(|c| c.text)
            .ok_or_else(|| AgentError::invocation(role, "No response from Anthropic"))
    }
}

#[async_trait]
impl CompletionClient for LlmAdapter {
    async fn complete(&self, role: AgentRole, system: &str, user: &str) -> AgentResult<String> {
        debug!(role = %role, provider = %self.provider, model = %self.model, "LLM request");
        match self.provider {
            LlmProvider::OpenAI => self.complete_openai(role, system, user).await,
            LlmProvider::Anthropic => self.complete_anthropic(role, system, user).await,
        }
    }
}

// OpenAI API types
#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    max_tokens: u32,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

// Anthropic API types
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    system: String,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parse() {
        assert_eq!(LlmProvider::parse("OpenAI"), Some(LlmProvider::OpenAI));
        assert_eq!(LlmProvider::parse(" anthropic "), Some(LlmProvider::Anthropic));
        assert_eq!(LlmProvider::parse("gemini"), None);
    }

    #[test]
    fn test_adapter_defaults() {
        let adapter = LlmAdapter::new(LlmProvider::Anthropic, "key", None);
        assert_eq!(adapter.model(), "claude-3-haiku-20240307");
        assert_eq!(adapter.max_tokens, 4096);

        let adapter = LlmAdapter::new(LlmProvider::OpenAI, "key", Some("gpt-4o".to_string()))
            .with_max_tokens(1000)
            .with_temperature(0.2);
        assert_eq!(adapter.model(), "gpt-4o");
        assert_eq!(adapter.max_tokens, 1000);
        assert_eq!(adapter.provider(), LlmProvider::OpenAI);
    }

    #[test]
    fn test_openai_request_shape() {
        let request = OpenAIRequest {
            model: "m".to_string(),
            messages: Vec::new(),
            max_tokens: 10,
            temperature: 0.5,
            response_format: ResponseFormat {
                kind: "json_object".to_string(),
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["response_format"]["type"], "json_object");
    }
}
