//! LLM backends
//!
//! One `LlmBackend` trait, three wire formats: OpenAI-style chat completions
//! (OpenAI, OpenRouter, local servers), Anthropic messages and Gemini
//! `generateContent`. Every reply is untrusted text.

use std::sync::Arc;
use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

const OPENROUTER_BASE: &str = "https://openrouter.ai/api/v1";
const ANTHROPIC_MESSAGES: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    Api(String),

    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("Backend misconfigured: {0}")]
    Config(String),

    #[error("Rate limited by provider")]
    RateLimited,

    #[error("Model returned no text")]
    EmptyResponse,

    #[error("LLM call timed out after {0}s")]
    Timeout(u64),
}

/// Per-call sampling options
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_output_tokens: 2000,
            temperature: 0.7,
        }
    }
}

impl GenerationOptions {
    pub fn new(max_output_tokens: u32, temperature: f32) -> Self {
        Self {
            max_output_tokens,
            temperature: temperature.clamp(0.0, 2.0),
        }
    }
}

/// A text-in, text-out language model
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn generate(&self, prompt: &str, options: &GenerationOptions)
        -> Result<String, LlmError>;

    /// Model identifier recorded in research sources
    fn model_name(&self) -> &str;
}

pub type SharedBackend = Arc<dyn LlmBackend>;

/// Run one generation with an upper bound on wall-clock time
pub async fn generate_bounded(
    backend: &dyn LlmBackend,
    prompt: &str,
    options: &GenerationOptions,
    limit: Duration,
) -> Result<String, LlmError> {
    match tokio::time::timeout(limit, backend.generate(prompt, options)).await {
        Ok(result) => result,
        Err(_) => Err(LlmError::Timeout(limit.as_secs())),
    }
}

/// Which hosted API (or local server) a backend talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    OpenAi,
    OpenRouter,
    Anthropic,
    Local,
}

impl ProviderKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Gemini => "Gemini",
            Self::OpenAi => "OpenAI",
            Self::OpenRouter => "OpenRouter",
            Self::Anthropic => "Anthropic",
            Self::Local => "local server",
        }
    }

    fn needs_key(self) -> bool {
        !matches!(self, Self::Local)
    }
}

/// Connection settings for any supported provider
#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub provider: ProviderKind,
    pub api_key: String,
    pub model: String,
    /// Overrides the provider's default endpoint
    pub base_url: Option<String>,
}

impl BackendSettings {
    pub fn new(provider: ProviderKind, api_key: &str, model: &str) -> Self {
        Self {
            provider,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: None,
        }
    }

    /// An OpenAI-compatible server that takes any key
    pub fn local(base_url: &str, model: &str) -> Self {
        Self::new(ProviderKind::Local, "sk-local", model).with_base_url(base_url)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(base_url.trim_end_matches('/').to_string());
        self
    }

    fn endpoint(&self, default: &str) -> String {
        self.base_url.clone().unwrap_or_else(|| default.to_string())
    }

    /// Validate the settings and build the matching backend
    pub fn connect(self) -> Result<SharedBackend, LlmError> {
        if self.provider.needs_key() && self.api_key.trim().is_empty() {
            return Err(LlmError::Config(format!(
                "{} API key is empty",
                self.provider.label()
            )));
        }
        if self.model.trim().is_empty() {
            return Err(LlmError::Config("model name is empty".to_string()));
        }

        let backend: SharedBackend = match self.provider {
            ProviderKind::OpenAi | ProviderKind::OpenRouter | ProviderKind::Local => {
                Arc::new(ChatCompletionsBackend::new(self))
            }
            ProviderKind::Anthropic => Arc::new(AnthropicBackend::new(self)),
            ProviderKind::Gemini => Arc::new(GeminiBackend::new(self)),
        };
        Ok(backend)
    }
}

/// OpenAI chat-completions wire format via `async-openai`
pub struct ChatCompletionsBackend {
    client: Client<OpenAIConfig>,
    model: String,
}

impl ChatCompletionsBackend {
    fn new(settings: BackendSettings) -> Self {
        let mut config = OpenAIConfig::new().with_api_key(&settings.api_key);
        match settings.provider {
            ProviderKind::OpenRouter => {
                config = config.with_api_base(settings.endpoint(OPENROUTER_BASE));
            }
            _ => {
                if let Some(base) = &settings.base_url {
                    config = config.with_api_base(base);
                }
            }
        }
        Self {
            client: Client::with_config(config),
            model: settings.model,
        }
    }
}

#[async_trait]
impl LlmBackend for ChatCompletionsBackend {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| LlmError::Api(e.to_string()))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![ChatCompletionRequestMessage::User(user)])
            .temperature(options.temperature)
            .max_tokens(options.max_output_tokens)
            .build()
            .map_err(|e| LlmError::Api(e.to_string()))?;

        let reply = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| LlmError::Api(e.to_string()))?;

        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// POST a JSON body and decode the JSON reply, mapping HTTP failures
async fn post_json(
    request: reqwest::RequestBuilder,
    body: &Value,
    provider: &'static str,
) -> Result<Value, LlmError> {
    let response = request
        .header("content-type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| LlmError::Api(e.to_string()))?;

    let status = response.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(LlmError::RateLimited);
    }
    if !status.is_success() {
        return Err(LlmError::Status {
            provider,
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        });
    }

    response
        .json()
        .await
        .map_err(|e| LlmError::Api(e.to_string()))
}

/// Concatenate the `text` fields of a list of content blocks
fn joined_text(blocks: Option<&Vec<Value>>) -> Result<String, LlmError> {
    let text: String = blocks
        .into_iter()
        .flatten()
        .filter_map(|block| block["text"].as_str())
        .collect();
    if text.trim().is_empty() {
        Err(LlmError::EmptyResponse)
    } else {
        Ok(text)
    }
}

/// Anthropic messages API
pub struct AnthropicBackend {
    http: reqwest::Client,
    settings: BackendSettings,
}

impl AnthropicBackend {
    fn new(settings: BackendSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }
}

#[async_trait]
impl LlmBackend for AnthropicBackend {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        let body = serde_json::json!({
            "model": self.settings.model,
            "max_tokens": options.max_output_tokens,
            // Anthropic caps temperature at 1.0
            "temperature": options.temperature.min(1.0),
            "messages": [{"role": "user", "content": prompt}],
        });

        let request = self
            .http
            .post(self.settings.endpoint(ANTHROPIC_MESSAGES))
            .header("x-api-key", &self.settings.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION);
        let reply = post_json(request, &body, "Anthropic").await?;

        joined_text(reply["content"].as_array())
    }

    fn model_name(&self) -> &str {
        &self.settings.model
    }
}

/// Google Gemini `generateContent` REST endpoint
pub struct GeminiBackend {
    http: reqwest::Client,
    settings: BackendSettings,
}

impl GeminiBackend {
    fn new(settings: BackendSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        let body = serde_json::json!({
            "contents": [{"role": "user", "parts": [{"text": prompt}]}],
            "generationConfig": {
                "maxOutputTokens": options.max_output_tokens,
                "temperature": options.temperature,
            },
        });

        let url = format!(
            "{}/models/{}:generateContent",
            self.settings.endpoint(GEMINI_BASE),
            self.settings.model
        );
        let request = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.settings.api_key);
        let reply = post_json(request, &body, "Gemini").await?;

        joined_text(reply["candidates"][0]["content"]["parts"].as_array())
    }

    fn model_name(&self) -> &str {
        &self.settings.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct SlowBackend;

    #[async_trait]
    impl LlmBackend for SlowBackend {
        async fn generate(
            &self,
            _prompt: &str,
            _options: &GenerationOptions,
        ) -> Result<String, LlmError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("late".to_string())
        }

        fn model_name(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_generate_bounded_times_out() {
        let result = generate_bounded(
            &SlowBackend,
            "prompt",
            &GenerationOptions::default(),
            Duration::from_millis(20),
        )
        .await;

        assert!(matches!(result, Err(LlmError::Timeout(_))));
    }

    #[test]
    fn test_connect_rejects_missing_key() {
        for provider in [ProviderKind::Gemini, ProviderKind::Anthropic, ProviderKind::OpenRouter] {
            let result = BackendSettings::new(provider, "  ", "some-model").connect();
            assert!(matches!(result, Err(LlmError::Config(_))));
        }
    }

    #[tokio::test]
    async fn test_local_needs_no_key() {
        let backend = BackendSettings::local("http://localhost:11434/v1/", "llama3")
            .connect()
            .unwrap();
        assert_eq!(backend.model_name(), "llama3");
    }

    #[test]
    fn test_base_url_override() {
        let settings = BackendSettings::new(ProviderKind::Gemini, "k", "gemini-2.0-flash")
            .with_base_url("http://proxy.test/v1beta/");
        assert_eq!(settings.endpoint(GEMINI_BASE), "http://proxy.test/v1beta");
        assert_eq!(
            BackendSettings::new(ProviderKind::Gemini, "k", "m").endpoint(GEMINI_BASE),
            GEMINI_BASE
        );
    }

    #[test]
    fn test_joined_text() {
        let parts = json!([{"text": "Hello, "}, {"inline": 1}, {"text": "world"}]);
        assert_eq!(joined_text(parts.as_array()).unwrap(), "Hello, world");
        assert!(matches!(joined_text(None), Err(LlmError::EmptyResponse)));
    }

    #[test]
    fn test_options_clamp_temperature() {
        assert_eq!(GenerationOptions::new(100, 3.5).temperature, 2.0);
    }
}
