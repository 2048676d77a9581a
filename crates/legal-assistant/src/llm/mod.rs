//! Generation backend.
//!
//! Agents never see transport errors: [`GenerationClient`] absorbs every
//! failure (network, HTTP status, empty body, malformed JSON) into
//! [`Generated::Empty`], and each agent decides its own deterministic fallback.

pub mod gemini;

pub use gemini::GeminiProvider;

use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::LlmConfig;

/// Gemini-style `generateContent` endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum ApiProvider {
    #[default]
    Google,
    /// Full URL of a Gemini-compatible `generateContent` endpoint (proxy, gateway).
    Custom { endpoint: String },
}

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub max_tokens: usize,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    /// Ask the backend for `application/json` output.
    pub json_response: bool,
}

impl From<&LlmConfig> for GenerationConfig {
    fn from(config: &LlmConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k,
            json_response: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub name: String,
    pub model: String,
}

#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion
    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String>;

    fn info(&self) -> ProviderInfo;
}

/// Outcome of a generation call once failures have been absorbed.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum Generated<T> {
    Value(T),
    Empty,
}

impl<T> Generated<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Value(v) => Some(v),
            Self::Empty => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn unwrap_or(self, fallback: T) -> T {
        self.into_option().unwrap_or(fallback)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Generated<U> {
        match self {
            Self::Value(v) => Generated::Value(f(v)),
            Self::Empty => Generated::Empty,
        }
    }
}

/// Shared handle to the configured provider. Cheap to clone; without a
/// provider every call yields `Empty`.
#[derive(Clone)]
pub struct GenerationClient {
    provider: Option<Arc<dyn LLMProvider>>,
    defaults: GenerationConfig,
}

impl GenerationClient {
    pub fn new(provider: Arc<dyn LLMProvider>, defaults: GenerationConfig) -> Self {
        let info = provider.info();
        tracing::info!(provider = %info.name, model = %info.model, "Generation backend ready");
        Self {
            provider: Some(provider),
            defaults,
        }
    }

    pub fn disabled(defaults: GenerationConfig) -> Self {
        tracing::warn!("No generation backend configured; model-backed answers will be empty");
        Self {
            provider: None,
            defaults,
        }
    }

    /// Gemini client from config, or a disabled client when no API key is set.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let defaults = GenerationConfig::from(config);
        match config.resolved_api_key() {
            Some(api_key) => {
                let provider = GeminiProvider::new(config, api_key)?;
                Ok(Self::new(Arc::new(provider), defaults))
            }
            None => {
                tracing::warn!("GEMINI_API_KEY is not set");
                Ok(Self::disabled(defaults))
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    pub async fn generate_text(&self, prompt: &str) -> Generated<String> {
        self.call(prompt, self.defaults.clone()).await
    }

    pub async fn generate_text_limited(&self, prompt: &str, max_tokens: usize) -> Generated<String> {
        let config = GenerationConfig {
            max_tokens,
            ..self.defaults.clone()
        };
        self.call(prompt, config).await
    }

    /// Request JSON output and parse it into `T`. Parse failures are `Empty`.
    pub async fn generate_json<T: DeserializeOwned>(&self, prompt: &str) -> Generated<T> {
        let config = GenerationConfig {
            json_response: true,
            ..self.defaults.clone()
        };
        let Generated::Value(raw) = self.call(prompt, config).await else {
            return Generated::Empty;
        };
        match serde_json::from_str::<T>(extract_json_payload(&raw)) {
            Ok(value) => Generated::Value(value),
            Err(e) => {
                let preview: String = raw.chars().take(200).collect();
                tracing::warn!(error = %e, response = %preview, "Model returned unparseable JSON");
                Generated::Empty
            }
        }
    }

    async fn call(&self, prompt: &str, config: GenerationConfig) -> Generated<String> {
        let Some(provider) = &self.provider else {
            return Generated::Empty;
        };
        match provider.generate(prompt, &config).await {
            Ok(text) if !text.trim().is_empty() => Generated::Value(text.trim().to_string()),
            Ok(_) => {
                tracing::warn!("Model returned an empty response");
                Generated::Empty
            }
            Err(e) => {
                tracing::error!(error = %e, "Generation call failed");
                Generated::Empty
            }
        }
    }
}

/// Strip markdown fences and trailing chatter around a JSON object or array.
pub fn extract_json_payload(raw: &str) -> &str {
    let cleaned = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let start = cleaned.find(['{', '[']);
    let end = cleaned.rfind(['}', ']']);
    match (start, end) {
        (Some(start), Some(end)) if end > start => &cleaned[start..=end],
        _ => cleaned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;

    fn defaults() -> GenerationConfig {
        GenerationConfig {
            max_tokens: 1024,
            temperature: 0.3,
            top_p: 0.95,
            top_k: 40,
            json_response: false,
        }
    }

    #[test]
    fn test_extract_json_payload_strips_fences() {
        assert_eq!(extract_json_payload("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(extract_json_payload("Kết quả: [\"x\", \"y\"] xong"), "[\"x\", \"y\"]");
        assert_eq!(extract_json_payload("no json here"), "no json here");
    }

    #[tokio::test]
    async fn test_generate_json_parses_fenced_output() {
        let provider = ScriptedProvider::replying("```json\n{\"status\": \"FINAL\"}\n```");
        let client = GenerationClient::new(provider.clone(), defaults());

        let parsed: Generated<serde_json::Value> = client.generate_json("prompt").await;
        let value = parsed.into_option().unwrap();
        assert_eq!(value["status"], "FINAL");
        assert!(provider.configs()[0].json_response);
    }

    #[tokio::test]
    async fn test_unparseable_json_is_empty() {
        let client = GenerationClient::new(ScriptedProvider::replying("không phải json"), defaults());
        let parsed: Generated<Vec<String>> = client.generate_json("prompt").await;
        assert!(parsed.is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_is_empty() {
        let client = GenerationClient::new(ScriptedProvider::failing(), defaults());
        assert!(client.generate_text("prompt").await.is_empty());
    }

    #[tokio::test]
    async fn test_blank_output_is_empty() {
        let client = GenerationClient::new(ScriptedProvider::replying("   \n"), defaults());
        assert!(client.generate_text("prompt").await.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_client_is_empty() {
        let client = GenerationClient::disabled(defaults());
        assert!(!client.is_enabled());
        assert!(client.generate_text("prompt").await.is_empty());
    }

    #[tokio::test]
    async fn test_limited_call_overrides_max_tokens() {
        let provider = ScriptedProvider::replying("xin chào");
        let client = GenerationClient::new(provider.clone(), defaults());
        let text = client.generate_text_limited("hi", 128).await;
        assert_eq!(text, Generated::Value("xin chào".to_string()));
        assert_eq!(provider.configs()[0].max_tokens, 128);
    }
}
