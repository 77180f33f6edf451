//! Google Gemini backend
//!
//! Calls the Generative Language API `models/{model}:generateContent`
//! endpoint with the whole conversation as `contents`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use creditai_config::ChatConfig;
use creditai_core::{Turn, TurnRole};

use crate::backend::{FinishReason, GenerationResult, LlmBackend};
use crate::LlmError;

/// Configuration for the Gemini backend
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    /// API base URL (for testing or proxy)
    pub endpoint: String,
    pub timeout: Duration,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .finish()
    }
}

impl GeminiConfig {
    /// Create config with API key and default model
    pub fn new(api_key: impl Into<String>) -> Self {
        let defaults = ChatConfig::default();
        Self {
            api_key: api_key.into(),
            model: defaults.model,
            endpoint: defaults.endpoint,
            timeout: Duration::from_secs(defaults.timeout_seconds),
            temperature: None,
            max_output_tokens: None,
        }
    }

    /// Build from chat settings; the API key must be present
    pub fn from_settings(chat: &ChatConfig) -> Result<Self, LlmError> {
        let api_key = chat
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| LlmError::Configuration("chat.api_key is not set".to_string()))?;

        Ok(Self {
            api_key,
            model: chat.model.clone(),
            endpoint: chat.endpoint.clone(),
            timeout: Duration::from_secs(chat.timeout_seconds),
            temperature: chat.temperature,
            max_output_tokens: chat.max_output_tokens,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature.clamp(0.0, 2.0));
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

/// Gemini backend
pub struct GeminiBackend {
    config: GeminiConfig,
    client: Client,
}

impl GeminiBackend {
    pub fn new(config: GeminiConfig) -> Result<Self, LlmError> {
        if config.api_key.is_empty() {
            return Err(LlmError::Configuration(
                "Gemini API key not set. Set CREDITAI__CHAT__API_KEY.".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn build_request(&self, turns: &[Turn]) -> GeminiRequest {
        let contents = turns
            .iter()
            .map(|turn| GeminiContent {
                role: match turn.role {
                    TurnRole::User => "user".to_string(),
                    TurnRole::Assistant => "model".to_string(),
                },
                parts: vec![GeminiPart {
                    text: turn.content.clone(),
                }],
            })
            .collect();

        let generation_config =
            if self.config.temperature.is_some() || self.config.max_output_tokens.is_some() {
                Some(GeminiGenerationConfig {
                    temperature: self.config.temperature,
                    max_output_tokens: self.config.max_output_tokens,
                })
            } else {
                None
            };

        GeminiRequest {
            contents,
            generation_config,
        }
    }
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    async fn generate(&self, turns: &[Turn]) -> Result<GenerationResult, LlmError> {
        if turns.is_empty() {
            return Err(LlmError::Generation("no turns to send".to_string()));
        }

        let start = Instant::now();
        let request = self.build_request(turns);

        let response = self
            .client
            .post(self.config.url())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, error_text)));
        }

        let response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let mut result = parse_response(response)?;
        result.total_time_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            model = %self.config.model,
            turns = turns.len(),
            latency_ms = result.total_time_ms,
            "Gemini generation complete"
        );
        Ok(result)
    }

    async fn is_available(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

fn parse_response(response: GeminiResponse) -> Result<GenerationResult, LlmError> {
    let candidate = match response.candidates.into_iter().next() {
        Some(candidate) => candidate,
        None => {
            let reason = response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates".to_string());
            return Err(LlmError::InvalidResponse(format!(
                "prompt rejected: {}",
                reason
            )));
        },
    };

    let finish_reason = match candidate.finish_reason.as_deref() {
        Some("STOP") | None => FinishReason::Stop,
        Some("MAX_TOKENS") => FinishReason::Length,
        Some("SAFETY") | Some("RECITATION") | Some("BLOCKLIST") | Some("PROHIBITED_CONTENT") => {
            FinishReason::Safety
        },
        Some(_) => FinishReason::Other,
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(LlmError::InvalidResponse(format!(
            "empty candidate (finish reason {:?})",
            finish_reason
        )));
    }

    Ok(GenerationResult {
        text,
        tokens: response
            .usage_metadata
            .and_then(|u| u.candidates_token_count),
        total_time_ms: 0,
        finish_reason,
    })
}

// =============================================================================
// Gemini API Types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    candidates_token_count: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = GeminiConfig::new("test-key")
            .with_model("gemini-1.5-pro")
            .with_temperature(3.0)
            .with_max_output_tokens(512)
            .with_endpoint("http://localhost:8089/");

        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.temperature, Some(2.0));
        assert_eq!(
            config.url(),
            "http://localhost:8089/v1beta/models/gemini-1.5-pro:generateContent"
        );
        assert!(!format!("{:?}", config).contains("test-key"));
    }

    #[test]
    fn test_default_model() {
        let config = GeminiConfig::new("k");
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(
            config.url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(matches!(
            GeminiBackend::new(GeminiConfig::new("")),
            Err(LlmError::Configuration(_))
        ));
        assert!(matches!(
            GeminiConfig::from_settings(&ChatConfig::default()),
            Err(LlmError::Configuration(_))
        ));
    }

    #[test]
    fn test_request_serialization() {
        let backend = GeminiBackend::new(GeminiConfig::new("k").with_temperature(0.2)).unwrap();
        let turns = vec![
            Turn::user("first question"),
            Turn::assistant("first answer"),
            Turn::user("second question"),
        ];

        let json = serde_json::to_value(backend.build_request(&turns)).unwrap();
        assert_eq!(json["contents"].as_array().unwrap().len(), 3);
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["contents"][2]["parts"][0]["text"], "second question");
        assert!((json["generationConfig"]["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
        assert!(json["generationConfig"].get("maxOutputTokens").is_none());
    }

    #[test]
    fn test_request_without_generation_config() {
        let backend = GeminiBackend::new(GeminiConfig::new("k")).unwrap();
        let json = serde_json::to_value(backend.build_request(&[Turn::user("hi")])).unwrap();
        assert!(json.get("generationConfig").is_none());
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "Your score "}, {"text": "is strong."}], "role": "model"},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 120, "candidatesTokenCount": 6, "totalTokenCount": 126}
        }"#;

        let response: GeminiResponse = serde_json::from_str(json).unwrap();
        let result = parse_response(response).unwrap();
        assert_eq!(result.text, "Your score is strong.");
        assert_eq!(result.tokens, Some(6));
        assert_eq!(result.finish_reason, FinishReason::Stop);
    }

    #[test]
    fn test_blocked_prompt_is_an_error() {
        let json = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let response: GeminiResponse = serde_json::from_str(json).unwrap();
        match parse_response(response) {
            Err(LlmError::InvalidResponse(msg)) => assert!(msg.contains("SAFETY")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        let backend = GeminiBackend::new(
            GeminiConfig::new("k")
                .with_endpoint("http://127.0.0.1:1")
                .with_timeout(Duration::from_secs(2)),
        )
        .unwrap();

        let err = backend.generate(&[Turn::user("hi")]).await.unwrap_err();
        assert!(matches!(err, LlmError::Network(_) | LlmError::Timeout));
    }
}
