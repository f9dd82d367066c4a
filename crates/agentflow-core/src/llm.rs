//! Model clients: the remote text-generation services agents delegate to.
//!
//! The executors only see the [`ModelClient`] trait. [`HttpModelClient`]
//! implements it over three HTTP APIs:
//!
//! - `gemini`    : `POST {base_url}/v1beta/models/{model}:generateContent`
//! - `anthropic` : `POST {base_url}/v1/messages` (Anthropic-compatible Messages API)
//! - `openai`    : `POST {base_url}/chat/completions` (OpenAI-compatible)
//!
//! No retries happen here or anywhere above. A failed call surfaces as a
//! [`ModelError`] and fails the workflow step that made it.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::resolve_env_vars;
use crate::error::{ModelError, WorkflowError};

/// Sampling temperature used for every agent call unless configured.
pub const DEFAULT_TEMPERATURE: f64 = 0.2;

const DEFAULT_TIMEOUT_SECS: u64 = 300;
const DEFAULT_MAX_TOKENS: u32 = 8192;

/// One generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub system: String,
    pub user: String,
    pub temperature: f64,
}

/// A remote text-generation service.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Provider name, for logs.
    fn name(&self) -> &str;

    async fn generate(&self, request: GenerateRequest) -> Result<String, ModelError>;
}

// ─── Provider configuration ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    Gemini,
    Anthropic,
    Openai,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Openai => "openai",
        }
    }

    fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini-flash-latest",
            ProviderKind::Anthropic => "claude-sonnet-4-20250514",
            ProviderKind::Openai => "gpt-4o-mini",
        }
    }

    fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com",
            ProviderKind::Anthropic => "https://api.anthropic.com",
            ProviderKind::Openai => "https://api.openai.com/v1",
        }
    }

    fn model_env(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "GEMINI_MODEL",
            ProviderKind::Anthropic => "ANTHROPIC_MODEL",
            ProviderKind::Openai => "OPENAI_MODEL",
        }
    }

    fn base_url_env(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "GEMINI_BASE_URL",
            ProviderKind::Anthropic => "ANTHROPIC_BASE_URL",
            ProviderKind::Openai => "OPENAI_BASE_URL",
        }
    }

    fn api_key_envs(&self) -> &'static [&'static str] {
        match self {
            ProviderKind::Gemini => &["GEMINI_API_KEY"],
            ProviderKind::Anthropic => &["ANTHROPIC_AUTH_TOKEN", "ANTHROPIC_API_KEY"],
            ProviderKind::Openai => &["OPENAI_API_KEY"],
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "openai" | "opencode" => Ok(ProviderKind::Openai),
            other => Err(WorkflowError::config(format!(
                "Unknown provider type: '{}' (expected gemini, anthropic or openai)",
                other
            ))),
        }
    }
}

/// The `provider` block of the workflow YAML. Every field is optional and
/// falls back to environment variables, then to provider defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub base_url: Option<String>,

    /// API key (supports `${ENV_VAR}` references)
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub temperature: Option<f64>,

    #[serde(default)]
    pub timeout_secs: Option<u64>,

    #[serde(default)]
    pub max_tokens: Option<u32>,
}

/// Fully-resolved provider settings.
#[derive(Clone, PartialEq)]
pub struct ResolvedProvider {
    pub kind: ProviderKind,
    pub model: String,
    pub base_url: String,
    pub api_key: String,
    pub temperature: f64,
    pub timeout: Duration,
    pub max_tokens: u32,
}

impl fmt::Debug for ResolvedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedProvider")
            .field("kind", &self.kind)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl ProviderConfig {
    /// Resolve against the process environment.
    pub fn resolve(&self) -> Result<ResolvedProvider, WorkflowError> {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolve using `env` for variable lookups.
    ///
    /// Precedence for each field: YAML value → environment → default.
    /// A missing API key is a configuration error.
    pub fn resolve_with<F>(&self, env: F) -> Result<ResolvedProvider, WorkflowError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let expand = |value: &String| -> Option<String> {
            let resolved = resolve_env_vars(value, &env);
            let resolved = resolved.trim();
            // An unresolved `${VAR}` counts as unset.
            if resolved.is_empty() || resolved.contains("${") {
                None
            } else {
                Some(resolved.to_string())
            }
        };
        let from_env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let kind = match self.kind.as_ref().and_then(expand) {
            Some(k) => k.parse()?,
            None => match from_env("AGENTFLOW_PROVIDER") {
                Some(k) => k.parse()?,
                None => ProviderKind::default(),
            },
        };

        let model = self
            .model
            .as_ref()
            .and_then(expand)
            .or_else(|| from_env(kind.model_env()))
            .unwrap_or_else(|| kind.default_model().to_string());

        let base_url = self
            .base_url
            .as_ref()
            .and_then(expand)
            .or_else(|| from_env(kind.base_url_env()))
            .unwrap_or_else(|| kind.default_base_url().to_string());

        let api_key = self
            .api_key
            .as_ref()
            .and_then(expand)
            .or_else(|| kind.api_key_envs().iter().find_map(|k| from_env(k)))
            .ok_or_else(|| {
                WorkflowError::config(format!(
                    "No API key found for provider '{}'. Set {} or specify provider.api_key in the workflow file.",
                    kind,
                    kind.api_key_envs().join(" or ")
                ))
            })?;

        let temperature = check_temperature(self.temperature.unwrap_or(DEFAULT_TEMPERATURE))?;

        Ok(ResolvedProvider {
            kind,
            model,
            base_url,
            api_key,
            temperature,
            timeout: Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        })
    }
}

/// Reject sampling temperatures outside `0..=2`.
pub(crate) fn check_temperature(temperature: f64) -> Result<f64, WorkflowError> {
    if (0.0..=2.0).contains(&temperature) {
        Ok(temperature)
    } else {
        Err(WorkflowError::config(format!(
            "provider.temperature must be between 0 and 2, got {}",
            temperature
        )))
    }
}

// ─── HTTP client ─────────────────────────────────────────────────────────

/// Calls a model provider over HTTP.
pub struct HttpModelClient {
    client: reqwest::Client,
    provider: ResolvedProvider,
}

impl HttpModelClient {
    pub fn new(provider: ResolvedProvider) -> Result<Self, WorkflowError> {
        let client = reqwest::Client::builder()
            .timeout(provider.timeout)
            .build()
            .map_err(|e| WorkflowError::config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, provider })
    }

    pub fn provider(&self) -> &ResolvedProvider {
        &self.provider
    }

    async fn call_gemini(&self, request: &GenerateRequest) -> Result<String, ModelError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.provider.base_url.trim_end_matches('/'),
            self.provider.model
        );

        let body = serde_json::json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [{ "text": format!("{}\n\n{}", request.system, request.user) }]
                }
            ],
            "generationConfig": {
                "temperature": request.temperature
            }
        });

        tracing::info!(
            "[ModelClient] Calling Gemini API: {} (model: {})",
            url,
            self.provider.model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.provider.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let json = read_json(response).await?;
        extract_gemini_text(&json)
    }

    async fn call_anthropic(&self, request: &GenerateRequest) -> Result<String, ModelError> {
        let url = format!("{}/v1/messages", self.provider.base_url.trim_end_matches('/'));

        let mut body = serde_json::json!({
            "model": self.provider.model,
            "max_tokens": self.provider.max_tokens,
            "temperature": request.temperature,
            "messages": [
                {
                    "role": "user",
                    "content": request.user
                }
            ]
        });
        if !request.system.is_empty() {
            body["system"] = serde_json::Value::String(request.system.clone());
        }

        tracing::info!(
            "[ModelClient] Calling Anthropic API: {} (model: {})",
            url,
            self.provider.model
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.provider.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let json = read_json(response).await?;
        extract_anthropic_text(&json)
    }

    async fn call_openai(&self, request: &GenerateRequest) -> Result<String, ModelError> {
        let url = format!(
            "{}/chat/completions",
            self.provider.base_url.trim_end_matches('/')
        );

        let mut messages = vec![];
        if !request.system.is_empty() {
            messages.push(serde_json::json!({
                "role": "system",
                "content": request.system
            }));
        }
        messages.push(serde_json::json!({
            "role": "user",
            "content": request.user
        }));

        let body = serde_json::json!({
            "model": self.provider.model,
            "messages": messages,
            "temperature": request.temperature
        });

        tracing::info!(
            "[ModelClient] Calling OpenAI API: {} (model: {})",
            url,
            self.provider.model
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.provider.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let json = read_json(response).await?;
        extract_openai_text(&json)
    }
}

#[async_trait]
impl ModelClient for HttpModelClient {
    fn name(&self) -> &str {
        self.provider.kind.as_str()
    }

    async fn generate(&self, request: GenerateRequest) -> Result<String, ModelError> {
        match self.provider.kind {
            ProviderKind::Gemini => self.call_gemini(&request).await,
            ProviderKind::Anthropic => self.call_anthropic(&request).await,
            ProviderKind::Openai => self.call_openai(&request).await,
        }
    }
}

/// Read a response body as JSON, turning non-2xx statuses into `ModelError::Api`.
async fn read_json(response: reqwest::Response) -> Result<serde_json::Value, ModelError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(ModelError::Api {
            status: status.as_u16(),
            message: text,
        });
    }

    Ok(serde_json::from_str(&text)?)
}

fn non_empty(text: String) -> Result<String, ModelError> {
    if text.trim().is_empty() {
        Err(ModelError::EmptyResponse)
    } else {
        Ok(text)
    }
}

/// Concatenate `candidates[0].content.parts[].text`.
fn extract_gemini_text(json: &serde_json::Value) -> Result<String, ModelError> {
    let parts = json
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|arr| arr.first())
        .and_then(|cand| cand.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(|p| p.as_array())
        .ok_or_else(|| ModelError::InvalidResponse("missing candidates[0].content.parts".into()))?;

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
        .collect();
    non_empty(text)
}

/// Join the `text` blocks of an Anthropic `content` array.
fn extract_anthropic_text(json: &serde_json::Value) -> Result<String, ModelError> {
    let blocks = json
        .get("content")
        .and_then(|c| c.as_array())
        .ok_or_else(|| ModelError::InvalidResponse("missing content array".into()))?;

    let text = blocks
        .iter()
        .filter(|block| block.get("type").and_then(|t| t.as_str()) == Some("text"))
        .filter_map(|block| block.get("text").and_then(|t| t.as_str()))
        .collect::<Vec<_>>()
        .join("\n");
    non_empty(text)
}

/// `choices[0].message.content` of an OpenAI-compatible response.
fn extract_openai_text(json: &serde_json::Value) -> Result<String, ModelError> {
    let text = json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|arr| arr.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|msg| msg.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| ModelError::InvalidResponse("missing choices[0].message.content".into()))?;
    non_empty(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!("gemini".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
        assert_eq!("Claude".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
        assert_eq!("openai".parse::<ProviderKind>().unwrap(), ProviderKind::Openai);
        assert!("llama".parse::<ProviderKind>().unwrap_err().is_configuration());
    }

    #[test]
    fn test_resolve_defaults_to_gemini() {
        let resolved = ProviderConfig::default()
            .resolve_with(env_of(&[("GEMINI_API_KEY", "k-123")]))
            .unwrap();
        assert_eq!(resolved.kind, ProviderKind::Gemini);
        assert_eq!(resolved.model, "gemini-flash-latest");
        assert_eq!(resolved.api_key, "k-123");
        assert_eq!(resolved.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(resolved.timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_resolve_precedence() {
        let config = ProviderConfig {
            kind: Some("anthropic".to_string()),
            model: Some("${MY_MODEL}".to_string()),
            api_key: Some("${MY_KEY}".to_string()),
            base_url: Some("${MY_BASE:-http://localhost:9000}".to_string()),
            ..Default::default()
        };
        let resolved = config
            .resolve_with(env_of(&[
                ("MY_MODEL", "claude-x"),
                ("MY_KEY", "secret"),
                ("ANTHROPIC_API_KEY", "ignored"),
            ]))
            .unwrap();
        assert_eq!(resolved.kind, ProviderKind::Anthropic);
        assert_eq!(resolved.model, "claude-x");
        assert_eq!(resolved.api_key, "secret");
        assert_eq!(resolved.base_url, "http://localhost:9000");
    }

    #[test]
    fn test_provider_from_env() {
        let resolved = ProviderConfig::default()
            .resolve_with(env_of(&[
                ("AGENTFLOW_PROVIDER", "openai"),
                ("OPENAI_API_KEY", "sk"),
                ("OPENAI_MODEL", "gpt-test"),
            ]))
            .unwrap();
        assert_eq!(resolved.kind, ProviderKind::Openai);
        assert_eq!(resolved.model, "gpt-test");
    }

    #[test]
    fn test_missing_api_key_is_configuration_error() {
        let config = ProviderConfig {
            api_key: Some("${NOT_SET_ANYWHERE}".to_string()),
            ..Default::default()
        };
        let err = config.resolve_with(env_of(&[])).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let resolved = ProviderConfig::default()
            .resolve_with(env_of(&[("GEMINI_API_KEY", "super-secret")]))
            .unwrap();
        let debug = format!("{:?}", resolved);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_extract_gemini_text() {
        let json = serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Hello " }, { "text": "world" }] }
            }]
        });
        assert_eq!(extract_gemini_text(&json).unwrap(), "Hello world");

        let empty = serde_json::json!({ "candidates": [{ "content": { "parts": [] } }] });
        assert!(matches!(extract_gemini_text(&empty), Err(ModelError::EmptyResponse)));

        let blocked = serde_json::json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        assert!(matches!(
            extract_gemini_text(&blocked),
            Err(ModelError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_extract_anthropic_text() {
        let json = serde_json::json!({
            "content": [
                { "type": "text", "text": "first" },
                { "type": "tool_use", "id": "x" },
                { "type": "text", "text": "second" }
            ]
        });
        assert_eq!(extract_anthropic_text(&json).unwrap(), "first\nsecond");
    }

    #[test]
    fn test_extract_openai_text() {
        let json = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "answer" } }]
        });
        assert_eq!(extract_openai_text(&json).unwrap(), "answer");
        assert!(extract_openai_text(&serde_json::json!({})).is_err());
    }
}
