// Text Generation Providers
// Gemini structured output and OpenAI-compatible chat completions behind one trait

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::env;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

use super::config_store::ConfigStore;

const GEMINI_DEFAULT_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const OPENAI_DEFAULT_URL: &str = "https://api.openai.com/v1/chat/completions";

pub const DEFAULT_PROVIDER: &str = "gemini";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TIMEOUT_SECS: u64 = 80;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Missing content in response")]
    MissingContent,
    #[error("JSON parse error: {0}")]
    JsonError(String),
    #[error("API key not configured")]
    MissingApiKey,
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderSpec {
    pub name: String,
    pub model: String,
}

pub fn parse_provider(spec: &str) -> ProviderSpec {
    let parts: Vec<&str> = spec.trim().splitn(2, ':').collect();
    if parts.len() == 2 {
        ProviderSpec {
            name: parts[0].to_lowercase(),
            model: parts[1].to_string(),
        }
    } else {
        ProviderSpec {
            name: spec.trim().to_lowercase(),
            model: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    OpenAi,
}

impl ProviderKind {
    pub fn from_name(name: &str) -> Result<Self, ProviderError> {
        match name {
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            "openai" => Ok(ProviderKind::OpenAi),
            other => Err(ProviderError::UnknownProvider(other.to_string())),
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            ProviderKind::Gemini => GEMINI_DEFAULT_MODEL,
            ProviderKind::OpenAi => OPENAI_DEFAULT_MODEL,
        }
    }

    fn default_url(self) -> String {
        match self {
            ProviderKind::Gemini => {
                env::var("GEMINI_API_URL").unwrap_or_else(|_| GEMINI_DEFAULT_URL.to_string())
            }
            ProviderKind::OpenAi => {
                env::var("OPENAI_API_URL").unwrap_or_else(|_| OPENAI_DEFAULT_URL.to_string())
            }
        }
    }
}

/// One outbound call: instruction, task prompt and the schema the answer must follow.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system_instruction: String,
    pub prompt: String,
    pub response_schema: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOutput {
    pub content: String,
    pub latency_ms: i64,
    pub model: String,
}

/// Capability to turn a prompt plus schema into structured JSON text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutput, ProviderError>;
}

#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    pub base_url: Option<String>,
    pub proxy: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    response_format: Value,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Option<Vec<ChatChoice>>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessageResponse>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

pub struct ProviderClient {
    client: Client,
    kind: ProviderKind,
    model: String,
    api_key: String,
    base_url: String,
}

impl ProviderClient {
    pub fn new(spec: &ProviderSpec, api_key: &str, options: &ClientOptions) -> Result<Self, ProviderError> {
        let kind = ProviderKind::from_name(&spec.name)?;
        if api_key.trim().is_empty() {
            return Err(ProviderError::MissingApiKey);
        }

        let timeout = Duration::from_secs(options.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        let mut builder = Client::builder().timeout(timeout);
        if let Some(ref proxy_url) = options.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }
        let client = builder.build()?;

        let model = if spec.model.trim().is_empty() {
            kind.default_model().to_string()
        } else {
            spec.model.trim().to_string()
        };
        let base_url = options
            .base_url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| kind.default_url());

        Ok(Self {
            client,
            kind,
            model,
            api_key: api_key.trim().to_string(),
            base_url,
        })
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn call_gemini(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );

        let body = json!({
            "systemInstruction": {
                "parts": [{ "text": request.system_instruction }]
            },
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.prompt }]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": request.response_schema
            }
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let data: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::JsonError(e.to_string()))?;

        let content: String = data
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(ProviderError::MissingContent);
        }
        Ok(content)
    }

    async fn call_chat_api(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let chat = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: request.system_instruction.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.prompt.clone(),
                },
            ],
            temperature: 0.7,
            response_format: json!({
                "type": "json_schema",
                "json_schema": {
                    "name": "optimization_result",
                    "strict": true,
                    "schema": to_json_schema(&request.response_schema)
                }
            }),
        };

        let response = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&chat)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let data: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::JsonError(e.to_string()))?;

        data.choices
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(ProviderError::MissingContent)
    }
}

#[async_trait]
impl TextGenerator for ProviderClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutput, ProviderError> {
        let start = Instant::now();
        debug!(
            provider = ?self.kind,
            model = %self.model,
            instruction_chars = request.system_instruction.chars().count(),
            prompt_chars = request.prompt.chars().count(),
            "provider.request"
        );

        let content = match self.kind {
            ProviderKind::Gemini => self.call_gemini(request).await?,
            ProviderKind::OpenAi => self.call_chat_api(request).await?,
        };

        let latency_ms = start.elapsed().as_millis() as i64;
        info!(
            provider = ?self.kind,
            model = %self.model,
            latency_ms,
            content_chars = content.chars().count(),
            "provider.response"
        );

        Ok(GenerationOutput {
            content,
            latency_ms,
            model: self.model.clone(),
        })
    }
}

/// Stand-in used when no credential is configured; every call fails.
pub struct UnconfiguredGenerator {
    pub provider: String,
}

#[async_trait]
impl TextGenerator for UnconfiguredGenerator {
    async fn generate(&self, _request: &GenerationRequest) -> Result<GenerationOutput, ProviderError> {
        Err(ProviderError::MissingApiKey)
    }
}

/// Convert the Gemini-style schema (upper-case types) into strict JSON Schema.
pub fn to_json_schema(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (key, value) in map {
                let converted = if key == "type" {
                    value
                        .as_str()
                        .map(|t| Value::String(t.to_lowercase()))
                        .unwrap_or_else(|| value.clone())
                } else {
                    to_json_schema(value)
                };
                out.insert(key.clone(), converted);
            }
            if out.get("type").and_then(|t| t.as_str()) == Some("object") {
                out.insert("additionalProperties".to_string(), Value::Bool(false));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(to_json_schema).collect()),
        other => other.clone(),
    }
}

/// Get API key from environment or config file
pub fn get_api_key(provider: &str, store: &ConfigStore) -> Option<String> {
    let env_keys = match provider {
        "gemini" | "google" => vec!["GEMINI_API_KEY", "GOOGLE_API_KEY", "SKRIVPARTNER_GEMINI_API_KEY"],
        "openai" => vec!["OPENAI_API_KEY", "SKRIVPARTNER_OPENAI_API_KEY"],
        _ => vec![],
    };

    for key in env_keys {
        if let Ok(val) = env::var(key) {
            let v = val.trim();
            if !v.is_empty() {
                return Some(v.to_string());
            }
        }
    }

    match store.get_api_key(provider) {
        Ok(Some(key)) if !key.trim().is_empty() => Some(key.trim().to_string()),
        _ => None,
    }
}
