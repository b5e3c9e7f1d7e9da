//! Gemini `generateContent` client.

use std::time::Duration;

use http::header::CONTENT_TYPE;
use http::StatusCode;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::ChatError;

/// Default API root.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model used when the request does not name one.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Outbound request timeout in seconds.
pub const DEFAULT_GEMINI_TIMEOUT_SECS: u64 = 30;

const API_KEY_HEADER: &str = "X-goog-api-key";

// =============================================================================
// Configuration
// =============================================================================

/// Settings for the outbound chat proxy.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key; requests fail with [`ChatError::NotConfigured`] when absent
    pub api_key: Option<String>,

    /// API root, without trailing slash
    pub base_url: String,

    /// Model used when the caller does not pick one
    pub default_model: String,

    /// Total request timeout
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            default_model: DEFAULT_GEMINI_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_GEMINI_TIMEOUT_SECS),
        }
    }
}

impl GeminiConfig {
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether a non-empty API key is present.
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

// =============================================================================
// Client
// =============================================================================

/// Successful proxy result.
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    /// First candidate's text, or empty if the upstream shape was unexpected
    pub reply: String,

    /// Upstream JSON body, passed through untouched
    pub raw: Value,
}

/// Thin client over one shared `reqwest::Client`.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    /// Build a client with the configured timeout.
    pub fn new(config: GeminiConfig) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ChatError::Unexpected(e.to_string()))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// URL of the `generateContent` method for `model`.
    pub fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(model)
        )
    }

    /// Send one user message and return the extracted reply.
    ///
    /// Validation happens before any network traffic: an empty message fails
    /// with [`ChatError::EmptyMessage`], a missing key with
    /// [`ChatError::NotConfigured`]. No retries are attempted.
    pub async fn generate(&self, message: &str, model: Option<&str>) -> Result<ChatReply, ChatError> {
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let api_key = match self.config.api_key.as_deref() {
            Some(key) if !key.is_empty() => key,
            _ => return Err(ChatError::NotConfigured),
        };

        let model = model
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.config.default_model);
        let url = self.endpoint(model);
        let body = json!({ "contents": [ { "parts": [ { "text": message } ] } ] });

        debug!(model = model, "Forwarding chat message to Gemini");

        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let is_json = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|ct| ct.starts_with("application/json"));
            let text = response
                .text()
                .await
                .map_err(|e| ChatError::Request(e.to_string()))?;

            warn!(status = status.as_u16(), body = %text, "Gemini API error");
            return Err(upstream_error(status, is_json, &text));
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| ChatError::Request(e.to_string()))?;

        let reply = match extract_reply(&raw) {
            Some(text) => text.to_string(),
            None => {
                warn!(response = %raw, "Failed to extract text from Gemini response");
                String::new()
            }
        };

        Ok(ChatReply { reply, raw })
    }
}

/// Read `candidates[0].content.parts[0].text` from a response body.
pub fn extract_reply(raw: &Value) -> Option<&str> {
    raw.pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
}

/// Build the error for a non-success upstream response.
///
/// JSON bodies contribute `error.message` and become the detail; anything
/// else falls back to `HTTP <code>: <body>` with an empty detail object.
fn upstream_error(status: StatusCode, is_json: bool, body: &str) -> ChatError {
    let detail = if is_json {
        serde_json::from_str::<Value>(body).unwrap_or_else(|_| json!({}))
    } else {
        json!({})
    };

    let message = detail
        .pointer("/error/message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}: {}", status.as_u16(), body));

    ChatError::Upstream { message, detail }
}

// =============================================================================
// Tests
// =============================================================================
