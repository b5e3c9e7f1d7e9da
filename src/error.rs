use thiserror::Error;

/// Errors produced while decoding or encoding image payloads
#[derive(Debug, Clone, Error)]
pub enum CodecError {
    /// Payload did not resolve to a non-empty string
    #[error("Invalid base64 input: {0}")]
    InvalidInput(String),

    /// Base64 or image-format decoding failed
    #[error("Failed to decode base64 image: {0}")]
    Decode(String),

    /// Serializing a raster to PNG failed
    #[error("Failed to encode image: {0}")]
    Encode(String),
}

/// Errors raised by the inference adapter
#[derive(Debug, Clone, Error)]
pub enum InferenceError {
    /// Model weights could not be loaded
    #[error("Failed to load model from {path}: {message}")]
    ModelLoad { path: String, message: String },

    /// The scoring function failed on a well-formed input
    #[error("Model evaluation failed: {0}")]
    Model(String),

    /// The blocking scoring task panicked or was cancelled
    #[error("Inference task failed: {0}")]
    Task(String),
}

/// Errors raised by the chat proxy
#[derive(Debug, Clone, Error)]
pub enum ChatError {
    /// The user message was empty
    #[error("message is required")]
    EmptyMessage,

    /// No API key is configured on the server
    #[error("server not configured: GEMINI_API_KEY missing")]
    NotConfigured,

    /// Upstream answered with a non-success status (maps to HTTP 502)
    #[error("{message}")]
    Upstream {
        message: String,
        detail: serde_json::Value,
    },

    /// Network failure or unreadable upstream response (maps to HTTP 502)
    #[error("gemini request failed")]
    Request(String),

    /// Anything else (maps to HTTP 500)
    #[error("unexpected error")]
    Unexpected(String),
}
