//! Outbound chat proxy to the Gemini generative-language API.
//!
//! ```text
//! POST {base_url}/models/{model}:generateContent
//! X-goog-api-key: <key>
//!
//! { "contents": [ { "parts": [ { "text": "<message>" } ] } ] }
//! ```
//!
//! The reply text is read from `candidates[0].content.parts[0].text`.

mod gemini;

pub use gemini::{
    extract_reply, ChatReply, GeminiClient, GeminiConfig, DEFAULT_GEMINI_BASE_URL,
    DEFAULT_GEMINI_MODEL, DEFAULT_GEMINI_TIMEOUT_SECS,
};
