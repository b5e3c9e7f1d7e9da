//! # PneumoScan
//!
//! A small web service that screens chest X-rays for pneumonia.
//!
//! Signed-in users upload a radiograph, which is decoded, normalized and scored
//! by a convolutional classifier (PNEUMONIA when the score exceeds 0.5). A chat
//! endpoint forwards questions to Google's Gemini API.
//!
//! ## Architecture
//!
//! - [`codec`] - base64 / data URI image payloads to RGB rasters and back
//! - [`inference`] - preprocessing, the candle classifier and thresholding
//! - [`chat`] - Gemini `generateContent` proxy client
//! - [`server`] - axum routes, cookie sessions and HTML pages
//! - [`config`] - CLI and environment configuration
//! - [`error`] - error types shared across layers
//!
//! ```text
//! browser ──► /session ──► cookies
//!         ──► /predict ──► codec::decode ──► InferenceService ──► {"result": ...}
//!         ──► /gemini  ──► GeminiClient  ──► {"reply": ..., "raw": ...}
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use pneumoscan::{create_router, ConvNetScorer, GeminiClient, GeminiConfig, InferenceService, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let inference = InferenceService::new(ConvNetScorer::load("models/model.safetensors")?);
//!     let chat = GeminiClient::new(GeminiConfig::default())?;
//!     let router = create_router(inference, chat, RouterConfig::new("change-me"));
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:5002").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod chat;
pub mod codec;
pub mod config;
pub mod error;
pub mod inference;
pub mod server;

// Re-export commonly used types
pub use chat::{ChatReply, GeminiClient, GeminiConfig};
pub use config::Config;
pub use error::{ChatError, CodecError, InferenceError};
pub use inference::{
    classify, preprocess, ConvNetScorer, Diagnosis, InferenceService, ModelInput, Prediction,
    ScoringModel,
};
pub use server::{create_router, AppState, AuthError, PageConfig, RouterConfig, SessionGate};
