//! HTTP request handlers.
//!
//! # Endpoints
//!
//! - `GET /` - Landing page
//! - `GET /auth` - Sign-in page (redirects to the dashboard when signed in)
//! - `GET /dashboard` - Upload and chat page (requires a session)
//! - `POST /session` - Store the provider's access token in cookies
//! - `GET|POST /logout` - Clear the session cookies
//! - `POST /predict` - Classify an uploaded X-ray (requires a session)
//! - `POST /gemini` - Proxy a chat message to Gemini (requires a session)
//! - `GET /health` - Health check

use std::sync::Arc;

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, warn};

use crate::chat::{ChatReply, GeminiClient};
use crate::codec;
use crate::error::{ChatError, CodecError, InferenceError};
use crate::inference::{Diagnosis, InferenceService, ScoringModel};

use super::auth::{AuthError, AuthStatus, Authenticated, SessionGate};
use super::pages::{self, PageConfig};

// =============================================================================
// Application State
// =============================================================================

/// Shared application state handed to every handler.
pub struct AppState<M: ScoringModel> {
    /// Loaded classifier
    pub inference: InferenceService<M>,

    /// Outbound chat client
    pub chat: GeminiClient,

    /// Cookie session gate
    pub gate: SessionGate,

    /// Values injected into rendered pages
    pub pages: Arc<PageConfig>,
}

impl<M: ScoringModel> AppState<M> {
    pub fn new(
        inference: InferenceService<M>,
        chat: GeminiClient,
        gate: SessionGate,
        pages: PageConfig,
    ) -> Self {
        Self {
            inference,
            chat,
            gate,
            pages: Arc::new(pages),
        }
    }
}

impl<M: ScoringModel> Clone for AppState<M> {
    fn clone(&self) -> Self {
        Self {
            inference: self.inference.clone(),
            chat: self.chat.clone(),
            gate: self.gate.clone(),
            pages: Arc::clone(&self.pages),
        }
    }
}

impl<M: ScoringModel> FromRef<AppState<M>> for SessionGate {
    fn from_ref(state: &AppState<M>) -> Self {
        state.gate.clone()
    }
}

// =============================================================================
// Request / Response Types
// =============================================================================

/// Body of `POST /session`.
#[derive(Debug, Default, Deserialize)]
pub struct SessionRequest {
    #[serde(default)]
    pub access_token: Option<String>,
}

/// Body of `POST /gemini`.
#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,

    /// Model override (defaults to the configured model)
    #[serde(default)]
    pub model: Option<String>,
}

/// `{ "ok": true }`
#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    fn ok() -> Json<Self> {
        Json(Self { ok: true })
    }
}

/// Response from `POST /predict`.
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub result: Diagnosis,
}

/// JSON error body returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,

    /// Extra context (upstream body or transport error) for proxy failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            detail: None,
        }
    }

    pub fn with_detail(error: impl Into<String>, detail: Value) -> Self {
        Self {
            error: error.into(),
            detail: Some(detail),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Error returned by JSON handlers.
#[derive(Debug)]
pub enum ApiError {
    Auth(AuthError),
    Codec(CodecError),
    Inference(InferenceError),
    Chat(ChatError),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

impl From<CodecError> for ApiError {
    fn from(err: CodecError) -> Self {
        ApiError::Codec(err)
    }
}

impl From<InferenceError> for ApiError {
    fn from(err: InferenceError) -> Self {
        ApiError::Inference(err)
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        ApiError::Chat(err)
    }
}

/// Convert ApiError to an HTTP response.
///
/// - codec failures are client errors (400)
/// - inference failures and missing configuration are server errors (500)
/// - upstream and transport failures of the chat proxy are 502
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Auth(err) => return err.into_response(),

            ApiError::Codec(err) => (StatusCode::BAD_REQUEST, ErrorResponse::new(err.to_string())),

            ApiError::Inference(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new(err.to_string()),
            ),

            ApiError::Chat(err) => {
                let message = err.to_string();
                match err {
                    ChatError::EmptyMessage => {
                        (StatusCode::BAD_REQUEST, ErrorResponse::new(message))
                    }
                    ChatError::NotConfigured => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ErrorResponse::new(message),
                    ),
                    ChatError::Upstream { message, detail } => (
                        StatusCode::BAD_GATEWAY,
                        ErrorResponse::with_detail(message, detail),
                    ),
                    ChatError::Request(detail) => (
                        StatusCode::BAD_GATEWAY,
                        ErrorResponse::with_detail(message, Value::String(detail)),
                    ),
                    ChatError::Unexpected(detail) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ErrorResponse::with_detail(message, Value::String(detail)),
                    ),
                }
            }
        };

        if status.is_server_error() {
            error!(status = status.as_u16(), detail = ?body.detail, "Server error: {}", body.error);
        } else {
            warn!(status = status.as_u16(), "Client error: {}", body.error);
        }

        (status, Json(body)).into_response()
    }
}

/// Parse a JSON body, treating a missing or malformed body as the default.
fn lenient_json<T: DeserializeOwned + Default>(body: &[u8]) -> T {
    serde_json::from_slice(body).unwrap_or_default()
}

// =============================================================================
// Page Handlers
// =============================================================================

/// `GET /`
pub async fn index_handler<M: ScoringModel>(State(state): State<AppState<M>>) -> Html<String> {
    Html(pages::landing_page(&state.pages))
}

/// `GET /auth`
///
/// Signed-in users are sent straight to the dashboard.
pub async fn auth_page_handler<M: ScoringModel>(
    State(state): State<AppState<M>>,
    auth: AuthStatus,
) -> Response {
    if auth.authenticated {
        return Redirect::to("/dashboard").into_response();
    }
    Html(pages::auth_page(&state.pages)).into_response()
}

/// `GET /dashboard`
///
/// Anonymous users are redirected to `/`.
pub async fn dashboard_handler<M: ScoringModel>(
    State(state): State<AppState<M>>,
    auth: AuthStatus,
) -> Response {
    if !auth.authenticated {
        return Redirect::to("/").into_response();
    }
    Html(pages::dashboard_page(&state.pages)).into_response()
}

// =============================================================================
// Session Handlers
// =============================================================================

/// `POST /session`
///
/// # Request
///
/// ```json
/// { "access_token": "<provider token>" }
/// ```
///
/// # Response
///
/// - `200 OK` with `{ "ok": true }` and the session cookies
/// - `400 Bad Request` if `access_token` is missing or empty (no cookies set)
/// - `401 Unauthorized` if token verification is enabled and the token fails it
pub async fn session_handler<M: ScoringModel>(
    State(state): State<AppState<M>>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, Json<OkResponse>), ApiError> {
    let request: SessionRequest = lenient_json(&body);
    let token = request.access_token.unwrap_or_default();

    let jar = state.gate.create_session(jar, &token)?;
    Ok((jar, OkResponse::ok()))
}

/// `GET /logout`: clear cookies and redirect to `/`.
pub async fn logout_redirect_handler<M: ScoringModel>(
    State(state): State<AppState<M>>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    (state.gate.clear_session(jar), Redirect::to("/"))
}

/// `POST /logout`: clear cookies and return `{ "ok": true }`.
pub async fn logout_handler<M: ScoringModel>(
    State(state): State<AppState<M>>,
    jar: CookieJar,
) -> (CookieJar, Json<OkResponse>) {
    (state.gate.clear_session(jar), OkResponse::ok())
}

// =============================================================================
// API Handlers
// =============================================================================

/// `POST /predict`
///
/// # Request
///
/// A JSON string or `{ "image": "<base64>" }`; the base64 may carry a
/// `data:image/<type>;base64,` prefix.
///
/// # Response
///
/// - `200 OK` with `{ "result": "PNEUMONIA" | "NORMAL" }`
/// - `400 Bad Request` if the payload is empty or not a decodable image
/// - `401 Unauthorized` without a session (the model is not invoked)
/// - `500 Internal Server Error` if the model fails
pub async fn predict_handler<M: ScoringModel>(
    State(state): State<AppState<M>>,
    _auth: Authenticated,
    body: Bytes,
) -> Result<Json<PredictResponse>, ApiError> {
    let payload: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let image = codec::decode(&payload)?;

    let prediction = state.inference.predict(image).await?;

    Ok(Json(PredictResponse {
        result: prediction.diagnosis,
    }))
}

/// `POST /gemini`
///
/// # Request
///
/// ```json
/// { "message": "What does consolidation look like?", "model": "gemini-1.5-flash" }
/// ```
///
/// # Response
///
/// - `200 OK` with `{ "reply": "...", "raw": { ...upstream body... } }`
/// - `400 Bad Request` if `message` is empty
/// - `401 Unauthorized` without a session
/// - `500 Internal Server Error` if no API key is configured
/// - `502 Bad Gateway` with `{ "error", "detail" }` on upstream or network failure
pub async fn gemini_handler<M: ScoringModel>(
    State(state): State<AppState<M>>,
    _auth: Authenticated,
    body: Bytes,
) -> Result<Json<ChatReply>, ApiError> {
    let request: ChatRequest = lenient_json(&body);

    let reply = state
        .chat
        .generate(&request.message, request.model.as_deref())
        .await?;

    Ok(Json(reply))
}

/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
