//! Test utilities for integration tests.
//!
//! Provides a counting mock classifier, image payload fixtures, router
//! builders, cookie helpers and a local stand-in for the Gemini API.

use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, Request, Response, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use http_body_util::BodyExt;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, Rgb, RgbImage};
use serde_json::Value;
use tower::ServiceExt;

use pneumoscan::chat::{GeminiClient, GeminiConfig};
use pneumoscan::error::InferenceError;
use pneumoscan::inference::{InferenceService, ModelInput, ScoringModel};
use pneumoscan::server::{create_router, RouterConfig, ACCESS_TOKEN_COOKIE};

pub const TEST_SECRET: &str = "integration-secret";

// =============================================================================
// Mock Classifier
// =============================================================================

/// A scoring model that returns a fixed score and counts its invocations.
#[derive(Clone)]
pub struct MockScorer {
    score: f32,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl MockScorer {
    pub fn new(score: f32) -> Self {
        Self {
            score,
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A model whose every evaluation fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(0.0)
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ScoringModel for MockScorer {
    fn score(&self, input: &ModelInput) -> Result<f32, InferenceError> {
        assert_eq!(input.shape(), (1, 64, 64, 3));
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(InferenceError::Model("mock failure".to_string()));
        }
        Ok(self.score)
    }
}

// =============================================================================
// Image Fixtures
// =============================================================================

/// A small synthetic "radiograph".
pub fn create_test_xray(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let v = ((x * 3 + y * 5) % 256) as u8;
        Rgb([v, v, v])
    })
}

/// Raw base64 of a PNG image (no data URI prefix).
pub fn png_base64(width: u32, height: u32) -> String {
    let mut buf = Cursor::new(Vec::new());
    create_test_xray(width, height)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    STANDARD.encode(buf.into_inner())
}

/// JPEG image as a `data:image/jpeg;base64,` URI.
pub fn jpeg_data_uri(width: u32, height: u32) -> String {
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, 85);
    encoder.encode_image(&create_test_xray(width, height)).unwrap();
    format!("data:image/jpeg;base64,{}", STANDARD.encode(buf))
}

// =============================================================================
// Router Builders
// =============================================================================

/// A chat client with the given key, pointed at `base_url`.
pub fn chat_client(base_url: &str, api_key: Option<&str>) -> GeminiClient {
    let mut config = GeminiConfig::default().with_base_url(base_url);
    if let Some(key) = api_key {
        config = config.with_api_key(key);
    }
    GeminiClient::new(config).unwrap()
}

/// Router with the given scorer and an unconfigured chat client.
pub fn test_router(scorer: MockScorer) -> Router {
    test_router_with(scorer, chat_client("http://127.0.0.1:1", None), RouterConfig::new(TEST_SECRET))
}

pub fn test_router_with(scorer: MockScorer, chat: GeminiClient, config: RouterConfig) -> Router {
    create_router(
        InferenceService::new(scorer),
        chat,
        config.with_tracing(false),
    )
}

// =============================================================================
// Request Helpers
// =============================================================================

/// Cookie header value carrying a bare access token.
pub fn token_cookie(token: &str) -> String {
    format!("{}={}", ACCESS_TOKEN_COOKIE, token)
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: impl Into<Body>, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(body.into()).unwrap()
}

/// Send one request through a clone of `router`.
pub async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(body.to_vec()).unwrap()
}

/// All `Set-Cookie` header values of a response.
pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// Turn `Set-Cookie` headers into a `Cookie` request header value.
pub fn cookie_header(set_cookies: &[String]) -> String {
    set_cookies
        .iter()
        .filter_map(|c| c.split(';').next())
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// Fake Gemini Upstream
// =============================================================================

/// A request received by [`FakeGemini`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method_path: String,
    pub api_key: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct FakeState {
    status: StatusCode,
    content_type: &'static str,
    body: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// A local HTTP server answering `POST /models/{model}` with a canned response.
pub struct FakeGemini {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl FakeGemini {
    /// Start a server that answers every request with `status` and a JSON `body`.
    pub async fn json(status: StatusCode, body: Value) -> Self {
        Self::start(status, "application/json", body.to_string()).await
    }

    /// Start a server that answers every request with `status` and a plain-text `body`.
    pub async fn text(status: StatusCode, body: &str) -> Self {
        Self::start(status, "text/plain", body.to_string()).await
    }

    /// Start a server that answers every request with `status`, `content_type` and a raw `body`.
    pub async fn raw(status: StatusCode, content_type: &'static str, body: &str) -> Self {
        Self::start(status, content_type, body.to_string()).await
    }

    async fn start(status: StatusCode, content_type: &'static str, body: String) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = FakeState {
            status,
            content_type,
            body,
            requests: Arc::clone(&requests),
        };

        let app = Router::new()
            .route("/models/{model}", post(fake_generate))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, requests }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn fake_generate(
    State(state): State<FakeState>,
    Path(model): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    state.requests.lock().unwrap().push(RecordedRequest {
        method_path: model,
        api_key: headers
            .get("x-goog-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });

    (state.status, [(CONTENT_TYPE, state.content_type)], state.body)
}

/// A successful `generateContent` body whose first candidate says `text`.
pub fn gemini_success(text: &str) -> Value {
    serde_json::json!({
        "candidates": [
            { "content": { "role": "model", "parts": [ { "text": text } ] }, "finishReason": "STOP" }
        ],
        "modelVersion": "gemini-1.5-flash"
    })
}
