//! Router configuration for PneumoScan.
//!
//! # Route Structure
//!
//! ```text
//! /            GET        - Landing page (public)
//! /auth        GET        - Sign-in page (public, redirects when signed in)
//! /dashboard   GET        - Dashboard (session, else redirect to /)
//! /session     POST       - Start a session from an access token (public)
//! /logout      GET, POST  - Clear the session (public)
//! /predict     POST       - X-ray classification (session, else 401)
//! /gemini      POST       - Chat proxy (session, else 401)
//! /health      GET        - Health check (public)
//! ```
//!
//! Gated JSON routes use the [`Authenticated`](super::auth::Authenticated)
//! extractor, so the check happens before the body is decoded.
//!
//! # Example
//!
//! ```ignore
//! use pneumoscan::chat::{GeminiClient, GeminiConfig};
//! use pneumoscan::inference::{ConvNetScorer, InferenceService};
//! use pneumoscan::server::routes::{create_router, RouterConfig};
//!
//! let inference = InferenceService::new(ConvNetScorer::load("models/model.safetensors")?);
//! let chat = GeminiClient::new(GeminiConfig::default().with_api_key(key))?;
//! let config = RouterConfig::new("my-secret-key").with_secure_cookies(true);
//!
//! let router = create_router(inference, chat, config);
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:5002").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{extract::DefaultBodyLimit, routing::get, routing::post, Router};
use http::header::CONTENT_TYPE;
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::SessionGate;
use super::handlers::{
    auth_page_handler, dashboard_handler, gemini_handler, health_handler, index_handler,
    logout_handler, logout_redirect_handler, predict_handler, session_handler, AppState,
};
use super::pages::PageConfig;
use super::token::TokenVerifier;
use crate::chat::GeminiClient;
use crate::inference::{InferenceService, ScoringModel};

/// Default request body limit (16 MiB), sized for base64-encoded radiographs.
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone)]
pub struct RouterConfig {
    /// Key signing the session flag cookie
    pub secret_key: String,

    /// Whether session cookies carry the `Secure` attribute
    pub cookie_secure: bool,

    /// HS256 secret for access token verification (None = presence-only)
    pub jwt_secret: Option<String>,

    /// Identity provider settings injected into pages
    pub pages: PageConfig,

    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Maximum accepted request body size in bytes
    pub max_body_bytes: usize,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a new router configuration with the given session secret.
    ///
    /// By default:
    /// - Cookies are not `Secure`
    /// - Access tokens are checked for presence only
    /// - CORS allows any origin
    /// - Bodies up to 16 MiB are accepted
    /// - Tracing is enabled
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            cookie_secure: false,
            jwt_secret: None,
            pages: PageConfig::default(),
            cors_origins: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            enable_tracing: true,
        }
    }

    /// Set the `Secure` attribute on session cookies.
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    /// Verify access tokens as HS256 JWTs signed with `secret`.
    pub fn with_jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.jwt_secret = Some(secret.into());
        self
    }

    /// Set the identity provider values rendered into pages.
    pub fn with_pages(mut self, pages: PageConfig) -> Self {
        self.pages = pages;
        self
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Set the request body limit.
    pub fn with_max_body_bytes(mut self, bytes: usize) -> Self {
        self.max_body_bytes = bytes;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    fn session_gate(&self) -> SessionGate {
        let gate = SessionGate::new(&self.secret_key).with_secure_cookies(self.cookie_secure);
        match self.jwt_secret.as_deref() {
            Some(secret) if !secret.is_empty() => gate.with_token_verifier(TokenVerifier::new(secret)),
            _ => gate,
        }
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// # Arguments
///
/// * `inference` - Classifier used by `/predict`
/// * `chat` - Client used by `/gemini`
/// * `config` - Router configuration
pub fn create_router<M>(
    inference: InferenceService<M>,
    chat: GeminiClient,
    config: RouterConfig,
) -> Router
where
    M: ScoringModel,
{
    let gate = config.session_gate();
    let app_state = AppState::new(inference, chat, gate, config.pages.clone());
    let cors = build_cors_layer(&config);

    let router = Router::new()
        .route("/", get(index_handler::<M>))
        .route("/auth", get(auth_page_handler::<M>))
        .route("/dashboard", get(dashboard_handler::<M>))
        .route("/session", post(session_handler::<M>))
        .route(
            "/logout",
            get(logout_redirect_handler::<M>).post(logout_handler::<M>),
        )
        .route("/predict", post(predict_handler::<M>))
        .route("/gemini", post(gemini_handler::<M>))
        .route("/health", get(health_handler))
        .with_state(app_state)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
