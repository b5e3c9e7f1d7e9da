//! HTTP server layer for PneumoScan.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          HTTP Layer                             │
//! │   pages: / /auth /dashboard    json: /session /predict /gemini  │
//! │                                                                 │
//! │  ┌────────────┐  ┌──────────────┐  ┌──────────┐  ┌───────────┐  │
//! │  │  handlers  │  │  auth/token  │  │  pages   │  │  routes   │  │
//! │  │ (requests) │  │  (cookies)   │  │  (HTML)  │  │ (router)  │  │
//! │  └────────────┘  └──────────────┘  └──────────┘  └───────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod handlers;
pub mod pages;
pub mod routes;
pub mod token;

pub use auth::{
    AuthError, AuthStatus, Authenticated, SessionGate, SessionSigner, ACCESS_TOKEN_COOKIE,
    SESSION_COOKIE, SESSION_TTL,
};
pub use handlers::{
    health_handler, ApiError, AppState, ChatRequest, ErrorResponse, HealthResponse, OkResponse,
    PredictResponse, SessionRequest,
};
pub use pages::PageConfig;
pub use routes::{create_router, RouterConfig, DEFAULT_MAX_BODY_BYTES};
pub use token::TokenVerifier;
