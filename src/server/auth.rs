//! Cookie-based session gate.
//!
//! A request is authenticated when either of two cookies is present:
//!
//! - `session`: a signed, expiring flag set by `POST /session`, of the form
//!   `{expiry}.{hex(HMAC-SHA256(secret_key, "session:{expiry}"))}`
//! - `sb-access-token`: the identity provider's access token
//!
//! # Trust boundary
//!
//! By default the access token is checked for *presence only*: any non-empty
//! value authenticates, and neither its signature, expiry nor issuer is
//! verified. Configure a [`TokenVerifier`] (the provider's HS256 JWT secret)
//! to require a valid, unexpired token instead.
//!
//! # Example
//!
//! ```rust
//! use axum_extra::extract::cookie::CookieJar;
//! use pneumoscan::server::auth::SessionGate;
//!
//! let gate = SessionGate::new("my-secret-key");
//! let jar = gate.create_session(CookieJar::new(), "eyJhbGciOi...").unwrap();
//! assert!(gate.is_authenticated(&jar));
//!
//! let jar = gate.clear_session(jar);
//! assert!(!gate.is_authenticated(&jar));
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use super::handlers::ErrorResponse;
use super::token::TokenVerifier;

// =============================================================================
// Constants
// =============================================================================

/// Cookie holding the identity provider's access token.
pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";

/// Cookie holding the signed session flag.
pub const SESSION_COOKIE: &str = "session";

/// Lifetime of both session cookies (7 days).
pub const SESSION_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 7);

/// HMAC-SHA256 type alias
type HmacSha256 = Hmac<Sha256>;

// =============================================================================
// Errors
// =============================================================================

/// Authentication error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// `POST /session` was called without an access token
    MissingToken,

    /// No acceptable credential on a gated route
    Unauthorized,

    /// Token is not a well-formed JWT
    MalformedToken(String),

    /// Token is signed with an algorithm other than HS256
    UnsupportedAlgorithm(String),

    /// Signature does not match
    InvalidSignature,

    /// Token or session flag has expired
    Expired {
        /// When the credential expired
        expired_at: u64,
        /// Current time
        current_time: u64,
    },
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "missing access_token"),
            AuthError::Unauthorized => write!(f, "unauthorized"),
            AuthError::MalformedToken(reason) => write!(f, "malformed token: {}", reason),
            AuthError::UnsupportedAlgorithm(alg) => {
                write!(f, "unsupported token algorithm: {}", alg)
            }
            AuthError::InvalidSignature => write!(f, "invalid signature"),
            AuthError::Expired {
                expired_at,
                current_time,
            } => write!(
                f,
                "credential expired at {} (current time: {})",
                expired_at, current_time
            ),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match &self {
            AuthError::MissingToken => StatusCode::BAD_REQUEST,
            _ => StatusCode::UNAUTHORIZED,
        };
        let message = self.to_string();

        // A bad signature could be tampering; the rest is routine
        match &self {
            AuthError::InvalidSignature => {
                warn!(status = status.as_u16(), "Authentication failed: {}", message)
            }
            _ => debug!(status = status.as_u16(), "Authentication failed: {}", message),
        }

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

// =============================================================================
// Session Signer
// =============================================================================

/// Signs and verifies the expiring session flag.
#[derive(Clone)]
pub struct SessionSigner {
    /// Secret key for HMAC computation
    secret_key: Vec<u8>,
}

impl SessionSigner {
    pub fn new(secret_key: impl AsRef<[u8]>) -> Self {
        Self {
            secret_key: secret_key.as_ref().to_vec(),
        }
    }

    /// Produce a flag value valid for `ttl`.
    pub fn sign(&self, ttl: Duration) -> String {
        self.sign_with_expiry(unix_now() + ttl.as_secs())
    }

    /// Produce a flag value that expires at `expiry` (Unix seconds).
    pub fn sign_with_expiry(&self, expiry: u64) -> String {
        format!("{}.{}", expiry, self.compute_signature(expiry))
    }

    /// Check a flag value's signature and expiry.
    pub fn verify(&self, value: &str) -> Result<(), AuthError> {
        let (expiry, signature) = value
            .split_once('.')
            .ok_or_else(|| AuthError::MalformedToken("missing separator".to_string()))?;
        let expiry: u64 = expiry
            .parse()
            .map_err(|_| AuthError::MalformedToken("invalid expiry".to_string()))?;

        let current_time = unix_now();
        if current_time > expiry {
            return Err(AuthError::Expired {
                expired_at: expiry,
                current_time,
            });
        }

        let provided = hex::decode(signature)
            .map_err(|_| AuthError::MalformedToken("signature is not hex".to_string()))?;
        let expected = self.mac(expiry);

        if provided.ct_eq(&expected).into() {
            Ok(())
        } else {
            Err(AuthError::InvalidSignature)
        }
    }

    fn compute_signature(&self, expiry: u64) -> String {
        hex::encode(self.mac(expiry))
    }

    fn mac(&self, expiry: u64) -> Vec<u8> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret_key).expect("HMAC can take key of any size");
        mac.update(format!("session:{}", expiry).as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// =============================================================================
// Session Gate
// =============================================================================

/// Decides whether a request is authenticated and manages the session cookies.
#[derive(Clone)]
pub struct SessionGate {
    signer: SessionSigner,
    verifier: Option<TokenVerifier>,
    cookie_secure: bool,
}

impl SessionGate {
    /// Presence-only gate with non-`Secure` cookies.
    pub fn new(secret_key: impl AsRef<[u8]>) -> Self {
        Self {
            signer: SessionSigner::new(secret_key),
            verifier: None,
            cookie_secure: false,
        }
    }

    /// Require access tokens to pass `verifier`.
    pub fn with_token_verifier(mut self, verifier: TokenVerifier) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Set the `Secure` attribute on issued cookies.
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    /// Whether access tokens are cryptographically verified.
    pub fn verifies_tokens(&self) -> bool {
        self.verifier.is_some()
    }

    /// True if the session flag is valid or an acceptable access token is present.
    pub fn is_authenticated(&self, jar: &CookieJar) -> bool {
        if let Some(flag) = jar.get(SESSION_COOKIE) {
            match self.signer.verify(flag.value()) {
                Ok(()) => return true,
                Err(e) => debug!("Ignoring session flag: {}", e),
            }
        }

        let Some(token) = jar.get(ACCESS_TOKEN_COOKIE) else {
            return false;
        };
        if token.value().is_empty() {
            return false;
        }

        match &self.verifier {
            None => true,
            Some(verifier) => match verifier.verify(token.value()) {
                Ok(_) => true,
                Err(e) => {
                    debug!("Rejecting access token cookie: {}", e);
                    false
                }
            },
        }
    }

    /// Store `token` verbatim and set the session flag.
    ///
    /// Both cookies are HttpOnly, scoped to `/`, `SameSite=Lax` and last
    /// [`SESSION_TTL`]. With a verifier, the flag expires no later than the
    /// token's `exp`.
    pub fn create_session(&self, jar: CookieJar, token: &str) -> Result<CookieJar, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let mut expiry = unix_now() + SESSION_TTL.as_secs();
        if let Some(verifier) = &self.verifier {
            expiry = expiry.min(verifier.verify(token)?);
        }

        let flag = self.signer.sign_with_expiry(expiry);
        Ok(jar
            .add(self.session_cookie(ACCESS_TOKEN_COOKIE, token.to_string()))
            .add(self.session_cookie(SESSION_COOKIE, flag)))
    }

    /// Expire both cookies.
    pub fn clear_session(&self, jar: CookieJar) -> CookieJar {
        jar.add(removal_cookie(ACCESS_TOKEN_COOKIE))
            .add(removal_cookie(SESSION_COOKIE))
    }

    fn session_cookie(&self, name: &'static str, value: String) -> Cookie<'static> {
        Cookie::build((name, value))
            .path("/")
            .http_only(true)
            .secure(self.cookie_secure)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(SESSION_TTL.as_secs() as i64))
            .build()
    }
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build((name, "")).path("/").build();
    cookie.make_removal();
    cookie
}

// =============================================================================
// Extractors
// =============================================================================

/// Authentication state of the current request. Never rejects.
#[derive(Debug, Clone, Copy)]
pub struct AuthStatus {
    /// Whether the request carries an acceptable credential
    pub authenticated: bool,
}

impl<S> FromRequestParts<S> for AuthStatus
where
    SessionGate: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let gate = SessionGate::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        Ok(AuthStatus {
            authenticated: gate.is_authenticated(&jar),
        })
    }
}

/// Guard for JSON routes: rejects unauthenticated requests with 401.
///
/// Runs before the body is read, so rejected requests never reach the handler.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated;

impl<S> FromRequestParts<S> for Authenticated
where
    SessionGate: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let status = AuthStatus::from_request_parts(parts, state)
            .await
            .unwrap_or(AuthStatus {
                authenticated: false,
            });
        if status.authenticated {
            Ok(Authenticated)
        } else {
            Err(AuthError::Unauthorized)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
