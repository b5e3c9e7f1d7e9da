//! HS256 access token verification.
//!
//! Supabase issues access tokens as JWTs signed with the project's JWT secret.
//! A token is accepted when its header names `HS256`, its signature matches
//! and it carries an `exp` claim in the future.

use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use super::auth::{unix_now, AuthError};

#[derive(Debug, Deserialize)]
struct Claims {
    exp: u64,
}

/// Verifies HS256-signed JWT access tokens against a shared secret.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        validation.validate_exp = true;
        validation.leeway = 0;
        // Supabase sets `aud: authenticated`; no audience is configured here
        validation.validate_aud = false;

        Self {
            key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }

    /// Check signature and expiry of a compact JWT, returning its `exp`.
    pub fn verify(&self, token: &str) -> Result<u64, AuthError> {
        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims.exp)
            .map_err(|e| self.map_error(token, e))
    }

    fn map_error(&self, token: &str, err: JwtError) -> AuthError {
        match err.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired {
                expired_at: self.expiry_of(token).unwrap_or(0),
                current_time: unix_now(),
            },
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            ErrorKind::InvalidAlgorithm => match decode_header(token) {
                Ok(header) => AuthError::UnsupportedAlgorithm(format!("{:?}", header.alg)),
                Err(e) => AuthError::MalformedToken(e.to_string()),
            },
            _ => AuthError::MalformedToken(err.to_string()),
        }
    }

    /// Read `exp` from a token whose signature is valid but which has expired.
    fn expiry_of(&self, token: &str) -> Option<u64> {
        let mut validation = self.validation.clone();
        validation.validate_exp = false;
        decode::<Claims>(token, &self.key, &validation)
            .ok()
            .map(|data| data.claims.exp)
    }
}
