//! Configuration management for PneumoScan.
//!
//! Every option can be given on the command line or through the environment.
//! `main` loads a `.env` file (if present) before parsing, so a local
//! development setup only needs that file.
//!
//! # Environment Variables
//!
//! - `HOST` - Server bind address (default: 127.0.0.1)
//! - `PORT` - Server port (default: 5002)
//! - `SECRET_KEY` - Key signing the session cookie (default: insecure placeholder)
//! - `SUPABASE_URL` - Supabase project URL rendered into the sign-in page
//! - `SUPABASE_ANON_KEY` - Supabase anonymous key rendered into the sign-in page
//! - `SUPABASE_JWT_SECRET` - Enables HS256 verification of access tokens
//! - `COOKIE_SECURE` - Set `Secure` on session cookies (`1` or `true`)
//! - `GEMINI_API_KEY` - Gemini API key (chat is disabled without it)
//! - `GEMINI_BASE_URL` - Gemini API root
//! - `GEMINI_MODEL` - Default Gemini model
//! - `GEMINI_TIMEOUT` - Gemini request timeout in seconds (default: 30)
//! - `MODEL_PATH` - Classifier weights (safetensors)
//! - `UPLOAD_DIR` - Directory to keep the last uploaded image in
//! - `CORS_ORIGINS` - Allowed CORS origins, comma-separated (default: any)
//! - `MAX_UPLOAD_BYTES` - Request body limit in bytes (default: 16 MiB)

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use url::Url;

use crate::chat::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL, DEFAULT_GEMINI_TIMEOUT_SECS};
use crate::server::DEFAULT_MAX_BODY_BYTES;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_PORT: u16 = 5002;

/// Placeholder session key used when none is configured.
pub const DEFAULT_SECRET_KEY: &str = "super-secret-key";

/// Default classifier weights location.
pub const DEFAULT_MODEL_PATH: &str = "models/model.safetensors";

// =============================================================================
// CLI Arguments
// =============================================================================

/// PneumoScan - chest X-ray pneumonia screening service.
///
/// Serves a small web app with cookie sessions, a convolutional classifier
/// behind `/predict` and a Gemini chat proxy behind `/gemini`.
#[derive(Parser, Debug, Clone)]
#[command(name = "pneumoscan")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "PORT")]
    pub port: u16,

    /// Maximum accepted request body size in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_BODY_BYTES, env = "MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: usize,

    // =========================================================================
    // Session Configuration
    // =========================================================================
    /// Secret key signing the session cookie.
    ///
    /// The default is a public placeholder; always set this in production.
    #[arg(long, default_value = DEFAULT_SECRET_KEY, env = "SECRET_KEY", hide_env_values = true)]
    pub secret_key: String,

    /// Mark session cookies `Secure` (HTTPS only).
    #[arg(
        long,
        env = "COOKIE_SECURE",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    pub cookie_secure: bool,

    // =========================================================================
    // Identity Provider Configuration
    // =========================================================================
    /// Supabase project URL, rendered into the sign-in page.
    #[arg(long, default_value = "", env = "SUPABASE_URL")]
    pub supabase_url: String,

    /// Supabase anonymous key, rendered into the sign-in page.
    #[arg(long, default_value = "", env = "SUPABASE_ANON_KEY")]
    pub supabase_anon_key: String,

    /// Supabase JWT secret.
    ///
    /// When set, access tokens must be valid, unexpired HS256 JWTs. When
    /// unset, any non-empty access token cookie is accepted.
    #[arg(long, env = "SUPABASE_JWT_SECRET", hide_env_values = true)]
    pub supabase_jwt_secret: Option<String>,

    // =========================================================================
    // Chat Configuration
    // =========================================================================
    /// Gemini API key. `/gemini` answers 500 without it.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Gemini API root.
    #[arg(long, default_value = DEFAULT_GEMINI_BASE_URL, env = "GEMINI_BASE_URL")]
    pub gemini_base_url: String,

    /// Model used when a chat request does not name one.
    #[arg(long, default_value = DEFAULT_GEMINI_MODEL, env = "GEMINI_MODEL")]
    pub gemini_model: String,

    /// Gemini request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_GEMINI_TIMEOUT_SECS, env = "GEMINI_TIMEOUT")]
    pub gemini_timeout: u64,

    // =========================================================================
    // Inference Configuration
    // =========================================================================
    /// Classifier weights (safetensors).
    #[arg(long, default_value = DEFAULT_MODEL_PATH, env = "MODEL_PATH")]
    pub model_path: String,

    /// Directory in which the most recent upload is kept as `image.jpg`.
    ///
    /// Uploads are not written to disk when unset.
    #[arg(long, env = "UPLOAD_DIR")]
    pub upload_dir: Option<String>,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.secret_key.is_empty() {
            return Err("Secret key must not be empty. Set --secret-key or SECRET_KEY".to_string());
        }

        if self.gemini_timeout == 0 {
            return Err("gemini_timeout must be greater than 0".to_string());
        }

        if self.max_upload_bytes == 0 {
            return Err("max_upload_bytes must be greater than 0".to_string());
        }

        if !self.supabase_url.is_empty() {
            Url::parse(&self.supabase_url)
                .map_err(|e| format!("Invalid Supabase URL '{}': {}", self.supabase_url, e))?;
        }

        Url::parse(&self.gemini_base_url)
            .map_err(|e| format!("Invalid Gemini base URL '{}': {}", self.gemini_base_url, e))?;

        if self.model_path.is_empty() {
            return Err("Model path is required. Set --model-path or MODEL_PATH".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether the placeholder session key is in use.
    pub fn uses_default_secret(&self) -> bool {
        self.secret_key == DEFAULT_SECRET_KEY
    }
}

// =============================================================================
// Tests
// =============================================================================
