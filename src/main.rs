//! PneumoScan - chest X-ray pneumonia screening service.
//!
//! This binary loads the classifier, then starts the HTTP server.

use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pneumoscan::{
    chat::{GeminiClient, GeminiConfig},
    config::Config,
    inference::{ConvNetScorer, InferenceService},
    server::{create_router, PageConfig, RouterConfig},
};

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine
    let dotenv = dotenvy::dotenv();

    let config = Config::parse();
    init_logging(config.verbose);

    if let Ok(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    run_serve(config).await
}

async fn run_serve(config: Config) -> ExitCode {
    info!("PneumoScan v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Model: {}", config.model_path);
    match config.upload_dir {
        Some(ref dir) => info!("  Upload dir: {}", dir),
        None => info!("  Upload dir: none (uploads are not persisted)"),
    }

    if config.uses_default_secret() {
        warn!("  Session key: DEFAULT PLACEHOLDER - set SECRET_KEY in production");
    }

    if config.supabase_jwt_secret.as_deref().is_some_and(|s| !s.is_empty()) {
        info!("  Auth: access tokens verified (HS256)");
    } else {
        warn!("  Auth: presence-only - any non-empty sb-access-token cookie is accepted");
        warn!("        Set SUPABASE_JWT_SECRET to verify access tokens");
    }

    if !config.cookie_secure {
        warn!("  Cookies: not Secure - set COOKIE_SECURE=1 behind HTTPS");
    }

    if config.gemini_api_key.as_deref().is_some_and(|k| !k.is_empty()) {
        info!("  Chat: {} via {}", config.gemini_model, config.gemini_base_url);
    } else {
        warn!("  Chat: GEMINI_API_KEY missing - /gemini will return 500");
    }

    // Load the classifier once; a bad model file is fatal
    let scorer = match ConvNetScorer::load(&config.model_path) {
        Ok(scorer) => scorer,
        Err(e) => {
            error!("Failed to load model: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut inference = InferenceService::new(scorer);
    if let Some(ref dir) = config.upload_dir {
        inference = inference.with_upload_dir(dir);
    }

    let chat = match GeminiClient::new(build_gemini_config(&config)) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let router = create_router(inference, chat, build_router_config(&config));

    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Open the app in your browser:");
    info!("    open http://{}/", addr);
    info!("  Health check:");
    info!("    curl http://{}/health", addr);
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "pneumoscan=debug,tower_http=debug"
    } else {
        "pneumoscan=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the Gemini client settings from the application Config.
fn build_gemini_config(config: &Config) -> GeminiConfig {
    let mut gemini = GeminiConfig::default()
        .with_base_url(&config.gemini_base_url)
        .with_default_model(&config.gemini_model)
        .with_timeout(Duration::from_secs(config.gemini_timeout));

    if let Some(ref key) = config.gemini_api_key {
        gemini = gemini.with_api_key(key);
    }

    gemini
}

/// Build RouterConfig from the application Config.
fn build_router_config(config: &Config) -> RouterConfig {
    let mut router_config = RouterConfig::new(&config.secret_key)
        .with_secure_cookies(config.cookie_secure)
        .with_pages(PageConfig::new(
            &config.supabase_url,
            &config.supabase_anon_key,
        ))
        .with_max_body_bytes(config.max_upload_bytes)
        .with_tracing(!config.no_tracing);

    if let Some(ref secret) = config.supabase_jwt_secret {
        router_config = router_config.with_jwt_secret(secret);
    }

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}
