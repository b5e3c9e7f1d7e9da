//! Session integration tests.
//!
//! Tests verify:
//! - `POST /session` stores the token and the signed flag with the right attributes
//! - Missing or empty tokens are rejected without setting cookies
//! - Logout clears the cookies on both methods
//! - Presence-only versus verified access tokens on gated routes

use axum::http::StatusCode;
use serde_json::json;

use pneumoscan::server::{RouterConfig, ACCESS_TOKEN_COOKIE, SESSION_COOKIE};

use super::test_utils::{
    body_json, chat_client, cookie_header, get, post_json, send, set_cookies, test_router,
    test_router_with, token_cookie, MockScorer, TEST_SECRET,
};

// =============================================================================
// Session Creation
// =============================================================================

#[tokio::test]
async fn test_session_sets_cookies() {
    let router = test_router(MockScorer::new(0.1));

    let response = send(
        &router,
        post_json("/session", json!({ "access_token": "tok-123" }).to_string(), None),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2);

    let token = cookies
        .iter()
        .find(|c| c.starts_with(&format!("{}=", ACCESS_TOKEN_COOKIE)))
        .expect("access token cookie");
    assert!(token.starts_with("sb-access-token=tok-123"));
    assert!(token.contains("HttpOnly"));
    assert!(token.contains("Path=/"));
    assert!(token.contains("SameSite=Lax"));
    assert!(token.contains("Max-Age=604800"));
    assert!(!token.contains("Secure"));

    assert!(cookies
        .iter()
        .any(|c| c.starts_with(&format!("{}=", SESSION_COOKIE))));

    assert_eq!(body_json(response).await, json!({ "ok": true }));
}

#[tokio::test]
async fn test_session_secure_cookies() {
    let router = test_router_with(
        MockScorer::new(0.1),
        chat_client("http://127.0.0.1:1", None),
        RouterConfig::new(TEST_SECRET).with_secure_cookies(true),
    );

    let response = send(
        &router,
        post_json("/session", r#"{"access_token":"t"}"#, None),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookies(&response).iter().all(|c| c.contains("Secure")));
}

#[tokio::test]
async fn test_session_missing_token_rejected() {
    let router = test_router(MockScorer::new(0.1));

    for body in ["{}", r#"{"access_token":""}"#, r#"{"access_token":null}"#, "not json", ""] {
        let response = send(&router, post_json("/session", body, None)).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {body:?}");
        assert!(set_cookies(&response).is_empty(), "body {body:?}");
        assert_eq!(
            body_json(response).await,
            json!({ "error": "missing access_token" })
        );
    }
}

#[tokio::test]
async fn test_session_cookies_authenticate_follow_up_requests() {
    let router = test_router(MockScorer::new(0.1));

    let response = send(
        &router,
        post_json("/session", r#"{"access_token":"abc"}"#, None),
    )
    .await;
    let cookie = cookie_header(&set_cookies(&response));

    let response = send(&router, get("/dashboard", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_signed_flag_alone_authenticates() {
    let router = test_router(MockScorer::new(0.1));

    let response = send(
        &router,
        post_json("/session", r#"{"access_token":"abc"}"#, None),
    )
    .await;
    let flag_only: Vec<String> = set_cookies(&response)
        .into_iter()
        .filter(|c| c.starts_with(&format!("{}=", SESSION_COOKIE)))
        .collect();

    let response = send(&router, get("/dashboard", Some(&cookie_header(&flag_only)))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_forged_flag_rejected() {
    let router = test_router(MockScorer::new(0.1));

    let response = send(&router, get("/dashboard", Some("session=true"))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get("location").unwrap(), "/");
}

// =============================================================================
// Logout
// =============================================================================

#[tokio::test]
async fn test_logout_post_clears_cookies() {
    let router = test_router(MockScorer::new(0.1));

    let response = send(&router, post_json("/logout", "", Some(&token_cookie("abc")))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(&response);
    assert!(cookies
        .iter()
        .any(|c| c.starts_with("sb-access-token=;") && c.contains("Max-Age=0")));
    assert!(cookies.iter().any(|c| c.starts_with("session=;")));
    assert_eq!(body_json(response).await, json!({ "ok": true }));
}

#[tokio::test]
async fn test_logout_get_redirects_home() {
    let router = test_router(MockScorer::new(0.1));

    let response = send(&router, get("/logout", Some(&token_cookie("abc")))).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get("location").unwrap(), "/");
    assert!(set_cookies(&response)
        .iter()
        .any(|c| c.starts_with("sb-access-token=;")));
}

#[tokio::test]
async fn test_logout_without_session_still_clears() {
    let router = test_router(MockScorer::new(0.1));

    let response = send(&router, post_json("/logout", "", None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(set_cookies(&response).len(), 2);
}

// =============================================================================
// Token Verification
// =============================================================================

#[tokio::test]
async fn test_presence_only_accepts_any_token() {
    let scorer = MockScorer::new(0.9);
    let router = test_router(scorer.clone());

    let response = send(
        &router,
        post_json(
            "/predict",
            json!({ "image": super::test_utils::png_base64(8, 8) }).to_string(),
            Some(&token_cookie("definitely-not-a-jwt")),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(scorer.call_count(), 1);
}

#[tokio::test]
async fn test_verified_tokens_reject_garbage() {
    let scorer = MockScorer::new(0.9);
    let router = test_router_with(
        scorer.clone(),
        chat_client("http://127.0.0.1:1", None),
        RouterConfig::new(TEST_SECRET).with_jwt_secret("jwt-secret"),
    );

    let response = send(
        &router,
        post_json("/session", r#"{"access_token":"garbage"}"#, None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&response).is_empty());

    let response = send(
        &router,
        post_json(
            "/predict",
            json!({ "image": super::test_utils::png_base64(8, 8) }).to_string(),
            Some(&token_cookie("garbage")),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(scorer.call_count(), 0);
}
