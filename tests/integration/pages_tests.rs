//! Page and health integration tests.

use axum::http::StatusCode;

use pneumoscan::server::{PageConfig, RouterConfig};

use super::test_utils::{
    body_json, body_text, chat_client, get, send, test_router, test_router_with, token_cookie,
    MockScorer, TEST_SECRET,
};

#[tokio::test]
async fn test_landing_page_is_public() {
    let router = test_router(MockScorer::new(0.1));

    let response = send(&router, get("/", None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    assert!(body_text(response).await.contains("PneumoScan"));
}

#[tokio::test]
async fn test_auth_page_for_anonymous_user() {
    let router = test_router_with(
        MockScorer::new(0.1),
        chat_client("http://127.0.0.1:1", None),
        RouterConfig::new(TEST_SECRET)
            .with_pages(PageConfig::new("https://demo.supabase.co", "anon-key")),
    );

    let response = send(&router, get("/auth", None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("https://demo.supabase.co"));
    assert!(html.contains("anon-key"));
}

#[tokio::test]
async fn test_auth_page_redirects_signed_in_user() {
    let router = test_router(MockScorer::new(0.1));

    let response = send(&router, get("/auth", Some(&token_cookie("tok")))).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get("location").unwrap(), "/dashboard");
}

#[tokio::test]
async fn test_dashboard_requires_session() {
    let router = test_router(MockScorer::new(0.1));

    let response = send(&router, get("/dashboard", None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get("location").unwrap(), "/");

    let response = send(&router, get("/dashboard", Some(&token_cookie("tok")))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("/predict"));
}

#[tokio::test]
async fn test_health() {
    let router = test_router(MockScorer::new(0.1));

    let response = send(&router, get("/health", None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_unknown_route() {
    let router = test_router(MockScorer::new(0.1));

    let response = send(&router, get("/slides", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
