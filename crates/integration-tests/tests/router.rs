//! HTTP behavior of the assembled application.
//!
//! Every route exercised here answers without touching the database or
//! Shopify.

#![allow(clippy::unwrap_used)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use serde_json::{Value, json};
use tower::ServiceExt;

use lavistique_integration_tests::{TEST_ADMIN_PASSWORD, test_app, test_config};

fn app() -> Router {
    test_app(test_config())
}

fn json_request(method: Method, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_health() {
    let response = app().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert!(response.headers().contains_key(header::CONTENT_SECURITY_POLICY));
    assert_eq!(
        response.headers().get(header::X_FRAME_OPTIONS).unwrap(),
        "DENY"
    );
}

#[tokio::test]
async fn test_chat_falls_back_without_provider() {
    let body = json!({ "messages": [
        { "role": "user", "content": "How long does shipping take?" }
    ]});
    let response = app()
        .oneshot(json_request(Method::POST, "/api/chat", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let reply = body_json(response).await;
    let content = reply["content"].as_str().unwrap();
    assert_eq!(
        content,
        lavistique_core::chat::fallback_reply("How long does shipping take?")
    );
}

#[tokio::test]
async fn test_chat_requires_messages_array() {
    let response = app()
        .oneshot(json_request(Method::POST, "/api/chat", &json!({ "messages": "hi" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Messages array required" })
    );
}

#[tokio::test]
async fn test_chat_rejects_other_methods() {
    let response = app().oneshot(get("/api/chat")).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_unprefixed_page_redirects_and_captures_promo() {
    let request = Request::builder()
        .uri("/products/royal-pet-portrait?promo=summer20")
        .header(header::ACCEPT_LANGUAGE, "de-DE,de;q=0.9")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/de/products/royal-pet-portrait?promo=summer20"
    );
    let cookies = set_cookies(&response);
    assert!(cookies.iter().any(|c| c.starts_with("lvq_promo=SUMMER20")));
    assert!(cookies.iter().any(|c| c.starts_with("lvq_locale=de")));
}

#[tokio::test]
async fn test_root_redirects_to_english_by_default() {
    let response = app().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/en/");
}

#[tokio::test]
async fn test_locale_cookie_wins_over_browser() {
    let request = Request::builder()
        .uri("/cart")
        .header(header::COOKIE, "lvq_locale=fr")
        .header(header::ACCEPT_LANGUAGE, "de-DE")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/fr/cart");
}

#[tokio::test]
async fn test_promo_without_cookie_is_not_found() {
    let response = app().oneshot(get("/api/promo")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "No active promo code" })
    );
}

#[tokio::test]
async fn test_clearing_promo_expires_cookie() {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/api/promo")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(&response);
    assert!(
        cookies
            .iter()
            .any(|c| c.starts_with("lvq_promo=") && c.contains("Max-Age=0"))
    );
}

#[tokio::test]
async fn test_locale_endpoint_reads_cookies() {
    let request = Request::builder()
        .uri("/api/locale")
        .header(header::COOKIE, "lvq_country=US; lvq_language=en")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let locale = body_json(response).await;
    assert_eq!(locale["country"], "US");
    assert_eq!(locale["language"], "EN");
    assert_eq!(locale["currency"], "USD");
}

#[tokio::test]
async fn test_staff_routes_require_bearer_token() {
    let response = app()
        .oneshot(get("/api/admin/support/count"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/api/admin/support/count")
        .header(header::AUTHORIZATION, "Bearer wrong-password")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_staff_routes_disabled_without_password() {
    let mut config = test_config();
    config.admin_password = None;

    let request = Request::builder()
        .uri("/api/admin/discounts")
        .header(header::AUTHORIZATION, format!("Bearer {TEST_ADMIN_PASSWORD}"))
        .body(Body::empty())
        .unwrap();
    let response = test_app(config).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
