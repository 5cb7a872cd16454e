mod common;

use axum::http::{Method, StatusCode};
use chrono::{TimeDelta, Utc};
use serde_json::json;
use tower::ServiceExt;

use common::{call, request, spawn_app, spawn_app_with};
use messaging_app::models::Role;

fn from_ip(ip: &str, caller: &messaging_app::models::User) -> axum::http::Request<axum::body::Body> {
    let mut req = request(Method::POST, "/api/messages", Some(caller), Some(json!({})));
    req.headers_mut().insert("x-forwarded-for", ip.parse().unwrap());
    req
}

#[tokio::test]
async fn test_sixth_message_in_window_is_refused() {
    let app = spawn_app().await;
    let alice = app.user("Alice", "alice@example.com", Role::Guest).await;

    for _ in 0..5 {
        let (status, _) = call(&app.router, from_ip("10.0.0.1", &alice)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, body) = call(&app.router, from_ip("10.0.0.1", &alice)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.as_str().unwrap().starts_with("Message limit exceeded"));

    // Other clients and other methods are unaffected.
    let (status, _) = call(&app.router, from_ip("10.0.0.2", &alice)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.send(Method::GET, "/api/messages", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit_can_be_disabled() {
    let app = spawn_app_with(|c| c.rate_limit.enabled = false).await;
    let alice = app.user("Alice", "alice@example.com", Role::Guest).await;

    for _ in 0..8 {
        let (status, _) = call(&app.router, from_ip("10.0.0.1", &alice)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_requests_outside_window_are_refused() {
    let now = Utc::now().time();
    let app = spawn_app_with(|c| {
        c.access_window.enabled = true;
        c.access_window.start = now + TimeDelta::hours(2);
        c.access_window.end = now + TimeDelta::hours(3);
    })
    .await;

    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.as_str().unwrap().starts_with("Access denied outside allowed hours"));
}

#[tokio::test]
async fn test_requests_inside_window_pass() {
    let now = Utc::now().time();
    let app = spawn_app_with(|c| {
        c.access_window.enabled = true;
        c.access_window.start = now - TimeDelta::hours(1);
        c.access_window.end = now + TimeDelta::hours(1);
    })
    .await;

    let (status, _) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_request_log_records_caller_and_path() {
    let app = spawn_app().await;
    let alice = app.user("Alice", "alice@example.com", Role::Guest).await;

    app.send(Method::GET, "/api/conversations", Some(&alice), None).await;
    app.send(Method::GET, "/health", None, None).await;

    let log = std::fs::read_to_string(app.dir.path().join("requests.log")).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with(" - User: alice@example.com - Path: /api/conversations"));
    assert!(lines[1].ends_with(" - User: AnonymousUser - Path: /health"));
}

#[tokio::test]
async fn test_refused_requests_are_still_logged() {
    let now = Utc::now().time();
    let app = spawn_app_with(|c| {
        c.access_window.enabled = true;
        c.access_window.start = now + TimeDelta::hours(2);
        c.access_window.end = now + TimeDelta::hours(3);
    })
    .await;

    let (status, _) = app.send(Method::GET, "/api/messages", None, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let log = std::fs::read_to_string(app.dir.path().join("requests.log")).unwrap();
    assert!(log.contains("Path: /api/messages"));
}

#[tokio::test]
async fn test_request_id_is_generated_and_echoed() {
    let app = spawn_app().await;

    let response = app
        .router
        .clone()
        .oneshot(request(Method::GET, "/health", None, None))
        .await
        .unwrap();
    let generated = response.headers().get("x-request-id").unwrap().to_str().unwrap();
    assert!(uuid::Uuid::parse_str(generated).is_ok());

    let mut req = request(Method::GET, "/health", None, None);
    req.headers_mut().insert("x-request-id", "client-chosen".parse().unwrap());
    let response = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(response.headers().get("x-request-id").unwrap(), "client-chosen");
}
