//! Shared utilities for the integration tests.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;

use messaging_app::config::{AppConfig, DatabaseConfig};
use messaging_app::db;
use messaging_app::models::{user, NewUser, Role, User};
use messaging_app::security::X_USER_ID;
use messaging_app::HttpServer;

/// A router over a fresh in-memory database.
pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
    pub dir: TempDir,
}

/// Defaults with the request log pointed into `dir`.
pub fn test_config(dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.database = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        ..DatabaseConfig::default()
    };
    config.request_log.path = dir.path().join("requests.log").to_string_lossy().into_owned();
    config
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

pub async fn spawn_app_with(customize: impl FnOnce(&mut AppConfig)) -> TestApp {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir);
    customize(&mut config);

    let pool = db::init(&config.database).await.unwrap();
    let router = HttpServer::new(config, pool.clone()).router();
    TestApp { router, pool, dir }
}

impl TestApp {
    pub async fn user(&self, first_name: &str, email: &str, role: Role) -> User {
        let mut conn = self.pool.acquire().await.unwrap();
        user::insert(
            &mut conn,
            NewUser {
                first_name: first_name.to_string(),
                last_name: "Tester".to_string(),
                email: email.to_string(),
                phone_number: None,
                role,
            },
        )
        .await
        .unwrap()
    }

    pub async fn send(&self, method: Method, uri: &str, caller: Option<&User>, body: Option<Value>) -> (StatusCode, Value) {
        call(&self.router, request(method, uri, caller, body)).await
    }
}

pub fn request(method: Method, uri: &str, caller: Option<&User>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = caller {
        builder = builder.header(X_USER_ID, user.user_id.to_string());
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Drive one request through the router. Non-JSON bodies come back as a string.
pub async fn call(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}
