/// Common test utilities for integration tests
///
/// This module provides shared infrastructure for integration tests:
/// - An app wired against in-memory stores
/// - Registration and sign-in helpers
/// - Request helpers returning status, headers and parsed JSON

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use base64::{engine::general_purpose, Engine};
use roster_api::app::{build_router, AppState};
use roster_api::config::Config;
use roster_shared::auth::password::PasswordParams;
use roster_shared::store::Stores;
use serde_json::{json, Value};
use tower::ServiceExt;

pub const SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// Test context containing all necessary resources
pub struct TestContext {
    pub app: axum::Router,
    pub state: AppState,
}

/// Parsed response
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// All `WWW-Authenticate` values
    pub fn challenges(&self) -> Vec<String> {
        self.headers
            .get_all("www-authenticate")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect()
    }
}

impl TestContext {
    /// Creates a context with default settings
    pub fn new() -> Self {
        Self::with_env(&[])
    }

    /// Creates a context with extra environment overrides
    pub fn with_env(pairs: &[(&str, &str)]) -> Self {
        let mut vars: Vec<(String, String)> = vec![
            ("STORAGE_BACKEND".to_string(), "memory".to_string()),
            ("JWT_SECRET".to_string(), SECRET.to_string()),
        ];
        vars.extend(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())));

        let mut config =
            Config::from_lookup(|key| vars.iter().rev().find(|(k, _)| k == key).map(|(_, v)| v.clone()))
                .expect("test config");
        config.auth.password = PasswordParams::fast();

        let state = AppState::build(config, Stores::memory()).expect("app state");
        let app = build_router(state.clone());

        TestContext { app, state }
    }

    /// Sends a request through the router
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse { status, headers, body }
    }

    pub async fn get(&self, uri: &str, headers: &[(&str, &str)]) -> TestResponse {
        self.send(build(uri, "GET", headers, None)).await
    }

    pub async fn post(&self, uri: &str, headers: &[(&str, &str)], body: Value) -> TestResponse {
        self.send(build(uri, "POST", headers, Some(body))).await
    }

    pub async fn delete(&self, uri: &str, headers: &[(&str, &str)]) -> TestResponse {
        self.send(build(uri, "DELETE", headers, None)).await
    }

    /// Registers an account, asserting success
    pub async fn register(&self, email: &str, password: &str) {
        let response = self
            .post("/register", &[], json!({ "email": email, "password": password }))
            .await;
        assert_eq!(response.status, StatusCode::OK, "register failed: {}", response.body);
    }

    /// Signs in, returning the sign-in response body
    pub async fn sign_in(&self, email: &str, password: &str) -> Value {
        let response = self
            .post("/auth/credentials", &[], json!({ "email": email, "password": password }))
            .await;
        assert_eq!(response.status, StatusCode::OK, "sign-in failed: {}", response.body);
        response.body
    }

    /// Registers and signs in, returning `Bearer {token}`
    pub async fn bearer_for(&self, email: &str, password: &str) -> String {
        self.register(email, password).await;
        let body = self.sign_in(email, password).await;
        format!("Bearer {}", body["bearerToken"].as_str().unwrap())
    }
}

pub fn build(uri: &str, method: &str, headers: &[(&str, &str)], body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }

    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn basic(email: &str, password: &str) -> String {
    format!(
        "Basic {}",
        general_purpose::STANDARD.encode(format!("{}:{}", email, password))
    )
}
