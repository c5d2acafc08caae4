// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
};
use menuboard::config::Config;
use menuboard::db::{FirestoreStore, MemoryStore};
use menuboard::routes::create_router;
use menuboard::services::TokenService;
use menuboard::AppState;
use std::sync::Arc;
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreStore {
    FirestoreStore::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// State over a fresh in-memory store.
#[allow(dead_code)]
pub fn test_state(config: Config) -> Arc<AppState> {
    Arc::new(AppState::new(config, Arc::new(MemoryStore::new())))
}

/// Create a test app over a fresh in-memory store.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> (axum::Router, Arc<AppState>) {
    let state = test_state(config);
    (create_router(state.clone()), state)
}

/// Same as [`create_test_app`] but with custom token lifetimes.
#[allow(dead_code)]
pub fn create_test_app_with_ttls(
    access_secs: u64,
    refresh_secs: u64,
) -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let tokens = TokenService::from_config(&config).with_ttls(access_secs, refresh_secs);
    let state = Arc::new(AppState {
        config,
        db: Arc::new(MemoryStore::new()),
        tokens,
    });
    (create_router(state.clone()), state)
}

/// Serve `state` on an ephemeral local port. Returns the base URL.
#[allow(dead_code)]
pub async fn spawn_server(state: Arc<AppState>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

#[allow(dead_code)]
pub fn find_cookie(headers: &[String], name: &str) -> String {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
        .unwrap_or_else(|| panic!("missing Set-Cookie header for {name}: {headers:?}"))
}

/// Value of cookie `name` from a list of Set-Cookie headers.
#[allow(dead_code)]
pub fn cookie_value(headers: &[String], name: &str) -> String {
    let cookie = find_cookie(headers, name);
    let pair = cookie.split(';').next().unwrap();
    pair[name.len() + 1..].to_string()
}

/// `Cookie` request header echoing back every cookie in `headers`.
#[allow(dead_code)]
pub fn cookie_header(headers: &[String]) -> String {
    headers
        .iter()
        .map(|h| h.split(';').next().unwrap().to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[allow(dead_code)]
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Log in through the router and return the Set-Cookie headers.
#[allow(dead_code)]
pub async fn login(app: &axum::Router, email: &str, password: &str) -> Vec<String> {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            serde_json::json!({ "email": email, "password": password }),
        ))
        .await
        .unwrap();
    assert!(
        response.status().is_success(),
        "login failed with {}",
        response.status()
    );
    set_cookie_headers(&response)
}
