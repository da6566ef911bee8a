#![allow(dead_code)]

use axum_test::TestServer;
use serde_json::{json, Value};
use wanderlist::{app::build_app, state::AppState};

/// Server over the in-memory store and storage, plus the state behind it.
pub fn build_test_server() -> (TestServer, AppState) {
    let state = AppState::fake();
    let server = TestServer::new(build_app(state.clone())).unwrap();
    (server, state)
}

pub fn auth_header(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Smallest body the image sniffer accepts as PNG.
pub fn png_bytes() -> Vec<u8> {
    let mut body = b"\x89PNG\r\n\x1a\n".to_vec();
    body.extend_from_slice(&[0u8; 64]);
    body
}

pub fn gif_bytes() -> Vec<u8> {
    let mut body = b"GIF89a".to_vec();
    body.extend_from_slice(&[0u8; 64]);
    body
}

pub async fn register(server: &TestServer, email: &str, password: &str) -> Value {
    let response = server
        .post("/register")
        .json(&json!({
            "name": "Ana",
            "email": email,
            "password": password,
            "password_confirmation": password,
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    response.json::<Value>()
}

pub async fn login(server: &TestServer, email: &str, password: &str) -> String {
    let response = server
        .post("/login")
        .json(&json!({ "email": email, "password": password }))
        .await;
    response.assert_status_ok();
    response.json::<Value>()["access_token"]
        .as_str()
        .unwrap()
        .to_string()
}
