//! HTTP tests for registration, login and the bearer-guarded routes.

mod common;

use axum::http::{header, StatusCode};
use serde_json::{json, Value};
use wanderlist::auth::repo::UserRepo;

use common::{auth_header, build_test_server, login, register};

#[tokio::test]
async fn test_health_endpoint() {
    let (server, _) = build_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "ok");
}

#[tokio::test]
async fn test_register_returns_user_and_token() {
    let (server, _) = build_test_server();
    let body = register(&server, "ana@example.com", "secret1").await;

    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "User registered successfully!");
    assert_eq!(body["data"]["email"], "ana@example.com");
    assert_eq!(body["data"]["name"], "Ana");
    assert!(body["data"].get("password_hash").is_none());

    let token = body["token"].as_str().unwrap();
    let me = server
        .get("/me")
        .add_header(header::AUTHORIZATION, auth_header(token))
        .await;
    me.assert_status_ok();
    assert_eq!(me.json::<Value>()["email"], "ana@example.com");
}

#[tokio::test]
async fn test_register_duplicate_email_is_rejected() {
    let (server, state) = build_test_server();
    register(&server, "ana@example.com", "secret1").await;

    let response = server
        .post("/register")
        .json(&json!({
            "name": "Other",
            "email": "ana@example.com",
            "password": "secret2",
            "password_confirmation": "secret2",
        }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Validation failed.");
    assert_eq!(body["errors"]["email"][0], "The email has already been taken.");

    let user = state.db.find_user_by_email("ana@example.com").await.unwrap().unwrap();
    assert_eq!(user.name, "Ana");
}

#[tokio::test]
async fn test_register_password_confirmation_mismatch() {
    let (server, state) = build_test_server();

    let response = server
        .post("/register")
        .json(&json!({
            "name": "Ana",
            "email": "ana@example.com",
            "password": "secret1",
            "password_confirmation": "secret2",
        }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(
        body["errors"]["password"][0],
        "The password field confirmation does not match."
    );
    assert!(state.db.find_user_by_email("ana@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn test_register_accepts_form_bodies() {
    let (server, _) = build_test_server();

    let response = server
        .post("/register")
        .form(&[
            ("name", "Ana"),
            ("email", "ana@example.com"),
            ("password", "secret1"),
            ("password_confirmation", "secret1"),
        ])
        .await;

    response.assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn test_login_reports_expiry_in_seconds() {
    let (server, _) = build_test_server();
    register(&server, "ana@example.com", "secret1").await;

    let response = server
        .post("/login")
        .json(&json!({ "email": "ana@example.com", "password": "secret1" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["expires_in"], 60 * 60);
    assert!(body["access_token"].is_string());
}

#[tokio::test]
async fn test_login_wrong_password_is_unauthorized() {
    let (server, _) = build_test_server();
    register(&server, "ana@example.com", "secret1").await;

    let response = server
        .post("/login")
        .json(&json!({ "email": "ana@example.com", "password": "wrong-one" }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["message"], "Unauthorized access.");
    assert!(body.get("access_token").is_none());
}

#[tokio::test]
async fn test_login_validation_uses_envelope() {
    let (server, _) = build_test_server();

    let response = server.post("/login").json(&json!({ "email": "nope" })).await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["errors"]["email"][0], "The email field must be a valid email address.");
    assert_eq!(body["errors"]["password"][0], "The password field is required.");
}

#[tokio::test]
async fn test_guarded_routes_need_a_token() {
    let (server, _) = build_test_server();

    for path in ["/me", "/user", "/logout"] {
        let response = server.get(path).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.json::<Value>()["message"], "Unauthenticated.");
    }

    let response = server
        .get("/me")
        .add_header(header::AUTHORIZATION, auth_header("not-a-jwt"))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_user_route_returns_current_user() {
    let (server, _) = build_test_server();
    register(&server, "ana@example.com", "secret1").await;
    let token = login(&server, "ana@example.com", "secret1").await;

    let response = server
        .get("/user")
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["email"], "ana@example.com");
}

#[tokio::test]
async fn test_logout_invalidates_the_token() {
    let (server, _) = build_test_server();
    register(&server, "ana@example.com", "secret1").await;
    let token = login(&server, "ana@example.com", "secret1").await;

    let response = server
        .get("/logout")
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["message"], "Successfully logged out.");

    server
        .get("/me")
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_rotates_the_token() {
    let (server, _) = build_test_server();
    register(&server, "ana@example.com", "secret1").await;
    let old = login(&server, "ana@example.com", "secret1").await;

    let response = server
        .post("/refresh")
        .add_header(header::AUTHORIZATION, auth_header(&old))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["token_type"], "bearer");
    let fresh = body["access_token"].as_str().unwrap().to_string();

    server
        .get("/me")
        .add_header(header::AUTHORIZATION, auth_header(&fresh))
        .await
        .assert_status_ok();
    server
        .get("/me")
        .add_header(header::AUTHORIZATION, auth_header(&old))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_failures_are_server_errors() {
    let (server, _) = build_test_server();

    let response = server.post("/refresh").await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json::<Value>()["message"], "Failed to refresh token.");

    server
        .post("/refresh")
        .add_header(header::AUTHORIZATION, auth_header("garbage"))
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
}
