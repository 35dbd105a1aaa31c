mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn test_verify_token_returns_profile() {
    let app = TestApp::spawn().await;
    let (family_id, admin) = app.onboard_family("admin@x.com", "Sharmas").await;

    let (status, profile) = app
        .post("/auth/verify-token", None, json!({"token": admin}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["email"], "admin@x.com");
    assert_eq!(profile["role"], "family_admin");
    assert_eq!(profile["family_id"], family_id.to_string());

    let (status, err) = app
        .post("/auth/verify-token", None, json!({"token": "garbage"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(err["error"], "Invalid or expired token");
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_rejected() {
    let app = TestApp::spawn().await;
    let other = TestApp::spawn_with(|config| {
        config.jwt.secret =
            secrecy::SecretString::new("another-secret-entirely-0123456789abcdef".to_string());
    })
    .await;
    let foreign = other.super_admin_token().await;

    let (status, _) = app
        .post("/auth/verify-token", None, json!({"token": foreign}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/auth/me", Some(&foreign)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_requires_session() {
    let app = TestApp::spawn().await;
    let root = app.super_admin_token().await;

    let (status, profile) = app.get("/auth/me", Some(&root)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["role"], "super_admin");

    let (status, err) = app.get("/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(err["kind"], "unauthenticated");
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let app = TestApp::spawn().await;
    let root = app.super_admin_token().await;

    let (status, body) = app.send(Method::POST, "/auth/logout", Some(&root), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logged out successfully");

    let (status, _) = app.get("/auth/me", Some(&root)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/admin/requests/pending", Some(&root)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post("/auth/verify-token", None, json!({"token": root}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A fresh login is unaffected
    let fresh = app.super_admin_token().await;
    let (status, _) = app.get("/auth/me", Some(&fresh)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.send(Method::POST, "/auth/logout", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
