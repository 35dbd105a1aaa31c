mod common;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Request, StatusCode},
};
use common::TestApp;
use serde_json::json;
use std::net::SocketAddr;
use tower::util::ServiceExt;

fn login_request(peer: &str, forwarded: Option<&str>) -> Request<Body> {
    let peer: SocketAddr = format!("{}:51000", peer).parse().unwrap();
    let mut builder = Request::builder()
        .method("POST")
        .uri("/admin/login")
        .header(header::CONTENT_TYPE, "application/json")
        .extension(ConnectInfo(peer));
    if let Some(chain) = forwarded {
        builder = builder.header("x-forwarded-for", chain);
    }
    builder
        .body(Body::from(
            json!({"email": "nobody@x.com", "password": "password123"}).to_string(),
        ))
        .unwrap()
}

async fn login_status(app: &TestApp, peer: &str, forwarded: Option<&str>) -> StatusCode {
    app.router
        .clone()
        .oneshot(login_request(peer, forwarded))
        .await
        .unwrap()
        .status()
}

#[tokio::test]
async fn test_login_rate_limit_per_ip() {
    let app = TestApp::spawn_with(|config| {
        config.rate_limit.login_attempts = 2;
        config.rate_limit.login_window_seconds = 60;
    })
    .await;

    for _ in 0..2 {
        assert_eq!(
            login_status(&app, "203.0.113.7", None).await,
            StatusCode::UNAUTHORIZED
        );
    }

    let response = app
        .router
        .clone()
        .oneshot(login_request("203.0.113.7", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));

    // Other clients keep their own budget
    assert_eq!(
        login_status(&app, "198.51.100.1", None).await,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_forwarded_header_from_direct_client_is_ignored() {
    let app = TestApp::spawn_with(|config| {
        config.rate_limit.login_attempts = 2;
        config.rate_limit.login_window_seconds = 60;
    })
    .await;

    let mut statuses = Vec::new();
    for i in 0..10 {
        let forged = format!("198.51.100.{}", i + 1);
        statuses.push(login_status(&app, "192.0.2.50", Some(&forged)).await);
    }

    assert_eq!(&statuses[..2], &[StatusCode::UNAUTHORIZED; 2]);
    assert!(statuses[2..]
        .iter()
        .all(|status| *status == StatusCode::TOO_MANY_REQUESTS));
}

#[tokio::test]
async fn test_trusted_proxy_forwards_client_address() {
    let app = TestApp::spawn_with(|config| {
        config.rate_limit.login_attempts = 1;
        config.rate_limit.trusted_proxies = vec!["10.0.0.1".parse().unwrap()];
    })
    .await;

    assert_eq!(
        login_status(&app, "10.0.0.1", Some("203.0.113.20")).await,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        login_status(&app, "10.0.0.1", Some("203.0.113.20")).await,
        StatusCode::TOO_MANY_REQUESTS
    );

    // A different client behind the same proxy has its own budget
    assert_eq!(
        login_status(&app, "10.0.0.1", Some("203.0.113.21")).await,
        StatusCode::UNAUTHORIZED
    );

    // A spoofed left-most hop does not escape the real client's budget
    assert_eq!(
        login_status(&app, "10.0.0.1", Some("1.1.1.1, 203.0.113.20")).await,
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[tokio::test]
async fn test_login_limit_does_not_throttle_status_polling() {
    let app = TestApp::spawn_with(|config| config.rate_limit.login_attempts = 1).await;

    for _ in 0..2 {
        login_status(&app, "203.0.113.8", None).await;
    }

    let peer: SocketAddr = "203.0.113.8:51000".parse().unwrap();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/admin/status/{}", uuid::Uuid::new_v4()))
                .extension(ConnectInfo(peer))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
