//! Router-level test harness: in-memory store, recording notifier and a
//! provisioned super admin, driven with `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Method, Request, StatusCode},
    Router,
};
use family_auth_service::{
    build_router,
    config::{
        AuthConfig, DatabaseConfig, Environment, JwtConfig, MagicLinkConfig, NotifierConfig,
        NotifierKind, RateLimitConfig, SecurityConfig, StoreBackend, SuperAdminConfig,
    },
    services::{CredentialStore, InMemoryStore, MockNotifier, SuperAdminAccount},
    utils::{hash_password, Password},
    AppState,
};
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

pub const SUPERADMIN_USERNAME: &str = "root";
pub const SUPERADMIN_EMAIL: &str = "root@familytree.test";
pub const SUPERADMIN_PASSWORD: &str = "correct-horse-battery";
pub const ADMIN_PASSWORD: &str = "password123";
pub const FAMILY_PASSWORD: &str = "fam1";
/// Socket peer attached to every request, as `into_make_service_with_connect_info` would.
pub const TEST_PEER: ([u8; 4], u16) = ([127, 0, 0, 1], 40000);

pub fn test_config() -> AuthConfig {
    AuthConfig {
        common: service_core::config::Config::default(),
        environment: Environment::Dev,
        service_name: "family-auth-service-test".to_string(),
        service_version: "test".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        store: StoreBackend::Memory,
        database: DatabaseConfig {
            url: String::new(),
            max_connections: 1,
            min_connections: 1,
        },
        jwt: JwtConfig {
            secret: SecretString::new("integration-test-secret-0123456789abcdef".to_string()),
            access_token_expiry_minutes: 60,
        },
        super_admin: Some(SuperAdminConfig {
            username: SUPERADMIN_USERNAME.to_string(),
            email: SUPERADMIN_EMAIL.to_string(),
            password_hash: SecretString::new(
                hash_password(&Password::new(SUPERADMIN_PASSWORD))
                    .expect("hash super admin password")
                    .into_string(),
            ),
        }),
        magic_link: MagicLinkConfig {
            enabled: false,
            ttl_minutes: 15,
            base_url: "http://localhost:3000".to_string(),
        },
        notifier: NotifierConfig {
            kind: NotifierKind::Log,
            smtp: None,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        rate_limit: RateLimitConfig {
            login_attempts: 1000,
            login_window_seconds: 60,
            register_attempts: 1000,
            register_window_seconds: 60,
            status_limit: 1000,
            status_window_seconds: 60,
            global_ip_limit: 10_000,
            global_ip_window_seconds: 60,
            trusted_proxies: Vec::new(),
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub notifier: Arc<MockNotifier>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    pub async fn spawn_with(customize: impl FnOnce(&mut AuthConfig)) -> Self {
        let mut config = test_config();
        customize(&mut config);

        let store = Arc::new(InMemoryStore::new());
        let notifier = Arc::new(MockNotifier::new());

        let super_admin = match &config.super_admin {
            Some(super_admin) => Some(
                SuperAdminAccount::provision(store.as_ref(), super_admin)
                    .await
                    .expect("provision super admin"),
            ),
            None => None,
        };

        let state = AppState::new(
            config,
            store.clone() as Arc<dyn CredentialStore>,
            notifier.clone(),
            super_admin,
            None,
        )
        .expect("build app state");
        let router = build_router(state.clone()).await.expect("build router");

        TestApp {
            router,
            state,
            store,
            notifier,
        }
    }

    /// Send a request and return the status with the JSON body (`Null` when
    /// the body is empty or not JSON).
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .extension(ConnectInfo(SocketAddr::from(TEST_PEER)));
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    pub async fn register(&self, email: &str, family_name: &str) -> (StatusCode, Value) {
        self.post(
            "/admin/register",
            None,
            json!({
                "email": email,
                "full_name": "Priya Sharma",
                "family_name": family_name,
                "password": ADMIN_PASSWORD,
                "confirm_password": ADMIN_PASSWORD,
                "family_password": FAMILY_PASSWORD,
            }),
        )
        .await
    }

    pub async fn super_admin_token(&self) -> String {
        let (status, body) = self
            .post(
                "/superadmin/login",
                None,
                json!({"username": SUPERADMIN_USERNAME, "password": SUPERADMIN_PASSWORD}),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "super admin login failed: {}", body);
        body["access_token"].as_str().unwrap().to_string()
    }

    pub async fn admin_token(&self, email: &str) -> String {
        let (status, body) = self
            .post(
                "/admin/login",
                None,
                json!({"email": email, "password": ADMIN_PASSWORD}),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "admin login failed: {}", body);
        body["access_token"].as_str().unwrap().to_string()
    }

    /// Register, approve and log in a family admin. Returns the family id and
    /// the admin's token.
    pub async fn onboard_family(&self, email: &str, family_name: &str) -> (Uuid, String) {
        let (status, body) = self.register(email, family_name).await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        let request_id = body["request_id"].as_str().unwrap().to_string();

        let root = self.super_admin_token().await;
        let (status, body) = self
            .post(
                "/admin/request/approve",
                Some(&root),
                json!({"request_id": request_id}),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "approve failed: {}", body);

        let family_id = body["user"]["family_id"].as_str().unwrap().parse().unwrap();
        (family_id, self.admin_token(email).await)
    }

    pub async fn add_member(
        &self,
        admin_token: &str,
        family_id: Uuid,
        email: &str,
        role: &str,
    ) -> (StatusCode, Value) {
        self.post(
            &format!("/families/{}/users", family_id),
            Some(admin_token),
            json!({"email": email, "full_name": "Ravi", "role": role}),
        )
        .await
    }

    pub async fn member_login(
        &self,
        email: &str,
        family_name: &str,
        family_password: &str,
    ) -> (StatusCode, Value) {
        self.post(
            "/member/login",
            None,
            json!({
                "email": email,
                "family_name": family_name,
                "family_password": family_password,
            }),
        )
        .await
    }
}
