pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use service_core::axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Json, Router,
};
use service_core::middleware::{
    metrics::metrics_middleware,
    rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware, IpRateLimit, IpRateLimiter},
    security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use service_core::observability::PrometheusHandle;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::config::AuthConfig;
use crate::services::{
    CredentialStore, FamilyDirectory, InMemoryRevocationList, JwtService, Notifier,
    RequestLedger, ServiceError, SessionIssuer, SuperAdminAccount,
};
use service_core::error::AppError;
use std::sync::Arc;

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::onboarding::register,
        handlers::onboarding::request_status,
        handlers::auth::session::super_admin_login,
        handlers::auth::session::admin_login,
        handlers::auth::session::member_login,
        handlers::auth::session::verify_token,
        handlers::auth::session::me,
        handlers::auth::session::logout,
        handlers::auth::magic_link::request_magic_link,
        handlers::auth::magic_link::verify_magic_link,
        handlers::admin::requests::list_pending,
        handlers::admin::requests::list_all,
        handlers::admin::requests::approve,
        handlers::admin::requests::reject,
        handlers::families::create_family_user,
        handlers::families::list_family_users,
        handlers::families::get_family,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::onboarding::AdminRegisterRequest,
            dtos::onboarding::AdminRegisterResponse,
            dtos::onboarding::RequestListResponse,
            dtos::onboarding::ApproveRequest,
            dtos::onboarding::ApproveResponse,
            dtos::onboarding::RejectRequest,
            dtos::onboarding::RejectResponse,
            dtos::auth::SuperAdminLoginRequest,
            dtos::auth::AdminLoginRequest,
            dtos::auth::MemberLoginRequest,
            dtos::auth::MagicLinkRequest,
            dtos::auth::MagicLinkVerifyRequest,
            dtos::auth::VerifyTokenRequest,
            dtos::auth::MessageResponse,
            dtos::family::CreateFamilyUserRequest,
            dtos::family::FamilyUsersResponse,
            services::AuthSession,
            models::UserProfile,
            models::UserResponse,
            models::FamilyResponse,
            models::OnboardingRequestView,
            models::RequestStatus,
            models::Role,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Onboarding", description = "Family admin registration requests"),
        (name = "Onboarding Review", description = "Super admin approval workflow"),
        (name = "Authentication", description = "Login schemes and session management"),
        (name = "Families", description = "Family-scoped credential administration"),
        (name = "Observability", description = "Service health and monitoring"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: AuthConfig,
    pub store: Arc<dyn CredentialStore>,
    pub ledger: RequestLedger,
    pub issuer: SessionIssuer,
    pub families: FamilyDirectory,
    pub metrics: Option<PrometheusHandle>,
    pub login_rate_limiter: IpRateLimit,
    pub register_rate_limiter: IpRateLimit,
    pub status_rate_limiter: IpRateLimit,
    pub ip_rate_limiter: IpRateLimit,
}

impl AppState {
    /// Wire the services over `store` and `notifier`. The super admin must
    /// already be provisioned into `store`.
    pub fn new(
        config: AuthConfig,
        store: Arc<dyn CredentialStore>,
        notifier: Arc<dyn Notifier>,
        super_admin: Option<SuperAdminAccount>,
        metrics: Option<PrometheusHandle>,
    ) -> Result<Self, AppError> {
        let jwt = JwtService::new(&config.jwt).map_err(AppError::ConfigError)?;

        let issuer = SessionIssuer::new(
            store.clone(),
            jwt,
            Arc::new(InMemoryRevocationList::new()),
            notifier.clone(),
            super_admin,
            config.magic_link.clone(),
        );

        let limits = &config.rate_limit;
        let keyed = |attempts, window_seconds| {
            IpRateLimit::new(
                create_ip_rate_limiter(attempts, window_seconds),
                &limits.trusted_proxies,
            )
        };
        let login_rate_limiter = keyed(limits.login_attempts, limits.login_window_seconds);
        let register_rate_limiter =
            keyed(limits.register_attempts, limits.register_window_seconds);
        let status_rate_limiter = keyed(limits.status_limit, limits.status_window_seconds);
        let ip_rate_limiter = keyed(limits.global_ip_limit, limits.global_ip_window_seconds);

        Ok(Self {
            ledger: RequestLedger::new(store.clone(), notifier),
            families: FamilyDirectory::new(store.clone()),
            issuer,
            store,
            metrics,
            login_rate_limiter,
            register_rate_limiter,
            status_rate_limiter,
            ip_rate_limiter,
            config,
        })
    }

    /// Limiters whose idle keys are pruned in the background.
    pub fn rate_limiters(&self) -> Vec<IpRateLimiter> {
        [
            &self.login_rate_limiter,
            &self.register_rate_limiter,
            &self.status_rate_limiter,
            &self.ip_rate_limiter,
        ]
        .into_iter()
        .map(|rate_limit| rate_limit.limiter().clone())
        .collect()
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins = if allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed_origins.iter().filter_map(|o| {
            o.parse::<HeaderValue>()
                .map_err(|e| tracing::error!(origin = %o, error = %e, "Ignoring invalid CORS origin"))
                .ok()
        }))
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

pub async fn build_router(state: AppState) -> Result<Router, AppError> {
    // Credential-checking routes share the login limiter
    let login_routes = Router::new()
        .route("/superadmin/login", post(handlers::auth::super_admin_login))
        .route("/admin/login", post(handlers::auth::admin_login))
        .route("/member/login", post(handlers::auth::member_login))
        .route("/auth/magic-link", post(handlers::auth::request_magic_link))
        .route(
            "/auth/magic-link/verify",
            post(handlers::auth::verify_magic_link),
        )
        .layer(from_fn_with_state(
            state.login_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let register_route = Router::new()
        .route("/admin/register", post(handlers::onboarding::register))
        .layer(from_fn_with_state(
            state.register_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let status_route = Router::new()
        .route(
            "/admin/status/:request_id",
            get(handlers::onboarding::request_status),
        )
        .layer(from_fn_with_state(
            state.status_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let review_routes = Router::new()
        .route("/admin/requests/pending", get(handlers::admin::list_pending))
        .route("/admin/requests/all", get(handlers::admin::list_all))
        .route("/admin/request/approve", post(handlers::admin::approve))
        .route("/admin/request/reject", post(handlers::admin::reject));

    let family_routes = Router::new()
        .route("/families/:family_id", get(handlers::families::get_family))
        .route(
            "/families/:family_id/users",
            get(handlers::families::list_family_users)
                .post(handlers::families::create_family_user),
        );

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .route(
            "/.well-known/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .route("/auth/verify-token", post(handlers::auth::verify_token))
        .route("/auth/me", get(handlers::auth::me))
        .route("/auth/logout", post(handlers::auth::logout))
        .merge(login_routes)
        .merge(register_route)
        .merge(status_route)
        .merge(review_routes)
        .merge(family_routes)
        // Resolve the bearer token once; handlers gate on the result
        .layer(from_fn_with_state(
            state.clone(),
            middleware::session_middleware,
        ))
        .with_state(state.clone())
        .layer(from_fn_with_state(
            state.ip_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ))
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &service_core::axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer(&state.config.security.allowed_origins));

    Ok(app)
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 500, description = "Credential store unreachable", body = ErrorResponse)
    ),
    tag = "Observability"
)]
pub async fn health_check(
    service_core::axum::extract::State(state): service_core::axum::extract::State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.store.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Credential store health check failed");
        AppError::from(ServiceError::from(e))
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "store": "up"
        }
    })))
}
